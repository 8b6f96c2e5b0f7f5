/*!
# Woffli: Options.
*/

use std::num::NonZeroU32;



/// # Default Iterations (Small Inputs).
const ITERATIONS_SMALL: NonZeroU32 = NonZeroU32::MIN.saturating_add(14);

/// # Default Iterations (Large Inputs).
const ITERATIONS_LARGE: NonZeroU32 = NonZeroU32::MIN.saturating_add(4);

/// # Large Input Threshold.
const LARGE_INPUT: usize = 200_000;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Compression Options.
///
/// This struct holds the (few) knobs governing compression. The defaults are
/// sensible for WOFF tables, which tend to be small and numerous.
///
/// ## Examples
///
/// ```
/// use std::num::NonZeroU32;
/// use woffli::ZopfliOptions;
///
/// let opts = ZopfliOptions::new()
///     .with_iterations(NonZeroU32::new(50))
///     .with_max_blocks(0);
///
/// assert_eq!(opts.iterations(1000).get(), 50);
/// assert_eq!(opts.max_blocks(), 0);
/// assert!(opts.block_splitting());
/// ```
pub struct ZopfliOptions {
	/// # Iterations.
	iterations: Option<NonZeroU32>,

	/// # Block Splitting.
	block_splitting: bool,

	/// # Maximum Blocks.
	max_blocks: usize,

	/// # Verbose.
	verbose: bool,

	/// # Verify.
	verify: bool,
}

impl Default for ZopfliOptions {
	#[inline]
	fn default() -> Self { Self::new() }
}

impl ZopfliOptions {
	#[must_use]
	/// # New.
	///
	/// Return the default options: size-based iterations, block splitting
	/// enabled with up to fifteen blocks per master chunk, no diagnostic
	/// output, and post-compression verification.
	pub const fn new() -> Self {
		Self {
			iterations: None,
			block_splitting: true,
			max_blocks: 15,
			verbose: false,
			verify: true,
		}
	}

	#[must_use]
	/// # With Iterations.
	///
	/// Set the number of optimal-parse passes to run for each block. If
	/// `None`, fifteen passes are run for inputs under 200,000 bytes, and five
	/// for anything bigger.
	///
	/// More passes can squeeze out a few more bytes, but are proportionally
	/// slower.
	pub const fn with_iterations(self, iterations: Option<NonZeroU32>) -> Self {
		Self { iterations, ..self }
	}

	#[must_use]
	/// # With Block Splitting.
	///
	/// Enable or disable block splitting.
	pub const fn with_block_splitting(self, block_splitting: bool) -> Self {
		Self { block_splitting, ..self }
	}

	#[must_use]
	/// # With Max Blocks.
	///
	/// Set the maximum number of blocks a master chunk may be split into.
	/// Zero means unlimited.
	pub const fn with_max_blocks(self, max_blocks: usize) -> Self {
		Self { max_blocks, ..self }
	}

	#[must_use]
	/// # With Verbose.
	///
	/// Print split points, block choices, and a summary to STDERR.
	pub const fn with_verbose(self, verbose: bool) -> Self {
		Self { verbose, ..self }
	}

	#[must_use]
	/// # With Verify.
	///
	/// Enable or disable the post-compression inflate check.
	pub const fn with_verify(self, verify: bool) -> Self {
		Self { verify, ..self }
	}
}

impl ZopfliOptions {
	#[must_use]
	/// # Iterations.
	///
	/// Return the number of optimal-parse passes to use for an input of `len`
	/// bytes.
	pub const fn iterations(&self, len: usize) -> NonZeroU32 {
		match self.iterations {
			Some(n) => n,
			None =>
				if len < LARGE_INPUT { ITERATIONS_SMALL }
				else { ITERATIONS_LARGE },
		}
	}

	#[must_use]
	/// # Block Splitting?
	pub const fn block_splitting(&self) -> bool { self.block_splitting }

	#[must_use]
	/// # Max Blocks.
	pub const fn max_blocks(&self) -> usize { self.max_blocks }

	#[must_use]
	/// # Verbose?
	pub const fn verbose(&self) -> bool { self.verbose }

	#[must_use]
	/// # Verify?
	pub const fn verify(&self) -> bool { self.verify }
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_defaults() {
		let opts = ZopfliOptions::default();
		assert_eq!(opts, ZopfliOptions::new());
		assert!(opts.block_splitting());
		assert_eq!(opts.max_blocks(), 15);
		assert!(! opts.verbose());
		assert!(opts.verify());
	}

	#[test]
	fn t_iterations() {
		let opts = ZopfliOptions::new();
		assert_eq!(opts.iterations(0).get(), 15);
		assert_eq!(opts.iterations(LARGE_INPUT - 1).get(), 15);
		assert_eq!(opts.iterations(LARGE_INPUT).get(), 5);

		// Explicit values win regardless of size.
		let opts = opts.with_iterations(NonZeroU32::new(3));
		assert_eq!(opts.iterations(0).get(), 3);
		assert_eq!(opts.iterations(LARGE_INPUT * 10).get(), 3);

		// And can be unset again.
		let opts = opts.with_iterations(None);
		assert_eq!(opts.iterations(LARGE_INPUT).get(), 5);
	}

	#[test]
	fn t_builders() {
		let opts = ZopfliOptions::new()
			.with_block_splitting(false)
			.with_max_blocks(3)
			.with_verbose(true)
			.with_verify(false);
		assert!(! opts.block_splitting());
		assert_eq!(opts.max_blocks(), 3);
		assert!(opts.verbose());
		assert!(! opts.verify());
	}
}
