/*!
# Woffli: Dynamic Lengths and RLE Optimization.
*/

use crate::ZopfliError;
use super::{
	ArrayD,
	ArrayLL,
	best_tree_size,
	DeflateSym,
	DISTANCE_BITS,
	LENGTH_EXTRA_BITS,
	LengthLimitedCodeLengths,
	LZ77StoreRange,
};



#[derive(Clone, Copy)]
/// # Dynamic Lengths.
///
/// The code lengths (and tree-encoding flags) for a dynamic block, along with
/// the total cost of writing the block's tree and data with them.
///
/// Two sets of lengths are considered: one built from the range's actual
/// symbol counts, another from RLE-friendlier approximations of those counts.
/// The cheaper of the two is kept.
pub(crate) struct DynamicLengths {
	/// # Extra Deflate Symbols Used.
	extra: u8,

	/// # Total Size (Tree and Data).
	size: u32,

	/// # Litlen Lengths.
	ll_lengths: ArrayLL<DeflateSym>,

	/// # Distance Lengths.
	d_lengths: ArrayD<DeflateSym>,
}

impl DynamicLengths {
	/// # New.
	pub(crate) fn new(store: LZ77StoreRange<'_>) -> Result<Self, ZopfliError> {
		let (mut ll_counts, d_counts) = store.histogram()?;
		ll_counts[256] = 1;

		let ll_lengths = ll_counts.llcl()?;
		let d_lengths = d_counts.llcl()?;
		let (extra, size) = calculate_size(&ll_counts, &d_counts, &ll_lengths, &d_lengths)?;
		let mut out = Self { extra, size, ll_lengths, d_lengths };

		if let Some((ll_lengths2, d_lengths2)) = out.try_optimized(&ll_counts, &d_counts)? {
			let (extra2, size2) = calculate_size(&ll_counts, &d_counts, &ll_lengths2, &d_lengths2)?;
			if size2 < out.size {
				out.extra = extra2;
				out.size = size2;
				out.ll_lengths = ll_lengths2;
				out.d_lengths = d_lengths2;
			}
		}

		Ok(out)
	}

	/// # Try Optimized.
	///
	/// Smooth the counts and build new lengths from them, returning them
	/// unless they wind up identical to what we already have.
	fn try_optimized(&self, ll_counts: &ArrayLL<u32>, d_counts: &ArrayD<u32>)
	-> Result<Option<(ArrayLL<DeflateSym>, ArrayD<DeflateSym>)>, ZopfliError> {
		let d_lengths2 = match optimize_huffman_for_rle(d_counts) {
			Some(c) => c.llcl()?,
			None => self.d_lengths,
		};
		let ll_lengths2 = match optimize_huffman_for_rle(ll_counts) {
			Some(c) => c.llcl()?,
			None => self.ll_lengths,
		};

		if d_lengths2 == self.d_lengths && ll_lengths2 == self.ll_lengths { Ok(None) }
		else { Ok(Some((ll_lengths2, d_lengths2))) }
	}
}

impl DynamicLengths {
	/// # Cost.
	///
	/// The combined tree and data size in bits, excluding the block header.
	pub(crate) const fn cost(&self) -> u32 { self.size }

	/// # Extra.
	pub(crate) const fn extra(&self) -> u8 { self.extra }

	/// # Litlen Lengths.
	pub(crate) const fn ll_lengths(&self) -> &ArrayLL<DeflateSym> { &self.ll_lengths }

	/// # Distance Lengths.
	pub(crate) const fn d_lengths(&self) -> &ArrayD<DeflateSym> { &self.d_lengths }
}



/// # Calculate Size and Extra.
///
/// Return the best tree-encoding flags and the total tree plus data size.
/// The data size is always computed from the real counts, even when the
/// lengths came from smoothed ones.
fn calculate_size(
	ll_counts: &ArrayLL<u32>,
	d_counts: &ArrayD<u32>,
	ll_lengths: &ArrayLL<DeflateSym>,
	d_lengths: &ArrayD<DeflateSym>,
) -> Result<(u8, u32), ZopfliError> {
	let (extra, treesize) = best_tree_size(ll_lengths, d_lengths)?;

	let a = ll_counts.iter()
		.zip(ll_lengths.iter())
		.zip(LENGTH_EXTRA_BITS.iter())
		.map(|((&c, &l), &b)| c * (l as u32 + u32::from(b)))
		.sum::<u32>();
	let b = d_counts.iter()
		.zip(d_lengths.iter())
		.zip(DISTANCE_BITS.iter())
		.take(30)
		.map(|((&c, &l), &b)| c * (l as u32 + u32::from(b)))
		.sum::<u32>();

	Ok((extra, treesize + a + b))
}

#[expect(clippy::integer_division, reason = "We want this.")]
/// # Optimize Huffman RLE Compression.
///
/// Return a copy of the counts with near-equal neighbors flattened into
/// averages, which tends to make the resulting code lengths cheaper to
/// run-length encode. Returns `None` if the counts are all zero.
fn optimize_huffman_for_rle<const N: usize>(counts: &[u32; N]) -> Option<[u32; N]> {
	let mut out = *counts;
	let len = out.iter().rposition(|&c| c != 0)? + 1;
	let good: Vec<bool> = GoodForRle::new(&out[..len]).collect();
	let counts = &mut out[..len];

	let mut stride: usize = 0;
	let mut sum: u32 = 0;
	let mut scratch: u32 = counts[0];
	for i in 0..=len {
		if i == len || good[i] || counts[i].abs_diff(scratch) >= 4 {
			// Collapse the stride if it is long enough and held something.
			if sum != 0 && 4 <= stride {
				#[expect(clippy::cast_possible_truncation, reason = "False positive.")]
				let stride32 = stride as u32;
				let v = u32::max((sum + stride32 / 2) / stride32, 1);
				for c in &mut counts[i - stride..i] { *c = v; }
			}

			stride = 0;
			sum = 0;

			// Compare subsequent values against the (rounded) average of the
			// next four, if there are that many.
			scratch =
				if i + 3 < len {
					(counts[i] + counts[i + 1] + counts[i + 2] + counts[i + 3] + 2) / 4
				}
				else if i < len { counts[i] }
				else { 0 };
		}

		stride += 1;
		if i < len { sum += counts[i]; }
	}

	Some(out)
}



/// # RLE-Optimized Stretches.
///
/// This iterator yields a boolean for each entry of the source slice: `true`
/// for entries within a run of 5+ zeroes or 7+ identical non-zeroes, `false`
/// otherwise.
struct GoodForRle<'a> {
	/// # Counts.
	counts: &'a [u32],

	/// # Good Buffer.
	///
	/// Leftover results from the current run, returned when non-zero.
	good: usize,

	/// # Bad Buffer.
	///
	/// Leftover results from the current run, returned when non-zero.
	bad: usize,
}

impl<'a> GoodForRle<'a> {
	/// # New Instance.
	const fn new(counts: &'a [u32]) -> Self {
		Self { counts, good: 0, bad: 0 }
	}
}

impl Iterator for GoodForRle<'_> {
	type Item = bool;

	fn next(&mut self) -> Option<Self::Item> {
		if self.good != 0 {
			self.good -= 1;
			return Some(true);
		}
		if self.bad != 0 {
			self.bad -= 1;
			return Some(false);
		}

		// Measure the next run, shortening the slice accordingly.
		let scratch = *self.counts.first()?;
		let stride = self.counts.iter().take_while(|&&c| c == scratch).count();
		self.counts = &self.counts[stride..];

		if 5 <= stride && (scratch == 0 || 7 <= stride) {
			self.good = stride - 1;
			Some(true)
		}
		else {
			self.bad = stride - 1;
			Some(false)
		}
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let len = self.len();
		(len, Some(len))
	}
}

impl ExactSizeIterator for GoodForRle<'_> {
	fn len(&self) -> usize { self.good + self.bad + self.counts.len() }
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_good_for_rle() {
		for c in [
			[196, 23, 10, 12, 5, 4, 1, 23, 8, 2, 6, 5, 0, 0, 0, 29, 5, 0, 0, 4, 4, 1, 0, 5, 2, 0, 0, 1, 4, 0, 1, 34, 10, 5, 7, 2, 1, 2, 0, 0, 3, 2, 5, 0, 1, 0, 0, 4, 2, 1, 0, 0, 1, 1, 0, 1, 1, 2, 0, 1, 4, 1, 5, 47, 13, 0, 5, 3, 1, 2, 0, 4, 0, 1, 6, 3, 0, 0, 0, 1, 3, 2, 2, 1, 4, 6, 0, 5, 0, 0, 1, 0, 0, 0, 1, 10, 4, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3].as_slice(),
			[2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 122, 0, 288, 11, 41, 6, 5, 2, 0, 0, 0, 1].as_slice(),
			[7, 7, 7, 7, 7, 7, 7, 1].as_slice(),
		] {
			let good = GoodForRle::new(c);
			assert_eq!(good.len(), c.len(), "GoodForRle length does not match source.");
			assert_eq!(good.count(), c.len(), "GoodForRle count does not match source.");
		}

		// Spot-check the flags.
		let c = [1, 0, 0, 0, 0, 0, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3];
		let good: Vec<bool> = GoodForRle::new(&c).collect();
		assert!(! good[0]);
		assert!(good[1..6].iter().all(|&g| g));
		assert!(good[6..12].iter().all(|&g| ! g)); // Six isn't seven.
		assert!(good[12..].iter().all(|&g| g));
	}

	#[test]
	fn t_optimize_huffman_for_rle() {
		// Nothing to do.
		assert!(optimize_huffman_for_rle(&[0_u32; 32]).is_none());

		// Near-equal neighbors get averaged.
		let mut counts = [0_u32; 32];
		counts[..8].copy_from_slice(&[10, 11, 10, 12, 11, 10, 11, 10]);
		let out = optimize_huffman_for_rle(&counts).expect("Missing counts.");
		assert!(out[..8].iter().all(|&c| c == out[0]));
		assert!(out[8..].iter().all(|&c| c == 0));

		// Nothing gets zeroed out.
		counts[10] = 1;
		let out = optimize_huffman_for_rle(&counts).expect("Missing counts.");
		assert_eq!(out[10], 1);
	}
}
