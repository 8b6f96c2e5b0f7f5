/*!
# Woffli: Ranges.
*/

use std::ops::Range;
use crate::{
	zopfli_error,
	ZopfliError,
};
use super::ZOPFLI_MASTER_BLOCK_SIZE;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Block Range.
///
/// A non-empty range no larger than `ZOPFLI_MASTER_BLOCK_SIZE`, used both for
/// byte ranges of the source and entry ranges of an LZ77 store.
pub(crate) struct ZopfliRange {
	start: usize,
	end: usize,
}

impl ZopfliRange {
	/// # New.
	pub(crate) const fn new(start: usize, end: usize) -> Result<Self, ZopfliError> {
		if start < end && end - start <= ZOPFLI_MASTER_BLOCK_SIZE {
			Ok(Self { start, end })
		}
		else { Err(zopfli_error!()) }
	}

	/// # Start.
	pub(crate) const fn start(&self) -> usize { self.start }

	/// # End.
	pub(crate) const fn end(&self) -> usize { self.end }

	/// # As Range.
	pub(crate) const fn rng(&self) -> Range<usize> { self.start..self.end }

	/// # Length.
	pub(crate) const fn len(&self) -> usize { self.end - self.start }

	#[expect(clippy::cast_possible_truncation, reason = "Lengths are capped at a million.")]
	/// # Length (u32).
	pub(crate) const fn len32(&self) -> u32 { (self.end - self.start) as u32 }

	/// # Split.
	///
	/// Cut the range in two at `mid`, which must fall strictly inside it.
	pub(crate) const fn split(&self, mid: usize) -> Result<(Self, Self), ZopfliError> {
		if self.start < mid && mid < self.end {
			Ok((
				Self { start: self.start, end: mid },
				Self { start: mid, end: self.end },
			))
		}
		else { Err(zopfli_error!()) }
	}
}
