/*!
# Woffli: Slice Chunks.
*/

use crate::{
	zopfli_error,
	ZopfliError,
};
use super::{
	ZOPFLI_MASTER_BLOCK_SIZE,
	ZOPFLI_WINDOW_SIZE,
	ZopfliRange,
};



#[derive(Debug, Clone, Copy)]
/// # Deflate Chunk.
///
/// Data is compressed (at most) a master block at a time, but everything
/// before the block remains visible so matches can reach back into it.
///
/// A chunk is thus the source slice truncated to the end of the block, plus
/// the position where the "active" part begins. That position is always less
/// than the slice length, and the active part never exceeds
/// `ZOPFLI_MASTER_BLOCK_SIZE`.
pub(crate) struct ZopfliChunk<'a> {
	/// # Source (Prelude and Block).
	arr: &'a [u8],

	/// # Block Start.
	from: usize,
}

impl<'a> ZopfliChunk<'a> {
	/// # New.
	///
	/// ## Errors.
	///
	/// This will return an error if the block would be empty or too big.
	pub(crate) const fn new(arr: &'a [u8], from: usize) -> Result<Self, ZopfliError> {
		if from < arr.len() && arr.len() - from <= ZOPFLI_MASTER_BLOCK_SIZE {
			Ok(Self { arr, from })
		}
		else { Err(zopfli_error!()) }
	}

	/// # Reslice.
	///
	/// Return a new chunk covering `rng`, with the prelude (if any) carried
	/// over.
	pub(crate) fn reslice(&self, rng: ZopfliRange) -> Result<Self, ZopfliError> {
		let arr = self.arr.get(..rng.end()).ok_or(zopfli_error!())?;
		Ok(Self { arr, from: rng.start() })
	}
}

impl ZopfliChunk<'_> {
	/// # Full Slice.
	///
	/// The prelude and block together.
	pub(crate) const fn arr(&self) -> &[u8] { self.arr }

	/// # Block Slice.
	pub(crate) fn block(&self) -> &[u8] { self.arr.get(self.from..).unwrap_or(&[]) }

	/// # First Block Value.
	pub(crate) const fn first(&self) -> u8 {
		if self.from < self.arr.len() { self.arr[self.from] }
		else { 0 }
	}

	/// # Block Size.
	pub(crate) const fn block_size(&self) -> usize { self.arr.len() - self.from }

	/// # Block Start.
	pub(crate) const fn pos(&self) -> usize { self.from }

	/// # Total Length.
	pub(crate) const fn total_len(&self) -> usize { self.arr.len() }

	/// # Block Range.
	pub(crate) const fn rng(&self) -> Result<ZopfliRange, ZopfliError> {
		ZopfliRange::new(self.from, self.arr.len())
	}

	/// # Window Start.
	///
	/// Hashing starts up to one window's worth of bytes before the block.
	pub(crate) const fn window_start(&self) -> usize {
		self.from.saturating_sub(ZOPFLI_WINDOW_SIZE)
	}

	/// # Warmup Values.
	///
	/// Return the first one or two bytes from the window start, used to prime
	/// the rolling hash.
	pub(crate) const fn warmup_values(&self) -> (u8, Option<u8>) {
		let start = self.window_start();
		let a = if start < self.arr.len() { self.arr[start] } else { 0 };
		let b =
			if start + 1 < self.arr.len() { Some(self.arr[start + 1]) }
			else { None };
		(a, b)
	}
}

impl<'a> ZopfliChunk<'a> {
	/// # Prelude Iterator.
	///
	/// Same as `ZopfliChunk::reducing_block_iter`, except only the positions
	/// from the window start up to the block start are visited. If the block
	/// sits at the start of the data, `None` is returned instead.
	pub(crate) fn reducing_prelude_iter(self) -> Option<std::iter::Take<ZopfliChunkIter<'a>>> {
		if self.from == 0 { None }
		else {
			let start = self.window_start();
			let chunk = Self { arr: self.arr, from: start };
			Some(ZopfliChunkIter(chunk).take(self.from - start))
		}
	}

	/// # Block Iterator.
	///
	/// Return an iterator that yields this chunk, then the same chunk with its
	/// block start nudged forward by one, and so on until the block is empty.
	pub(crate) const fn reducing_block_iter(self) -> ZopfliChunkIter<'a> {
		ZopfliChunkIter(self)
	}
}



/// # Chunk Iterator.
pub(crate) struct ZopfliChunkIter<'a>(ZopfliChunk<'a>);

impl<'a> Iterator for ZopfliChunkIter<'a> {
	type Item = ZopfliChunk<'a>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.0.from < self.0.arr.len() {
			let next = self.0;
			self.0.from += 1;
			Some(next)
		}
		else { None }
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let len = self.len();
		(len, Some(len))
	}
}

impl ExactSizeIterator for ZopfliChunkIter<'_> {
	fn len(&self) -> usize { self.0.arr.len().saturating_sub(self.0.from) }
}
