/*!
# Woffli: Deflate.

This module contains the raw DEFLATE entrypoint along with the bit writer all
the block-level code funnels through.
*/

use crate::{
	zopfli::{
		deflate_part,
		ZOPFLI_MASTER_BLOCK_SIZE,
		ZopfliChunk,
		ZopfliState,
	},
	ZopfliError,
	ZopfliOptions,
};



/// # Deflate.
///
/// Compress `arr` as a raw DEFLATE stream, appending the output to `out`.
///
/// The input is processed a master block at a time, each block seeing all of
/// the data before it for back-references. Empty inputs are written as a
/// single final fixed block holding nothing but the end-of-block code.
pub(crate) fn deflate_into(
	arr: &[u8],
	options: ZopfliOptions,
	out: &mut ZopfliOut,
) -> Result<(), ZopfliError> {
	if arr.is_empty() {
		out.add_header::<1>(true);
		out.add_fixed_bits::<7>(0);
		return Ok(());
	}

	let iterations = options.iterations(arr.len());
	let mut state = ZopfliState::new();
	for chunk in DeflateIter::new(arr) {
		let chunk = chunk?;
		deflate_part(
			&mut state,
			options,
			iterations,
			chunk.total_len() == arr.len(),
			chunk,
			out,
		)?;
	}

	Ok(())
}



#[derive(Debug, Default)]
/// # Bit Writer.
///
/// DEFLATE streams are written a bit at a time, least-significant first.
/// This tracks the output buffer along with the position within its last
/// byte.
pub(crate) struct ZopfliOut {
	/// # Bit Position.
	bp: u8,

	/// # Buffer.
	buf: Vec<u8>,
}

impl ZopfliOut {
	/// # With Prefix.
	///
	/// Start a new writer with some whole bytes (like a container header)
	/// already in place.
	pub(crate) fn with_prefix(prefix: &[u8], capacity: usize) -> Self {
		let mut buf = Vec::with_capacity(prefix.len() + capacity);
		buf.extend_from_slice(prefix);
		Self { bp: 0, buf }
	}

	/// # Append Whole Bytes.
	///
	/// Write bytes directly to the buffer, ignoring the bit position. This
	/// should only be used at byte boundaries.
	pub(crate) fn append_data(&mut self, data: &[u8]) {
		self.buf.extend_from_slice(data);
	}

	/// # Bit Length.
	///
	/// Return the number of bits written so far.
	pub(crate) fn bit_len(&self) -> usize {
		if self.bp == 0 { self.buf.len() * 8 }
		else { (self.buf.len() - 1) * 8 + usize::from(self.bp) }
	}

	/// # Into Inner.
	pub(crate) fn into_inner(self) -> Vec<u8> { self.buf }
}

impl ZopfliOut {
	/// # Add Bit.
	///
	/// Add a single bit to the output. When the bit position is zero it lands
	/// on a fresh zero byte; otherwise it is ORed onto the last one.
	pub(crate) fn add_bit(&mut self, bit: u8) {
		if self.bp == 0 { self.buf.push(0); }
		if let Some(last) = self.buf.last_mut() { *last |= bit << self.bp; }
		self.bp = self.bp.wrapping_add(1) & 7;
	}

	/// # Add Multiple Bits.
	///
	/// Write the lowest `length` bits of `symbol`, least significant first.
	pub(crate) fn add_bits(&mut self, symbol: u32, length: u32) {
		for i in 0..length {
			self.add_bit(u8::from((symbol >> i) & 1 == 1));
		}
	}

	/// # Add Multiple Bits (Fixed).
	///
	/// Same as `ZopfliOut::add_bits`, but for lengths known at compile time.
	pub(crate) fn add_fixed_bits<const N: u8>(&mut self, symbol: u32) {
		const { assert!(1 < N, "BUG: fixed bits implies more than one!"); }
		for i in const { 0..N } {
			self.add_bit(u8::from((symbol >> i) & 1 == 1));
		}
	}

	/// # Add Block Header.
	///
	/// Write the final flag followed by the two-bit block type: `0` for
	/// stored, `1` for fixed, `2` for dynamic.
	pub(crate) fn add_header<const BLOCK_BIT: u8>(&mut self, last_block: bool) {
		self.add_bit(u8::from(last_block));
		self.add_bit(const { BLOCK_BIT & 1 });
		self.add_bit(const { (BLOCK_BIT & 2) >> 1 });
	}

	/// # Add Huffman Bits.
	///
	/// Same as `ZopfliOut::add_bits`, but most significant first, as Huffman
	/// codes are packed in reverse.
	pub(crate) fn add_huffman_bits(&mut self, symbol: u32, length: u32) {
		for i in (0..length).rev() {
			self.add_bit(u8::from((symbol >> i) & 1 == 1));
		}
	}

	/// # Add Stored Block(s).
	///
	/// Write the chunk's block verbatim, in pieces of at most 65,535 bytes.
	/// Each piece gets its own header, is padded to the next byte boundary,
	/// and is prefixed with its length and the length's complement.
	pub(crate) fn add_uncompressed_block(&mut self, last_block: bool, chunk: ZopfliChunk<'_>) {
		let iter = chunk.block().chunks(usize::from(u16::MAX));
		let last = iter.len().saturating_sub(1);
		for (i, block) in iter.enumerate() {
			self.add_header::<0>(last_block && i == last);
			self.bp = 0;

			let len = u16::try_from(block.len()).unwrap_or(u16::MAX);
			let [a, b] = len.to_le_bytes();
			let [c, d] = (! len).to_le_bytes();
			self.buf.extend_from_slice(&[a, b, c, d]);
			self.buf.extend_from_slice(block);
		}
	}
}



/// # Master Block Iterator.
///
/// This yields increasingly larger slices of the source, each ending a
/// master block further along, paired with the start of the new block.
struct DeflateIter<'a> {
	/// # Data.
	arr: &'a [u8],

	/// # Block Start.
	pos: usize,
}

impl<'a> Iterator for DeflateIter<'a> {
	type Item = Result<ZopfliChunk<'a>, ZopfliError>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.pos < self.arr.len() {
			let pos = self.pos;
			let chunk = self.arr.get(..pos + ZOPFLI_MASTER_BLOCK_SIZE).unwrap_or(self.arr);
			self.pos = chunk.len();
			Some(ZopfliChunk::new(chunk, pos))
		}
		else { None }
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let len = self.len();
		(len, Some(len))
	}
}

impl ExactSizeIterator for DeflateIter<'_> {
	fn len(&self) -> usize {
		(self.arr.len() - self.pos).div_ceil(ZOPFLI_MASTER_BLOCK_SIZE)
	}
}

impl<'a> DeflateIter<'a> {
	/// # New.
	const fn new(arr: &'a [u8]) -> Self { Self { arr, pos: 0 } }
}
