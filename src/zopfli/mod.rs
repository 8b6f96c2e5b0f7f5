/*!
# Woffli: Zopfli.

This module holds the compression engine proper: LZ77 match-finding and
parsing, block splitting, length-limited Huffman coding, and DEFLATE block
emission.

The design follows Google's zopfli closely in terms of output, but everything
has been reworked around owned buffers, checked indexing, and `Result`
propagation, so the whole thing runs without a lick of `unsafe`.
*/

mod blocks;
mod cache;
mod chunk;
mod hash;
mod kat;
mod lz77;
mod rle;
mod rng;
mod squeeze;
mod stats;
mod symbols;
mod tree;

pub(crate) use blocks::deflate_part;
use cache::{
	MatchCache,
	SqueezeCache,
};
pub(crate) use chunk::ZopfliChunk;
use hash::ZopfliHash;
use kat::LengthLimitedCodeLengths;
use lz77::{
	LZ77Store,
	LZ77StoreRange,
};
use rle::DynamicLengths;
use rng::ZopfliRange;
pub(crate) use squeeze::ZopfliState;
use stats::{
	RanState,
	SymbolStats,
};
use symbols::{
	DeflateSym,
	DISTANCE_BITS,
	DISTANCE_BITS_F,
	DISTANCE_SYMBOLS,
	DISTANCE_VALUES,
	Dsym,
	LENGTH_EXTRA_BITS,
	LENGTH_SYMBOL_BIT_VALUES,
	LENGTH_SYMBOL_BITS,
	LENGTH_SYMBOL_BITS_F,
	LENGTH_SYMBOLS,
	LitLen,
	Lsym,
};
use tree::{
	best_tree_size,
	encode_tree,
};



/// # Size of Litlen Collections.
const ZOPFLI_NUM_LL: usize = 288;

/// # Size of Distance Collections.
const ZOPFLI_NUM_D: usize = 32;

/// # Zero-Filled Distance Counts.
const ZEROED_COUNTS_D: ArrayD<u32> = [0; ZOPFLI_NUM_D];

/// # Zero-Filled Litlen Counts.
const ZEROED_COUNTS_LL: ArrayLL<u32> = [0; ZOPFLI_NUM_LL];

/// # Fixed Litlen Tree.
///
/// Eight bits for `0..144`, nine for `144..256`, seven for `256..280`, and
/// eight again for the rest.
const FIXED_TREE_LL: ArrayLL<DeflateSym> = {
	let mut out = [DeflateSym::D08; ZOPFLI_NUM_LL];
	let mut i = 144;
	while i < 256 {
		out[i] = DeflateSym::D09;
		i += 1;
	}
	while i < 280 {
		out[i] = DeflateSym::D07;
		i += 1;
	}
	out
};

/// # Fixed Litlen Symbols.
///
/// These are the canonical codes for `FIXED_TREE_LL`.
const FIXED_SYMBOLS_LL: ArrayLL<u32> = {
	let mut out = [0; ZOPFLI_NUM_LL];
	let mut i = 0;
	while i < ZOPFLI_NUM_LL {
		out[i] = match i {
			0..=143 => 48 + i as u32,
			144..=255 => 400 + (i - 144) as u32,
			256..=279 => (i - 256) as u32,
			_ => 192 + (i - 280) as u32,
		};
		i += 1;
	}
	out
};

/// # Fixed Distance Tree.
const FIXED_TREE_D: ArrayD<DeflateSym> = [DeflateSym::D05; ZOPFLI_NUM_D];

/// # Fixed Distance Symbols.
const FIXED_SYMBOLS_D: ArrayD<u32> = {
	let mut out = [0; ZOPFLI_NUM_D];
	let mut i = 0;
	while i < ZOPFLI_NUM_D {
		out[i] = i as u32;
		i += 1;
	}
	out
};

/// # Master Block Size.
///
/// Inputs are compressed in chunks of at most this many bytes.
pub(crate) const ZOPFLI_MASTER_BLOCK_SIZE: usize = 1_000_000;

/// # Window Size.
const ZOPFLI_WINDOW_SIZE: usize = 32_768;

// The matchable hash cache range.
const ZOPFLI_MIN_MATCH: usize = 3;
const ZOPFLI_MAX_MATCH: usize = 258;

/// # Length of Sublength Array.
const SUBLEN_LEN: usize = ZOPFLI_MAX_MATCH + 1;

/// # Array with `ZOPFLI_NUM_LL` Entries.
type ArrayLL<T> = [T; ZOPFLI_NUM_LL];

/// # Array with `ZOPFLI_NUM_D` Entries.
type ArrayD<T> = [T; ZOPFLI_NUM_D];
