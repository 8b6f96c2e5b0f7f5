/*!
# Woffli: Blocks.

This module contains the per-master-block entrypoint, the block splitter, and
the logic for picking and writing the best block type for each split.
*/

use dactyl::{
	NiceU64,
	NoHash,
};
use fyi_msg::Msg;
use std::{
	collections::HashSet,
	iter::once,
	num::NonZeroU32,
};
use crate::{
	zopfli_error,
	ZopfliError,
	ZopfliOptions,
	ZopfliOut,
};
use super::{
	ArrayD,
	ArrayLL,
	DeflateSym,
	DISTANCE_BITS,
	DISTANCE_VALUES,
	DynamicLengths,
	encode_tree,
	FIXED_SYMBOLS_D,
	FIXED_SYMBOLS_LL,
	FIXED_TREE_D,
	FIXED_TREE_LL,
	LENGTH_SYMBOL_BIT_VALUES,
	LENGTH_SYMBOL_BITS,
	LengthLimitedCodeLengths,
	LZ77Store,
	LZ77StoreRange,
	ZopfliChunk,
	ZopfliRange,
	ZopfliState,
};



const BLOCK_TYPE_FIXED: u8 = 1;
const BLOCK_TYPE_DYNAMIC: u8 = 2;

/// # Minimum Split Distance.
///
/// Stores (or blocks) with fewer entries than this are left alone.
const MINIMUM_SPLIT_DISTANCE: usize = 10;

/// # Exhaustive Search Limit.
///
/// Ranges shorter than this are searched for split points one by one.
const SPLIT_SEARCH_EXHAUSTIVE: usize = 1024;

/// # Split Search Samples.
///
/// Longer ranges are sampled at this many evenly-spaced points, zooming in on
/// the best until things stop improving.
const SPLIT_SEARCH_SAMPLES: usize = 9;

/// # Split Done Set.
type SplitDone = HashSet<usize, NoHash>;



/// # Deflate a Part.
///
/// Compress one master block of the input, writing one or more DEFLATE blocks
/// to `out`. Only the very last of these is marked final, and only if
/// `last_block` is set.
///
/// If block splitting is enabled, split points are first chosen from a cheap
/// greedy parse, each split is optimized separately, and then the combined
/// result is split again in case that works out better.
pub(crate) fn deflate_part(
	state: &mut ZopfliState,
	options: ZopfliOptions,
	iterations: NonZeroU32,
	last_block: bool,
	chunk: ZopfliChunk<'_>,
	out: &mut ZopfliOut,
) -> Result<(), ZopfliError> {
	// Byte positions to split at, if any.
	let byte_splits =
		if options.block_splitting() { split_raw(state, chunk, options.max_blocks())? }
		else { Vec::new() };

	// Optimize each piece separately, collecting the results in one store.
	let mut store = LZ77Store::new();
	let mut scratch = LZ77Store::new();
	let mut splits = Vec::with_capacity(byte_splits.len() + 1);
	let mut cost1: u32 = 0;
	let mut start = chunk.pos();
	for end in byte_splits.iter().copied().chain(once(chunk.total_len())) {
		let chunk2 = chunk.reslice(ZopfliRange::new(start, end)?)?;
		state.lz77_optimal(chunk2, iterations, &mut scratch)?;
		cost1 = cost1.saturating_add(scratch.ranged_full()?.block_size_auto()?);

		store.append(&scratch);
		splits.push(store.len());
		start = end;
	}

	// The last "split" is just the end.
	splits.pop();

	// With the real symbols in hand, the big picture might look different.
	if 1 < byte_splits.len() {
		let splits2 = split_lz77(&store, options.max_blocks())?;
		let mut cost2: u32 = 0;
		for rng in split_ranges(&splits2, store.len()) {
			cost2 = cost2.saturating_add(store.ranged(rng?)?.block_size_auto()?);
		}

		if cost2 < cost1 { splits = splits2; }
	}

	if options.verbose() { verbose_splits(&store, &splits); }

	// Write the blocks!
	let mut iter = split_ranges(&splits, store.len()).peekable();
	while let Some(rng) = iter.next() {
		let last = last_block && iter.peek().is_none();
		add_lz77_block(state, options.verbose(), last, store.ranged(rng?)?, chunk, out)?;
	}

	Ok(())
}



/// # Add LZ77 Block (Automatic Type).
///
/// Calculate the expected sizes for the stored, fixed, and dynamic block
/// types, then write the range using whichever is smallest.
///
/// The fixed estimate is refined with a dedicated fixed-cost optimal pass
/// when the store is small or the rough figure is within 10% of the dynamic
/// one.
fn add_lz77_block(
	state: &mut ZopfliState,
	verbose: bool,
	last_block: bool,
	store: LZ77StoreRange<'_>,
	chunk: ZopfliChunk<'_>,
	out: &mut ZopfliOut,
) -> Result<(), ZopfliError> {
	let before = out.bit_len();
	let byte_range = store.byte_range()?;

	let uncompressed_cost = store.block_size_uncompressed()?;
	let dynamic = DynamicLengths::new(store)?;
	let dynamic_cost = 3 + dynamic.cost();
	let mut fixed_cost = store.block_size_fixed();

	let mut fixed_store = None;
	if store.is_small() || u64::from(fixed_cost) * 10 <= u64::from(dynamic_cost) * 11 {
		let mut fixed = LZ77Store::new();
		state.lz77_optimal_fixed(chunk.reslice(byte_range)?, &mut fixed)?;
		fixed_cost = fixed.ranged_full()?.block_size_fixed();
		fixed_store = Some(fixed);
	}

	let kind =
		// Stored.
		if uncompressed_cost < fixed_cost && uncompressed_cost < dynamic_cost {
			out.add_uncompressed_block(last_block, chunk.reslice(byte_range)?);
			"Stored"
		}
		// Fixed.
		else if fixed_cost < dynamic_cost {
			let fixed_rng = match fixed_store.as_ref() {
				Some(s) => s.ranged_full()?,
				None => store,
			};
			out.add_header::<BLOCK_TYPE_FIXED>(last_block);
			add_lz77_data(
				fixed_rng,
				&FIXED_SYMBOLS_LL, &FIXED_TREE_LL, &FIXED_SYMBOLS_D, &FIXED_TREE_D,
				out,
			)?;
			"Fixed"
		}
		// Dynamic.
		else {
			let ll_lengths = dynamic.ll_lengths();
			let d_lengths = dynamic.d_lengths();
			out.add_header::<BLOCK_TYPE_DYNAMIC>(last_block);
			encode_tree(ll_lengths, d_lengths, dynamic.extra(), out)?;

			let ll_symbols = ArrayLL::<u32>::llcl_symbols(ll_lengths);
			let d_symbols = ArrayD::<u32>::llcl_symbols(d_lengths);
			add_lz77_data(store, &ll_symbols, ll_lengths, &d_symbols, d_lengths, out)?;
			"Dynamic"
		};

	if verbose {
		let after = out.bit_len();
		Msg::custom("Woffli", 199, &format!(
			"{kind} block: {} \x1b[2m→\x1b[0m {} bytes.",
			NiceU64::from(byte_range.len() as u64).as_str(),
			NiceU64::from(after.saturating_sub(before).div_ceil(8) as u64).as_str(),
		))
			.with_newline(true)
			.eprint();
	}

	Ok(())
}

/// # Add LZ77 Data.
///
/// Write the entries in the range using the given codes, followed by the
/// end-of-block symbol.
fn add_lz77_data(
	store: LZ77StoreRange<'_>,
	ll_symbols: &ArrayLL<u32>,
	ll_lengths: &ArrayLL<DeflateSym>,
	d_symbols: &ArrayD<u32>,
	d_lengths: &ArrayD<DeflateSym>,
	out: &mut ZopfliOut,
) -> Result<(), ZopfliError> {
	for e in store.entries() {
		// The literal or length symbol.
		let ll = e.ll_symbol as usize;
		if ll_lengths[ll].is_zero() { return Err(zopfli_error!()); }
		out.add_huffman_bits(ll_symbols[ll], ll_lengths[ll] as u32);

		// The length extra bits and the distance.
		if 0 < e.dist {
			out.add_bits(
				u32::from(LENGTH_SYMBOL_BIT_VALUES[e.litlen as usize]),
				u32::from(LENGTH_SYMBOL_BITS[e.litlen as usize]),
			);

			let d = e.d_symbol as usize;
			if d_lengths[d].is_zero() { return Err(zopfli_error!()); }
			out.add_huffman_bits(d_symbols[d], d_lengths[d] as u32);
			out.add_bits(
				u32::from(DISTANCE_VALUES[usize::from(e.dist)]),
				u32::from(DISTANCE_BITS[d]),
			);
		}
	}

	// End-of-block.
	if ll_lengths[256].is_zero() { return Err(zopfli_error!()); }
	out.add_huffman_bits(ll_symbols[256], ll_lengths[256] as u32);

	Ok(())
}



/// # Split Points: Uncompressed.
///
/// Split a greedy parse of the chunk, returning the results as byte positions
/// rather than store indices.
fn split_raw(state: &mut ZopfliState, chunk: ZopfliChunk<'_>, max_blocks: usize)
-> Result<Vec<usize>, ZopfliError> {
	let mut store = LZ77Store::new();
	state.greedy(chunk, &mut store, false)?;

	let entries = store.entries();
	split_lz77(&store, max_blocks)?.into_iter()
		.map(|s| entries.get(s).map(|e| e.pos).ok_or(zopfli_error!()))
		.collect()
}

/// # Split Points: LZ77.
///
/// Find the store indices at which the store should be split into separate
/// blocks, if any, returning them in ascending order.
///
/// The largest unfinished block is repeatedly cut in two at its cheapest
/// point, until no cut helps or (if non-zero) `max_blocks` is reached.
fn split_lz77(store: &LZ77Store, max_blocks: usize) -> Result<Vec<usize>, ZopfliError> {
	let size = store.len();
	let mut splits = Vec::new();
	if size < MINIMUM_SPLIT_DISTANCE { return Ok(splits); }

	let mut done = SplitDone::with_hasher(NoHash::default());
	let mut start = 0;
	let mut end = size;
	loop {
		if 0 < max_blocks && max_blocks <= splits.len() + 1 { break; }

		let (llpos, split_cost) = find_minimum(store, start, end)?;
		let orig_cost = store.ranged(ZopfliRange::new(start, end)?)?.block_size_auto()?;

		// No improvement.
		if ! split_helps(start, end, llpos, orig_cost, split_cost) {
			done.insert(start);
		}
		// Keep it, sorted.
		else {
			let idx = splits.partition_point(|&s| s < llpos);
			splits.insert(idx, llpos);
		}

		match find_largest(&done, &splits, size) {
			Some((a, b)) if MINIMUM_SPLIT_DISTANCE <= b - a => {
				start = a;
				end = b;
			},
			_ => break,
		}
	}

	Ok(splits)
}

/// # Split Helps?
///
/// A split is only worth keeping if it lands strictly inside the block and
/// strictly lowers the cost. Ties leave the block whole.
const fn split_helps(start: usize, end: usize, llpos: usize, orig_cost: u32, split_cost: u32)
-> bool {
	split_cost < orig_cost && start + 1 < llpos && llpos < end
}

/// # Find Largest Splittable Block.
///
/// Return the start and end of the largest block not yet marked done. Note
/// the final block ends one short of the store.
fn find_largest(done: &SplitDone, splits: &[usize], size: usize) -> Option<(usize, usize)> {
	let mut best = None;
	let mut longest = 0;
	let starts = once(0).chain(splits.iter().copied());
	let ends = splits.iter().copied().chain(once(size - 1));
	for (start, end) in starts.zip(ends) {
		if longest < end - start && ! done.contains(&start) {
			best = Some((start, end));
			longest = end - start;
		}
	}
	best
}

#[expect(clippy::integer_division, reason = "We want this.")]
/// # Find Minimum Split Cost.
///
/// Return the index within `start + 1..end` that minimizes the combined
/// automatic-type cost of the two halves, along with that cost.
///
/// Short ranges are searched exhaustively. Longer ones are sampled and
/// narrowed, which is much faster but may settle on a local minimum.
fn find_minimum(store: &LZ77Store, start: usize, end: usize)
-> Result<(usize, u32), ZopfliError> {
	let whole = ZopfliRange::new(start, end)?;
	let split_cost = |mid: usize| -> Result<u32, ZopfliError> {
		let (a, b) = whole.split(mid)?;
		let a = store.ranged(a)?.block_size_auto()?;
		let b = store.ranged(b)?.block_size_auto()?;
		Ok(a.saturating_add(b))
	};

	let mut lo = start + 1;
	let mut hi = end;

	if hi - lo < SPLIT_SEARCH_EXHAUSTIVE {
		let mut best = (lo, u32::MAX);
		for mid in lo..hi {
			let cost = split_cost(mid)?;
			if cost < best.1 { best = (mid, cost); }
		}
		return Ok(best);
	}

	let mut pos = lo;
	let mut last_best = u32::MAX;
	while SPLIT_SEARCH_SAMPLES < hi - lo {
		let step = (hi - lo) / (SPLIT_SEARCH_SAMPLES + 1);
		let point = |i: usize| lo + (i + 1) * step;

		let mut best_i = 0;
		let mut best = u32::MAX;
		for i in 0..SPLIT_SEARCH_SAMPLES {
			let cost = split_cost(point(i))?;
			if i == 0 || cost < best {
				best = cost;
				best_i = i;
			}
		}

		// Stop once things start getting worse.
		if last_best < best { break; }

		pos = point(best_i);
		let new_lo = if best_i == 0 { lo } else { point(best_i - 1) };
		let new_hi = if best_i + 1 == SPLIT_SEARCH_SAMPLES { hi } else { point(best_i + 1) };
		lo = new_lo;
		hi = new_hi;
		last_best = best;
	}

	Ok((pos, last_best))
}

/// # Split Ranges.
///
/// Convert sorted split points into the ranges between them, from zero to
/// `end`.
fn split_ranges(splits: &[usize], end: usize)
-> impl Iterator<Item=Result<ZopfliRange, ZopfliError>> + '_ {
	once(0).chain(splits.iter().copied())
		.zip(splits.iter().copied().chain(once(end)))
		.map(|(a, b)| ZopfliRange::new(a, b))
}

#[cold]
/// # Print Split Points.
///
/// Print the chosen split points as byte offsets, in decimal and hex.
fn verbose_splits(store: &LZ77Store, splits: &[usize]) {
	let entries = store.entries();
	let pos: Vec<usize> = splits.iter().filter_map(|&s| entries.get(s)).map(|e| e.pos).collect();

	let dec = pos.iter().map(usize::to_string).collect::<Vec<_>>().join(", ");
	let hex = pos.iter().map(|p| format!("{p:x}")).collect::<Vec<_>>().join(", ");
	Msg::custom("Woffli", 199, &format!(
		"Block split points: [{dec}] \x1b[2m(hex: [{hex}])\x1b[0m",
	))
		.with_newline(true)
		.eprint();
}



#[cfg(test)]
mod test {
	use super::*;
	use super::super::LitLen;

	/// # Mixed Data.
	///
	/// Noise followed by a repetitive passage followed by a long run; each
	/// part wants a very different tree.
	fn mixed() -> Vec<u8> {
		let mut out = Vec::with_capacity(30_000);
		let mut seed = 0x1234_5678_u32;
		for _ in 0..10_000 {
			seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
			out.push(seed.to_le_bytes()[2]);
		}
		while out.len() < 20_000 {
			out.extend_from_slice(b"<glyf><loca><head><hhea><hmtx>");
		}
		out.resize(30_000, b'z');
		out
	}

	#[test]
	fn t_split_ranges() {
		let rng: Vec<(usize, usize)> = split_ranges(&[], 5)
			.map(|r| r.map(|r| (r.start(), r.end())))
			.collect::<Result<_, _>>()
			.expect("Ranges failed.");
		assert_eq!(rng, [(0, 5)]);

		let rng: Vec<(usize, usize)> = split_ranges(&[2, 4], 7)
			.map(|r| r.map(|r| (r.start(), r.end())))
			.collect::<Result<_, _>>()
			.expect("Ranges failed.");
		assert_eq!(rng, [(0, 2), (2, 4), (4, 7)]);

		// Duplicates make empty ranges, which are errors.
		assert!(split_ranges(&[2, 2], 7).any(|r| r.is_err()));
	}

	#[test]
	fn t_split_helps() {
		assert!(split_helps(0, 100, 50, 1000, 999));

		// Ties and losses don't count.
		assert!(! split_helps(0, 100, 50, 1000, 1000));
		assert!(! split_helps(0, 100, 50, 1000, 1001));

		// Nor do splits at the edges.
		assert!(! split_helps(0, 100, 1, 1000, 10));
		assert!(! split_helps(0, 100, 100, 1000, 10));
		assert!(split_helps(10, 100, 12, 1000, 10));
	}

	#[test]
	fn t_find_largest() {
		let mut done = SplitDone::with_hasher(NoHash::default());
		assert_eq!(find_largest(&done, &[], 100), Some((0, 99)));
		assert_eq!(find_largest(&done, &[10, 80], 100), Some((10, 80)));

		done.insert(10);
		assert_eq!(find_largest(&done, &[10, 80], 100), Some((80, 99)));

		done.insert(0);
		done.insert(80);
		assert_eq!(find_largest(&done, &[10, 80], 100), None);
	}

	#[test]
	fn t_split_lz77() {
		let data = mixed();
		let chunk = ZopfliChunk::new(&data, 0).expect("Chunk failed.");
		let mut state = ZopfliState::new();
		let mut store = LZ77Store::new();
		state.greedy(chunk, &mut store, false).expect("Greedy failed.");

		// Empty stores are never split.
		assert!(split_lz77(&LZ77Store::new(), 15).is_ok_and(|s| s.is_empty()));

		// One block means no splits.
		assert!(split_lz77(&store, 1).is_ok_and(|s| s.is_empty()));

		// Otherwise we should get a few, sorted, in range.
		let splits = split_lz77(&store, 15).expect("Split failed.");
		assert!(! splits.is_empty(), "Expected split points.");
		assert!(splits.len() < 15);
		assert!(splits.windows(2).all(|w| w[0] < w[1]));
		assert!(0 < splits[0] && splits[splits.len() - 1] < store.len());

		// The limit should be respected.
		let splits = split_lz77(&store, 2).expect("Split failed.");
		assert!(splits.len() <= 1);

		// And the byte positions should line up with entries.
		let raw = split_raw(&mut state, chunk, 15).expect("Split failed.");
		assert!(raw.windows(2).all(|w| w[0] < w[1]));
		assert!(raw.iter().all(|&p| 0 < p && p < data.len()));
	}

	#[test]
	fn t_find_minimum() {
		let data = mixed();
		let chunk = ZopfliChunk::new(&data, 0).expect("Chunk failed.");
		let mut state = ZopfliState::new();
		let mut store = LZ77Store::new();
		state.greedy(chunk, &mut store, false).expect("Greedy failed.");

		// Exhaustive and sampled both need to stay in bounds and report the
		// cost of the point they chose.
		for (start, end) in [(0, 500), (0, store.len())] {
			let (pos, cost) = find_minimum(&store, start, end).expect("Minimum failed.");
			assert!(start < pos && pos < end);
			let (a, b) = ZopfliRange::new(start, end)
				.and_then(|r| r.split(pos))
				.expect("Split failed.");
			let expected = store.ranged(a).and_then(LZ77StoreRange::block_size_auto).expect("Cost failed") +
				store.ranged(b).and_then(LZ77StoreRange::block_size_auto).expect("Cost failed");
			assert_eq!(cost, expected);
		}
	}

	#[test]
	fn t_add_lz77_data() {
		let mut store = LZ77Store::new();
		store.push(LitLen::L065, 0, 0).expect("Push failed.");
		store.push(LitLen::L003, 1, 1).expect("Push failed.");
		let rng = store.ranged_full().expect("Range failed.");

		// Fixed codes: 3 header bits (not written here), 8 for the literal,
		// 7 + 5 for the match, and 7 for the end.
		let mut out = ZopfliOut::default();
		add_lz77_data(rng, &FIXED_SYMBOLS_LL, &FIXED_TREE_LL, &FIXED_SYMBOLS_D, &FIXED_TREE_D, &mut out)
			.expect("Data failed.");
		assert_eq!(out.bit_len(), 8 + 7 + 5 + 7);

		// A used symbol without a code is an error.
		let mut ll_lengths = FIXED_TREE_LL;
		ll_lengths[65] = DeflateSym::D00;
		let mut out = ZopfliOut::default();
		assert!(add_lz77_data(rng, &FIXED_SYMBOLS_LL, &ll_lengths, &FIXED_SYMBOLS_D, &FIXED_TREE_D, &mut out).is_err());

		let mut d_lengths = FIXED_TREE_D;
		d_lengths[0] = DeflateSym::D00;
		let mut out = ZopfliOut::default();
		assert!(add_lz77_data(rng, &FIXED_SYMBOLS_LL, &FIXED_TREE_LL, &FIXED_SYMBOLS_D, &d_lengths, &mut out).is_err());
	}
}
