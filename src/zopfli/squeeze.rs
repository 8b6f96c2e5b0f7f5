/*!
# Woffli: LZ77 Parsing.

This module contains the greedy (lazy-matching) parser as well as the
iterative, cost-driven "squeeze" parser that does most of the heavy lifting.
*/

use std::num::NonZeroU32;
use crate::{
	zopfli_error,
	ZopfliError,
};
use super::{
	DISTANCE_BITS,
	DISTANCE_BITS_F,
	DISTANCE_SYMBOLS,
	LENGTH_SYMBOL_BITS,
	LENGTH_SYMBOL_BITS_F,
	LENGTH_SYMBOLS,
	LitLen,
	LZ77Store,
	MatchCache,
	RanState,
	SqueezeCache,
	SUBLEN_LEN,
	SymbolStats,
	ZOPFLI_MAX_MATCH,
	ZOPFLI_MIN_MATCH,
	ZopfliChunk,
	ZopfliHash,
};



/// # Zero-Filled Sublength Array.
const ZEROED_SUBLEN: [u16; SUBLEN_LEN] = [0; SUBLEN_LEN];

/// # Lazy Matching Distance Threshold.
///
/// Matches reaching further back than this are scored one less than their
/// length.
const LAZY_DISTANCE: u16 = 1024;



/// # Cost Model.
///
/// The squeeze forward pass prices every literal and length/distance pair
/// with one of these.
pub(crate) trait CostModel {
	/// # Literal Cost.
	fn literal(&self, byte: u8) -> f64;

	/// # Length/Distance Cost.
	fn matched(&self, dist: u16, length: LitLen) -> f64;

	/// # Cheapest Possible Match.
	fn min_cost(&self) -> f64;

	/// # Cost of a Maximum-Length Match at Distance One.
	fn max_run_cost(&self) -> f64;
}

impl CostModel for SymbolStats {
	fn literal(&self, byte: u8) -> f64 { self.ll_symbols[usize::from(byte)] }

	fn matched(&self, dist: u16, length: LitLen) -> f64 {
		let dsym = DISTANCE_SYMBOLS[usize::from(dist)] as usize;
		DISTANCE_BITS_F[dsym] +
		self.d_symbols[dsym] +
		self.ll_symbols[LENGTH_SYMBOLS[length as usize] as usize] +
		LENGTH_SYMBOL_BITS_F[length as usize]
	}

	fn min_cost(&self) -> f64 {
		// The length and distance parts can be minimized separately.
		let length_cost = LENGTH_SYMBOLS.iter()
			.zip(LENGTH_SYMBOL_BITS_F)
			.skip(ZOPFLI_MIN_MATCH)
			.map(|(&lsym, lbits)| lbits + self.ll_symbols[lsym as usize])
			.fold(f64::INFINITY, f64::min);

		let dist_cost = DISTANCE_BITS_F.iter()
			.zip(self.d_symbols)
			.take(30)
			.map(|(&dbits, v)| dbits + v)
			.fold(f64::INFINITY, f64::min);

		length_cost + dist_cost
	}

	fn max_run_cost(&self) -> f64 { self.ll_symbols[285] + self.d_symbols[0] }
}



#[derive(Debug, Clone, Copy)]
/// # Fixed-Tree Cost Model.
///
/// Bit costs under the predefined DEFLATE Huffman codes.
pub(crate) struct FixedCost;

impl CostModel for FixedCost {
	fn literal(&self, byte: u8) -> f64 {
		if byte <= 143 { 8.0 } else { 9.0 }
	}

	fn matched(&self, dist: u16, length: LitLen) -> f64 {
		// Seven bits for length symbols through 279 (i.e. length 114), eight
		// after that, and five for every distance symbol.
		let dsym = DISTANCE_SYMBOLS[usize::from(dist)] as usize;
		let base = if (length as u16) <= 114 { 12 } else { 13 };
		f64::from(
			base +
			DISTANCE_BITS[dsym] +
			LENGTH_SYMBOL_BITS[length as usize]
		)
	}

	fn min_cost(&self) -> f64 { 12.0 }

	fn max_run_cost(&self) -> f64 { 13.0 }
}



#[derive(Default)]
/// # Zopfli State.
///
/// This bundles the match cache, hash chains, and squeeze buffers so they can
/// be allocated once and reused for every block of a given input.
pub(crate) struct ZopfliState {
	lmc: MatchCache,
	hash: ZopfliHash,
	squeeze: SqueezeCache,
}

impl ZopfliState {
	/// # New.
	pub(crate) fn new() -> Self { Self::default() }

	/// # Initialize Match Cache.
	///
	/// Reset the match cache for a block of `blocksize` bytes.
	pub(crate) fn init_lmc(&mut self, blocksize: usize) { self.lmc.init(blocksize); }
}

impl ZopfliState {
	/// # Greedy LZ77 Run.
	///
	/// Parse the chunk's block in a single forward pass, deferring each match
	/// by one position in case the next one turns out better.
	///
	/// If `cached`, the match cache is consulted and populated along the way;
	/// it must have been initialized for this block.
	pub(crate) fn greedy(
		&mut self,
		chunk: ZopfliChunk<'_>,
		store: &mut LZ77Store,
		cached: bool,
	) -> Result<(), ZopfliError> {
		/// # Minimum Score Worth Matching.
		const MIN_SCORE: u16 = LitLen::MIN_MATCH as u16;

		/// # Distance-Based Length Score.
		const fn length_score(length: LitLen, distance: u16) -> u16 {
			if LAZY_DISTANCE < distance { (length as u16).saturating_sub(1) }
			else { length as u16 }
		}

		store.clear();
		self.hash.reset(chunk);

		let instart = chunk.pos();
		let mut iter = chunk.reducing_block_iter();
		let mut sublen = ZEROED_SUBLEN;
		let mut prev_length = LitLen::L000;
		let mut prev_distance: u16 = 0;
		let mut prev_value = 0_u8;
		let mut match_available = false;

		while let Some(chunk2) = iter.next() {
			self.hash.update_hash(chunk2);
			let prev_prev_value = std::mem::replace(&mut prev_value, chunk2.first());

			let (distance, mut length) = self.hash.find(
				chunk2,
				LitLen::MAX_MATCH,
				&mut Some(&mut sublen),
				cached.then_some((&mut self.lmc, instart)),
			)?;

			let score = length_score(length, distance);
			if match_available {
				match_available = false;

				// The new match is better; write the previous byte as a
				// literal and maybe defer this one.
				if length_score(prev_length, prev_distance) + 1 < score {
					store.push(LitLen::from_u8(prev_prev_value), 0, chunk2.pos() - 1)?;
					if MIN_SCORE <= score && ! length.is_max() {
						match_available = true;
						prev_length = length;
						prev_distance = distance;
						continue;
					}
				}
				// The old match wins.
				else {
					store.push(prev_length, prev_distance, chunk2.pos() - 1)?;
					for chunk3 in iter.by_ref().take(prev_length as usize - 2) {
						self.hash.update_hash(chunk3);
					}
					continue;
				}
			}
			else if MIN_SCORE <= score && ! length.is_max() {
				match_available = true;
				prev_length = length;
				prev_distance = distance;
				continue;
			}

			if MIN_SCORE <= score {
				store.push(length, distance, chunk2.pos())?;
			}
			else {
				length = LitLen::L001;
				store.push(LitLen::from_u8(chunk2.first()), 0, chunk2.pos())?;
			}

			for chunk3 in iter.by_ref().take(length as usize - 1) {
				self.hash.update_hash(chunk3);
			}
		}

		Ok(())
	}

	/// # Optimal LZ77.
	///
	/// Parse the chunk's block `iterations` times, each pass priced by the
	/// statistics of the pass before it, and keep the cheapest result (by
	/// dynamic block size) in `store`.
	///
	/// When the cost stops moving, the best statistics are randomly perturbed
	/// to shake things loose. If a perturbed restart stalls again without
	/// beating the best, there is little point in continuing.
	pub(crate) fn lz77_optimal(
		&mut self,
		chunk: ZopfliChunk<'_>,
		iterations: NonZeroU32,
		store: &mut LZ77Store,
	) -> Result<(), ZopfliError> {
		self.init_lmc(chunk.block_size());

		// Bootstrap the statistics with a greedy pass.
		let mut current = LZ77Store::new();
		self.greedy(chunk, &mut current, true)?;

		let mut ran = RanState::new();
		let mut stats = SymbolStats::new();
		stats.load_store(&current);
		let mut best_stats = stats;

		let mut best_cost = u32::MAX;
		let mut last_cost = u32::MAX;
		let mut restart_cost = u32::MAX;
		let mut weighted = false;
		for i in 0..iterations.get() {
			stats.crunch();
			self.optimal_run(chunk, &stats, &mut current)?;
			let cost = current.ranged_full()?.block_size_dynamic()?;

			if cost < best_cost {
				store.replace(&current);
				best_stats = stats;
				best_cost = cost;
			}

			stats.reload_store(&current, weighted);

			if 5 < i && cost == last_cost {
				if weighted && restart_cost <= best_cost { break; }
				restart_cost = best_cost;
				stats = best_stats;
				stats.randomize(&mut ran);
				weighted = true;
			}

			last_cost = cost;
		}

		if store.is_empty() { Err(zopfli_error!()) }
		else { Ok(()) }
	}

	/// # Optimal LZ77 (Fixed).
	///
	/// Same as `ZopfliState::lz77_optimal`, but a single pass is run using the
	/// fixed-tree costs.
	pub(crate) fn lz77_optimal_fixed(
		&mut self,
		chunk: ZopfliChunk<'_>,
		store: &mut LZ77Store,
	) -> Result<(), ZopfliError> {
		self.init_lmc(chunk.block_size());
		self.optimal_run(chunk, &FixedCost, store)
	}

	/// # Optimal Run.
	///
	/// Run the forward (cost) and backward (path) squeeze passes, then follow
	/// the path to repopulate `store`.
	fn optimal_run<M: CostModel>(
		&mut self,
		chunk: ZopfliChunk<'_>,
		model: &M,
		store: &mut LZ77Store,
	) -> Result<(), ZopfliError> {
		store.clear();

		let costs = self.squeeze.reset_costs(chunk.block_size());
		get_best_lengths(&mut self.hash, &mut self.lmc, chunk, model, costs)?;
		let paths = self.squeeze.trace_paths()?;
		follow_paths(&mut self.hash, &mut self.lmc, chunk, paths, store)
	}
}



#[expect(clippy::cast_possible_truncation, reason = "Costs are stored as f32.")]
/// # Get Best Lengths.
///
/// The squeeze forward pass: calculate the cheapest cost of reaching every
/// position of the block, and the length of the step that got there.
///
/// Costs are calculated in 64 bits but stored in 32, for better or worse.
fn get_best_lengths<M: CostModel>(
	hash: &mut ZopfliHash,
	lmc: &mut MatchCache,
	chunk: ZopfliChunk<'_>,
	model: &M,
	costs: &mut [(f32, LitLen)],
) -> Result<(), ZopfliError> {
	if costs.len() != chunk.block_size() + 1 { return Err(zopfli_error!()); }

	hash.reset(chunk);

	let instart = chunk.pos();
	let min_cost = model.min_cost();
	let max_run_cost = model.max_run_cost();
	let mut sublen = ZEROED_SUBLEN;
	let mut iter = chunk.reducing_block_iter();

	while let Some(mut chunk2) = iter.next() {
		hash.update_hash(chunk2);
		let mut j = chunk2.pos() - instart;

		// In the middle of a long run of identical bytes, skip ahead a max
		// match at a time.
		if
			ZOPFLI_MAX_MATCH * 2 < usize::from(hash.same(chunk2.pos())) &&
			instart + ZOPFLI_MAX_MATCH + 1 < chunk2.pos() &&
			ZOPFLI_MAX_MATCH * 2 + 1 < chunk2.block_size() &&
			ZOPFLI_MAX_MATCH < usize::from(hash.same(chunk2.pos() - ZOPFLI_MAX_MATCH))
		{
			for chunk3 in iter.by_ref().take(ZOPFLI_MAX_MATCH) {
				let cost = f64::from(costs[j].0) + max_run_cost;
				costs[j + ZOPFLI_MAX_MATCH] = (cost as f32, LitLen::MAX_MATCH);
				j += 1;
				chunk2 = chunk3;
				hash.update_hash(chunk2);
			}
		}

		let (_, length) = hash.find(
			chunk2,
			LitLen::MAX_MATCH,
			&mut Some(&mut sublen),
			Some((&mut *lmc, instart)),
		)?;

		// Literal.
		let cost_j = f64::from(costs[j].0);
		let new_cost = model.literal(chunk2.first()) + cost_j;
		if new_cost < f64::from(costs[j + 1].0) {
			costs[j + 1] = (new_cost as f32, LitLen::L001);
		}

		// Matches, but only where there's potential for improvement.
		let limit = length.min_usize(chunk2.block_size()) as usize;
		if ZOPFLI_MIN_MATCH <= limit {
			let min_cost_add = min_cost + cost_j;
			for (k, &dist) in sublen.iter().enumerate().take(limit + 1).skip(ZOPFLI_MIN_MATCH) {
				let current = f64::from(costs[j + k].0);
				if min_cost_add < current {
					let new_cost = cost_j + model.matched(dist, LitLen::ALL[k]);
					if new_cost < current {
						costs[j + k] = (new_cost as f32, LitLen::ALL[k]);
					}
				}
			}
		}
	}

	Ok(())
}

/// # Follow Paths.
///
/// Rehash the block, walking the lengths chosen by the squeeze passes and
/// recovering their distances, and write the results to `store`.
fn follow_paths(
	hash: &mut ZopfliHash,
	lmc: &mut MatchCache,
	chunk: ZopfliChunk<'_>,
	paths: &[LitLen],
	store: &mut LZ77Store,
) -> Result<(), ZopfliError> {
	hash.reset(chunk);

	let instart = chunk.pos();
	let mut iter = chunk.reducing_block_iter();
	for &length in paths {
		let chunk2 = iter.next().ok_or(zopfli_error!())?;
		hash.update_hash(chunk2);

		if length.is_matchable() {
			// The search should find the same length it found the first time,
			// with a real distance.
			let (dist, test) = hash.find(
				chunk2,
				length,
				&mut None,
				Some((&mut *lmc, instart)),
			)?;
			if test != length || dist == 0 { return Err(zopfli_error!()); }

			store.push(length, dist, chunk2.pos())?;
			for chunk3 in iter.by_ref().take(length as usize - 1) {
				hash.update_hash(chunk3);
			}
		}
		else {
			store.push(LitLen::from_u8(chunk2.first()), 0, chunk2.pos())?;
		}
	}

	// Every byte should be accounted for.
	if iter.next().is_none() { Ok(()) }
	else { Err(zopfli_error!()) }
}
