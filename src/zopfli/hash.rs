/*!
# Woffli: Matches and Hashes.

This module contains the sliding-window hash chains used to track down
length/distance matches.
*/

use crate::{
	zopfli_error,
	ZopfliError,
};
use super::{
	LitLen,
	MatchCache,
	SUBLEN_LEN,
	ZOPFLI_MIN_MATCH,
	ZOPFLI_WINDOW_SIZE,
	ZopfliChunk,
};

const ZOPFLI_WINDOW_MASK: usize = ZOPFLI_WINDOW_SIZE - 1;
const HASH_SHIFT: u16 = 5;
const HASH_MASK: u16 = 32_767;
const ZOPFLI_MAX_CHAIN_HITS: usize = 8192;



/// # Zopfli Hash.
///
/// This structure tracks byte values and hashes by position, facilitating
/// match-finding (length and distance) at various offsets.
///
/// There are two chains: the first keyed by a rolling hash of the next three
/// bytes, the second by that same hash mixed with the number of identical
/// bytes that follow, which helps cut through long runs.
pub(crate) struct ZopfliHash {
	chain1: ZopfliHashChain,
	chain2: ZopfliHashChain,

	/// # Repetitions of the same byte after this.
	same: Vec<u16>,
}

impl Default for ZopfliHash {
	fn default() -> Self { Self::new() }
}

impl ZopfliHash {
	/// # New.
	pub(crate) fn new() -> Self {
		Self {
			chain1: ZopfliHashChain::new(),
			chain2: ZopfliHashChain::new(),
			same: vec![0; ZOPFLI_WINDOW_SIZE],
		}
	}

	/// # Reset/Warm Up.
	///
	/// This sets all values to their defaults, then cycles the first chain's
	/// hash value once or twice, then hashes the bits between the start of the
	/// window and the start of the slice we're actually interested in, if any.
	pub(crate) fn reset(&mut self, chunk: ZopfliChunk<'_>) {
		self.chain1.reset();
		self.chain2.reset();
		self.same.fill(0);

		let (a, b) = chunk.warmup_values();
		self.update_hash_value(a);
		if let Some(b) = b { self.update_hash_value(b); }

		if let Some(iter) = chunk.reducing_prelude_iter() {
			for chunk2 in iter { self.update_hash(chunk2); }
		}
	}

	#[expect(clippy::cast_possible_truncation, reason = "False positive.")]
	/// # Update Hash.
	///
	/// This updates the hash tables for the chunk's block start position.
	pub(crate) fn update_hash(&mut self, chunk: ZopfliChunk<'_>) {
		let pos = chunk.pos();
		let hpos = pos & ZOPFLI_WINDOW_MASK;

		// Cycle the first hash.
		let arr = chunk.block();
		self.update_hash_value(arr.get(ZOPFLI_MIN_MATCH - 1).map_or(0, |v| *v));
		self.chain1.update_hash(hpos);

		// Count up the repetitions, picking up where the last position left
		// off.
		let current = chunk.first();
		let mut amount = self.same[pos.wrapping_sub(1) & ZOPFLI_WINDOW_MASK]
			.saturating_sub(1);
		while
			amount < u16::MAX &&
			usize::from(amount) + 1 < arr.len() &&
			current == arr[usize::from(amount) + 1]
		{
			amount += 1;
		}
		self.same[hpos] = amount;

		// Cycle the second hash.
		self.chain2.val = (amount.wrapping_sub(ZOPFLI_MIN_MATCH as u16) & 255) ^ self.chain1.val;
		self.chain2.update_hash(hpos);
	}

	/// # Update Hash Value.
	///
	/// This updates the rolling (chain1) hash value, which always fits within
	/// fifteen bits.
	fn update_hash_value(&mut self, c: u8) {
		self.chain1.val = ((self.chain1.val << HASH_SHIFT) ^ u16::from(c)) & HASH_MASK;
	}

	/// # Sameness.
	///
	/// Return the number of identical bytes following `pos`.
	pub(crate) fn same(&self, pos: usize) -> u16 { self.same[pos & ZOPFLI_WINDOW_MASK] }
}

impl ZopfliHash {
	/// # Find Longest Match.
	///
	/// This finds the longest match for the chunk's block start, returning its
	/// distance and length. If `cache` holds the match cache and the position
	/// of the block it covers, results are pulled from and saved to it when
	/// possible.
	///
	/// Lengths will never exceed `limit` nor the remaining block size, but
	/// they might be less than `ZOPFLI_MIN_MATCH`, particularly as the end of
	/// the block draws near.
	pub(crate) fn find(
		&self,
		chunk: ZopfliChunk<'_>,
		mut limit: LitLen,
		sublen: &mut Option<&mut [u16; SUBLEN_LEN]>,
		mut cache: Option<(&mut MatchCache, usize)>,
	) -> Result<(u16, LitLen), ZopfliError> {
		let pos = chunk.pos();
		let block_size = chunk.block_size();

		// Check the longest match cache first!
		if let Some((lmc, blockstart)) = cache.as_mut() {
			let mut distance = 0;
			let mut length = LitLen::L000;
			if lmc.find(pos - *blockstart, &mut limit, sublen, &mut distance, &mut length)? {
				if (length as usize) <= block_size { return Ok((distance, length)); }
				return Err(zopfli_error!());
			}
		}

		// We'll need at least ZOPFLI_MIN_MATCH bytes for a search.
		if block_size < ZOPFLI_MIN_MATCH { return Ok((0, LitLen::L000)); }

		// Cap the limit to fit.
		limit = limit.min_usize(block_size);

		let (distance, length) = self.find_loop(chunk, limit, sublen);

		// Cache the results for next time, maybe.
		if limit.is_max() {
			if let (Some((lmc, blockstart)), Some(s)) = (cache, sublen) {
				lmc.set_sublen(pos - blockstart, s, distance, length)?;
			}
		}

		Ok((distance, length))
	}

	#[expect(clippy::cast_possible_truncation, reason = "Distances fit the window.")]
	/// # Find Longest Match Loop.
	///
	/// This method is the workhorse for `ZopfliHash::find`, walking the hash
	/// chain(s) nearest-first in search of the best match. If no match is
	/// found, `(0, 1)` is returned.
	fn find_loop(
		&self,
		chunk: ZopfliChunk<'_>,
		limit: LitLen,
		sublen: &mut Option<&mut [u16; SUBLEN_LEN]>,
	) -> (u16, LitLen) {
		/// # Distance Given Positions.
		const fn ppp_distance(p: usize, pp: usize) -> usize {
			if p < pp { pp - p }
			else { ZOPFLI_WINDOW_SIZE + pp - p }
		}

		let arr = chunk.arr();
		let right = chunk.block();
		let limit_len = limit as usize;

		let pos = chunk.pos();
		let hpos = pos & ZOPFLI_WINDOW_MASK;

		let mut bestdist: usize = 0;
		let mut bestlength = LitLen::L001;

		// Start with the first chain, but maybe switch to the second partway
		// through.
		let mut switched = false;
		let mut chain = &self.chain1;

		let mut pp = hpos;
		let mut p = usize::from(chain.prev[pp]);
		let mut dist = ppp_distance(p, pp);
		let mut hits = 0;
		let same0 = self.same[hpos];
		let same1 = limit.min_u16(same0);
		while dist < ZOPFLI_WINDOW_SIZE {
			if 0 != dist && dist <= pos {
				let left = &arr[pos - dist..];

				// Only bother if the next byte after the current best matches.
				let bl = bestlength as usize;
				if right.len() <= bl || right[bl] == left[bl] {
					// Skip ahead using the repetition counts, if we can.
					let mut currentlength =
						if 2 < same0 && right[0] == left[0] {
							same1.min_u16(self.same[(pos - dist) & ZOPFLI_WINDOW_MASK]) as usize
						}
						else { 0 };

					while currentlength < limit_len && left[currentlength] == right[currentlength] {
						currentlength += 1;
					}

					// We've found a better length!
					if bl < currentlength {
						if let Some(s) = sublen {
							s[bl + 1..=currentlength].fill(dist as u16);
						}

						bestdist = dist;
						bestlength = LitLen::ALL[currentlength];

						// We can stop looking if we've reached the limit.
						if limit_len <= currentlength { break; }
					}
				}
			}

			// Switch to the second chain once it promises more.
			if
				! switched &&
				same0 <= (bestlength as u16) &&
				self.chain2.hashval[p] == Some(self.chain2.val)
			{
				switched = true;
				chain = &self.chain2;
			}

			// Shift to the next (previous) position, unless this is the end
			// of the line.
			pp = p;
			p = usize::from(chain.prev[p]);
			if p == pp { break; }

			dist += ppp_distance(p, pp);
			hits += 1;
			if ZOPFLI_MAX_CHAIN_HITS <= hits { break; }
		}

		(bestdist as u16, bestlength)
	}
}



/// # Zopfli Hash Chain.
///
/// This struct stores the recorded hash values and their latest and previous
/// positions, all masked to the window size.
struct ZopfliHashChain {
	/// # Hash Value to (Most Recent) Position.
	head: Vec<Option<u16>>,

	/// # Position to Hash Value.
	///
	/// This is the reverse of `head`.
	hashval: Vec<Option<u16>>,

	/// # Position to Previous Position with the Same Hash.
	///
	/// Positions pointing to themselves mark the end of the chain.
	prev: Vec<u16>,

	/// # Current Hash Value.
	val: u16,
}

impl ZopfliHashChain {
	/// # New.
	fn new() -> Self {
		let mut out = Self {
			head: vec![None; ZOPFLI_WINDOW_SIZE],
			hashval: vec![None; ZOPFLI_WINDOW_SIZE],
			prev: vec![0; ZOPFLI_WINDOW_SIZE],
			val: 0,
		};
		out.reset();
		out
	}

	#[expect(clippy::cast_possible_truncation, reason = "The window fits u16.")]
	/// # Reset.
	///
	/// (Re)Set all the data to its logical defaults so we can begin again.
	fn reset(&mut self) {
		self.head.fill(None);
		self.hashval.fill(None);
		for (i, p) in self.prev.iter_mut().enumerate() { *p = i as u16; }
		self.val = 0;
	}

	#[expect(clippy::cast_possible_truncation, reason = "The window fits u16.")]
	/// # Update Hash.
	///
	/// This updates the chain for (masked) position `hpos`. The hash value
	/// will have already been cycled by the time this is called.
	fn update_hash(&mut self, hpos: usize) {
		let hval = self.val;
		self.hashval[hpos] = Some(hval);

		// Link to the previous head, if it is still current.
		self.prev[hpos] = match self.head[usize::from(hval)] {
			Some(head) if self.hashval[usize::from(head)] == Some(hval) => head,
			_ => hpos as u16,
		};

		self.head[usize::from(hval)] = Some(hpos as u16);
	}
}
