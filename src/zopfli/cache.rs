/*!
# Woffli: Match and Squeeze Caches.

The match cache spares `ZopfliHash::find` from repeating the same searches
over and over again across squeeze iterations; the squeeze cache holds the
cost and path buffers used by the optimal parser.
*/

use crate::{
	zopfli_error,
	ZopfliError,
};
use super::{
	LitLen,
	SUBLEN_LEN,
	ZOPFLI_MIN_MATCH,
};



/// # Default Length (1) and Distance (0).
///
/// This combination is never produced by a real search, so marks positions
/// that have not yet been looked at.
const DEFAULT_LD: (LitLen, u16) = (LitLen::L001, 0);

/// # Sublength Cache Entries.
const ZOPFLI_CACHE_LENGTH: usize = 8;

/// # Sublength Cache Total Length.
///
/// Each entry uses three bytes: the length (minus three) and the distance.
const SUBLEN_CACHED_LEN: usize = ZOPFLI_CACHE_LENGTH * 3;



#[derive(Default)]
/// # Longest Match Cache.
///
/// This holds the best length/distance found at each position of the current
/// block, along with a compressed summary of the sublengths leading up to
/// it.
pub(crate) struct MatchCache {
	/// # Length and Distance.
	ld: Vec<(LitLen, u16)>,

	/// # Sublengths.
	sublen: Vec<u8>,
}

impl MatchCache {
	/// # Initialize.
	///
	/// Resize the buffers for `blocksize` positions and reset everything to
	/// the defaults: one for length, zero for everything else.
	pub(crate) fn init(&mut self, blocksize: usize) {
		self.ld.truncate(0);
		self.ld.resize(blocksize, DEFAULT_LD);
		self.sublen.truncate(0);
		self.sublen.resize(blocksize * SUBLEN_CACHED_LEN, 0);
	}

	/// # Find Match.
	///
	/// Pull the length, distance, and (optionally) sublengths for `pos` from
	/// the cache, if possible. If the cache has something, but not enough,
	/// `limit` is lowered to the cached length so the subsequent search
	/// knows when to quit.
	///
	/// Returns `true` if the values were written.
	pub(crate) fn find(
		&self,
		pos: usize,
		limit: &mut LitLen,
		sublen: &mut Option<&mut [u16; SUBLEN_LEN]>,
		distance: &mut u16,
		length: &mut LitLen,
	) -> Result<bool, ZopfliError> {
		let (cache_len, cache_dist) = self.ld.get(pos).copied().ok_or(zopfli_error!())?;

		// Lengths without distances are only ever "unset".
		if ! cache_len.is_zero() && cache_dist == 0 { return Ok(false); }
		let cache_sublen = self.sublen_at(pos)?;

		// Find the max sublength once, if ever.
		let maxlength =
			if sublen.is_none() { 0 }
			else { max_sublen(cache_sublen) };

		if
			limit.is_max() ||
			(cache_len as u16) <= (*limit as u16) ||
			(sublen.is_some() && (*limit as usize) <= maxlength)
		{
			if sublen.is_none() || (cache_len as usize) <= maxlength {
				*length = cache_len.min_u16(*limit as u16);

				if let Some(s) = sublen {
					if length.is_matchable() {
						write_sublen(cache_sublen, s);
						*distance = s[*length as usize];

						// The full-length distance is stored twice; they had
						// better agree!
						if limit.is_max() && *distance != cache_dist {
							return Err(zopfli_error!());
						}
					}
					else { *distance = 0; }
				}
				else { *distance = cache_dist; }

				return Ok(true);
			}

			// We know when to stop, at least.
			if (cache_len as u16) < (*limit as u16) { *limit = cache_len; }
		}

		Ok(false)
	}

	#[expect(clippy::cast_possible_truncation, reason = "Lengths top out at 258.")]
	/// # Set Sublength.
	///
	/// Save the results of a full-length search to the cache, unless
	/// something is already there.
	pub(crate) fn set_sublen(
		&mut self,
		pos: usize,
		sublen: &[u16; SUBLEN_LEN],
		distance: u16,
		length: LitLen,
	) -> Result<(), ZopfliError> {
		let ld = self.ld.get_mut(pos).ok_or(zopfli_error!())?;

		// Already set?
		if *ld != DEFAULT_LD { return Ok(()); }

		// Unmatchable positions are noted as such.
		if ! length.is_matchable() {
			*ld = (LitLen::L000, 0);
			return Ok(());
		}

		if distance == 0 { return Err(zopfli_error!()); }
		*ld = (length, distance);

		// Only sublengths between the minimum match and length matter; each
		// run of identical distances gets one entry (up to the cap).
		let slice = &sublen[ZOPFLI_MIN_MATCH..=(length as usize)];
		let from = pos * SUBLEN_CACHED_LEN;
		let dst = self.sublen.get_mut(from..from + SUBLEN_CACHED_LEN).ok_or(zopfli_error!())?;
		let mut dst = dst.chunks_exact_mut(3);

		for (i, pair) in (0_u8..=u8::MAX).zip(slice.windows(2)) {
			if pair[0] != pair[1] {
				let Some([d0, d1, d2]) = dst.next() else { return Ok(()); };
				*d0 = i;
				[*d1, *d2] = pair[0].to_le_bytes();
			}
		}

		// The final run is implicitly a change.
		if let Some([d0, d1, d2]) = dst.next() {
			let last = (length as u16 - 3) as u8;
			*d0 = last;
			[*d1, *d2] = slice[slice.len() - 1].to_le_bytes();

			// Copy the length to the last slot too for the benefit of
			// max_sublen lookups.
			if let Some([d0, _, _]) = dst.last() { *d0 = last; }
		}

		Ok(())
	}

	/// # Sublength Slice.
	fn sublen_at(&self, pos: usize) -> Result<&[u8], ZopfliError> {
		let from = pos * SUBLEN_CACHED_LEN;
		self.sublen.get(from..from + SUBLEN_CACHED_LEN).ok_or(zopfli_error!())
	}
}



#[derive(Default)]
/// # Squeeze Cache.
///
/// This struct stores the per-position costs (and the lengths that achieved
/// them) computed by the optimal parser's forward pass, as well as the path
/// recovered by tracing them backward.
pub(crate) struct SqueezeCache {
	costs: Vec<(f32, LitLen)>,
	paths: Vec<LitLen>,
}

impl SqueezeCache {
	/// # Reset Costs.
	///
	/// Resize the costs for a block of `blocksize` bytes (plus one), setting
	/// the first to zero and the rest to infinity, and return them.
	pub(crate) fn reset_costs(&mut self, blocksize: usize) -> &mut [(f32, LitLen)] {
		self.costs.truncate(0);
		self.costs.resize(blocksize + 1, (f32::INFINITY, LitLen::L000));
		if let Some(c) = self.costs.first_mut() { c.0 = 0.0; }
		&mut self.costs
	}

	/// # Trace Paths.
	///
	/// Walk the costs backward from the end, collecting the lengths of the
	/// cheapest path, then return them in forward order.
	pub(crate) fn trace_paths(&mut self) -> Result<&[LitLen], ZopfliError> {
		self.paths.truncate(0);
		if self.costs.len() < 2 { return Ok(&[]); }

		let mut idx = self.costs.len() - 1;
		while 0 != idx {
			let v = self.costs[idx].1;
			if v.is_zero() || idx < (v as usize) { return Err(zopfli_error!()); }
			self.paths.push(v);
			idx -= v as usize;
		}

		self.paths.reverse();
		Ok(&self.paths)
	}
}



/// # Max Sublength.
///
/// Return the largest cached sublength, or zero if there isn't one.
fn max_sublen(slice: &[u8]) -> usize {
	// A missing first distance means nothing was cached.
	if slice[1] == 0 && slice[2] == 0 { 0 }
	// Otherwise the max is stored as the length of the last entry.
	else { usize::from(slice[SUBLEN_CACHED_LEN - 3]) + ZOPFLI_MIN_MATCH }
}

/// # Write Sublength.
///
/// Expand the cached runs back into the full sublength array.
fn write_sublen(src: &[u8], dst: &mut [u16; SUBLEN_LEN]) {
	let maxlength = max_sublen(src);
	let mut old = 0;
	for chunk in src.chunks_exact(3) {
		let length = usize::from(chunk[0]) + ZOPFLI_MIN_MATCH;
		if old <= length {
			let value = u16::from_le_bytes([chunk[1], chunk[2]]);
			dst[old..=length].fill(value);
		}
		if length == maxlength { return; }
		old = length + 1;
	}
}



#[cfg(test)]
mod test {
	use super::*;

	/// # Sublengths.
	///
	/// Build a sublength array with the given (inclusive end, distance) runs.
	fn sublen(runs: &[(usize, u16)]) -> [u16; SUBLEN_LEN] {
		let mut out = [0_u16; SUBLEN_LEN];
		let mut from = 0;
		for &(end, dist) in runs {
			out[from..=end].fill(dist);
			from = end + 1;
		}
		out
	}

	#[test]
	fn t_cache_roundtrip() {
		let mut cache = MatchCache::default();
		cache.init(4);

		// Nothing cached yet.
		let mut limit = LitLen::MAX_MATCH;
		let mut s = [0_u16; SUBLEN_LEN];
		let mut dist = 0;
		let mut len = LitLen::L000;
		assert!(! cache.find(0, &mut limit, &mut Some(&mut s), &mut dist, &mut len).expect("Find failed."));

		// Cache a match with three runs.
		let src = sublen(&[(5, 1), (9, 40), (20, 300)]);
		cache.set_sublen(0, &src, 300, LitLen::L020).expect("Set failed.");
		assert_eq!(max_sublen(cache.sublen_at(0).expect("Missing sublen.")), 20);

		// Pull it back out.
		let mut s = [0_u16; SUBLEN_LEN];
		assert!(cache.find(0, &mut limit, &mut Some(&mut s), &mut dist, &mut len).expect("Find failed."));
		assert_eq!(len, LitLen::L020);
		assert_eq!(dist, 300);
		assert_eq!(s[3..=20], src[3..=20]);

		// Lower limits are capped, with the distance for that length.
		let mut limit = LitLen::L008;
		assert!(cache.find(0, &mut limit, &mut Some(&mut s), &mut dist, &mut len).expect("Find failed."));
		assert_eq!(len, LitLen::L008);
		assert_eq!(dist, 40);

		// Without a sublength, the stored distance comes back.
		let mut limit = LitLen::MAX_MATCH;
		assert!(cache.find(0, &mut limit, &mut None, &mut dist, &mut len).expect("Find failed."));
		assert_eq!(len, LitLen::L020);
		assert_eq!(dist, 300);

		// But only if the limit is big enough.
		let mut limit = LitLen::L010;
		assert!(! cache.find(0, &mut limit, &mut None, &mut dist, &mut len).expect("Find failed."));
		assert_eq!(limit, LitLen::L010);

		// Setting it again changes nothing.
		cache.set_sublen(0, &sublen(&[(20, 7)]), 7, LitLen::L020).expect("Set failed.");
		let mut limit = LitLen::MAX_MATCH;
		assert!(cache.find(0, &mut limit, &mut None, &mut dist, &mut len).expect("Find failed."));
		assert_eq!(dist, 300);
	}

	#[test]
	fn t_cache_unmatchable() {
		let mut cache = MatchCache::default();
		cache.init(2);
		cache.set_sublen(1, &[0; SUBLEN_LEN], 0, LitLen::L001).expect("Set failed.");

		let mut limit = LitLen::MAX_MATCH;
		let mut s = [0_u16; SUBLEN_LEN];
		let mut dist = 5;
		let mut len = LitLen::L005;
		assert!(cache.find(1, &mut limit, &mut Some(&mut s), &mut dist, &mut len).expect("Find failed."));
		assert_eq!(len, LitLen::L000);
		assert_eq!(dist, 0);

		// Out of range.
		assert!(cache.find(2, &mut limit, &mut None, &mut dist, &mut len).is_err());
	}

	#[test]
	fn t_cache_overflow() {
		// More runs than entries: only the first eight get cached, and the
		// search limit is lowered instead.
		let runs: Vec<(usize, u16)> = (0..12).map(|i| (4 + i * 2, 10 + i as u16)).collect();
		let src = sublen(&runs);
		let length = LitLen::ALL[26];

		let mut cache = MatchCache::default();
		cache.init(1);
		cache.set_sublen(0, &src, src[26], length).expect("Set failed.");
		assert_eq!(max_sublen(cache.sublen_at(0).expect("Missing sublen.")), 18);

		let mut limit = LitLen::MAX_MATCH;
		let mut s = [0_u16; SUBLEN_LEN];
		let mut dist = 0;
		let mut len = LitLen::L000;
		assert!(! cache.find(0, &mut limit, &mut Some(&mut s), &mut dist, &mut len).expect("Find failed."));
		assert_eq!(limit, length);

		// Shorter requests still need a search, but their limits stay put.
		let mut limit = LitLen::L010;
		assert!(! cache.find(0, &mut limit, &mut Some(&mut s), &mut dist, &mut len).expect("Find failed."));
		assert_eq!(limit, LitLen::L010);

		let mut limit = LitLen::L003;
		assert!(! cache.find(0, &mut limit, &mut Some(&mut s), &mut dist, &mut len).expect("Find failed."));
		assert_eq!(limit, LitLen::L003);
	}

	#[test]
	fn t_trace_paths() {
		let mut cache = SqueezeCache::default();
		let costs = cache.reset_costs(6);
		assert_eq!(costs.len(), 7);
		assert_eq!(costs[0].0, 0.0);
		assert!(costs[1..].iter().all(|c| c.0.is_infinite()));

		// 1 + 4 + 1.
		costs[6].1 = LitLen::L001;
		costs[5].1 = LitLen::L004;
		costs[1].1 = LitLen::L001;
		let paths = cache.trace_paths().expect("Trace failed.");
		assert_eq!(paths, &[LitLen::L001, LitLen::L004, LitLen::L001]);

		// Zeroes are bad.
		let costs = cache.reset_costs(3);
		costs[3].1 = LitLen::L001;
		assert!(cache.trace_paths().is_err());

		// Lengths past the start are bad too.
		let costs = cache.reset_costs(3);
		costs[3].1 = LitLen::L004;
		assert!(cache.trace_paths().is_err());
	}
}
