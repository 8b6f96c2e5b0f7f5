/*!
# Woffli: LZ77 Store.

This module defines the LZ77 symbol stream along with its cumulative histogram
snapshots, used to cheaply count the symbols of arbitrary sub-ranges.
*/

use crate::{
	zopfli_error,
	ZopfliError,
};
use super::{
	ArrayD,
	ArrayLL,
	DISTANCE_BITS,
	DISTANCE_SYMBOLS,
	Dsym,
	DynamicLengths,
	FIXED_TREE_LL,
	LENGTH_SYMBOL_BITS,
	LENGTH_SYMBOLS,
	LitLen,
	Lsym,
	ZEROED_COUNTS_D,
	ZEROED_COUNTS_LL,
	ZOPFLI_NUM_D,
	ZOPFLI_NUM_LL,
	ZOPFLI_WINDOW_SIZE,
	ZopfliRange,
};



/// # Small Store Threshold.
///
/// Fixed-tree estimates are only worth computing for stores with at most
/// this many entries.
const SMALL_STORE: usize = 1000;

/// # Uncompressed Block Size Limit.
const MAX_STORED_BLOCK: u32 = 65_535;



#[derive(Clone, Default)]
/// # LZ77 Data Store.
///
/// In addition to the entries themselves, cumulative litlen and distance
/// symbol counts are snapshotted every `ZOPFLI_NUM_LL` and `ZOPFLI_NUM_D`
/// entries respectively. Each snapshot holds the totals from the start of the
/// store through the end of its chunk (or the end of the store, for the last
/// one).
pub(crate) struct LZ77Store {
	/// # Entries.
	entries: Vec<LZ77StoreEntry>,

	/// # Litlen Snapshots.
	ll_counts: Vec<ArrayLL<u32>>,

	/// # Distance Snapshots.
	d_counts: Vec<ArrayD<u32>>,
}

impl LZ77Store {
	/// # New.
	pub(crate) const fn new() -> Self {
		Self {
			entries: Vec::new(),
			ll_counts: Vec::new(),
			d_counts: Vec::new(),
		}
	}

	/// # Ranged.
	///
	/// Return an immutable view of the entries within `rng`.
	pub(crate) fn ranged(&self, rng: ZopfliRange) -> Result<LZ77StoreRange<'_>, ZopfliError> {
		if rng.end() <= self.entries.len() { Ok(LZ77StoreRange { store: self, rng }) }
		else { Err(zopfli_error!()) }
	}

	/// # Ranged (Full).
	///
	/// Same as `LZ77Store::ranged`, but covering the whole store.
	pub(crate) fn ranged_full(&self) -> Result<LZ77StoreRange<'_>, ZopfliError> {
		let rng = ZopfliRange::new(0, self.entries.len())?;
		Ok(LZ77StoreRange { store: self, rng })
	}

	/// # Clear.
	pub(crate) fn clear(&mut self) {
		self.entries.truncate(0);
		self.ll_counts.truncate(0);
		self.d_counts.truncate(0);
	}

	/// # Push Values.
	///
	/// ## Errors.
	///
	/// An error is returned if the pair makes no sense, i.e. an out-of-window
	/// distance, a literal bigger than a byte, or a too-short match.
	pub(crate) fn push(&mut self, litlen: LitLen, dist: u16, pos: usize)
	-> Result<(), ZopfliError> {
		let entry = LZ77StoreEntry::new(litlen, dist, pos)?;
		self.push_entry(entry);
		Ok(())
	}

	/// # Push Entry.
	///
	/// Add the entry, starting new snapshots as needed.
	fn push_entry(&mut self, entry: LZ77StoreEntry) {
		let len = self.entries.len();
		if len % ZOPFLI_NUM_LL == 0 {
			let last = self.ll_counts.last().copied().unwrap_or(ZEROED_COUNTS_LL);
			self.ll_counts.push(last);
		}
		if len % ZOPFLI_NUM_D == 0 {
			let last = self.d_counts.last().copied().unwrap_or(ZEROED_COUNTS_D);
			self.d_counts.push(last);
		}

		if let Some(ll) = self.ll_counts.last_mut() { ll[entry.ll_symbol as usize] += 1; }
		if 0 < entry.dist {
			if let Some(d) = self.d_counts.last_mut() { d[entry.d_symbol as usize] += 1; }
		}

		self.entries.push(entry);
	}

	/// # Replace Store.
	///
	/// Replace the current content with some other store's content.
	pub(crate) fn replace(&mut self, other: &Self) {
		self.entries.clone_from(&other.entries);
		self.ll_counts.clone_from(&other.ll_counts);
		self.d_counts.clone_from(&other.d_counts);
	}

	/// # Append Store.
	///
	/// Add all of the other store's entries to the end of this one. The
	/// snapshots have to be rebuilt as we go, so each entry is pushed
	/// individually.
	pub(crate) fn append(&mut self, other: &Self) {
		self.entries.reserve(other.entries.len());
		for e in &other.entries { self.push_entry(*e); }
	}
}

impl LZ77Store {
	/// # Entries.
	pub(crate) fn entries(&self) -> &[LZ77StoreEntry] { &self.entries }

	/// # Is Empty?
	pub(crate) fn is_empty(&self) -> bool { self.entries.is_empty() }

	/// # Length.
	pub(crate) fn len(&self) -> usize { self.entries.len() }

	/// # Histogram At.
	///
	/// Return the cumulative symbol counts for entries `0..=lpos`, working
	/// backward from the snapshot covering `lpos`.
	fn histogram_at(&self, lpos: usize) -> Result<(ArrayLL<u32>, ArrayD<u32>), ZopfliError> {
		let len = self.entries.len();
		if len <= lpos { return Err(zopfli_error!()); }

		// Litlens.
		let chunk = lpos / ZOPFLI_NUM_LL;
		let mut ll_counts = self.ll_counts.get(chunk).copied().ok_or(zopfli_error!())?;
		let end = usize::min(len, (chunk + 1) * ZOPFLI_NUM_LL);
		for e in &self.entries[lpos + 1..end] {
			ll_counts[e.ll_symbol as usize] -= 1;
		}

		// Distances.
		let chunk = lpos / ZOPFLI_NUM_D;
		let mut d_counts = self.d_counts.get(chunk).copied().ok_or(zopfli_error!())?;
		let end = usize::min(len, (chunk + 1) * ZOPFLI_NUM_D);
		for e in &self.entries[lpos + 1..end] {
			if 0 < e.dist { d_counts[e.d_symbol as usize] -= 1; }
		}

		Ok((ll_counts, d_counts))
	}
}



#[derive(Clone, Copy)]
/// # Ranged LZ77 Data Store.
///
/// An immutable, non-empty view into an `LZ77Store`. The parent store is kept
/// around because histograms are derived from its snapshots, and because some
/// cost estimates depend on the size of the whole thing.
pub(crate) struct LZ77StoreRange<'a> {
	/// # Parent Store.
	store: &'a LZ77Store,

	/// # Entry Range.
	rng: ZopfliRange,
}

impl<'a> LZ77StoreRange<'a> {
	/// # Entries.
	pub(crate) fn entries(self) -> &'a [LZ77StoreEntry] {
		self.store.entries.get(self.rng.rng()).unwrap_or(&[])
	}

	/// # Entry Range.
	pub(crate) const fn rng(self) -> ZopfliRange { self.rng }

	/// # Uncompressed Range.
	///
	/// Return the original uncompressed range used to build this store.
	pub(crate) fn byte_range(self) -> Result<ZopfliRange, ZopfliError> {
		let entries = self.entries();
		let first = entries.first().ok_or(zopfli_error!())?;
		let last = entries.last().ok_or(zopfli_error!())?;
		ZopfliRange::new(first.pos, last.pos + last.length() as usize)
	}

	/// # Histogram.
	///
	/// Count up the litlen and distance symbols within the range. Short ranges
	/// are counted directly; longer ones are worked out from the snapshots.
	pub(crate) fn histogram(self) -> Result<(ArrayLL<u32>, ArrayD<u32>), ZopfliError> {
		let start = self.rng.start();
		let end = self.rng.end();

		if end < start + ZOPFLI_NUM_LL * 3 {
			let mut ll_counts = ZEROED_COUNTS_LL;
			let mut d_counts = ZEROED_COUNTS_D;
			for e in self.entries() {
				ll_counts[e.ll_symbol as usize] += 1;
				if 0 < e.dist { d_counts[e.d_symbol as usize] += 1; }
			}
			Ok((ll_counts, d_counts))
		}
		else {
			let (mut ll_counts, mut d_counts) = self.store.histogram_at(end - 1)?;
			if 0 < start {
				let (ll2, d2) = self.store.histogram_at(start - 1)?;
				for (a, b) in ll_counts.iter_mut().zip(ll2) { *a -= b; }
				for (a, b) in d_counts.iter_mut().zip(d2) { *a -= b; }
			}
			Ok((ll_counts, d_counts))
		}
	}

	/// # Length.
	pub(crate) const fn len(self) -> usize { self.rng.len() }
}

impl LZ77StoreRange<'_> {
	/// # Calculate Block Size (Auto).
	///
	/// Return the smallest of the uncompressed, fixed, and dynamic estimates.
	/// For large stores the fixed estimate is skipped (treated as
	/// uncompressed), as it is almost never the winner and usually just
	/// muddies the block-splitting decisions.
	pub(crate) fn block_size_auto(self) -> Result<u32, ZopfliError> {
		let uncompressed = self.block_size_uncompressed()?;
		let fixed =
			if SMALL_STORE < self.store.len() { uncompressed }
			else { self.block_size_fixed() };
		let dynamic = self.block_size_dynamic()?;

		if uncompressed < fixed && uncompressed < dynamic { Ok(uncompressed) }
		else { Ok(u32::min(fixed, dynamic)) }
	}

	/// # Calculate Block Size (Dynamic).
	///
	/// This includes the three header bits.
	pub(crate) fn block_size_dynamic(self) -> Result<u32, ZopfliError> {
		DynamicLengths::new(self).map(|d| 3 + d.cost())
	}

	/// # Calculate Block Size (Fixed).
	///
	/// This includes the three header bits and the end-of-block symbol.
	pub(crate) fn block_size_fixed(self) -> u32 {
		let size = self.entries().iter()
			.map(LZ77StoreEntry::fixed_cost)
			.sum::<u32>();

		3 + FIXED_TREE_LL[256] as u32 + size
	}

	/// # Calculate Block Size (Uncompressed).
	///
	/// Stored blocks top out at 65,535 bytes, each costing five bytes of
	/// overhead.
	pub(crate) fn block_size_uncompressed(self) -> Result<u32, ZopfliError> {
		let blocksize = self.byte_range()?.len32();
		let chunks = blocksize.div_ceil(MAX_STORED_BLOCK);
		Ok(blocksize * 8 + chunks * 40)
	}

	/// # Is Small?
	///
	/// Returns true if the parent store is small enough for fixed-tree
	/// considerations.
	pub(crate) fn is_small(self) -> bool { self.store.len() < SMALL_STORE }
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # LZ77 Store Entry.
///
/// A literal (zero distance) or a length/distance pair, along with its
/// starting position in the source and its pre-computed symbols.
pub(crate) struct LZ77StoreEntry {
	pub(crate) pos: usize,
	pub(crate) litlen: LitLen,
	pub(crate) dist: u16,
	pub(crate) ll_symbol: Lsym,
	pub(crate) d_symbol: Dsym,
}

impl LZ77StoreEntry {
	/// # New.
	const fn new(litlen: LitLen, dist: u16, pos: usize) -> Result<Self, ZopfliError> {
		if dist == 0 {
			if 255 < (litlen as u16) { return Err(zopfli_error!()); }
			Ok(Self {
				pos,
				litlen,
				dist,
				ll_symbol: Lsym::from_litlen(litlen),
				d_symbol: Dsym::D00,
			})
		}
		else if (dist as usize) < ZOPFLI_WINDOW_SIZE && litlen.is_matchable() {
			Ok(Self {
				pos,
				litlen,
				dist,
				ll_symbol: LENGTH_SYMBOLS[litlen as usize],
				d_symbol: DISTANCE_SYMBOLS[dist as usize],
			})
		}
		else { Err(zopfli_error!()) }
	}

	/// # Fixed Cost.
	///
	/// The number of bits needed to write this entry with the fixed tree.
	const fn fixed_cost(&self) -> u32 {
		let base = FIXED_TREE_LL[self.ll_symbol as usize] as u32;
		if 0 < self.dist {
			base +
			LENGTH_SYMBOL_BITS[self.litlen as usize] as u32 +
			DISTANCE_BITS[self.d_symbol as usize] as u32 +
			5 // FIXED_TREE_D.
		}
		else { base }
	}

	/// # Length.
	///
	/// If the distance is zero, 1, otherwise the litlen.
	pub(crate) const fn length(&self) -> LitLen {
		if 0 < self.dist { self.litlen }
		else { LitLen::L001 }
	}
}



#[cfg(test)]
mod test {
	use super::*;

	/// # Build a Store.
	///
	/// Literals for even positions, short matches for the rest, so the
	/// histograms have something to chew on.
	fn store(n: usize) -> LZ77Store {
		let mut store = LZ77Store::new();
		let mut pos = 0;
		for i in 0..n {
			if i % 3 == 0 {
				store.push(LitLen::from_u8((i % 251) as u8), 0, pos).expect("Push failed.");
				pos += 1;
			}
			else {
				let len = LitLen::ALL[3 + i % 50];
				let dist = (1 + (i * 7) % 30_000) as u16;
				store.push(len, dist, pos).expect("Push failed.");
				pos += len as usize;
			}
		}
		store
	}

	/// # Direct Histogram.
	fn direct(entries: &[LZ77StoreEntry]) -> (ArrayLL<u32>, ArrayD<u32>) {
		let mut ll_counts = ZEROED_COUNTS_LL;
		let mut d_counts = ZEROED_COUNTS_D;
		for e in entries {
			ll_counts[e.ll_symbol as usize] += 1;
			if 0 < e.dist { d_counts[e.d_symbol as usize] += 1; }
		}
		(ll_counts, d_counts)
	}

	#[test]
	fn t_fixed_tree_256() {
		assert_eq!(FIXED_TREE_LL[256] as u32, 7);
		assert!(super::super::FIXED_TREE_D.iter().all(|&d| d as u32 == 5));
	}

	#[test]
	fn t_push_invalid() {
		let mut store = LZ77Store::new();
		assert!(store.push(LitLen::L256, 0, 0).is_err());
		assert!(store.push(LitLen::L002, 1, 0).is_err());
		assert!(store.push(LitLen::L010, 32_768, 0).is_err());
		assert!(store.is_empty());

		assert!(store.push(LitLen::L255, 0, 0).is_ok());
		assert!(store.push(LitLen::L010, 1, 1).is_ok());
		assert_eq!(store.len(), 2);
		assert_eq!(store.entries()[1].ll_symbol, Lsym::L264);
		assert_eq!(store.entries()[1].d_symbol, Dsym::D00);
	}

	#[test]
	fn t_snapshots() {
		let store = store(2000);
		assert_eq!(store.ll_counts.len(), 2000_usize.div_ceil(ZOPFLI_NUM_LL));
		assert_eq!(store.d_counts.len(), 2000_usize.div_ceil(ZOPFLI_NUM_D));

		// Every cumulative count should match a direct count.
		for lpos in [0, 1, 31, 32, 287, 288, 289, 1000, 1999] {
			let (ll, d) = store.histogram_at(lpos).expect("Histogram failed.");
			let (ll2, d2) = direct(&store.entries()[..=lpos]);
			assert_eq!(ll, ll2, "Litlen mismatch at {lpos}.");
			assert_eq!(d, d2, "Distance mismatch at {lpos}.");
		}

		assert!(store.histogram_at(2000).is_err());
	}

	#[test]
	fn t_histogram() {
		let store = store(3000);

		// Short and long ranges, aligned and not.
		for (start, end) in [
			(0, 5), (0, 864), (0, 865), (0, 3000), (1, 3000), (288, 1200),
			(500, 2999), (1234, 1300), (2000, 3000),
		] {
			let rng = ZopfliRange::new(start, end).expect("Range failed.");
			let (ll, d) = store.ranged(rng)
				.and_then(LZ77StoreRange::histogram)
				.expect("Histogram failed.");
			let (ll2, d2) = direct(&store.entries()[start..end]);
			assert_eq!(ll, ll2, "Litlen mismatch for {start}..{end}.");
			assert_eq!(d, d2, "Distance mismatch for {start}..{end}.");
		}

		// Out of range.
		let rng = ZopfliRange::new(0, 3001).expect("Range failed.");
		assert!(store.ranged(rng).is_err());
	}

	#[test]
	fn t_append_replace() {
		let a = store(400);
		let b = store(700);

		let mut c = LZ77Store::new();
		c.replace(&a);
		c.append(&b);
		assert_eq!(c.len(), 1100);
		assert_eq!(&c.entries()[..400], a.entries());
		assert_eq!(&c.entries()[400..], b.entries());

		// The rebuilt snapshots should still add up.
		let (ll, d) = c.ranged_full()
			.and_then(LZ77StoreRange::histogram)
			.expect("Histogram failed.");
		let (ll2, d2) = direct(c.entries());
		assert_eq!(ll, ll2);
		assert_eq!(d, d2);

		c.clear();
		assert!(c.is_empty());
		assert!(c.ranged_full().is_err());
	}

	#[test]
	fn t_byte_range() {
		let mut store = LZ77Store::new();
		store.push(LitLen::L065, 0, 10).expect("Push failed.");
		store.push(LitLen::L065, 0, 11).expect("Push failed.");
		store.push(LitLen::L020, 2, 12).expect("Push failed.");

		let rng = store.ranged_full()
			.and_then(LZ77StoreRange::byte_range)
			.expect("Byte range failed.");
		assert_eq!(rng.rng(), 10..32);

		// Uncompressed: 22 bytes plus one stored header.
		let size = store.ranged_full()
			.and_then(LZ77StoreRange::block_size_uncompressed)
			.expect("Size failed.");
		assert_eq!(size, 22 * 8 + 40);

		// Fixed: header, EOB, two 8-bit literals, and a length-20 match
		// (seven-bit symbol 269 plus two extra bits, five-bit distance).
		let size = store.ranged_full()
			.map(LZ77StoreRange::block_size_fixed)
			.expect("Size failed.");
		assert_eq!(size, 3 + 7 + 8 + 8 + 7 + 2 + 5);
	}
}
