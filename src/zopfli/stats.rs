/*!
# Woffli: Squeeze Stats.

This module defines the cost model used by the optimal parser, along with the
tiny PRNG used to shake it up when progress stalls.
*/

use super::{
	ArrayD,
	ArrayLL,
	LZ77Store,
	ZEROED_COUNTS_D,
	ZEROED_COUNTS_LL,
	ZOPFLI_NUM_D,
	ZOPFLI_NUM_LL,
};



#[derive(Clone, Copy)]
/// # Randomness.
///
/// A simple, repeatable [MWC PRNG](https://en.wikipedia.org/wiki/Multiply-with-carry_pseudorandom_number_generator),
/// used to shuffle frequencies between runs.
pub(crate) struct RanState {
	m_w: u32,
	m_z: u32,
}

impl RanState {
	/// # New Instance.
	pub(crate) const fn new() -> Self {
		Self { m_w: 1, m_z: 2 }
	}

	/// # Generate Random Number.
	const fn randomize(&mut self) -> u32 {
		self.m_z = 36_969 * (self.m_z & 65_535) + (self.m_z >> 16);
		self.m_w = 18_000 * (self.m_w & 65_535) + (self.m_w >> 16);
		(self.m_z << 16).wrapping_add(self.m_w)
	}
}



#[derive(Clone, Copy)]
/// # Symbol Stats.
///
/// This holds the litlen and distance symbol counts from a parse, and the
/// per-symbol bit costs derived from them.
pub(crate) struct SymbolStats {
	/// # Litlen Symbol Counts.
	ll_counts: ArrayLL<u32>,

	/// # Distance Symbol Counts.
	d_counts: ArrayD<u32>,

	/// # Litlen Symbol Costs.
	pub(crate) ll_symbols: ArrayLL<f64>,

	/// # Distance Symbol Costs.
	pub(crate) d_symbols: ArrayD<f64>,
}

impl SymbolStats {
	/// # New Instance.
	pub(crate) const fn new() -> Self {
		Self {
			ll_counts: ZEROED_COUNTS_LL,
			d_counts: ZEROED_COUNTS_D,
			ll_symbols: [0.0; ZOPFLI_NUM_LL],
			d_symbols: [0.0; ZOPFLI_NUM_D],
		}
	}

	/// # Crunch Symbols.
	///
	/// Calculate the entropy of the counts, i.e. `log2(sum) - log2(count)`
	/// for each symbol, storing the results as bit costs. Unused symbols cost
	/// the full `log2(sum)`, and if nothing at all was used, the sum is taken
	/// to be the alphabet size.
	pub(crate) fn crunch(&mut self) {
		entropy(&self.ll_counts, &mut self.ll_symbols);
		entropy(&self.d_counts, &mut self.d_symbols);
	}

	/// # Load Statistics.
	///
	/// Add the symbols from `store` to the counts, and mark the end-of-block
	/// symbol as used exactly once.
	///
	/// Note: this does _not_ rebuild the symbol costs.
	pub(crate) fn load_store(&mut self, store: &LZ77Store) {
		for e in store.entries() {
			self.ll_counts[e.ll_symbol as usize] += 1;
			if 0 < e.dist { self.d_counts[e.d_symbol as usize] += 1; }
		}

		self.ll_counts[256] = 1;
	}

	/// # Randomize Stat Frequencies.
	///
	/// Randomly overwrite about a third of the counts with other counts from
	/// the same alphabet. Litlens are always processed before distances, and
	/// a single `RanState` should be shared across all iterations so the
	/// results are repeatable.
	///
	/// Note: this does _not_ rebuild the symbol costs.
	pub(crate) fn randomize(&mut self, state: &mut RanState) {
		/// # Shuffle Counts.
		fn shuffle_counts<const N: usize>(counts: &mut [u32; N], state: &mut RanState) {
			for i in 0..N {
				if (state.randomize() >> 4) % 3 == 0 {
					let index = state.randomize() as usize % N;
					counts[i] = counts[index];
				}
			}
		}

		shuffle_counts(&mut self.ll_counts, state);
		shuffle_counts(&mut self.d_counts, state);
		self.ll_counts[256] = 1;
	}

	/// # Reload Store.
	///
	/// Like `SymbolStats::load_store`, but reset the counts first, or, if
	/// `weighted`, halve them, producing a sort of running average of the
	/// current and previous passes.
	///
	/// Note: this does _not_ rebuild the symbol costs.
	pub(crate) fn reload_store(&mut self, store: &LZ77Store, weighted: bool) {
		if weighted {
			for c in &mut self.d_counts { *c /= 2; }
			for c in &mut self.ll_counts { *c /= 2; }
		}
		else {
			self.d_counts.fill(0);
			self.ll_counts.fill(0);
		}

		self.load_store(store);
	}
}



#[expect(clippy::cast_precision_loss, reason = "Alphabets are tiny.")]
/// # Entropy.
///
/// Write the bit cost of each count to `bits`.
fn entropy<const N: usize>(counts: &[u32; N], bits: &mut [f64; N]) {
	let sum = counts.iter().copied().map(u64::from).sum::<u64>();
	let log2sum =
		if sum == 0 { (N as f64).log2() }
		else { (sum as f64).log2() };

	for (c, b) in counts.iter().copied().zip(bits.iter_mut()) {
		*b =
			if c == 0 { log2sum }
			else {
				let v = log2sum - f64::from(c).log2();
				// Rounding can leave us a hair below zero.
				if v < 0.0 && -1e-5 < v { 0.0 } else { v }
			};
	}
}
