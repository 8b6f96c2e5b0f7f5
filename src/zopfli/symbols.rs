/*!
# Woffli: Symbols.

This module contains custom types and lookup tables for length and distance
symbols, bit counts, and bit values. Nearly all of it is generated by
`build.rs`; the hand-written bits are conversions between the numeric types.
*/

// This defines the DeflateSym, Dsym, LitLen, and Lsym symbol enums, as well
// as the DISTANCE_* and LENGTH_* lookup tables.
include!(concat!(env!("OUT_DIR"), "/symbols.rs"));

impl DeflateSym {
	/// # Jumbled Tree Symbols.
	///
	/// This ordering is used when encoding DEFLATE trees.
	pub(crate) const TREE: [Self; 19] = [
		Self::D16, Self::D17, Self::D18, Self::D00, Self::D08,
		Self::D07, Self::D09, Self::D06, Self::D10, Self::D05,
		Self::D11, Self::D04, Self::D12, Self::D03, Self::D13,
		Self::D02, Self::D14, Self::D01, Self::D15,
	];

	/// # Is Zero?
	pub(crate) const fn is_zero(self) -> bool { matches!(self, Self::D00) }

	/// # From Bit Count.
	///
	/// Code lengths top out at fifteen; anything bigger is nonsense.
	pub(crate) const fn from_bits(n: usize) -> Option<Self> {
		if n < 16 { Some(Self::ALL[n]) }
		else { None }
	}
}

impl LitLen {
	/// # Min Matchable.
	pub(crate) const MIN_MATCH: Self = Self::L003;

	/// # Max Matchable.
	pub(crate) const MAX_MATCH: Self = Self::L258;

	/// # Is Matchable?
	///
	/// Returns `true` if `self` is at least `Self::MIN_MATCH`.
	pub(crate) const fn is_matchable(self) -> bool { 2 < (self as u16) }

	/// # Is Max?
	pub(crate) const fn is_max(self) -> bool { matches!(self, Self::MAX_MATCH) }

	/// # Is Zero?
	pub(crate) const fn is_zero(self) -> bool { matches!(self, Self::L000) }

	/// # From U8.
	///
	/// `LitLen` covers the full `u8` range, so literals always fit.
	pub(crate) const fn from_u8(n: u8) -> Self { Self::ALL[n as usize] }

	/// # Min w/ U16.
	///
	/// Return the smaller of `self` and `n`.
	pub(crate) const fn min_u16(self, n: u16) -> Self {
		if n < (self as u16) { Self::ALL[n as usize] }
		else { self }
	}

	/// # Min w/ Usize.
	///
	/// Return the smaller of `self` and `n`.
	pub(crate) const fn min_usize(self, n: usize) -> Self {
		if n < (self as usize) { Self::ALL[n] }
		else { self }
	}
}

impl Lsym {
	/// # From `LitLen`.
	///
	/// For literals (and the end-of-block marker), the symbol is the value.
	pub(crate) const fn from_litlen(litlen: LitLen) -> Self {
		Self::ALL[litlen as usize]
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_all_variants() {
		for (i, v) in DeflateSym::ALL.iter().copied().enumerate() { assert_eq!(v as usize, i); }
		for (i, v) in Dsym::ALL.iter().copied().enumerate() { assert_eq!(v as usize, i); }
		for (i, v) in LitLen::ALL.iter().copied().enumerate() { assert_eq!(v as usize, i); }
		for (i, v) in Lsym::ALL.iter().copied().enumerate() { assert_eq!(v as usize, i); }
	}

	#[test]
	fn t_litlen_min() {
		assert_eq!(LitLen::L010.min_u16(5), LitLen::L005);
		assert_eq!(LitLen::L010.min_u16(500), LitLen::L010);
		assert_eq!(LitLen::MAX_MATCH.min_usize(1_000_000), LitLen::MAX_MATCH);
		assert_eq!(LitLen::MAX_MATCH.min_usize(3), LitLen::MIN_MATCH);
		assert!(LitLen::MIN_MATCH.is_matchable());
		assert!(! LitLen::L002.is_matchable());
	}

	#[test]
	/// # Test Distance Symbols (Fallback).
	///
	/// The generated table uses log math; this double-checks it against
	/// plain range branching.
	fn t_dsym_slow() {
		/// # Lower Bounds for Each Distance Symbol.
		const BOUNDS: [u16; 30] = [
			1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257,
			385, 513, 769, 1025, 1537, 2049, 3073, 4097, 6145, 8193, 12_289,
			16_385, 24_577,
		];

		for (i, sym1) in DISTANCE_SYMBOLS.iter().copied().enumerate().skip(1) {
			let i = i as u16;
			let sym2 = BOUNDS.iter().rposition(|&b| b <= i).unwrap();
			assert_eq!(sym1 as usize, sym2, "Wrong distance symbol at {i}.");

			// The value is what's left after the base, and must fit within
			// the extra bits.
			let value = DISTANCE_VALUES[i as usize];
			assert_eq!(BOUNDS[sym2] + value, i, "Wrong distance value at {i}.");
			assert!(
				u32::from(value) < (1_u32 << DISTANCE_BITS[sym2]),
				"Distance value overflows its bits at {i}.",
			);
		}
	}

	#[test]
	fn t_length_symbols() {
		// Spot checks from the DEFLATE length table.
		for (len, sym, bits, value) in [
			(3, Lsym::L257, 0, 0),
			(10, Lsym::L264, 0, 0),
			(11, Lsym::L265, 1, 0),
			(12, Lsym::L265, 1, 1),
			(18, Lsym::L268, 1, 1),
			(19, Lsym::L269, 2, 0),
			(34, Lsym::L272, 2, 3),
			(115, Lsym::L280, 4, 0),
			(130, Lsym::L280, 4, 15),
			(227, Lsym::L284, 5, 0),
			(257, Lsym::L284, 5, 30),
			(258, Lsym::L285, 0, 0),
		] {
			assert_eq!(LENGTH_SYMBOLS[len], sym, "Wrong symbol for {len}.");
			assert_eq!(LENGTH_SYMBOL_BITS[len], bits, "Wrong bits for {len}.");
			assert_eq!(LENGTH_SYMBOL_BIT_VALUES[len], value, "Wrong value for {len}.");
			assert_eq!(LENGTH_EXTRA_BITS[sym as usize], bits, "Wrong symbol bits for {len}.");
		}

		// The float tables should match the integer ones.
		for (a, b) in LENGTH_SYMBOL_BITS.iter().zip(LENGTH_SYMBOL_BITS_F.iter()) {
			assert_eq!(f64::from(*a), *b);
		}
		for (a, b) in DISTANCE_BITS.iter().zip(DISTANCE_BITS_F.iter()) {
			assert_eq!(f64::from(*a), *b);
		}
	}
}
