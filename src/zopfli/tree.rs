/*!
# Woffli: Dynamic Tree Encoding.

Dynamic DEFLATE blocks open with a description of their own Huffman trees,
itself Huffman-coded and optionally run-length-encoded using the special
symbols `16` (repeat previous), `17` (short zero run), and `18` (long zero
run).

Which of those three are worth enabling varies, so every combination is tried
and the cheapest one wins.
*/

use crate::{
	zopfli_error,
	ZopfliError,
	ZopfliOut,
};
use super::{
	ArrayD,
	ArrayLL,
	DeflateSym,
	LengthLimitedCodeLengths,
};



/// # Zero-Filled Tree Counts.
const ZEROED_COUNTS_TREE: [u32; 19] = [0; 19];



/// # Calculate the Exact Tree Size (in Bits).
///
/// This returns the `extra` combination (`0..8`) that produced the smallest
/// tree, along with that size. Ties go to the lowest combination.
pub(crate) fn best_tree_size(
	ll_lengths: &ArrayLL<DeflateSym>,
	d_lengths: &ArrayD<DeflateSym>,
) -> Result<(u8, u32), ZopfliError> {
	let (all, _, _) = tree_symbols(ll_lengths, d_lengths);

	let mut best_extra = 0;
	let mut best_size = u32::MAX;
	for extra in 0..8 {
		let cl_counts = tree_counts(&all, extra, None);
		let cl_lengths = cl_counts.llcl()?;
		let hclen = tree_hclen(&cl_counts);

		let mut size = 14 + (hclen + 4) * 3;
		size += cl_lengths.iter()
			.zip(cl_counts.iter())
			.map(|(&a, &b)| a as u32 * b)
			.sum::<u32>();
		size += cl_counts[16] * 2;
		size += cl_counts[17] * 3;
		size += cl_counts[18] * 7;

		if size < best_size {
			best_extra = extra;
			best_size = size;
		}
	}

	Ok((best_extra, best_size))
}

/// # Encode Tree.
///
/// Write the tree header for `ll_lengths` and `d_lengths` to `out`, using the
/// special symbols enabled by `extra`.
pub(crate) fn encode_tree(
	ll_lengths: &ArrayLL<DeflateSym>,
	d_lengths: &ArrayD<DeflateSym>,
	extra: u8,
	out: &mut ZopfliOut,
) -> Result<(), ZopfliError> {
	if 7 < extra { return Err(zopfli_error!()); }

	let (all, hlit, hdist) = tree_symbols(ll_lengths, d_lengths);
	let mut rle: Vec<(DeflateSym, u8)> = Vec::with_capacity(all.len());
	let cl_counts = tree_counts(&all, extra, Some(&mut rle));
	let cl_lengths = cl_counts.llcl()?;
	let cl_symbols = <[u32; 19]>::llcl_symbols(&cl_lengths);
	let hclen = tree_hclen(&cl_counts);

	out.add_fixed_bits::<5>(hlit);
	out.add_fixed_bits::<5>(hdist);
	out.add_fixed_bits::<4>(hclen);

	// Code length code lengths, in the jumbled order.
	for &o in &DeflateSym::TREE[..hclen as usize + 4] {
		out.add_fixed_bits::<3>(cl_lengths[o as usize] as u32);
	}

	for (sym, value) in rle {
		let idx = sym as usize;
		out.add_huffman_bits(cl_symbols[idx], cl_lengths[idx] as u32);
		match sym {
			DeflateSym::D16 => { out.add_fixed_bits::<2>(u32::from(value)); },
			DeflateSym::D17 => { out.add_fixed_bits::<3>(u32::from(value)); },
			DeflateSym::D18 => { out.add_fixed_bits::<7>(u32::from(value)); },
			_ => {},
		}
	}

	Ok(())
}



/// # Tree Counts.
///
/// Run-length encode the merged code lengths using whichever special symbols
/// `extra` enables (bit 0 for `16`, bit 1 for `17`, bit 2 for `18`), and
/// return the resulting symbol counts.
///
/// If `rle` is provided, the symbols and their extra-bit values are recorded
/// there too, in order.
fn tree_counts(
	all: &[DeflateSym],
	extra: u8,
	mut rle: Option<&mut Vec<(DeflateSym, u8)>>,
) -> [u32; 19] {
	let mut cl_counts = ZEROED_COUNTS_TREE;
	let (use_16, use_17, use_18) = extra_bools(extra);

	// Emit as many of the special symbol as will fit, deducting from count.
	let mut special = |count: &mut usize, sym: DeflateSym, min: usize, max: usize| {
		while min <= *count {
			let count2 = usize::min(*count, max);
			cl_counts[sym as usize] += 1;
			if let Some(r) = rle.as_deref_mut() {
				#[expect(clippy::cast_possible_truncation, reason = "False positive.")]
				r.push((sym, (count2 - min) as u8));
			}
			*count -= count2;
		}
	};

	let mut i = 0;
	while i < all.len() {
		let symbol = all[i];
		let symbol_zero = symbol.is_zero();
		let mut count = 1;

		if use_16 || (symbol_zero && (use_17 || use_18)) {
			count += all[i + 1..].iter().take_while(|&&s| s == symbol).count();
		}
		i += count;

		if symbol_zero && 3 <= count {
			if use_18 { special(&mut count, DeflateSym::D18, 11, 138); }
			if use_17 { special(&mut count, DeflateSym::D17, 3, 10); }
		}

		// Repeats of anything else need the value written out once first.
		if use_16 && 4 <= count {
			count -= 1;
			let mut one = 1;
			special(&mut one, symbol, 1, 1);
			special(&mut count, DeflateSym::D16, 3, 6);
		}

		special(&mut count, symbol, 1, 1);
	}

	cl_counts
}

/// # Extra Boolification.
///
/// Split the `extra` byte into its use-16/17/18 flags.
const fn extra_bools(extra: u8) -> (bool, bool, bool) {
	(0 != extra & 1, 0 != extra & 2, 0 != extra & 4)
}

/// # HCLEN.
///
/// Return the number of code length code lengths that need writing, minus
/// four. Trailing entries (in the jumbled order) with zero counts are dropped.
fn tree_hclen(cl_counts: &[u32; 19]) -> u32 {
	let mut hclen = 15;
	while 0 < hclen && cl_counts[DeflateSym::TREE[hclen as usize + 3] as usize] == 0 {
		hclen -= 1;
	}
	hclen
}

#[expect(clippy::cast_possible_truncation, reason = "False positive.")]
/// # Tree Symbols.
///
/// Merge the litlen lengths (through the last used length symbol) and the
/// distance lengths (through the last used distance symbol), returning them
/// along with the HLIT and HDIST values.
///
/// The 256 literal lengths and the end-of-block length are always kept, as is
/// at least one distance.
fn tree_symbols(ll_lengths: &ArrayLL<DeflateSym>, d_lengths: &ArrayD<DeflateSym>)
-> (Vec<DeflateSym>, u32, u32) {
	let hlit = ll_lengths[257..286].iter()
		.rposition(|b| ! b.is_zero())
		.map_or(0, |v| v + 1);
	let hdist = d_lengths[1..30].iter()
		.rposition(|b| ! b.is_zero())
		.map_or(0, |v| v + 1);

	let mut all = Vec::with_capacity(258 + hlit + hdist);
	all.extend_from_slice(&ll_lengths[..257 + hlit]);
	all.extend_from_slice(&d_lengths[..=hdist]);

	(all, hlit as u32, hdist as u32)
}



#[cfg(test)]
mod test {
	use super::*;
	use super::super::{
		FIXED_TREE_D,
		FIXED_TREE_LL,
	};

	#[test]
	fn t_tree_symbols() {
		let mut ll = [DeflateSym::D00; 288];
		let mut d = [DeflateSym::D00; 32];

		// Nothing beyond the literals and end-of-block.
		let (all, hlit, hdist) = tree_symbols(&ll, &d);
		assert_eq!(all.len(), 258);
		assert_eq!(hlit, 0);
		assert_eq!(hdist, 0);

		ll[270] = DeflateSym::D04;
		d[4] = DeflateSym::D02;
		d[31] = DeflateSym::D02; // Out of range; ignored.
		let (all, hlit, hdist) = tree_symbols(&ll, &d);
		assert_eq!(hlit, 14);
		assert_eq!(hdist, 4);
		assert_eq!(all.len(), 257 + 14 + 5);
		assert_eq!(all[270], DeflateSym::D04);
		assert_eq!(all[271 + 4], DeflateSym::D02);
	}

	#[test]
	fn t_tree_counts() {
		let all = [DeflateSym::D00; 20];

		// Without special symbols, everything is counted literally.
		let counts = tree_counts(&all, 0, None);
		assert_eq!(counts[0], 20);

		// With 18, one symbol covers the whole run.
		let mut rle = Vec::new();
		let counts = tree_counts(&all, 4, Some(&mut rle));
		assert_eq!(counts[0], 0);
		assert_eq!(counts[18], 1);
		assert_eq!(rle, [(DeflateSym::D18, 9)]);

		// With only 17, two runs of 10.
		let counts = tree_counts(&all, 2, None);
		assert_eq!(counts[17], 2);

		// Non-zero repeats need 16, and write the value once first.
		let all = [DeflateSym::D08; 8];
		let mut rle = Vec::new();
		let counts = tree_counts(&all, 1, Some(&mut rle));
		assert_eq!(counts[8], 2);
		assert_eq!(counts[16], 1);
		assert_eq!(
			rle,
			[(DeflateSym::D08, 0), (DeflateSym::D16, 3), (DeflateSym::D08, 0)],
		);
	}

	#[test]
	fn t_best_tree_size() {
		// The fixed tree is a reasonable, stable test subject.
		let (extra, size) = best_tree_size(&FIXED_TREE_LL, &FIXED_TREE_D)
			.expect("Tree size failed.");
		assert!(extra < 8);

		// Encoding with that extra should produce exactly that many bits.
		let mut out = ZopfliOut::default();
		encode_tree(&FIXED_TREE_LL, &FIXED_TREE_D, extra, &mut out)
			.expect("Tree encoding failed.");
		assert_eq!(out.bit_len(), size as usize);

		// And no other combination should beat it.
		let (all, _, _) = tree_symbols(&FIXED_TREE_LL, &FIXED_TREE_D);
		for e in 0..8 {
			let mut out = ZopfliOut::default();
			encode_tree(&FIXED_TREE_LL, &FIXED_TREE_D, e, &mut out)
				.expect("Tree encoding failed.");
			assert!(size as usize <= out.bit_len());
			assert!(! all.is_empty());
		}

		assert!(encode_tree(&FIXED_TREE_LL, &FIXED_TREE_D, 8, &mut ZopfliOut::default()).is_err());
	}
}
