/*!
# Woffli: Length-Limited Code Lengths.

This module contains the Katajainen boundary package-merge implementation used
to build optimal Huffman code lengths that never exceed a given bit limit, as
well as the canonical code assignment that follows from them.

Chains are stored in a flat arena and refer to one another by index, so there
are no lifetimes or raw pointers to babysit.
*/

use crate::{
	zopfli_error,
	ZopfliError,
};
use super::{
	DeflateSym,
	ZOPFLI_NUM_D,
	ZOPFLI_NUM_LL,
};



/// # Length Limited Code Lengths.
///
/// This trait adds an `llcl` method to symbol count arrays that generates the
/// appropriate deflate symbols (bitlengths), and a `llcl_symbols` method that
/// turns those lengths into canonical codes.
pub(crate) trait LengthLimitedCodeLengths<const N: usize> {
	/// # Counts to Lengths.
	fn llcl(&self) -> Result<[DeflateSym; N], ZopfliError>;

	/// # Lengths to Codes.
	fn llcl_symbols(lengths: &[DeflateSym; N]) -> [u32; N];
}

/// # Helper: Implement the LLCL Trait.
macro_rules! llcl {
	($size:expr, $maxbits:literal, $patch:literal) => (
		impl LengthLimitedCodeLengths<$size> for [u32; $size] {
			fn llcl(&self) -> Result<[DeflateSym; $size], ZopfliError> {
				let mut lengths = [DeflateSym::D00; $size];
				bit_lengths(self, $maxbits, &mut lengths)?;
				if $patch { patch_distances(&mut lengths); }
				Ok(lengths)
			}

			fn llcl_symbols(lengths: &[DeflateSym; $size]) -> [u32; $size] {
				let mut symbols = [0; $size];
				canonical_codes(lengths, $maxbits, &mut symbols);
				symbols
			}
		}
	);
}

llcl!(19, 7, false);
llcl!(ZOPFLI_NUM_D, 15, true);
llcl!(ZOPFLI_NUM_LL, 15, false);



#[derive(Debug, Clone, Copy)]
/// # Leaf.
///
/// A non-zero frequency and the symbol it belongs to.
struct Leaf {
	weight: u64,
	symbol: usize,
}

#[derive(Debug, Clone, Copy)]
/// # Chain Node.
struct Node {
	/// # Total Weight.
	weight: u64,

	/// # Leaf Count.
	///
	/// The number of leaves to the left of (and including) this node.
	count: usize,

	/// # Previous Node (Arena Index).
	tail: Option<usize>,
}

/// # Package-Merge State.
///
/// Each of the `maxbits` lists only ever needs its two lookahead chains, so
/// those are all we track; everything else lives on in the arena until the
/// final tail walk.
struct PackageMerge<'a> {
	leaves: &'a [Leaf],
	nodes: Vec<Node>,
	lists: Vec<[usize; 2]>,
}

impl<'a> PackageMerge<'a> {
	/// # New.
	///
	/// Every list starts with the same two lightest leaves.
	fn new(leaves: &'a [Leaf], maxbits: usize) -> Self {
		let mut nodes = Vec::with_capacity(2 * maxbits * leaves.len());
		nodes.push(Node { weight: leaves[0].weight, count: 1, tail: None });
		nodes.push(Node { weight: leaves[1].weight, count: 2, tail: None });
		Self {
			leaves,
			nodes,
			lists: vec![[0, 1]; maxbits],
		}
	}

	/// # Push Node.
	///
	/// Add a node to the arena, returning its index.
	fn push(&mut self, weight: u64, count: usize, tail: Option<usize>) -> usize {
		let idx = self.nodes.len();
		self.nodes.push(Node { weight, count, tail });
		idx
	}

	/// # Lookahead Sum.
	///
	/// The combined weight of the two lookahead chains of a list.
	fn sum(&self, index: usize) -> u64 {
		let [a, b] = self.lists[index];
		self.nodes[a].weight + self.nodes[b].weight
	}

	/// # Boundary Package-Merge Step.
	///
	/// Add a new chain to the list at `index`, using either the next leaf or
	/// the combination of the two lookahead chains from the previous list,
	/// in which case that list needs two new chains of its own.
	fn boundary_pm(&mut self, index: usize) {
		let old = self.lists[index][1];
		let last_count = self.nodes[old].count;

		if index == 0 {
			if last_count >= self.leaves.len() { return; }
			let new = self.push(self.leaves[last_count].weight, last_count + 1, None);
			self.lists[index] = [old, new];
			return;
		}

		let sum = self.sum(index - 1);
		if last_count < self.leaves.len() && sum > self.leaves[last_count].weight {
			let tail = self.nodes[old].tail;
			let new = self.push(self.leaves[last_count].weight, last_count + 1, tail);
			self.lists[index] = [old, new];
		}
		else {
			let tail = Some(self.lists[index - 1][1]);
			let new = self.push(sum, last_count, tail);
			self.lists[index] = [old, new];
			self.boundary_pm(index - 1);
			self.boundary_pm(index - 1);
		}
	}

	/// # Final Boundary Package-Merge Step.
	///
	/// Same as `boundary_pm`, but only the counts and tails matter for the
	/// last chain, so no lookaheads are replenished.
	fn boundary_pm_final(&mut self, index: usize) {
		let last = self.lists[index][1];
		let last_count = self.nodes[last].count;
		let sum = self.sum(index - 1);

		if last_count < self.leaves.len() && sum > self.leaves[last_count].weight {
			let tail = self.nodes[last].tail;
			let new = self.push(0, last_count + 1, tail);
			self.lists[index][1] = new;
		}
		else {
			self.nodes[last].tail = Some(self.lists[index - 1][1]);
		}
	}

	/// # Write Lengths.
	///
	/// Walk the final chain's tails, then hand out lengths to the leaves,
	/// heaviest first.
	fn write(&self, lengths: &mut [DeflateSym]) -> Result<(), ZopfliError> {
		let mut counts = [0_usize; 16];
		let mut end = 16_usize;
		let mut node = self.lists.last().map(|l| l[1]);
		while let Some(idx) = node {
			end = end.checked_sub(1).ok_or(zopfli_error!())?;
			counts[end] = self.nodes[idx].count;
			node = self.nodes[idx].tail;
		}
		if end == 0 { return Err(zopfli_error!()); }

		let mut val = counts[15];
		let mut value = 1;
		for ptr in (end..16).rev() {
			let length = DeflateSym::from_bits(value).ok_or(zopfli_error!())?;
			while val > counts[ptr - 1] {
				let leaf = self.leaves.get(val - 1).ok_or(zopfli_error!())?;
				lengths[leaf.symbol] = length;
				val -= 1;
			}
			value += 1;
		}

		Ok(())
	}
}



/// # Calculate Bit Lengths.
///
/// Populate `lengths` with optimal code lengths for `frequencies`, none of
/// which may exceed `maxbits`.
///
/// An error is returned if `maxbits` is too small to give every used symbol
/// a code.
fn bit_lengths(frequencies: &[u32], maxbits: usize, lengths: &mut [DeflateSym])
-> Result<(), ZopfliError> {
	if frequencies.len() != lengths.len() { return Err(zopfli_error!()); }
	lengths.fill(DeflateSym::D00);

	let mut leaves: Vec<Leaf> = frequencies.iter()
		.copied()
		.enumerate()
		.filter_map(|(symbol, weight)|
			if weight == 0 { None }
			else { Some(Leaf { weight: u64::from(weight), symbol }) }
		)
		.collect();

	if (1_usize << maxbits) < leaves.len() { return Err(zopfli_error!()); }

	// Package-merge needs at least three leaves; smaller sets are easy.
	if leaves.len() < 3 {
		for leaf in leaves { lengths[leaf.symbol] = DeflateSym::D01; }
		return Ok(());
	}

	// Lightest to heaviest; ties keep symbol order.
	leaves.sort_by_key(|l| l.weight);

	// Shrink the limit if we don't have that many leaves to begin with.
	let maxbits = usize::min(maxbits, leaves.len() - 1);

	// We want 2n - 2 active chains in the last list. Initialization gave us
	// two; each regular pass adds one more, and the final pass the last.
	let mut pm = PackageMerge::new(&leaves, maxbits);
	for _ in 0..2 * leaves.len() - 5 { pm.boundary_pm(maxbits - 1); }
	pm.boundary_pm_final(maxbits - 1);
	pm.write(lengths)
}

/// # Canonical Codes.
///
/// Assign consecutive codes to each (used) symbol in order, shortest lengths
/// first, per the DEFLATE canonical Huffman scheme.
fn canonical_codes(lengths: &[DeflateSym], maxbits: usize, symbols: &mut [u32]) {
	// Count the codes of each length.
	let mut bl_count = [0_u32; 16];
	for l in lengths.iter().copied() { bl_count[l as usize] += 1; }
	bl_count[0] = 0;

	// Find the first code for each length.
	let mut next_code = [0_u32; 16];
	let mut code = 0;
	for bits in 1..=maxbits {
		code = (code + bl_count[bits - 1]) << 1;
		next_code[bits] = code;
	}

	// And assign them.
	for (l, s) in lengths.iter().copied().zip(symbols.iter_mut()) {
		if ! l.is_zero() {
			*s = next_code[l as usize];
			next_code[l as usize] += 1;
		}
	}
}

/// # Patch Distance Codes.
///
/// Some ancient decoders (zlib 1.2.1 and earlier) choke when fewer than two
/// distance codes are in use, so pad the lengths as needed.
fn patch_distances(lengths: &mut [DeflateSym]) {
	let used = lengths.iter().take(30).filter(|l| ! l.is_zero()).count();
	if used == 0 {
		lengths[0] = DeflateSym::D01;
		lengths[1] = DeflateSym::D01;
	}
	else if used == 1 {
		if lengths[0].is_zero() { lengths[0] = DeflateSym::D01; }
		else { lengths[1] = DeflateSym::D01; }
	}
}
