/*!
# Woffli: Build Script.
*/

use std::{
	fmt,
	fs::File,
	io::Write,
	ops::Range,
	path::{
		Path,
		PathBuf,
	},
};

/// # Distance Extra Bits Value Masks.
const DISTANCE_EXTRA_BITS_MASK: [(u32, u32); 16] = [
	(0, 0), (0, 0), (5, 1), (9, 3), (17, 7), (33, 15), (65, 31), (129, 63),
	(257, 127), (513, 255), (1025, 511), (2049, 1023), (4097, 2047),
	(8193, 4095), (16_385, 8191), (32_769, 16_383),
];

/// # Distance Extra Bits (by Symbol).
const DISTANCE_BITS: [u8; 32] = [
	0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6,
	7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13, 13, 0, 0,
];

/// # Length Symbol Bases and Extra Bits.
///
/// These are the lengths at which each length symbol (`257..=285`) begins,
/// and the number of extra bits required to reach the next one.
const LENGTH_BASES: [(u16, u8); 29] = [
	(3, 0), (4, 0), (5, 0), (6, 0), (7, 0), (8, 0), (9, 0), (10, 0),
	(11, 1), (13, 1), (15, 1), (17, 1),
	(19, 2), (23, 2), (27, 2), (31, 2),
	(35, 3), (43, 3), (51, 3), (59, 3),
	(67, 4), (83, 4), (99, 4), (115, 4),
	(131, 5), (163, 5), (195, 5), (227, 5),
	(258, 0),
];

/// # Window Size.
const ZOPFLI_WINDOW_SIZE: u16 = 32_768;



/// # Build.
pub fn main() {
	println!("cargo:rerun-if-changed=build.rs");
	build_symbols();
}

/// # Build Symbols.
///
/// The compiler struggles with zopfli's litlen-distance-symbol-as-index
/// structures. Enums are a silly but simple way to help it better understand
/// the boundaries.
///
/// Plus they're easy to automate, like so:
fn build_symbols() {
	use std::fmt::Write;

	let mut out = format!(
		"{}{}{}{}",
		NumEnum::new(0..19_u8, "Extended Deflate Indices.", "DeflateSym")
			.with_debug()
			.with_eq(),
		NumEnum::new(0..32_u16, "Distance Symbols.", "Dsym").with_debug().with_eq(),
		NumEnum::new(0..259_u16, "Lit/Lengths.", "LitLen").with_debug().with_eq(),
		NumEnum::new(0..286_u16, "Lit/Length Symbols.", "Lsym").with_debug().with_eq(),
	);

	out.push_str(r"/// # Distance Symbols by Distance
///
/// This table is kinda terrible, but the performance gains (versus calculating
/// the symbols on-the-fly) are incredible, so whatever.
pub(crate) const DISTANCE_SYMBOLS: &[Dsym; 32_768] = &[");
	for i in 0..ZOPFLI_WINDOW_SIZE {
		let dsym =
			if i < 5 { i.saturating_sub(1) }
			else {
				let d_log = (i - 1).ilog2();
				let r = ((u32::from(i) - 1) >> (d_log - 1)) & 1;
				(d_log * 2 + r) as u16
			};

		if i % 128 == 0 { out.push('\n'); }
		write!(&mut out, "Dsym::D{dsym:02}, ").unwrap();
	}
	out.push_str("
];

/// # Distance Bit Values by Distance.
pub(crate) const DISTANCE_VALUES: &[u16; 32_768] = &[");
	for i in 0..ZOPFLI_WINDOW_SIZE {
		let dvalue =
			if i < 5 { 0 }
			else {
				let d_log = (i - 1).ilog2();
				let (m1, m2) = DISTANCE_EXTRA_BITS_MASK[d_log as usize];
				(u32::from(i) - m1) & m2
			};

		if i % 128 == 0 { out.push('\n'); }
		write!(&mut out, "{dvalue}, ").unwrap();
	}
	out.push_str("\n];\n\n");

	// Length symbols, bits, and values are all derived from the same base
	// table, so might as well crunch them together.
	let mut symbols = String::new();
	let mut values = [0_u8; 259];
	let mut bits = [0_u8; 259];
	for litlen in 0..259_u16 {
		let (sym, base, extra) =
			if litlen < 3 { (0, litlen, 0) }
			else {
				let idx = LENGTH_BASES.iter().rposition(|&(b, _)| b <= litlen).unwrap();
				let (base, extra) = LENGTH_BASES[idx];
				(257 + idx, base, extra)
			};

		if litlen % 16 == 0 { symbols.push_str("\n\t"); }
		write!(&mut symbols, "Lsym::L{sym:03}, ").unwrap();
		values[litlen as usize] = (litlen - base) as u8;
		bits[litlen as usize] = extra;
	}

	// The same extra bits, but indexed by symbol rather than litlen.
	let mut symbol_bits = [0_u8; 286];
	for (i, (_, extra)) in LENGTH_BASES.iter().enumerate() {
		symbol_bits[257 + i] = *extra;
	}

	write!(
		&mut out,
		"/// # Length Symbols by Litlen.
pub(crate) const LENGTH_SYMBOLS: [Lsym; 259] = [{symbols}
];

/// # Length Symbol Bit Values by Litlen.
pub(crate) const LENGTH_SYMBOL_BIT_VALUES: [u8; 259] = {values:?};

/// # Length Extra Bits (by Symbol).
pub(crate) const LENGTH_EXTRA_BITS: [u8; 286] = {symbol_bits:?};

",
	).unwrap();

	/// # Distance and length bits.
	///
	/// Generate integer and float constants for our bit arrays.
	fn bits_and_bobs<const N: usize>(title: &str, name: &str, arr: [u8; N]) -> String {
		format!(
			"/// # {title}.
pub(crate) const {name}: [u8; {N}] = {arr:?};

/// # {title} (Float).
///
/// This is identical to the `u8` version, but avoids a lot of `f64::from` calls.
pub(crate) const {name}_F: [f64; {N}] = {:?};

",
			arr.map(f64::from),
		)
	}

	out.push_str(&bits_and_bobs("Distance Bits (by Symbol)", "DISTANCE_BITS", DISTANCE_BITS));
	out.push_str(&bits_and_bobs("Length Bits (by Litlen)", "LENGTH_SYMBOL_BITS", bits));

	// Save it!
	write(&out_path("symbols.rs"), out.as_bytes());
}

/// # Output Path.
///
/// Append the sub-path to OUT_DIR and return it.
fn out_path(stub: &str) -> PathBuf {
	std::fs::canonicalize(std::env::var("OUT_DIR").expect("Missing OUT_DIR."))
		.expect("Missing OUT_DIR.")
		.join(stub)
}

/// # Write File.
fn write(path: &Path, data: &[u8]) {
	File::create(path).and_then(|mut f| f.write_all(data).and_then(|()| f.flush()))
		.expect("Unable to write file.");
}



/// # Number Enum.
///
/// We have a lot of custom numeric types that cover a range of numbers; this
/// struct ensures we generate their code consistently.
///
/// Each enum also gets an `ALL` constant listing every variant in order, so
/// numbers can be converted back to variants by plain (safe) indexing.
struct NumEnum<T: Copy + fmt::Display>
where Range<T>: ExactSizeIterator<Item=T> {
	rng: Range<T>,
	title: &'static str,
	name: &'static str,
	flags: u8,
}

impl<T: Copy + fmt::Display> NumEnum<T>
where Range<T>: ExactSizeIterator<Item=T> {
	const DERIVE_DEBUG: u8 = 0b0000_0001;
	const DERIVE_EQ: u8 =    0b0000_0010;

	/// # New Instance.
	const fn new(rng: Range<T>, title: &'static str, name: &'static str) -> Self {
		Self { rng, title, name, flags: 0 }
	}

	/// # With Derive `Debug`.
	const fn with_debug(self) -> Self {
		Self {
			flags: self.flags | Self::DERIVE_DEBUG,
			..self
		}
	}

	/// # With Derive `Eq`/`PartialEq`.
	const fn with_eq(self) -> Self {
		Self {
			flags: self.flags | Self::DERIVE_EQ,
			..self
		}
	}
}

impl<T: Copy + fmt::Display> fmt::Display for NumEnum<T>
where Range<T>: ExactSizeIterator<Item=T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// Allow dead code.
		writeln!(f, "#[allow(dead_code)]")?;

		// Representation.
		let kind = std::any::type_name::<T>();
		writeln!(f, "#[repr({kind})]")?;

		// Derives.
		write!(f, "#[derive(Clone, Copy")?;
		if Self::DERIVE_DEBUG == self.flags & Self::DERIVE_DEBUG { write!(f, ", Debug")?; }
		if Self::DERIVE_EQ == self.flags & Self::DERIVE_EQ { write!(f, ", Eq, PartialEq")?; }
		writeln!(f, ")]")?;

		// Title.
		writeln!(f, "/// # {}", self.title)?;

		// Opening.
		writeln!(f, "pub(crate) enum {} {{", self.name)?;

		// Arms.
		let width: usize = self.rng.end.to_string().len();
		let prefix: String = self.name[..1].to_ascii_uppercase();
		for i in self.rng.clone() {
			writeln!(f, "\t{prefix}{i:0width$} = {i}_{kind},", width=width)?;
		}

		// Closing.
		writeln!(f, "}}\n")?;

		// Variant list.
		writeln!(f, "impl {} {{", self.name)?;
		writeln!(f, "\t/// # All Variants.")?;
		writeln!(f, "\tpub(crate) const ALL: [Self; {}] = [", self.rng.len())?;
		for i in self.rng.clone() {
			writeln!(f, "\t\tSelf::{prefix}{i:0width$},", width=width)?;
		}
		writeln!(f, "\t];\n}}\n")
	}
}
