/*!
# Woffli

Woffli is a Zopfli-grade zlib compressor tuned for the table data of WOFF
fonts.

WOFF tables are stored either verbatim or as a zlib stream, whichever is
smaller, so every byte shaved off matters and the extra compression time is
paid once, at build time. Woffli trades a great deal of CPU for the smallest
DEFLATE streams it can find: iterated, cost-driven LZ77 parsing, block
splitting, and exhaustive block-type and tree-encoding selection.

The output is a standard zlib stream, readable by any inflater.

## Examples

```
let table = b"glyf glyf glyf glyf glyf glyf glyf glyf glyf glyf glyf glyf";
let packed = woffli::compress(table).expect("Should be smaller.");
assert!(packed.len() < table.len());
```
*/

#![deny(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]

mod deflate;
mod error;
mod options;
mod zlib;
mod zopfli;

pub use error::{
	WoffliError,
	ZopfliError,
};
pub use options::ZopfliOptions;
use deflate::ZopfliOut;
use error::zopfli_error;



#[must_use]
/// # Compress (If Smaller).
///
/// Compress `src` using the default options, returning the zlib stream only
/// if it is really smaller than the original. (WOFF table lengths are padded
/// to four bytes, so savings of less than that don't count.)
///
/// ## Panics
///
/// Debug builds panic if compression fails an internal sanity check or the
/// output does not inflate back to `src`. Release builds simply return `None`
/// in such cases, keeping the original.
pub fn compress(src: &[u8]) -> Option<Vec<u8>> {
	match compress_with(src, &ZopfliOptions::new()) {
		Ok(out) => out,
		#[cfg(debug_assertions)]
		Err(e) => panic!("{e}"),
		#[cfg(not(debug_assertions))]
		Err(_) => None,
	}
}

/// # Compress (If Smaller) With Options.
///
/// Same as `compress`, but with explicit options and error reporting.
///
/// ## Errors
///
/// This will return an error if an internal sanity check fails or the
/// verification pass (if enabled) does not reproduce `src`.
pub fn compress_with(src: &[u8], options: &ZopfliOptions)
-> Result<Option<Vec<u8>>, WoffliError> {
	let out = zlib::encode(src, *options)?;
	if is_really_smaller(out.len(), src.len()) { Ok(Some(out)) }
	else { Ok(None) }
}

/// # Zlib.
///
/// Compress `src` as a zlib stream, regardless of whether or not it winds up
/// smaller.
///
/// ## Errors
///
/// This will return an error if an internal sanity check fails or the
/// verification pass (if enabled) does not reproduce `src`.
pub fn zlib(src: &[u8], options: &ZopfliOptions) -> Result<Vec<u8>, WoffliError> {
	zlib::encode(src, *options)
}

/// # Deflate.
///
/// Compress `src` as a raw DEFLATE stream, without the zlib header or
/// checksum.
///
/// ## Errors
///
/// This will return an error if an internal sanity check fails or the
/// verification pass (if enabled) does not reproduce `src`.
pub fn deflate(src: &[u8], options: &ZopfliOptions) -> Result<Vec<u8>, WoffliError> {
	let mut out = ZopfliOut::default();
	deflate::deflate_into(src, *options, &mut out)?;
	let out = out.into_inner();
	if options.verify() { zlib::verify(src, &out, false)?; }
	Ok(out)
}

#[must_use]
/// # Really Smaller?
///
/// WOFF pads each table to a four-byte boundary, so a compressed table only
/// saves space if its padded length is smaller than the original's. This
/// returns `true` if `compressed` beats `original` by that measure.
///
/// ## Examples
///
/// ```
/// assert!(woffli::is_really_smaller(4, 5));
/// assert!(! woffli::is_really_smaller(5, 8));
/// ```
pub const fn is_really_smaller(compressed: usize, original: usize) -> bool {
	compressed.div_ceil(4) < original.div_ceil(4)
}



#[cfg(test)]
mod test {
	use super::*;
	use flate2::read::ZlibDecoder;
	use std::{
		io::Read,
		num::NonZeroU32,
	};

	/// # Inflate.
	fn inflate(src: &[u8]) -> Vec<u8> {
		let mut out = Vec::new();
		ZlibDecoder::new(src).read_to_end(&mut out).expect("Inflate failed.");
		out
	}

	/// # Noise.
	fn noise(len: usize, mut seed: u32) -> Vec<u8> {
		(0..len).map(|_| {
			seed ^= seed << 13;
			seed ^= seed >> 17;
			seed ^= seed << 5;
			seed.to_le_bytes()[0]
		}).collect()
	}

	#[test]
	fn t_is_really_smaller() {
		for (a, b, expected) in [
			(0, 0, false),
			(0, 1, true),
			(4, 5, true),
			(5, 8, false),
			(7, 8, false),
			(8, 8, false),
			(8, 9, true),
			(usize::MAX - 4, usize::MAX, true),
		] {
			assert_eq!(is_really_smaller(a, b), expected, "{a} vs {b}");
		}
	}

	#[test]
	fn t_empty() {
		let out = zlib(&[], &ZopfliOptions::new()).expect("Zlib failed.");
		assert_eq!(out, [0x78, 0xDA, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
		assert!(inflate(&out).is_empty());

		assert_eq!(deflate(&[], &ZopfliOptions::new()), Ok(vec![0x03, 0x00]));
		assert!(compress(&[]).is_none());
	}

	#[test]
	fn t_single() {
		let out = zlib(b"A", &ZopfliOptions::new()).expect("Zlib failed.");
		assert_eq!(inflate(&out), b"A");
		assert!(compress(b"A").is_none());
	}

	#[test]
	fn t_random() {
		// Noise doesn't compress.
		let src = noise(10, 0xDEAD_BEEF);
		assert!(compress(&src).is_none());

		// But it should still round-trip.
		let src = noise(5000, 0xC0FF_EE00);
		assert_eq!(compress_with(&src, &ZopfliOptions::new()), Ok(None));
		let out = zlib(&src, &ZopfliOptions::new()).expect("Zlib failed.");
		assert_eq!(inflate(&out), src);
	}

	#[test]
	fn t_run() {
		// One literal and one long match; the whole thing should be tiny.
		let src = [b'a'; 259];
		let out = compress(&src).expect("Compression failed.");
		assert!(out.len() < 16);
		assert_eq!(inflate(&out), src);
	}

	#[test]
	fn t_repetitive() {
		let mut src = Vec::new();
		for i in 0..400_u32 {
			src.extend_from_slice(b"<hmtx advance=\"");
			src.extend_from_slice(i.to_string().as_bytes());
			src.extend_from_slice(b"\" lsb=\"0\"/>\n");
		}

		let out = compress(&src).expect("Compression failed.");
		assert!(out.len() * 4 < src.len());
		assert_eq!(inflate(&out), src);

		// Same again, for determinism.
		assert_eq!(compress(&src), Some(out.clone()));

		// Raw should be the same minus the container.
		let raw = deflate(&src, &ZopfliOptions::new()).expect("Deflate failed.");
		assert_eq!(raw, out[2..out.len() - 4]);

		// Other option combinations should work too.
		for opts in [
			ZopfliOptions::new().with_block_splitting(false),
			ZopfliOptions::new().with_max_blocks(0),
			ZopfliOptions::new().with_iterations(NonZeroU32::new(1)),
			ZopfliOptions::new().with_verify(false),
		] {
			let out = zlib(&src, &opts).expect("Zlib failed.");
			assert_eq!(inflate(&out), src);
		}
	}

	#[test]
	fn t_large() {
		// Two very different halves, well over 100K all told.
		let mut src = Vec::with_capacity(140_000);
		let mut i = 0_u32;
		while src.len() < 70_000 {
			src.extend_from_slice(b"The quick brown fox jumps over the lazy dog #");
			src.extend_from_slice(i.to_string().as_bytes());
			src.extend_from_slice(b".\n");
			i += 1;
		}
		while src.len() < 140_000 {
			src.extend_from_slice(format!("0x{:08X}, ", i.wrapping_mul(2_654_435_761)).as_bytes());
			i += 1;
		}

		let opts = ZopfliOptions::new().with_iterations(NonZeroU32::new(2));
		let out = zlib(&src, &opts).expect("Zlib failed.");
		assert_eq!(inflate(&out), src);

		// The first block's final bit should be unset.
		assert_eq!(out[2] & 1, 0, "Expected multiple blocks.");

		// Unless splitting is disabled and it all fits in one.
		let opts = opts.with_block_splitting(false);
		let out = zlib(&src, &opts).expect("Zlib failed.");
		assert_eq!(out[2] & 1, 1, "Expected one block.");
		assert_eq!(inflate(&out), src);
	}
}
