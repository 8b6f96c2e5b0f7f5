/*!
# Woffli: Zlib Container.
*/

use dactyl::NiceU64;
use flate2::{
	Decompress,
	FlushDecompress,
	Status,
};
use fyi_msg::Msg;
use crate::{
	deflate::deflate_into,
	WoffliError,
	ZopfliOptions,
	ZopfliOut,
};



/// # Zlib Header.
///
/// CM 8 (deflate), CINFO 7 (32K window), FLEVEL 3 (maximum compression), and
/// check bits making the pair a multiple of 31.
const ZLIB_HEADER: [u8; 2] = [0x78, 0xDA];



/// # Zlib Encode.
///
/// Compress `src` and wrap the result in a zlib container: the two-byte
/// header, the raw DEFLATE stream, and the big-endian Adler-32 checksum of
/// the uncompressed data.
///
/// If verification is enabled, the stream is inflated and compared against
/// the source before being returned.
pub(crate) fn encode(src: &[u8], options: ZopfliOptions) -> Result<Vec<u8>, WoffliError> {
	let mut out = ZopfliOut::with_prefix(&ZLIB_HEADER, src.len());
	deflate_into(src, options, &mut out)?;
	out.append_data(&simd_adler32::adler32(&src).to_be_bytes());
	let out = out.into_inner();

	if options.verify() { verify(src, &out, true)?; }
	if options.verbose() { summarize(src.len(), out.len()); }

	Ok(out)
}

/// # Verify.
///
/// Inflate `stream` (zlib-wrapped or raw) and make sure it matches `src`
/// exactly.
pub(crate) fn verify(src: &[u8], stream: &[u8], zlib: bool) -> Result<(), WoffliError> {
	let mut inflated = Vec::with_capacity(src.len() + 1);
	let mut dec = Decompress::new(zlib);
	match dec.decompress_vec(stream, &mut inflated, FlushDecompress::Finish) {
		Ok(Status::StreamEnd) if inflated == src => Ok(()),
		_ => Err(WoffliError::Verify),
	}
}

#[cold]
#[expect(clippy::cast_precision_loss, reason = "Precision is not critical.")]
/// # Summarize.
///
/// Print the before and after sizes, and the percentage saved.
fn summarize(before: usize, after: usize) {
	let saved =
		if before == 0 { 0.0 }
		else { (before as f64 - after as f64) / before as f64 * 100.0 };

	Msg::custom("Woffli", 199, &format!(
		"{} \x1b[2m→\x1b[0m {} bytes \x1b[2m({saved:.2}% removed)\x1b[0m",
		NiceU64::from(before as u64).as_str(),
		NiceU64::from(after as u64).as_str(),
	))
		.with_newline(true)
		.eprint();
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_verify() {
		let src = b"Hello hello hello hello.";
		let stream = encode(src, ZopfliOptions::new().with_verify(false))
			.expect("Encode failed.");

		assert_eq!(stream[..2], ZLIB_HEADER);
		assert!(verify(src, &stream, true).is_ok());

		// Missing the header.
		assert_eq!(verify(src, &stream[2..], true), Err(WoffliError::Verify));

		// Raw is fine if we skip the container.
		assert!(verify(src, &stream[2..stream.len() - 4], false).is_ok());

		// Wrong source.
		assert_eq!(verify(b"Hello.", &stream, true), Err(WoffliError::Verify));

		// Broken checksum.
		let mut broken = stream.clone();
		if let Some(last) = broken.last_mut() { *last ^= 1; }
		assert_eq!(verify(src, &broken, true), Err(WoffliError::Verify));

		// Truncated.
		assert_eq!(verify(src, &stream[..stream.len() - 1], true), Err(WoffliError::Verify));
	}

	#[test]
	fn t_trailer() {
		let src = b"abcabcabcabcabcabcabcabcabcabcabcabc";
		let stream = encode(src, ZopfliOptions::new()).expect("Encode failed.");
		let trailer = &stream[stream.len() - 4..];
		assert_eq!(trailer, simd_adler32::adler32(&src.as_slice()).to_be_bytes());

		// The header should pass the zlib check.
		assert_eq!(u16::from_be_bytes(ZLIB_HEADER) % 31, 0);
	}
}
