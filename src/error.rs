/*!
# Woffli: Errors
*/

use std::{
	error::Error,
	fmt,
};



#[derive(Debug, Copy, Clone, Eq, PartialEq)]
/// # Error type.
pub enum WoffliError {
	/// # Verification Failed.
	///
	/// The compressed stream did not inflate back to the original bytes.
	Verify,

	/// # Internal Sanity Failure.
	Zopfli(ZopfliError),
}

impl AsRef<str> for WoffliError {
	#[inline]
	fn as_ref(&self) -> &str { self.as_str() }
}

impl Error for WoffliError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::Verify => None,
			Self::Zopfli(e) => Some(e),
		}
	}
}

impl fmt::Display for WoffliError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Verify => f.write_str(self.as_str()),
			Self::Zopfli(e) => <ZopfliError as fmt::Display>::fmt(e, f),
		}
	}
}

impl From<ZopfliError> for WoffliError {
	#[inline]
	fn from(err: ZopfliError) -> Self { Self::Zopfli(err) }
}

impl WoffliError {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Verify => "The compressed stream did not inflate to the original data.",
			Self::Zopfli(_) => "An internal compression sanity check failed.",
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Zopfli Error.
///
/// This is raised when one of the many internal invariants of the LZ77 or
/// Huffman machinery fails to hold. It should never happen in practice, and
/// any compression attempt that raises it is abandoned wholesale.
///
/// Debug builds record the file and line of the failed check; release builds
/// carry no payload at all. Either way, construction goes through the
/// crate-private `zopfli_error!` macro.
pub struct ZopfliError {
	#[cfg(debug_assertions)] file: &'static str,
	#[cfg(debug_assertions)] line: u32,
}

#[cfg(debug_assertions)]
impl ZopfliError {
	/// # New Error.
	pub(crate) const fn new(file: &'static str, line: u32) -> Self {
		Self { file, line }
	}
}

impl Error for ZopfliError {}

impl fmt::Display for ZopfliError {
	#[cfg(debug_assertions)]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Zopfli sanity check failed at {}:{}.", self.file, self.line)
	}

	#[cfg(not(debug_assertions))]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Zopfli sanity check failed.")
	}
}



#[cfg(debug_assertions)]
/// # Error Macro.
macro_rules! zopfli_error {
	() => ($crate::ZopfliError::new(file!(), line!()));
}

#[cfg(not(debug_assertions))]
/// # Error Macro.
macro_rules! zopfli_error {
	() => ($crate::ZopfliError {});
}

pub(crate) use zopfli_error;



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_error_source() {
		let err = WoffliError::from(zopfli_error!());
		assert!(matches!(err, WoffliError::Zopfli(_)));
		assert!(err.source().is_some());
		assert!(err.to_string().starts_with("Zopfli sanity check failed"));

		let err = WoffliError::Verify;
		assert!(err.source().is_none());
		assert_eq!(err.to_string(), err.as_str());
	}
}
