//! Utility macros and functions for the HTTP crate.
//!
//! This module provides helper macros and functions that are used internally
//! by the HTTP crate implementation.

/// A macro for early returns with an error if a condition is not met.
///
/// This is similar to the `assert!` macro, but returns an error instead of panicking.
/// It's useful for validation checks where you want to return early with an error
/// if some condition is not satisfied.
///
/// # Arguments
///
/// * `$predicate` - A boolean expression that should evaluate to true
/// * `$error` - The error value to return if the predicate is false
///
/// # Example
///
/// ```ignore
/// ensure!(headers.len() < MAX_HEADERS, ParseError::too_many_headers(MAX_HEADERS));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Returns the index of the first `\n` at or after `from`.
#[inline]
pub(crate) fn find_lf(src: &[u8], from: usize) -> Option<usize> {
    src.get(from..)?.iter().position(|b| *b == b'\n').map(|index| from + index)
}

/// Strips one trailing `\r` from a line.
#[inline]
pub(crate) fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_lf_from_offset() {
        let src = b"ab\ncd\n";
        assert_eq!(find_lf(src, 0), Some(2));
        assert_eq!(find_lf(src, 3), Some(5));
        assert_eq!(find_lf(src, 6), None);
        assert_eq!(find_lf(src, 10), None);
    }

    #[test]
    fn trim_single_cr() {
        assert_eq!(trim_cr(b"abc\r"), b"abc");
        assert_eq!(trim_cr(b"abc"), b"abc");
        assert_eq!(trim_cr(b"\r\r"), b"\r");
    }
}
