//! HTTP header block parsing and body framing selection.
//!
//! The header block is parsed as a whole with `httparse`: `key: value` lines
//! terminated by an empty line. Nothing is committed until the terminating empty
//! line has been seen, so a block split across several reads is simply parsed again
//! from its first line once more bytes arrived.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - The whole request line plus header block must fit in the input buffer

use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderName, HeaderValue};
use httparse::{EMPTY_HEADER, Error, Status};

use crate::protocol::{Headers, ParseError, PayloadSize};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Parses the header block at the start of `src`.
///
/// Header names are case-insensitive, a repeated name keeps the value of its last
/// occurrence whatever the case it was written in.
///
/// # Returns
///
/// - `Ok(Some((headers, consumed)))` once the empty line closing the block was read
/// - `Ok(None)` if more data is needed
/// - `Err(ParseError)` if a line is not a `key: value` pair or there are too many headers
pub(crate) fn parse_headers(src: &[u8]) -> Result<Option<(Headers, usize)>, ParseError> {
    let mut raw_headers = [EMPTY_HEADER; MAX_HEADER_NUM];

    let (consumed, raw_headers) = match httparse::parse_headers(src, &mut raw_headers).map_err(|e| match e {
        Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
        e => ParseError::invalid_header(e.to_string()),
    })? {
        Status::Complete(parsed) => parsed,
        Status::Partial => return Ok(None),
    };

    let mut headers = Headers::with_capacity(raw_headers.len());
    for header in raw_headers {
        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
        let value = HeaderValue::from_bytes(header.value.trim_ascii()).map_err(ParseError::invalid_header)?;
        headers.insert(name, value);
    }

    Ok(Some((headers, consumed)))
}

/// Determines the body framing of a request from its headers.
///
/// `Content-Length` takes precedence; otherwise a `Transfer-Encoding` whose last
/// coding is `chunked` selects chunked decoding; otherwise the request has no body.
///
/// # Errors
///
/// Returns `ParseError` if the `Content-Length` value is not an unsigned integer.
pub(crate) fn parse_payload(headers: &Headers) -> Result<PayloadSize, ParseError> {
    if let Some(cl_value) = headers.get(CONTENT_LENGTH) {
        let length = cl_value
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .ok_or_else(|| ParseError::invalid_content_length(format!("value {cl_value:?} is not u64")))?;
        return Ok(PayloadSize::Length(length));
    }

    if is_chunked(headers.get(TRANSFER_ENCODING).and_then(|value| value.to_str().ok())) {
        return Ok(PayloadSize::Chunked);
    }

    Ok(PayloadSize::Empty)
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 7230, chunked must be the last encoding if present.
fn is_chunked(header_value: Option<&str>) -> bool {
    const CHUNKED: &str = "chunked";
    header_value
        .and_then(|value| value.rsplit(',').next())
        .is_some_and(|last| last.trim().eq_ignore_ascii_case(CHUNKED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn headers_of(pairs: &[(&'static str, &'static str)]) -> Headers {
        pairs
            .iter()
            .map(|(k, v)| (HeaderName::from_bytes(k.as_bytes()).unwrap(), HeaderValue::from_static(v)))
            .collect()
    }

    #[test]
    fn check_is_chunked() {
        assert!(!is_chunked(None));
        assert!(is_chunked(Some("chunked")));
        assert!(is_chunked(Some("gzip, chunked")));
        assert!(!is_chunked(Some("chunked, gzip")));
        assert!(!is_chunked(Some("gzip")));
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        123"##};

        let (headers, consumed) = parse_headers(str.as_bytes()).unwrap().unwrap();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers["Host"], "127.0.0.1:8080");
        assert_eq!(headers["User-Agent"], "curl/7.79.1");
        assert_eq!(headers["Accept"], "*/*");
        assert_eq!(&str.as_bytes()[consumed..], b"123");
    }

    #[test]
    fn value_whitespace_is_trimmed() {
        let (headers, _) = parse_headers(b"Keep-Alive:   timeout=5, max=1000  \r\nX-Empty:\r\n\r\n").unwrap().unwrap();
        assert_eq!(headers["Keep-Alive"], "timeout=5, max=1000");
        assert_eq!(headers["X-Empty"], "");
    }

    #[test]
    fn duplicate_header_last_wins() {
        let (headers, _) = parse_headers(b"Accept: a\r\nAccept: b\r\n\r\n").unwrap().unwrap();
        assert_eq!(headers["Accept"], "b");
    }

    #[test]
    fn duplicate_header_last_wins_ignoring_case() {
        let (headers, _) = parse_headers(b"content-length: 1\r\nContent-Length: 4\r\nCONTENT-LENGTH: 2\r\n\r\n").unwrap().unwrap();

        assert_eq!(headers.len(), 1);
        assert_eq!(headers["content-length"], "2");
        assert_eq!(parse_payload(&headers).unwrap(), PayloadSize::Length(2));
    }

    #[test]
    fn bare_lf_lines() {
        let (headers, consumed) = parse_headers(b"Accept: a\n\nrest").unwrap().unwrap();
        assert_eq!(headers["Accept"], "a");
        assert_eq!(consumed, 11);
    }

    #[test]
    fn incomplete_block() {
        assert!(parse_headers(b"").unwrap().is_none());
        assert!(parse_headers(b"Conte").unwrap().is_none());
        assert!(parse_headers(b"Content-Length: 13\r\n").unwrap().is_none());
        assert!(parse_headers(b"Content-Length: 13\r\n\r").unwrap().is_none());
    }

    #[test]
    fn invalid_lines() {
        assert!(matches!(parse_headers(b"no colon here\r\n\r\n"), Err(ParseError::InvalidHeader { .. })));
        assert!(matches!(parse_headers(b": value\r\n\r\n"), Err(ParseError::InvalidHeader { .. })));
    }

    #[test]
    fn too_many_headers() {
        let block: String = (0..=MAX_HEADER_NUM).map(|i| format!("X-{i}: v\r\n")).collect::<String>() + "\r\n";
        assert!(matches!(parse_headers(block.as_bytes()), Err(ParseError::TooManyHeaders { .. })));
    }

    #[test]
    fn payload_framing() {
        assert_eq!(parse_payload(&headers_of(&[])).unwrap(), PayloadSize::Empty);
        assert_eq!(parse_payload(&headers_of(&[("content-length", " 13 ")])).unwrap(), PayloadSize::Length(13));
        assert_eq!(parse_payload(&headers_of(&[("Transfer-Encoding", "chunked")])).unwrap(), PayloadSize::Chunked);
        assert_eq!(
            parse_payload(&headers_of(&[("Content-Length", "4"), ("Transfer-Encoding", "chunked")])).unwrap(),
            PayloadSize::Length(4)
        );
        assert!(matches!(
            parse_payload(&headers_of(&[("Content-Length", "abc")])),
            Err(ParseError::InvalidContentLength { .. })
        ));
    }
}
