//! Request line parsing: `METHOD target PROTOCOL\r\n`.
//!
//! The parser is a pure function over the unread bytes. It never consumes
//! anything itself; on success it reports how many bytes the line occupied so
//! the caller can commit them, on `Ok(None)` the caller keeps the bytes and
//! retries once more data arrived.

use http::Version;

use crate::ensure;
use crate::protocol::{Method, Parameters, ParseError, RequestLine};
use crate::utils::{find_lf, trim_cr};

/// Parses the request line at the start of `src`.
///
/// Empty lines preceding the request line are skipped, so a stray CRLF left
/// after a previous body does not break the next request.
///
/// # Returns
///
/// - `Ok(Some((line, consumed)))` when a full line was parsed
/// - `Ok(None)` when the line is not complete yet
/// - `Err(ParseError)` when the bytes can never form a valid request line
pub(crate) fn parse_request_line(src: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let start = src.iter().position(|b| *b != b'\r' && *b != b'\n').unwrap_or(src.len());
    let rest = &src[start..];

    let Some(line_end) = find_lf(rest, 0) else {
        // fail fast on an unknown method instead of waiting for the end of line
        let token_end = rest.iter().position(|b| *b == b' ').unwrap_or(rest.len());
        let token = &rest[..token_end];
        if token_end < rest.len() {
            ensure!(Method::from_bytes(token).is_some(), ParseError::InvalidMethod);
        } else {
            ensure!(Method::is_prefix(token), ParseError::InvalidMethod);
        }
        return Ok(None);
    };

    let line = trim_cr(&rest[..line_end]);
    let mut parts = line.splitn(3, |b| *b == b' ');

    let method = parts.next().and_then(Method::from_bytes).ok_or(ParseError::InvalidMethod)?;
    let target = parts.next().filter(|target| is_request_target(target)).ok_or(ParseError::InvalidUri)?;
    let version = parse_version(parts.next().unwrap_or_default())?;

    let (path, parameters) = parse_target(target)?;

    Ok(Some((RequestLine { method, path, parameters, version }, start + line_end + 1)))
}

fn is_request_target(target: &[u8]) -> bool {
    matches!(target.first(), Some(b'/' | b'*')) || target.windows(3).any(|w| w == b"://")
}

fn parse_version(protocol: &[u8]) -> Result<Version, ParseError> {
    let protocol = protocol.trim_ascii();
    if protocol.starts_with(b"HTTP/1.1") {
        Ok(Version::HTTP_11)
    } else if protocol.starts_with(b"HTTP/1.0") {
        Ok(Version::HTTP_10)
    } else if protocol.starts_with(b"HTTP/2") {
        Ok(Version::HTTP_2)
    } else {
        Err(ParseError::invalid_version(protocol))
    }
}

/// Splits the request target into its path and query parameters.
///
/// Parameters are `&` separated `key=value` pairs. A key without `=` gets an empty
/// value, empty segments such as a trailing `&` are skipped, and a repeated key
/// collects every value in encounter order.
fn parse_target(target: &[u8]) -> Result<(String, Parameters), ParseError> {
    let target = std::str::from_utf8(target).map_err(|_e| ParseError::InvalidUri)?;

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    let mut parameters = Parameters::new();
    for pair in query.into_iter().flat_map(|query| query.split('&')).filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        parameters.entry(key.to_string()).or_default().push(value.to_string());
    }

    Ok((path.to_string(), parameters))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> (RequestLine, usize) {
        parse_request_line(src.as_bytes()).unwrap().unwrap()
    }

    #[test]
    fn simple_line() {
        let (line, consumed) = parse("GET /test HTTP/1.1\r\nHost: a\r\n");
        assert_eq!(line.method, Method::Get);
        assert_eq!(line.path, "/test");
        assert!(line.parameters.is_empty());
        assert_eq!(line.version, Version::HTTP_11);
        assert_eq!(consumed, "GET /test HTTP/1.1\r\n".len());
    }

    #[test]
    fn parameters_accumulate() {
        let (line, _) = parse("GET /index/?a=1&b=2&a=3 HTTP/1.0\r\n");
        assert_eq!(line.path, "/index/");
        assert_eq!(line.parameters["a"], vec!["1", "3"]);
        assert_eq!(line.parameters["b"], vec!["2"]);
        assert_eq!(line.version, Version::HTTP_10);
    }

    #[test]
    fn parameter_without_value() {
        let (line, _) = parse("GET /search?flag&q=&&x=1& HTTP/1.1\r\n");
        assert_eq!(line.parameters["flag"], vec![""]);
        assert_eq!(line.parameters["q"], vec![""]);
        assert_eq!(line.parameters["x"], vec!["1"]);
        assert_eq!(line.parameters.len(), 3);
    }

    #[test]
    fn leading_empty_lines_are_skipped() {
        let (line, consumed) = parse("\r\n\r\nDELETE /item HTTP/1.1\r\n");
        assert_eq!(line.method, Method::Delete);
        assert_eq!(consumed, "\r\n\r\nDELETE /item HTTP/1.1\r\n".len());
    }

    #[test]
    fn trailing_garbage_after_protocol() {
        let (line, _) = parse("POST /test?foo=bar HTTP/1.1=\r\n");
        assert_eq!(line.version, Version::HTTP_11);
        assert_eq!(line.parameters["foo"], vec!["bar"]);
    }

    #[test]
    fn http2_placeholder() {
        let (line, _) = parse("OPTIONS * HTTP/2.0\r\n");
        assert_eq!(line.version, Version::HTTP_2);
        assert_eq!(line.path, "*");
    }

    #[test]
    fn incomplete_line() {
        assert!(parse_request_line(b"").unwrap().is_none());
        assert!(parse_request_line(b"PO").unwrap().is_none());
        assert!(parse_request_line(b"POST /test?f").unwrap().is_none());
        assert!(parse_request_line(b"GET HTTP/1.1").unwrap().is_none());
    }

    #[test]
    fn unknown_method_fails_early() {
        assert!(matches!(parse_request_line(b"X"), Err(ParseError::InvalidMethod)));
        assert!(matches!(parse_request_line(b"GETS /"), Err(ParseError::InvalidMethod)));
        assert!(matches!(parse_request_line(b"CONNECT a:443 HTTP/1.1\r\n"), Err(ParseError::InvalidMethod)));
    }

    #[test]
    fn missing_path() {
        assert!(matches!(parse_request_line(b"GET HTTP/1.1\r\n\r\n"), Err(ParseError::InvalidUri)));
    }

    #[test]
    fn invalid_protocol() {
        assert!(matches!(parse_request_line(b"GET / FTP/1.1\r\n"), Err(ParseError::InvalidVersion(_))));
        assert!(matches!(parse_request_line(b"GET /\r\n"), Err(ParseError::InvalidVersion(_))));
    }
}
