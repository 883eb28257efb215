//! Decoder implementation for HTTP messages with Content-Length header.
//!
//! This module provides functionality to decode HTTP messages where the payload size
//! is specified by the Content-Length header, as defined in
//! [RFC 7230 Section 3.3.2](https://tools.ietf.org/html/rfc7230#section-3.3.2).

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::codec::header::CRLF;
use crate::protocol::ParseError;

/// A decoder for handling HTTP messages with a known content length.
///
/// The whole body must be present in the buffer: it is split off as a single
/// zero-copy [`Bytes`] view instead of being streamed in pieces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// The number of bytes of the body
    length: usize,
}

impl LengthDecoder {
    /// Creates a new LengthDecoder instance.
    ///
    /// # Arguments
    /// * `length` - The total content length to decode, specified by Content-Length header
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Decoder for LengthDecoder {
    type Item = Bytes;
    type Error = ParseError;

    /// Splits the body off the input buffer.
    ///
    /// A CRLF directly following the body is consumed as well, it is never part of
    /// the body.
    ///
    /// # Returns
    /// * `Ok(Some(bytes))` with exactly `length` bytes once they are all available
    /// * `Ok(None)` when more data is needed, the buffer is left untouched
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < self.length {
            return Ok(None);
        }

        let body = src.split_to(self.length).freeze();
        if src.starts_with(CRLF) {
            src.advance(CRLF.len());
        }
        Ok(Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let mut buffer: BytesMut = BytesMut::from(&b"101234567890abcdef\r\n\r\n"[..]);

        let mut length_decoder = LengthDecoder::new(10);
        let bytes = length_decoder.decode(&mut buffer).unwrap().unwrap();

        assert_eq!(bytes.len(), 10);
        assert_eq!(&bytes[..], b"1012345678");
        assert_eq!(&buffer[..], b"90abcdef\r\n\r\n");
    }

    #[test]
    fn trailing_crlf_is_skipped() {
        let mut buffer = BytesMut::from(&b"Hello, world!\r\nGET"[..]);

        let bytes = LengthDecoder::new(13).decode(&mut buffer).unwrap().unwrap();

        assert_eq!(&bytes[..], b"Hello, world!");
        assert_eq!(&buffer[..], b"GET");
    }

    #[test]
    fn waits_for_whole_body() {
        let mut buffer = BytesMut::from(&b"Hello"[..]);

        assert!(LengthDecoder::new(13).decode(&mut buffer).unwrap().is_none());
        assert_eq!(&buffer[..], b"Hello");
    }

    #[test]
    fn empty_body() {
        let mut buffer = BytesMut::new();

        let bytes = LengthDecoder::new(0).decode(&mut buffer).unwrap().unwrap();

        assert!(bytes.is_empty());
    }
}
