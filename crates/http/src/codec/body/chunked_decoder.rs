//! Decoder implementation for HTTP chunked transfer encoding.
//!
//! This module provides functionality to decode HTTP messages that use chunked transfer encoding
//! as specified in [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).
//!
//! Chunk sizes are hexadecimal, as HTTP defines them. Every chunk must fit in the
//! input buffer because it is handed out as a single zero-copy view.

use bytes::{Buf, BytesMut};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::header::CRLF;
use crate::ensure;
use crate::protocol::{ParseError, PayloadItem};
use crate::utils::{find_lf, trim_cr};

/// A decoder for handling HTTP chunked transfer encoding.
///
/// The decoder processes incoming bytes according to the chunked format:
/// - Each chunk starts with its size in hexadecimal
/// - Followed by optional extensions and CRLF
/// - Then the chunk data and CRLF
/// - A zero-sized chunk, optional trailer fields and an empty line end the body
///
/// Each step either completes and commits its bytes, or leaves the buffer exactly
/// as it was so that the same step is retried once more bytes arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    max_chunk_size: usize,
}

impl ChunkedDecoder {
    /// Creates a new ChunkedDecoder accepting chunks of at most `max_chunk_size` bytes.
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Decodes the next chunk from the input buffer.
    ///
    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when a chunk is successfully decoded
    /// - `Ok(Some(PayloadItem::Eof))` when the final chunk and trailers are processed
    /// - `Ok(None)` when more data is needed
    /// - `Err(ParseError)` if the chunked encoding is invalid or a chunk exceeds the limit
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let (data_start, size) = match httparse::parse_chunk_size(&src[..]) {
            Ok(Status::Complete(parsed)) => parsed,
            Ok(Status::Partial) => return Ok(None),
            Err(e) => return Err(ParseError::invalid_body(format!("invalid chunk size line: {e}"))),
        };

        if size == 0 {
            return Ok(skip_trailers(src, data_start).map(|consumed| {
                src.advance(consumed);
                trace!("finished reading chunked data");
                PayloadItem::Eof
            }));
        }

        let size = usize::try_from(size)
            .ok()
            .filter(|size| *size <= self.max_chunk_size)
            .ok_or_else(|| ParseError::chunk_too_large(size, self.max_chunk_size))?;

        let data_end = data_start + size;
        if src.len() < data_end + CRLF.len() {
            return Ok(None);
        }
        ensure!(&src[data_end..data_end + CRLF.len()] == CRLF, ParseError::invalid_body("chunk data is not followed by CRLF"));

        src.advance(data_start);
        let chunk = src.split_to(size).freeze();
        src.advance(CRLF.len());

        trace!(len = chunk.len(), "read chunked bytes");
        Ok(Some(PayloadItem::Chunk(chunk)))
    }
}

/// Returns the offset right after the empty line closing the trailer section, which
/// starts at `from`.
fn skip_trailers(src: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    loop {
        let line_end = find_lf(src, pos)?;
        let line = trim_cr(&src[pos..line_end]);
        pos = line_end + 1;
        if line.is_empty() {
            return Some(pos);
        }
    }
}
