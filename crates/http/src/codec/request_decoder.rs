//! HTTP request decoder module
//!
//! This module provides a resumable decoder for HTTP/1.x requests. The decoder is fed
//! whatever bytes the connection has read so far, any number of times, and emits a
//! [`Request`] once one is complete.
//!
//! # Components
//!
//! - [`RequestDecoder`]: Main decoder that coordinates the parsing phases
//! - Request line and header parsing via the `header` module
//! - Payload handling via the `body` module
//!
//! # Phases
//!
//! ```text
//! RequestLine -> Headers -> Done
//!                        -> Body -> Done
//!                        -> ChunkedBody -> RequestLine
//! ```
//!
//! Each phase either completes and commits the bytes it used, or leaves the buffer at
//! the start of that phase. Whatever earlier phases produced is kept in the decoder, so
//! a request line is never parsed twice.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use ring_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(&b"GET /index.html?lang=en HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]);
//!
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.path(), "/index.html");
//! assert_eq!(request.parameter("lang"), Some("en"));
//! assert_eq!(request.header("host"), Some("localhost"));
//! ```

use std::mem;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::DEFAULT_BUFFER_SIZE;
use crate::codec::body::{ChunkedDecoder, LengthDecoder};
use crate::codec::header::{parse_headers, parse_payload, parse_request_line};
use crate::protocol::{ChunkSink, Headers, ParseError, PayloadItem, PayloadSize, Request, RequestLine};

/// The phase a [`RequestDecoder`] is in, as observed between two `decode` calls.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecodeState {
    /// Waiting for the request line of the next request
    RequestLine,
    /// Request line parsed, waiting for the end of the header block
    Headers,
    /// Header block parsed, waiting for `Content-Length` body bytes
    Body,
    /// Request head emitted, feeding chunks to its chunk handler
    ChunkedBody,
    /// A request was just emitted, the next call starts over
    Done,
}

#[derive(Debug)]
enum Phase {
    RequestLine,
    Headers(RequestLine),
    Body { line: RequestLine, headers: Headers, decoder: LengthDecoder },
    ChunkedBody { decoder: ChunkedDecoder, sink: ChunkSink },
    Done,
}

/// A resumable decoder for HTTP requests.
///
/// The decoder never copies request data: bodies and chunks are split off the
/// input buffer as [`Bytes`] views.
///
/// A chunked request is emitted as soon as its header block is complete, with an
/// empty body. Its chunks are decoded by the following `decode` calls and handed to
/// the handler registered through [`Request::on_chunk`], followed by
/// [`PayloadItem::Eof`]. After the terminal chunk the decoder goes on with the next
/// request in the same call.
///
/// # Limits
///
/// `capacity` is the size of the input buffer. A request whose head does not fit in
/// it, a `Content-Length` larger than it, or a chunk larger than it is rejected.
#[derive(Debug)]
pub struct RequestDecoder {
    phase: Phase,
    capacity: usize,
}

impl RequestDecoder {
    /// Creates a decoder for an input buffer of the default size (64 KiB).
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a decoder for an input buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { phase: Phase::RequestLine, capacity }
    }

    /// Returns the current decoding phase.
    pub fn state(&self) -> DecodeState {
        match self.phase {
            Phase::RequestLine => DecodeState::RequestLine,
            Phase::Headers(_) => DecodeState::Headers,
            Phase::Body { .. } => DecodeState::Body,
            Phase::ChunkedBody { .. } => DecodeState::ChunkedBody,
            Phase::Done => DecodeState::Done,
        }
    }

    /// Called when a phase needs more bytes than `src` holds.
    fn incomplete(&self, src: &BytesMut) -> Result<Option<Request>, ParseError> {
        if src.len() >= self.capacity {
            return Err(ParseError::too_large_request(self.capacity));
        }
        Ok(None)
    }

    fn complete(&mut self, request: Request) -> Result<Option<Request>, ParseError> {
        trace!(method = %request.method(), path = request.path(), body = request.body().len(), "decoded request");
        self.phase = Phase::Done;
        Ok(Some(request))
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    /// Attempts to decode an HTTP request from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(request))`: a complete request, or the head of a chunked one
    /// - `Ok(None)`: Need more data to proceed
    /// - `Err(_)`: Encountered a parsing error, the connection should be closed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match mem::replace(&mut self.phase, Phase::Done) {
                Phase::Done => {
                    self.phase = Phase::RequestLine;
                }

                Phase::RequestLine => {
                    let Some((line, consumed)) = parse_request_line(src)? else {
                        self.phase = Phase::RequestLine;
                        return self.incomplete(src);
                    };
                    src.advance(consumed);
                    self.phase = Phase::Headers(line);
                }

                Phase::Headers(line) => {
                    let Some((headers, consumed)) = parse_headers(src)? else {
                        self.phase = Phase::Headers(line);
                        return self.incomplete(src);
                    };
                    src.advance(consumed);

                    match parse_payload(&headers)? {
                        PayloadSize::Length(length) => {
                            let length = usize::try_from(length)
                                .ok()
                                .filter(|length| *length <= self.capacity)
                                .ok_or_else(|| ParseError::too_large_body(length, self.capacity))?;
                            self.phase = Phase::Body { line, headers, decoder: LengthDecoder::new(length) };
                        }
                        PayloadSize::Chunked => {
                            let sink = ChunkSink::default();
                            let request = Request::from_parts(line, headers, Bytes::new(), Some(sink.clone()));
                            trace!(method = %request.method(), path = request.path(), "decoded chunked request head");
                            self.phase = Phase::ChunkedBody { decoder: ChunkedDecoder::new(self.capacity), sink };
                            return Ok(Some(request));
                        }
                        PayloadSize::Empty => {
                            return self.complete(Request::from_parts(line, headers, Bytes::new(), None));
                        }
                    }
                }

                Phase::Body { line, headers, mut decoder } => {
                    let Some(body) = decoder.decode(src)? else {
                        self.phase = Phase::Body { line, headers, decoder };
                        return self.incomplete(src);
                    };
                    return self.complete(Request::from_parts(line, headers, body, None));
                }

                Phase::ChunkedBody { mut decoder, sink } => loop {
                    match decoder.decode(src)? {
                        Some(PayloadItem::Eof) => {
                            sink.deliver(PayloadItem::Eof);
                            self.phase = Phase::RequestLine;
                            break;
                        }
                        Some(item) => {
                            if !sink.deliver(item) {
                                trace!("no chunk handler registered, chunk dropped");
                            }
                        }
                        None => {
                            self.phase = Phase::ChunkedBody { decoder, sink };
                            return self.incomplete(src);
                        }
                    }
                },
            }
        }
    }
}
