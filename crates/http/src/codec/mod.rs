//! HTTP codec module for encoding and decoding HTTP messages
//!
//! This module provides the wire format of the server: a resumable request decoder
//! fed from the connection input buffer, and a response encoder writing into the
//! connection output buffer.
//!
//! # Architecture
//!
//! - Request handling:
//!   - [`RequestDecoder`]: Decodes incoming HTTP requests, phase by phase
//!   - Request line and header parsing via the `header` module
//!   - Payload decoding via the `body` module
//!
//! - Response handling:
//!   - [`ResponseEncoder`]: Encodes outgoing HTTP responses
//!   - [`HeaderEncoder`]: status line and header block, using the memoized
//!     fragments of [`status_line`] and [`header_key`]
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use ring_http::codec::{RequestDecoder, ResponseEncoder};
//! use ring_http::protocol::Response;
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! // Decode incoming request
//! let mut decoder = RequestDecoder::new();
//! let mut request_buffer = BytesMut::from(&b"GET / HTTP/1.1\r\n\r\n"[..]);
//! let request = decoder.decode(&mut request_buffer).unwrap();
//! assert!(request.is_some());
//!
//! // Encode outgoing response
//! let mut encoder = ResponseEncoder::new();
//! let mut response_buffer = BytesMut::new();
//! encoder.encode(&Response::new(204), &mut response_buffer).unwrap();
//! assert!(response_buffer.starts_with(b"HTTP/1.1 204 No Content\r\n"));
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use body::{ChunkedDecoder, LengthDecoder};
pub use header::{HeaderEncoder, header_key, status_line};
pub use request_decoder::{DecodeState, RequestDecoder};
pub use response_encoder::ResponseEncoder;

/// Default size of the connection input and output buffers
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
