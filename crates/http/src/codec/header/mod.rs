//! Request line, header block and status line processing.
//!
//! # Components
//!
//! - request line decoding: method, path, query parameters and protocol
//! - header decoding: `key: value` block and body framing selection
//! - [`HeaderEncoder`]: status line and header block serialization, backed by the
//!   memoized fragments returned from [`status_line`] and [`header_key`]

mod header_decoder;
mod header_encoder;
mod request_line_decoder;

pub(crate) use header_decoder::{parse_headers, parse_payload};
pub(crate) use header_encoder::CRLF;
pub use header_encoder::{HeaderEncoder, header_key, status_line};
pub(crate) use request_line_decoder::parse_request_line;
