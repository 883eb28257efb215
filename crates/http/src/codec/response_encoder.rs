//! HTTP response encoder module
//!
//! Serializes a [`Response`] into the connection output buffer:
//!
//! ```text
//! HTTP/1.1 <code> <reason>\r\n
//! Server: ring-http\r\n        (only when the response carries headers)
//! <Name>: <Value>\r\n          (one per header)
//! \r\n
//! <body>\r\n
//! ```
//!
//! The encoder never adds a `Content-Length` header, the handler sets it when the
//! client needs one.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::DEFAULT_BUFFER_SIZE;
use crate::codec::header::{CRLF, HeaderEncoder};
use crate::protocol::{Response, SendError};

/// Encoder writing whole responses into a bounded output buffer.
///
/// `max_size` is the number of bytes the output buffer may hold. A response that
/// does not fit next to what is already buffered is rejected with
/// [`SendError::BufferOverflow`] and nothing is written.
#[derive(Debug, Clone)]
pub struct ResponseEncoder {
    max_size: usize,
}

impl ResponseEncoder {
    /// Creates an encoder for an output buffer of the default size (64 KiB).
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates an encoder for an output buffer of `max_size` bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self { max_size }
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }
}

impl Encoder<&Response> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, response: &Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let status_line = HeaderEncoder::status_line(response);
        let required =
            status_line.len() + HeaderEncoder::headers_len(response) + response.body().len() + CRLF.len();
        let available = self.max_size.saturating_sub(dst.len());
        if required > available {
            return Err(SendError::buffer_overflow(required, available));
        }

        dst.reserve(required);
        HeaderEncoder::encode(&status_line, response, dst);
        dst.put_slice(response.body());
        dst.put_slice(CRLF);

        trace!(status = response.status(), len = required, "encoded response");
        Ok(())
    }
}
