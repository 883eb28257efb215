//! HTTP body decoding for request payloads
//!
//! A request body is framed in one of two ways once the header block has been read:
//!
//! - [`LengthDecoder`]: a fixed number of bytes given by `Content-Length`
//! - [`ChunkedDecoder`]: a sequence of hex-sized chunks closed by a zero-size chunk
//!
//! Both decoders hand out zero-copy views split off the connection input buffer and
//! never consume bytes belonging to an incomplete step.

mod chunked_decoder;
mod length_decoder;

pub use chunked_decoder::ChunkedDecoder;
pub use length_decoder::LengthDecoder;
