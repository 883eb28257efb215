use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// Errors raised while decoding a request.
///
/// Every variant is fatal to the connection: the session closes the socket
/// instead of trying to resynchronize with the byte stream.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("request size exceed the buffer capacity {capacity}")]
    TooLargeRequest { capacity: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0}")]
    InvalidVersion(String),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("body size {size} exceed the buffer capacity {capacity}")]
    TooLargeBody { size: u64, capacity: usize },

    #[error("chunk size {size} exceed the buffer capacity {capacity}")]
    ChunkTooLarge { size: u64, capacity: usize },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_request(capacity: usize) -> Self {
        Self::TooLargeRequest { capacity }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_version(bytes: &[u8]) -> Self {
        Self::InvalidVersion(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn too_large_body(size: u64, capacity: usize) -> Self {
        Self::TooLargeBody { size, capacity }
    }

    pub fn chunk_too_large(size: u64, capacity: usize) -> Self {
        Self::ChunkTooLarge { size, capacity }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors raised while encoding a response into the output buffer.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("response needs {required} bytes but only {available} bytes left in the output buffer")]
    BufferOverflow { required: usize, available: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn buffer_overflow(required: usize, available: usize) -> Self {
        Self::BufferOverflow { required, available }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
