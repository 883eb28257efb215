//! Core HTTP protocol types.
//!
//! - [`Request`] / [`Method`]: the decoded request and its closed method set
//! - [`Response`] / [`ResponseBuilder`]: what a handler returns
//! - [`PayloadItem`] / [`PayloadSize`]: body framing and chunk delivery
//! - [`HttpError`], [`ParseError`], [`SendError`]: error taxonomy of the codec

mod error;
mod message;
mod request;
mod response;

pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub use message::PayloadItem;
pub use message::PayloadSize;

pub(crate) use request::{ChunkSink, RequestLine};
pub use request::{Headers, Method, Parameters, Request};

pub(crate) use response::canonical_reason;
pub use response::{Response, ResponseBuilder};
