//! HTTP request representation.
//!
//! A [`Request`] is built field by field by the request decoder and handed to the
//! [`Handler`](crate::handler::Handler) once complete. Its body is a zero-copy
//! [`Bytes`] view split off the connection input buffer, and a request using
//! chunked transfer encoding streams its body through a chunk handler instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use http::{HeaderMap, Version};

use crate::protocol::PayloadItem;

/// Query parameters, a key may carry several values in encounter order.
pub type Parameters = HashMap<String, Vec<String>>;

/// Request headers keyed case-insensitively, the last occurrence of a header name wins.
pub type Headers = HeaderMap;

/// The closed set of request methods understood by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Trace,
}

impl Method {
    const ALL: [Method; 8] =
        [Method::Get, Method::Head, Method::Post, Method::Put, Method::Patch, Method::Delete, Method::Options, Method::Trace];

    /// Returns the wire token of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
        }
    }

    pub(crate) fn from_bytes(token: &[u8]) -> Option<Method> {
        Self::ALL.into_iter().find(|method| method.as_str().as_bytes() == token)
    }

    /// Returns true when `partial` can still grow into one of the known tokens.
    pub(crate) fn is_prefix(partial: &[u8]) -> bool {
        Self::ALL.iter().any(|method| method.as_str().as_bytes().starts_with(partial))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Head => http::Method::HEAD,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
            Method::Options => http::Method::OPTIONS,
            Method::Trace => http::Method::TRACE,
        }
    }
}

type ChunkHandler = Box<dyn FnMut(PayloadItem) + Send>;

/// Slot shared between a chunked [`Request`] and the decoder feeding it.
///
/// The handler is registered by the request owner after the request head has been
/// decoded, and invoked by the decoder for every chunk decoded afterwards.
#[derive(Clone, Default)]
pub(crate) struct ChunkSink {
    handler: Arc<Mutex<Option<ChunkHandler>>>,
}

impl ChunkSink {
    fn lock(&self) -> MutexGuard<'_, Option<ChunkHandler>> {
        self.handler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, handler: ChunkHandler) {
        *self.lock() = Some(handler);
    }

    /// Hands `item` to the registered handler, returns false when none is registered.
    ///
    /// The handler runs outside the lock, so it may register a replacement for itself.
    pub(crate) fn deliver(&self, item: PayloadItem) -> bool {
        let Some(mut handler) = self.lock().take() else {
            return false;
        };
        handler(item);

        let mut slot = self.lock();
        if slot.is_none() {
            *slot = Some(handler);
        }
        true
    }
}

impl fmt::Debug for ChunkSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkSink").field("registered", &self.lock().is_some()).finish()
    }
}

/// The parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestLine {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) parameters: Parameters,
    pub(crate) version: Version,
}

/// A fully decoded HTTP request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    parameters: Parameters,
    version: Version,
    headers: Headers,
    body: Bytes,
    chunk_sink: Option<ChunkSink>,
}

impl Request {
    pub(crate) fn from_parts(line: RequestLine, headers: Headers, body: Bytes, chunk_sink: Option<ChunkSink>) -> Self {
        let RequestLine { method, path, parameters, version } = line;
        Self { method, path, parameters, version, headers, body, chunk_sink }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Returns the first value of the query parameter `key`.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|values| values.first()).map(String::as_str)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the protocol token, e.g. `"HTTP/1.1"`.
    pub fn protocol(&self) -> &'static str {
        match self.version {
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_11 => "HTTP/1.1",
            _ => "HTTP/2.0",
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Looks a header up, ignoring ASCII case of the name.
    ///
    /// Returns `None` as well when the value is not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The request body.
    ///
    /// Empty when the request carried no body or when the body is chunked, in which
    /// case it is delivered through [`Request::on_chunk`].
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Returns true when the body uses chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        self.chunk_sink.is_some()
    }

    /// Registers the handler receiving the chunks of a chunked body.
    ///
    /// The handler gets one [`PayloadItem::Chunk`] per decoded chunk in arrival order,
    /// then a single [`PayloadItem::Eof`]. Chunks decoded before registration are
    /// dropped. Returns false, and drops `handler`, when the request is not chunked.
    pub fn on_chunk<F>(&self, handler: F) -> bool
    where
        F: FnMut(PayloadItem) + Send + 'static,
    {
        match &self.chunk_sink {
            Some(sink) => {
                sink.set(Box::new(handler));
                true
            }
            None => false,
        }
    }
}
