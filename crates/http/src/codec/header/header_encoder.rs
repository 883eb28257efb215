//! Status line and header block serialization.
//!
//! The same handful of status codes and header names recur across almost every
//! response, so their encoded fragments are memoized in process-wide caches shared
//! by all worker threads. Header values vary per response and are never cached.
//!
//! Both caches are insert-if-absent and append-only. The status cache is bounded by
//! the status code range, the header name cache by [`MAX_CACHED_HEADER_KEYS`]; names
//! seen after it filled up are encoded on every call.

use bytes::{BufMut, Bytes, BytesMut};
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::protocol::{Response, canonical_reason};

const HTTP_VERSION: &[u8] = b"HTTP/1.1 ";
pub(crate) const CRLF: &[u8] = b"\r\n";
const SERVER_HEADER: &[u8] = b"Server: ring-http\r\n";
const HEADER_SEPARATOR: &[u8] = b": ";

/// Upper bound of distinct header names kept in the cache
const MAX_CACHED_HEADER_KEYS: usize = 1024;

static STATUS_LINES: Lazy<DashMap<u16, Bytes>> = Lazy::new(DashMap::new);
static HEADER_KEYS: Lazy<HeaderKeyCache> = Lazy::new(|| HeaderKeyCache::new(MAX_CACHED_HEADER_KEYS));

/// Encoded `Name: ` prefixes by header name, holding at most `capacity` names.
#[derive(Debug)]
struct HeaderKeyCache {
    keys: DashMap<String, Bytes>,
    capacity: usize,
}

impl HeaderKeyCache {
    fn new(capacity: usize) -> Self {
        Self { keys: DashMap::new(), capacity }
    }

    fn get(&self, name: &str) -> Bytes {
        if let Some(key) = self.keys.get(name) {
            return key.value().clone();
        }
        if self.keys.len() >= self.capacity {
            return render_header_key(name);
        }
        self.keys.entry(name.to_string()).or_insert_with(|| render_header_key(name)).value().clone()
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Returns the encoded status line for `status` with its canonical reason phrase,
/// e.g. `HTTP/1.1 200 OK\r\n`.
///
/// Repeated calls for the same code return the same shared allocation.
pub fn status_line(status: u16) -> Bytes {
    if let Some(line) = STATUS_LINES.get(&status) {
        return line.value().clone();
    }
    STATUS_LINES.entry(status).or_insert_with(|| render_status_line(status, canonical_reason(status))).value().clone()
}

/// Returns the encoded `Name: ` prefix of a header line.
///
/// Repeated calls for the same name return the same shared allocation while the
/// cache has room.
pub fn header_key(name: &str) -> Bytes {
    HEADER_KEYS.get(name)
}

fn render_status_line(status: u16, reason: &str) -> Bytes {
    let mut line = BytesMut::with_capacity(HTTP_VERSION.len() + 4 + reason.len() + CRLF.len());
    line.put_slice(HTTP_VERSION);
    line.put_slice(status.to_string().as_bytes());
    line.put_u8(b' ');
    line.put_slice(reason.as_bytes());
    line.put_slice(CRLF);
    line.freeze()
}

fn render_header_key(name: &str) -> Bytes {
    let mut key = BytesMut::with_capacity(name.len() + HEADER_SEPARATOR.len());
    key.put_slice(name.as_bytes());
    key.put_slice(HEADER_SEPARATOR);
    key.freeze()
}

/// Encoder for the status line and header block of a [`Response`].
///
/// Writes the status line, then either nothing or a `Server` line followed by every
/// header, then the empty line closing the block.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderEncoder;

impl HeaderEncoder {
    /// Returns the status line to write for `response`.
    ///
    /// A custom reason phrase bypasses the cache.
    pub(crate) fn status_line(response: &Response) -> Bytes {
        match response.reason() {
            Some(reason) => render_status_line(response.status(), reason),
            None => status_line(response.status()),
        }
    }

    /// Number of bytes the header lines and the closing empty line occupy.
    pub(crate) fn headers_len(response: &Response) -> usize {
        let headers = response.headers();
        let lines: usize = if headers.is_empty() {
            0
        } else {
            SERVER_HEADER.len()
                + headers
                    .iter()
                    .map(|(name, value)| name.len() + HEADER_SEPARATOR.len() + value.len() + CRLF.len())
                    .sum::<usize>()
        };
        lines + CRLF.len()
    }

    /// Writes `status_line` and the header block of `response` into `dst`.
    pub(crate) fn encode(status_line: &[u8], response: &Response, dst: &mut BytesMut) {
        dst.put_slice(status_line);

        let headers = response.headers();
        if !headers.is_empty() {
            dst.put_slice(SERVER_HEADER);
            for (name, value) in headers {
                dst.put_slice(&header_key(name));
                dst.put_slice(value.as_bytes());
                dst.put_slice(CRLF);
            }
        }
        dst.put_slice(CRLF);
    }
}
