//! HTTP response representation.
//!
//! The encoder writes a [`Response`] as-is: it never computes `Content-Length`
//! nor validates header names, so the handler is responsible for both.

use bytes::Bytes;
use http::StatusCode;

/// A response produced by a [`Handler`](crate::handler::Handler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    reason: Option<String>,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Response {
    /// Creates a response with the given status, no headers and an empty body.
    pub fn new(status: u16) -> Self {
        Self { status, reason: None, headers: Vec::new(), body: Bytes::new() }
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { inner: Response::new(200) }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// The custom reason phrase, if the handler set one.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// The reason phrase written on the status line.
    ///
    /// Falls back to the canonical reason of the status code, or an empty phrase for
    /// codes without one.
    pub fn reason_phrase(&self) -> &str {
        match &self.reason {
            Some(reason) => reason,
            None => canonical_reason(self.status),
        }
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    fn set_header(&mut self, name: String, value: String) {
        match self.headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(&name)) {
            Some(entry) => *entry = (name, value),
            None => self.headers.push((name, value)),
        }
    }
}

pub(crate) fn canonical_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status).ok().and_then(|code| code.canonical_reason()).unwrap_or("")
}

#[derive(Debug)]
pub struct ResponseBuilder {
    inner: Response,
}

impl ResponseBuilder {
    pub fn status(mut self, status: u16) -> Self {
        self.inner.status = status;
        self
    }

    pub fn reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.inner.reason = Some(reason.into());
        self
    }

    /// Sets a header, replacing a previous value of the same name.
    pub fn header<K: Into<String>, V: ToString>(mut self, name: K, value: V) -> Self {
        self.inner.set_header(name.into(), value.to_string());
        self
    }

    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.inner.body = body.into();
        self
    }

    pub fn build(self) -> Response {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_replaces_same_name() {
        let response = Response::builder()
            .header("Content-Type", "text/plain")
            .header("content-type", "text/html")
            .header("Content-Length", 0)
            .build();

        assert_eq!(response.headers().len(), 2);
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(response.header("Content-Length"), Some("0"));
    }

    #[test]
    fn reason_phrase_falls_back_to_canonical() {
        assert_eq!(Response::new(404).reason_phrase(), "Not Found");
        assert_eq!(Response::new(599).reason_phrase(), "");
        assert_eq!(Response::builder().status(200).reason("Fine").build().reason_phrase(), "Fine");
    }
}
