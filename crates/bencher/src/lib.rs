//! Request fixtures decoded by the ring-http benchmarks.

/// Body framing of a fixture request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Framing {
    Empty,
    Chunked,
}

/// A complete HTTP request read from `resources/request`.
#[derive(Debug, Copy, Clone)]
pub struct RequestFixture {
    name: &'static str,
    file_name: &'static str,
    content: &'static str,
    framing: Framing,
}

impl RequestFixture {
    pub const fn new(name: &'static str, file_name: &'static str, content: &'static str, framing: Framing) -> Self {
        Self { name, file_name, content, framing }
    }

    pub const fn empty(name: &'static str, file_name: &'static str, content: &'static str) -> Self {
        Self::new(name, file_name, content, Framing::Empty)
    }

    pub const fn chunked(name: &'static str, file_name: &'static str, content: &'static str) -> Self {
        Self::new(name, file_name, content, Framing::Chunked)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Decode calls needed to consume the whole fixture: the head, plus one
    /// draining the chunks of a chunked body.
    pub fn decode_calls(&self) -> usize {
        match self.framing {
            Framing::Empty => 1,
            Framing::Chunked => 2,
        }
    }

    /// Splits the fixture into `count` reads of equal size, the last one possibly shorter.
    pub fn fragments(&self, count: usize) -> std::slice::Chunks<'static, u8> {
        let content = self.content.as_bytes();
        content.chunks(content.len().div_ceil(count.max(1)).max(1))
    }
}
