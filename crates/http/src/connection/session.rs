//! Per-connection state machine.
//!
//! A [`Session`] knows nothing about sockets. The driver performs the reads and
//! writes, reports each completion as an [`Event`] and gets back the next [`Action`]
//! to submit:
//!
//! ```text
//! Accepted --Accepted--> Reading --Read(n)--> Handling --> Writing --Written--> Reading
//!                           |                    |            |
//!                           +------- Read(0), errors, Close ---+--> Closed
//! ```
//!
//! Closing is idempotent. It returns both buffers to their pools and removes the
//! connection from the reaper.

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, error, trace, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::pool::BufferPool;
use crate::protocol::{Response, SendError};
use crate::reaper::{ConnectionId, ConnectionReaper, Reapable};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Accepted,
    Reading,
    Handling,
    Writing,
    Closed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed its side, reported as a zero-length read
    PeerClosed,
    /// Idle for longer than the ttl, or the server is shutting down
    Cancelled,
    /// The request bytes are not valid HTTP
    DecodeError,
    /// A response could not be written into the output buffer
    EncodeError,
    /// The socket failed
    Io,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            CloseReason::PeerClosed => "peer closed",
            CloseReason::Cancelled => "cancelled",
            CloseReason::DecodeError => "decode error",
            CloseReason::EncodeError => "encode error",
            CloseReason::Io => "io error",
        };
        f.write_str(reason)
    }
}

/// Completion reported by the driver.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    /// The connection was just accepted
    Accepted,
    /// `n` bytes were appended to [`Session::input_mut`], 0 means end of stream
    Read(usize),
    /// The first `n` bytes of [`Session::output`] were written
    Written(usize),
    /// The driver gives up on the connection
    Close(CloseReason),
}

/// The next operation the driver has to submit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read into the spare capacity of the input buffer
    Read,
    /// Write the output buffer
    Write,
    /// Close the socket, the session is already closed
    Close,
}

/// Identity of a connection as seen by the reaper.
///
/// Closing the handle cancels its token, the driver reacts by closing the session.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    token: CancellationToken,
}

impl ConnectionHandle {
    /// Creates a handle cancelled together with `parent`.
    pub fn new(parent: &CancellationToken) -> Self {
        Self { id: ConnectionId::next(), token: parent.child_token() }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

impl Reapable for ConnectionHandle {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn close(&self) {
        self.token.cancel();
    }
}

/// State shared by every connection of a server.
#[derive(Debug)]
pub struct ConnectionContext {
    request_pool: BufferPool,
    response_pool: BufferPool,
    reaper: Arc<ConnectionReaper<ConnectionHandle>>,
    ttl: Duration,
}

impl ConnectionContext {
    pub fn new(request_buffer_size: usize, response_buffer_size: usize, ttl: Duration) -> Self {
        Self {
            request_pool: BufferPool::with_buffer_size(request_buffer_size),
            response_pool: BufferPool::with_buffer_size(response_buffer_size),
            reaper: Arc::new(ConnectionReaper::new()),
            ttl,
        }
    }

    pub fn request_pool(&self) -> &BufferPool {
        &self.request_pool
    }

    pub fn response_pool(&self) -> &BufferPool {
        &self.response_pool
    }

    pub fn reaper(&self) -> &Arc<ConnectionReaper<ConnectionHandle>> {
        &self.reaper
    }
}

/// One accepted connection: its buffers, codec state and handler.
pub struct Session<H> {
    state: SessionState,
    conn: ConnectionHandle,
    context: Arc<ConnectionContext>,
    handler: Arc<H>,
    decoder: RequestDecoder,
    encoder: ResponseEncoder,
    input: BytesMut,
    output: BytesMut,
    /// Response that did not fit next to the bytes still waiting in `output`
    pending: Option<Response>,
}

impl<H> Session<H> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn id(&self) -> ConnectionId {
        self.conn.id
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.conn
    }

    /// Buffer the driver appends read bytes to.
    pub fn input_mut(&mut self) -> &mut BytesMut {
        &mut self.input
    }

    /// Bytes the driver has to write.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Number of bytes the driver may still append to the input buffer.
    pub fn read_capacity(&self) -> usize {
        self.context.request_pool.buffer_size().saturating_sub(self.input.len())
    }

    fn close(&mut self, reason: CloseReason) -> Action {
        if self.state == SessionState::Closed {
            return Action::Close;
        }
        self.state = SessionState::Closed;

        match reason {
            CloseReason::PeerClosed | CloseReason::Cancelled => {
                debug!(connection = self.conn.id.as_u64(), %reason, "closing connection");
            }
            _ => warn!(connection = self.conn.id.as_u64(), %reason, "closing connection"),
        }

        let mut input = mem::take(&mut self.input);
        input.clear();
        self.context.request_pool.give(input);

        let mut output = mem::take(&mut self.output);
        output.clear();
        self.context.response_pool.give(output);

        self.pending = None;
        self.context.reaper.remove(self.conn.id);
        Action::Close
    }
}

impl<H: Handler> Session<H> {
    pub fn new(context: Arc<ConnectionContext>, handler: Arc<H>, conn: ConnectionHandle) -> Self {
        let input = context.request_pool.take();
        let output = context.response_pool.take();
        Self {
            state: SessionState::Accepted,
            conn,
            decoder: RequestDecoder::with_capacity(context.request_pool.buffer_size()),
            encoder: ResponseEncoder::with_capacity(context.response_pool.buffer_size()),
            context,
            handler,
            input,
            output,
            pending: None,
        }
    }

    /// Advances the state machine with a completion and returns the next action.
    pub fn on_event(&mut self, event: Event) -> Action {
        if self.state == SessionState::Closed {
            return Action::Close;
        }

        match event {
            Event::Accepted => {
                self.context.reaper.seen(&self.conn, self.context.ttl);
                self.state = SessionState::Reading;
                Action::Read
            }
            Event::Read(0) => self.close(CloseReason::PeerClosed),
            Event::Read(n) => {
                trace!(connection = self.conn.id.as_u64(), n, "read bytes");
                self.context.reaper.seen(&self.conn, self.context.ttl);
                self.process()
            }
            Event::Written(n) => {
                self.output.advance(n.min(self.output.len()));
                if self.output.is_empty() {
                    self.process()
                } else {
                    self.state = SessionState::Writing;
                    Action::Write
                }
            }
            Event::Close(reason) => self.close(reason),
        }
    }

    fn process(&mut self) -> Action {
        self.state = SessionState::Handling;
        if let Err(reason) = self.handle_input() {
            return self.close(reason);
        }

        if self.output.is_empty() {
            self.state = SessionState::Reading;
            Action::Read
        } else {
            self.state = SessionState::Writing;
            Action::Write
        }
    }

    /// Decodes and answers every complete request of the input buffer, stops early
    /// when the output buffer has to be drained first.
    fn handle_input(&mut self) -> Result<(), CloseReason> {
        if let Some(response) = self.pending.take() {
            if !self.encode(response)? {
                return Ok(());
            }
        }

        loop {
            match self.decoder.decode(&mut self.input) {
                Ok(Some(request)) => {
                    let response = self.handler.handle(request);
                    if !self.encode(response)? {
                        return Ok(());
                    }
                }
                Ok(None) => return Ok(()),
                Err(e) => {
                    warn!(connection = self.conn.id.as_u64(), cause = %e, "can't decode request");
                    return Err(CloseReason::DecodeError);
                }
            }
        }
    }

    /// Returns false when the response is kept back until the output buffer drained.
    fn encode(&mut self, response: Response) -> Result<bool, CloseReason> {
        match self.encoder.encode(&response, &mut self.output) {
            Ok(()) => Ok(true),
            Err(SendError::BufferOverflow { .. }) if !self.output.is_empty() => {
                self.pending = Some(response);
                Ok(false)
            }
            Err(e) => {
                error!(connection = self.conn.id.as_u64(), cause = %e, "can't encode response");
                Err(CloseReason::EncodeError)
            }
        }
    }
}

impl<H> Drop for Session<H> {
    fn drop(&mut self) {
        self.close(CloseReason::Cancelled);
    }
}

impl<H> fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.conn.id)
            .field("state", &self.state)
            .field("decoder", &self.decoder.state())
            .field("input", &self.input.len())
            .field("output", &self.output.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;

    use super::*;
    use crate::handler::{HandlerFn, make_handler};
    use crate::protocol::{PayloadItem, Request};

    type EchoHandler = HandlerFn<fn(Request) -> Response>;

    fn echo(request: Request) -> Response {
        let path = request.path().to_string();
        Response::builder().header("Content-Length", path.len()).body(path).build()
    }

    fn session_with(response_buffer_size: usize) -> (Arc<ConnectionContext>, Session<EchoHandler>) {
        let context = Arc::new(ConnectionContext::new(1024, response_buffer_size, Duration::from_secs(60)));
        let handler = Arc::new(make_handler(echo as fn(Request) -> Response));
        let conn = ConnectionHandle::new(&CancellationToken::new());
        let session = Session::new(Arc::clone(&context), handler, conn);
        (context, session)
    }

    fn feed<H: Handler>(session: &mut Session<H>, bytes: &[u8]) -> Action {
        session.input_mut().extend_from_slice(bytes);
        session.on_event(Event::Read(bytes.len()))
    }

    #[test]
    fn request_response_cycle() {
        let (context, mut session) = session_with(1024);

        assert_eq!(session.on_event(Event::Accepted), Action::Read);
        assert_eq!(context.reaper().len(), 1);

        assert_eq!(feed(&mut session, b"GET /hel"), Action::Read);
        assert_eq!(session.state(), SessionState::Reading);

        assert_eq!(feed(&mut session, b"lo HTTP/1.1\r\n\r\n"), Action::Write);
        assert_eq!(session.state(), SessionState::Writing);
        assert_eq!(
            session.output(),
            &b"HTTP/1.1 200 OK\r\nServer: ring-http\r\nContent-Length: 6\r\n\r\n/hello\r\n"[..]
        );

        assert_eq!(session.on_event(Event::Written(10)), Action::Write);
        let rest = session.output().len();
        assert_eq!(session.on_event(Event::Written(rest)), Action::Read);
        assert!(session.output().is_empty());
    }

    #[test]
    fn pipelined_requests_share_one_write() {
        let (_context, mut session) = session_with(1024);
        session.on_event(Event::Accepted);

        assert_eq!(feed(&mut session, b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n"), Action::Write);

        let output = String::from_utf8_lossy(session.output()).into_owned();
        assert_eq!(output.matches("HTTP/1.1 200 OK").count(), 2);
        assert!(output.find("/a\r\n") < output.find("/b\r\n"));
    }

    #[test]
    fn full_output_waits_for_write() {
        // one response is 61 bytes, two do not fit
        let (_context, mut session) = session_with(100);
        session.on_event(Event::Accepted);

        assert_eq!(feed(&mut session, b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n"), Action::Write);
        assert!(session.output().ends_with(b"/a\r\n"));

        let written = session.output().len();
        assert_eq!(session.on_event(Event::Written(written)), Action::Write);
        assert!(session.output().ends_with(b"/b\r\n"));

        let written = session.output().len();
        assert_eq!(session.on_event(Event::Written(written)), Action::Read);
    }

    #[test]
    fn peer_close_returns_buffers() {
        let (context, mut session) = session_with(1024);
        session.on_event(Event::Accepted);

        assert_eq!(session.on_event(Event::Read(0)), Action::Close);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(context.request_pool().idle(), 1);
        assert_eq!(context.response_pool().idle(), 1);
        assert!(context.reaper().is_empty());

        assert_eq!(session.on_event(Event::Close(CloseReason::Io)), Action::Close);
        drop(session);
        assert_eq!(context.request_pool().idle(), 1);
    }

    #[test]
    fn invalid_request_closes() {
        let (context, mut session) = session_with(1024);
        session.on_event(Event::Accepted);

        assert_eq!(feed(&mut session, b"BREW /pot HTTP/1.1\r\n\r\n"), Action::Close);
        assert!(context.reaper().is_empty());
    }

    #[test]
    fn response_larger_than_output_closes() {
        let (_context, mut session) = session_with(32);
        session.on_event(Event::Accepted);

        assert_eq!(feed(&mut session, b"GET /a-rather-long-path HTTP/1.1\r\n\r\n"), Action::Close);
    }

    #[test]
    fn chunked_request_streams_to_handler() {
        let received = Arc::new(Mutex::new(Vec::<PayloadItem>::new()));
        let sink = Arc::clone(&received);
        let handler = Arc::new(make_handler(move |request: Request| {
            let sink = Arc::clone(&sink);
            request.on_chunk(move |item| sink.lock().unwrap().push(item));
            Response::new(202)
        }));
        let context = Arc::new(ConnectionContext::new(1024, 1024, Duration::from_secs(60)));
        let mut session = Session::new(context, handler, ConnectionHandle::new(&CancellationToken::new()));
        session.on_event(Event::Accepted);

        let action = feed(&mut session, b"POST /up HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n");
        assert_eq!(action, Action::Write);
        assert_eq!(*received.lock().unwrap(), vec![PayloadItem::Chunk(Bytes::from_static(b"Wiki"))]);

        feed(&mut session, b"5\r\npedia\r\n0\r\n\r\n");
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 3);
        assert!(received[2].is_eof());
    }

    #[test]
    fn reaping_cancels_connection() {
        let (context, mut session) = session_with(1024);
        session.on_event(Event::Accepted);

        assert!(!session.connection().is_cancelled());
        context.reaper().sweep_at(std::time::Instant::now() + Duration::from_secs(61));
        assert!(session.connection().is_cancelled());
    }
}
