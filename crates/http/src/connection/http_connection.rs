use std::io;
use std::sync::Arc;

use bytes::BufMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tracing::{debug, warn};

use crate::connection::session::{Action, CloseReason, ConnectionContext, ConnectionHandle, Event, Session};
use crate::handler::Handler;
use crate::protocol::{HttpError, ParseError, SendError};

/// Drives a [`Session`] over an async byte stream.
///
/// The connection submits exactly the operation the session asks for: it reads into
/// the spare capacity of the input buffer, never beyond the request buffer size, and
/// writes the output buffer. Every completion is reported back to the session.
///
/// The connection stops as soon as its [`ConnectionHandle`] is cancelled, either by the
/// reaper or because the server shuts down.
///
/// # Type Parameters
///
/// * `S`: The async byte stream, usually a `TcpStream`
/// * `H`: The request handler
pub struct HttpConnection<S, H> {
    stream: S,
    conn: ConnectionHandle,
    session: Session<H>,
}

impl<S, H> HttpConnection<S, H>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: Handler,
{
    pub fn new(stream: S, context: Arc<ConnectionContext>, handler: Arc<H>, conn: ConnectionHandle) -> Self {
        let session = Session::new(context, handler, conn.clone());
        Self { stream, conn, session }
    }

    /// Serves requests until the peer closes, the connection is cancelled or fails.
    ///
    /// Closing because of the peer, the reaper or invalid requests is not an error,
    /// only a failing socket is reported.
    pub async fn process(mut self) -> Result<(), HttpError> {
        let mut action = self.session.on_event(Event::Accepted);
        let mut result = Ok(());

        loop {
            action = match action {
                Action::Read => match self.read().await {
                    Ok(event) => self.session.on_event(event),
                    Err(e) => {
                        warn!(connection = self.conn.id().as_u64(), cause = %e, "can't read from connection");
                        result = Err(ParseError::io(e).into());
                        self.session.on_event(Event::Close(CloseReason::Io))
                    }
                },
                Action::Write => match self.write().await {
                    Ok(event) => self.session.on_event(event),
                    Err(e) => {
                        warn!(connection = self.conn.id().as_u64(), cause = %e, "can't write to connection");
                        result = Err(SendError::io(e).into());
                        self.session.on_event(Event::Close(CloseReason::Io))
                    }
                },
                Action::Close => break,
            };
        }

        if let Err(e) = self.stream.shutdown().await {
            debug!(connection = self.conn.id().as_u64(), cause = %e, "shutdown connection failed");
        }
        result
    }

    async fn read(&mut self) -> io::Result<Event> {
        let capacity = self.session.read_capacity();
        let input = self.session.input_mut();
        input.reserve(capacity);
        let mut limited = input.limit(capacity);

        select! {
            () = self.conn.cancelled() => Ok(Event::Close(CloseReason::Cancelled)),
            result = self.stream.read_buf(&mut limited) => result.map(Event::Read),
        }
    }

    async fn write(&mut self) -> io::Result<Event> {
        let output = self.session.output();

        let written = select! {
            () = self.conn.cancelled() => return Ok(Event::Close(CloseReason::Cancelled)),
            result = self.stream.write(output) => result?,
        };
        if written == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }
        self.stream.flush().await?;
        Ok(Event::Written(written))
    }
}

impl<S, H> std::fmt::Debug for HttpConnection<S, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection").field("session", &self.session).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::duplex;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::handler::make_handler;
    use crate::protocol::{Request, Response};

    fn hello(request: Request) -> Response {
        let body = format!("hello {}", request.parameter("name").unwrap_or("world"));
        Response::builder().header("Content-Length", body.len()).body(body).build()
    }

    #[tokio::test]
    async fn serves_until_peer_closes() {
        let context = Arc::new(ConnectionContext::new(1024, 1024, Duration::from_secs(60)));
        let (client, server) = duplex(64);
        let conn = ConnectionHandle::new(&CancellationToken::new());
        let connection = HttpConnection::new(server, Arc::clone(&context), Arc::new(make_handler(hello)), conn);
        let task = tokio::spawn(connection.process());

        let (mut reader, mut writer) = tokio::io::split(client);
        writer.write_all(b"GET /?name=ring HTTP/1.1\r\n\r\n").await.unwrap();
        writer.shutdown().await.unwrap();

        let mut response = String::new();
        reader.read_to_string(&mut response).await.unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(response, "HTTP/1.1 200 OK\r\nServer: ring-http\r\nContent-Length: 10\r\n\r\nhello ring\r\n");
        assert_eq!(context.request_pool().idle(), 1);
        assert!(context.reaper().is_empty());
    }

    #[tokio::test]
    async fn cancellation_closes_idle_connection() {
        let context = Arc::new(ConnectionContext::new(1024, 1024, Duration::from_secs(60)));
        let (mut client, server) = duplex(64);
        let parent = CancellationToken::new();
        let conn = ConnectionHandle::new(&parent);
        let task = tokio::spawn(HttpConnection::new(server, context, Arc::new(make_handler(hello)), conn).process());

        parent.cancel();
        task.await.unwrap().unwrap();

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }
}
