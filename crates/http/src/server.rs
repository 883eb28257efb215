//! Multi-threaded HTTP server.
//!
//! [`Server::start`] binds a single listening socket and starts one worker thread per
//! configured thread. Every worker runs its own single-threaded tokio runtime, accepts
//! on a clone of the listening socket and serves the connections it accepted itself,
//! so a connection never moves between threads.
//!
//! Buffer pools, the reaper and the handler are shared by all workers.
//!
//! ```no_run
//! use ring_http::config::Options;
//! use ring_http::handler::make_handler;
//! use ring_http::protocol::{Request, Response};
//! use ring_http::server::Server;
//!
//! let handler = make_handler(|_request: Request| Response::builder().header("Content-Length", 2).body("ok").build());
//! let handle = Server::new(Options::builder().port(8080).build(), handler).start().unwrap();
//! handle.join().unwrap();
//! ```

use std::io;
use std::mem;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Options;
use crate::connection::{ConnectionContext, ConnectionHandle, HttpConnection};
use crate::handler::Handler;
use crate::reaper::ReaperHandle;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid options: {reason}")]
    InvalidOptions { reason: String },

    #[error("can't bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("worker thread panicked")]
    WorkerPanicked,
}

impl ServerError {
    pub fn invalid_options<S: ToString>(reason: S) -> Self {
        Self::InvalidOptions { reason: reason.to_string() }
    }
}

#[derive(Debug)]
pub struct Server<H> {
    options: Options,
    handler: Arc<H>,
}

impl<H: Handler> Server<H> {
    pub fn new(options: Options, handler: H) -> Self {
        Self { options, handler: Arc::new(handler) }
    }

    /// Binds the listening socket and starts the workers and the reaper.
    ///
    /// Returns once every worker thread is running.
    pub fn start(self) -> Result<ServerHandle, ServerError> {
        self.options.validate()?;

        let addr = format!("{}:{}", self.options.host(), self.options.port());
        let listener = StdTcpListener::bind(&addr).map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let context = Arc::new(ConnectionContext::new(
            self.options.request_buffer_size(),
            self.options.response_buffer_size(),
            self.options.ttl(),
        ));
        let reaper = context.reaper().spawn(self.options.reap_interval())?;
        let token = CancellationToken::new();

        let mut handle = ServerHandle { local_addr, token, workers: Vec::new(), reaper: Some(reaper) };
        for index in 0..self.options.threads() {
            let worker = Worker {
                index,
                listener: listener.try_clone()?,
                context: Arc::clone(&context),
                handler: Arc::clone(&self.handler),
                token: handle.token.clone(),
            };
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            let thread = thread::Builder::new()
                .name(format!("ring-http-worker-{index}"))
                .spawn(move || runtime.block_on(worker.run()))?;
            handle.workers.push(thread);
        }

        info!(%local_addr, threads = self.options.threads(), "server started");
        Ok(handle)
    }
}

struct Worker<H> {
    index: usize,
    listener: StdTcpListener,
    context: Arc<ConnectionContext>,
    handler: Arc<H>,
    token: CancellationToken,
}

impl<H: Handler> Worker<H> {
    async fn run(self) {
        let listener = match TcpListener::from_std(self.listener) {
            Ok(listener) => listener,
            Err(e) => {
                error!(worker = self.index, cause = %e, "can't register listener");
                return;
            }
        };

        loop {
            let (stream, remote_addr) = select! {
                () = self.token.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        warn!(worker = self.index, cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            if let Err(e) = stream.set_nodelay(true) {
                debug!(cause = %e, "can't set TCP_NODELAY");
            }

            let conn = ConnectionHandle::new(&self.token);
            debug!(worker = self.index, connection = conn.id().as_u64(), %remote_addr, "accepted connection");
            let connection = HttpConnection::new(stream, Arc::clone(&self.context), Arc::clone(&self.handler), conn);
            tokio::spawn(async move {
                if let Err(e) = connection.process().await {
                    error!(%remote_addr, cause = %e, "connection failed");
                }
            });
        }

        debug!(worker = self.index, "worker stopped accepting");
    }
}

/// Handle of a running server.
///
/// Dropping the handle shuts the server down without waiting for the workers.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    token: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    reaper: Option<ReaperHandle>,
}

impl ServerHandle {
    /// The address the server listens on, with the actual port when bound to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting and closes every open connection.
    pub fn shutdown(&self) {
        info!(local_addr = %self.local_addr, "shutting down server");
        self.token.cancel();
    }

    /// Waits until every worker stopped, which only happens after [`shutdown`](Self::shutdown).
    pub fn join(mut self) -> Result<(), ServerError> {
        let mut result = Ok(());
        for worker in mem::take(&mut self.workers) {
            if worker.join().is_err() {
                result = Err(ServerError::WorkerPanicked);
            }
        }
        if let Some(reaper) = self.reaper.take() {
            reaper.shutdown();
        }
        result
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
