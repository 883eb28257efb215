//! A completion driven HTTP/1.1 server
//!
//! This crate provides an embeddable HTTP/1.1 server built around a resumable,
//! zero-copy request codec. Connections are modelled as state machines that are told
//! about completed reads and writes and answer with the next operation to submit, the
//! way a completion based I/O interface such as io_uring is driven.
//!
//! # Features
//!
//! - Resumable request decoding: requests may arrive split at any byte
//! - Pipelined requests decoded and answered in one pass
//! - Chunked transfer encoding, streamed to a per-request chunk handler
//! - Response status lines and header names memoized across all threads
//! - Pooled connection buffers
//! - Idle connections closed after a configurable ttl
//!
//! # Example
//!
//! ```no_run
//! use ring_http::config::Options;
//! use ring_http::handler::make_handler;
//! use ring_http::protocol::{Request, Response};
//! use ring_http::server::Server;
//! use tracing::{Level, info};
//! use tracing_subscriber::FmtSubscriber;
//!
//! fn hello_world(request: Request) -> Response {
//!     info!(path = request.path(), "receiving request");
//!
//!     let body = "Hello World!\r\n";
//!     Response::builder()
//!         .status(200)
//!         .header("Content-Type", "text/plain")
//!         .header("Content-Length", body.len())
//!         .body(body)
//!         .build()
//! }
//!
//! let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//! tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//! let options = Options::builder().host("127.0.0.1").port(8080).build();
//! let handle = Server::new(options, make_handler(hello_world)).start().expect("can't start server");
//! handle.join().expect("worker panicked");
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`protocol`]: Request, response and error types
//! - [`codec`]: Request decoding and response encoding
//! - [`pool`]: Lock-free pool of connection buffers
//! - [`reaper`]: Closes connections that stayed idle for too long
//! - [`connection`]: Per-connection state machine and its tokio driver
//! - [`handler`]: Request handler trait and utilities
//! - [`config`] / [`server`]: Options and the multi-threaded server
//!
//! ## Error Handling
//!
//! - [`protocol::ParseError`]: the request bytes are not valid HTTP
//! - [`protocol::SendError`]: the response does not fit the output buffer
//! - [`protocol::HttpError`]: either of the above, or a failing socket
//! - [`server::ServerError`]: the server can't start
//!
//! Request and response errors close the connection, they never reach the handler.
//!
//! # Limitations
//!
//! - HTTP/1.x only, no TLS
//! - A request, and every chunk of a chunked request, must fit in the request buffer
//! - A response must fit in the response buffer
//! - Maximum number of headers: 64

pub mod codec;
pub mod config;
pub mod connection;
pub mod handler;
pub mod pool;
pub mod protocol;
pub mod reaper;
pub mod server;

mod utils;
pub(crate) use utils::ensure;
