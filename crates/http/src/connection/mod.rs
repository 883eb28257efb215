//! HTTP connection handling module
//!
//! This module ties the codec, the buffer pools and the reaper together for every
//! accepted connection.
//!
//! # Components
//!
//! - [`Session`]: socket independent state machine of one connection. It is told
//!   about completed reads and writes through [`Event`]s and answers with the next
//!   [`Action`] to submit
//! - [`HttpConnection`]: drives a session over a tokio byte stream
//! - [`ConnectionContext`]: buffer pools, reaper and ttl shared by all connections
//! - [`ConnectionHandle`]: identity and cancellation token of one connection

mod http_connection;
mod session;

pub use http_connection::HttpConnection;
pub use session::{Action, CloseReason, ConnectionContext, ConnectionHandle, Event, Session, SessionState};
