//! Server configuration.
//!
//! [`Options`] can be built in code through [`Options::builder`] or deserialized with
//! serde; every missing field takes its default value.
//!
//! ```
//! use ring_http::config::Options;
//!
//! let options = Options::builder().port(0).threads(2).ttl_millis(5_000).build();
//! assert_eq!(options.threads(), 2);
//! assert_eq!(options.host(), "0.0.0.0");
//! ```

use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::DEFAULT_BUFFER_SIZE;
use crate::ensure;
use crate::server::ServerError;

const DEFAULT_TTL_MILLIS: u64 = 60_000;
const DEFAULT_REAP_INTERVAL_MILLIS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    host: String,
    port: u16,
    request_buffer_size: usize,
    response_buffer_size: usize,
    threads: usize,
    /// Idle time in milliseconds after which a connection is closed
    ttl: u64,
    /// Milliseconds between two reaper sweeps
    reap_interval: u64,
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder { options: Options::default() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Size of the input buffer of a connection, also the largest accepted request.
    pub fn request_buffer_size(&self) -> usize {
        self.request_buffer_size
    }

    /// Size of the output buffer of a connection, also the largest response.
    pub fn response_buffer_size(&self) -> usize {
        self.response_buffer_size
    }

    /// Number of worker threads accepting and serving connections.
    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval)
    }

    /// Rejects values the server can't run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        ensure!(self.threads > 0, ServerError::invalid_options("threads must be at least 1"));
        ensure!(self.request_buffer_size > 0, ServerError::invalid_options("request_buffer_size must not be 0"));
        ensure!(self.response_buffer_size > 0, ServerError::invalid_options("response_buffer_size must not be 0"));
        ensure!(self.reap_interval > 0, ServerError::invalid_options("reap_interval must not be 0"));
        Ok(())
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_buffer_size: DEFAULT_BUFFER_SIZE,
            response_buffer_size: DEFAULT_BUFFER_SIZE,
            threads: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            ttl: DEFAULT_TTL_MILLIS,
            reap_interval: DEFAULT_REAP_INTERVAL_MILLIS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.options.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }

    pub fn request_buffer_size(mut self, size: usize) -> Self {
        self.options.request_buffer_size = size;
        self
    }

    pub fn response_buffer_size(mut self, size: usize) -> Self {
        self.options.response_buffer_size = size;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.options.threads = threads;
        self
    }

    pub fn ttl_millis(mut self, ttl: u64) -> Self {
        self.options.ttl = ttl;
        self
    }

    pub fn reap_interval_millis(mut self, interval: u64) -> Self {
        self.options.reap_interval = interval;
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}
