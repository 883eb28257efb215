//! Request handlers.
//!
//! A [`Handler`] turns one decoded [`Request`] into one [`Response`]. It runs on the
//! worker thread that owns the connection, so it must not block for long: every other
//! connection of that worker waits meanwhile.
//!
//! Plain functions and closures become handlers through [`make_handler`]:
//!
//! ```
//! use ring_http::handler::make_handler;
//! use ring_http::protocol::{Request, Response};
//!
//! let handler = make_handler(|request: Request| {
//!     Response::builder().header("Content-Length", request.path().len()).body(request.path().to_string()).build()
//! });
//! # let _ = &handler;
//! ```

use crate::protocol::{Request, Response};

/// Produces the response of a request.
///
/// The body of `request` is a view into the connection input buffer, handlers are
/// expected to consume it before returning.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: Request) -> Response;
}

/// Adapter turning a function into a [`Handler`], see [`make_handler`].
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Response + Send + Sync + 'static,
{
    fn handle(&self, request: Request) -> Response {
        (self.f)(request)
    }
}

pub fn make_handler<F>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Response + Send + Sync + 'static,
{
    HandlerFn { f }
}
