use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ring_http::config::Options;
use ring_http::handler::make_handler;
use ring_http::protocol::{Method, PayloadItem, Request, Response};
use ring_http::server::Server;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let options = Options::builder().host("127.0.0.1").port(8080).build();
    let handle = match Server::new(options, make_handler(route)).start() {
        Ok(handle) => handle,
        Err(e) => {
            error!(cause = %e, "can't start server");
            return;
        }
    };

    info!(addr = %handle.local_addr(), "start listening");
    if let Err(e) = handle.join() {
        error!(cause = %e, "server stopped with error");
    }
}

fn route(request: Request) -> Response {
    let path = request.path().to_string();
    match (request.method(), path.as_str()) {
        (Method::Get, "/") => text(200, "Hello World!\r\n".to_string()),
        (Method::Post, "/echo") if request.is_chunked() => upload(&request),
        (Method::Post, "/echo") => {
            info!(len = request.body().len(), "receiving request body");
            Response::builder()
                .header("Content-Type", request.header("Content-Type").unwrap_or("application/octet-stream"))
                .header("Content-Length", request.body().len())
                .body(request.into_body())
                .build()
        }
        _ => text(404, "404 not found\r\n".to_string()),
    }
}

/// Chunked bodies arrive after the handler returned, so only their size is logged.
fn upload(request: &Request) -> Response {
    let received = Arc::new(AtomicUsize::new(0));
    let path = request.path().to_string();
    request.on_chunk(move |item| match item {
        PayloadItem::Chunk(bytes) => {
            received.fetch_add(bytes.len(), Ordering::Relaxed);
        }
        PayloadItem::Eof => info!(%path, len = received.load(Ordering::Relaxed), "received chunked body"),
    });
    text(202, "accepted\r\n".to_string())
}

fn text(status: u16, body: String) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .header("Content-Length", body.len())
        .body(body)
        .build()
}
