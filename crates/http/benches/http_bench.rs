use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use criterion::{Criterion, criterion_group, criterion_main};
use ring_http::codec::{RequestDecoder, ResponseEncoder};
use ring_http::connection::{Action, ConnectionContext, ConnectionHandle, Event, Session};
use ring_http::handler::make_handler;
use ring_http::protocol::{Request, Response};
use tokio_util::codec::{Decoder, Encoder};
use tokio_util::sync::CancellationToken;

fn test_handler(_request: Request) -> Response {
    Response::builder().status(200).header("Content-Length", 12).body("Hello World!").build()
}

fn bench_request_decoder(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

    c.bench_function("decode_simple_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut bytes = BytesMut::from(&request[..]);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });
}

fn bench_response_encoder(c: &mut Criterion) {
    let response = test_handler_response();

    c.bench_function("encode_simple_response", |b| {
        let mut encoder = ResponseEncoder::new();
        let mut bytes = BytesMut::with_capacity(1024);
        b.iter(|| {
            bytes.clear();
            encoder.encode(black_box(&response), &mut bytes).unwrap();
        });
    });
}

fn test_handler_response() -> Response {
    Response::builder().status(200).header("Content-Type", "text/plain").header("Content-Length", 12).body("Hello World!").build()
}

fn bench_session(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
    let context = Arc::new(ConnectionContext::new(8 * 1024, 8 * 1024, Duration::from_secs(60)));
    let handler = Arc::new(make_handler(test_handler));
    let token = CancellationToken::new();

    c.bench_function("process_simple_request", |b| {
        let mut session = Session::new(Arc::clone(&context), Arc::clone(&handler), ConnectionHandle::new(&token));
        session.on_event(Event::Accepted);
        b.iter(|| {
            session.input_mut().extend_from_slice(request);
            let action = session.on_event(Event::Read(request.len()));
            debug_assert_eq!(action, Action::Write);
            let written = session.output().len();
            black_box(session.on_event(Event::Written(written)));
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_response_encoder, bench_session);
criterion_main!(benches);
