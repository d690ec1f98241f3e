//! A failing request cycle must never stop the accept loop.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use gateway_server::{application_fn, ResponseBody};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

mod common;

/// Picks a failure mode from the request path; `/` and `/lazy` succeed.
fn flaky_app(calls: Arc<AtomicU32>) -> impl gateway_server::Application {
    application_fn(move |ctx, start| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        match ctx.path_info() {
            "/error" => Err("handler failed".into()),
            "/panic" => panic!("handler panicked on request {n}"),
            "/no-start" => Ok(ResponseBody::once("body without status")),
            "/lazy-panic" => {
                start.start("200 OK", [("Content-Type", "text/plain")]);
                Ok(ResponseBody::new((0..2).map(|i| {
                    if i == 1 {
                        panic!("lazy chunk failed");
                    }
                    b"partial".to_vec()
                })))
            }
            "/lazy" => {
                start.start("200 OK", [("Content-Type", "text/plain")]);
                Ok(ResponseBody::new((0..3).map(|i| format!("chunk{i};").into_bytes())))
            }
            _ => {
                start.start("200 OK", [("Content-Type", "text/plain")]);
                Ok(ResponseBody::from(format!("ok {n}")))
            }
        }
    })
}

#[tokio::test]
async fn survives_every_cycle_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let server = common::start_server(flaky_app(calls.clone())).await;

    for path in ["/error", "/panic", "/no-start", "/lazy-panic"] {
        let request = format!("GET {path} HTTP/1.1\r\n\r\n");
        let response = common::send_raw(server.addr, request.as_bytes()).await;
        assert!(response.is_empty(), "{path} should close without a response");

        let ok = common::send_raw(server.addr, b"GET / HTTP/1.1\r\n\r\n").await;
        assert!(ok.starts_with("HTTP/1.1 200 OK\r\n"), "server died after {path}");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 8);
    server.stop().await;
}

#[tokio::test]
async fn lazy_body_is_produced_after_start() {
    let calls = Arc::new(AtomicU32::new(0));
    let server = common::start_server(flaky_app(calls.clone())).await;

    let response = common::send_raw(server.addr, b"GET /lazy HTTP/1.1\r\n\r\n").await;
    let (head, body) = common::split_response(&response);
    assert_eq!(head[0], "HTTP/1.1 200 OK");
    assert_eq!(body, "chunk0;chunk1;chunk2;");

    let again = common::send_raw(server.addr, b"GET /lazy-panic HTTP/1.1\r\n\r\n").await;
    assert!(again.is_empty());
    let after = common::send_raw(server.addr, b"GET /lazy HTTP/1.1\r\n\r\n").await;
    assert!(after.ends_with("\r\n\r\nchunk0;chunk1;chunk2;"));

    server.stop().await;
}

#[tokio::test]
async fn silent_client_is_closed_without_invoking_application() {
    let calls = Arc::new(AtomicU32::new(0));
    let server = common::start_server(flaky_app(calls.clone())).await;

    let mut silent = TcpStream::connect(server.addr).await.unwrap();
    silent.shutdown().await.unwrap();
    let leftover = common::read_response(&mut silent).await;
    assert!(leftover.is_empty());

    let ok = common::send_raw(server.addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(ok.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    server.stop().await;
}

#[tokio::test]
async fn client_that_disconnects_early_does_not_stop_server() {
    let calls = Arc::new(AtomicU32::new(0));
    let server = common::start_server(flaky_app(calls.clone())).await;

    {
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    }

    let ok = common::send_raw(server.addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(ok.starts_with("HTTP/1.1 200 OK\r\n"));

    server.stop().await;
}

#[tokio::test]
async fn malformed_request_line_degrades_to_empty_fields() {
    let app = application_fn(|ctx, start| {
        start.start("200 OK", Vec::<(String, String)>::new());
        Ok(ResponseBody::from(format!(
            "method=[{}] path=[{}]",
            ctx.request_method(),
            ctx.path_info()
        )))
    });
    let server = common::start_server(app).await;

    let response = common::send_raw(server.addr, b"NONSENSE\r\n\r\n").await;
    let (_, body) = common::split_response(&response);
    assert_eq!(body, "method=[] path=[]");

    server.stop().await;
}
