//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use gateway_server::config::ServerConfig;
use gateway_server::{Application, HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// A server running in the background on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<()>,
}

impl TestServer {
    /// Stop the accept loop and wait for it to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .unwrap();
    }
}

pub fn loopback_config() -> ServerConfig {
    ServerConfig {
        bind_host: "127.0.0.1".into(),
        bind_port: 0,
        backlog: 16,
        ..ServerConfig::default()
    }
}

/// Bind and start serving `app`.
pub async fn start_server<A: Application + 'static>(app: A) -> TestServer {
    let server = HttpServer::bind(&loopback_config(), app).await.unwrap();
    let addr = server.local_addr();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();

    let handle = tokio::spawn(async move {
        server.run(receiver).await;
    });

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Send raw bytes and read until the server closes the connection.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    read_response(&mut stream).await
}

#[allow(dead_code)]
pub async fn read_response(stream: &mut TcpStream) -> String {
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("timed out waiting for response")
        .unwrap();
    String::from_utf8(response).unwrap()
}

/// Split a response into (status line + headers, body).
#[allow(dead_code)]
pub fn split_response(response: &str) -> (Vec<&str>, &str) {
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("response has no blank line");
    (head.split("\r\n").collect(), body)
}
