//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Once};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use edge_proxy::config::ProxyConfig;
use edge_proxy::http::{build_app, AppState, Responder};
use edge_proxy::routing::RouteTable;
use edge_proxy::security::FloodGate;

static CRYPTO_PROVIDER_INIT: Once = Once::new();

/// Integration test binaries link both rustls crypto backends (aws-lc-rs via
/// the proxy's own TLS stack, ring via reqwest's dev-dependency features),
/// so rustls can no longer auto-select a process-wide default. Pin one
/// explicitly before any test spins up a proxy that touches TLS config.
fn ensure_crypto_provider() {
    CRYPTO_PROVIDER_INIT.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

/// Start the proxy app on an ephemeral plain-TCP port. The pipeline under
/// test is TLS-agnostic; TLS termination is exercised separately.
pub async fn spawn_proxy(table: RouteTable, budget: u64) -> SocketAddr {
    spawn_proxy_with(table, budget, Responder::default()).await
}

pub async fn spawn_proxy_with(table: RouteTable, budget: u64, responder: Responder) -> SocketAddr {
    ensure_crypto_provider();
    let config = ProxyConfig::default();
    let state = AppState::new(
        &config,
        Arc::new(table),
        Arc::new(FloodGate::new(budget)),
        Arc::new(responder),
    );
    let app = build_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// Start a mock backend that returns a fixed body on every request.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// Start a mock backend that echoes the received request head (request line
/// and headers) back as the response body, so tests can assert on what the
/// proxy actually sent upstream.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            head.len(),
                            head
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                data.extend_from_slice(&buf[..n]);
                if data.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    let text = String::from_utf8_lossy(&data);
    text.split("\r\n\r\n").next().unwrap_or_default().to_string()
}

/// Send a raw HTTP/1.1 request and return the full response text. Used
/// where a real client would mask what we need to control (Host header,
/// forwarded-for values).
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    let _ = socket.read_to_end(&mut response).await;
    String::from_utf8_lossy(&response).to_string()
}
