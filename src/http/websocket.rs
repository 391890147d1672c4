//! WebSocket proxy engine.
//!
//! The downstream leg is an axum upgrade; the upstream leg is a
//! tokio-tungstenite client connection. Messages are pumped both ways until
//! either side closes, which closes the other.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::http::HeaderValue;
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message as TgMessage};
use tracing::{info, warn};
use url::Url;

use crate::http::context::{InboundContext, X_FORWARDED_FOR, X_FORWARDED_HOST};
use crate::observability::metrics;

/// Upstream WebSocket URL: the target origin with a ws/wss scheme and the
/// inbound path and query appended.
pub fn upstream_url(target: &Url, secure: bool, ctx: &InboundContext) -> Option<Url> {
    let scheme = if secure || matches!(target.scheme(), "https" | "wss") {
        "wss"
    } else {
        "ws"
    };
    let mut url = target.clone();
    url.set_scheme(scheme).ok()?;
    url.set_path(ctx.uri.path());
    url.set_query(ctx.uri.query());
    Some(url)
}

/// Proxy an upgraded client socket to the upstream URL. The upstream
/// handshake carries the client's subprotocol offer so `Sec-WebSocket-*`
/// negotiation passes through, plus the forwarded-* headers the same way
/// the HTTP engine injects them. Dropping out of this function closes the
/// client socket; upgrade failures stay silent.
pub async fn run(client_ws: WebSocket, upstream: Url, ctx: InboundContext, timeout: Duration) {
    let mut request = match upstream.as_str().into_client_request() {
        Ok(r) => r,
        Err(e) => {
            warn!(upstream = %upstream, error = %e, "Invalid upstream WebSocket request");
            return;
        }
    };
    if let Some(protocol) = ctx.headers.get("sec-websocket-protocol") {
        request
            .headers_mut()
            .insert("sec-websocket-protocol", protocol.clone());
    }

    // Always the immediate peer; client-supplied values are discarded.
    request.headers_mut().insert(
        X_FORWARDED_FOR,
        HeaderValue::from_str(&ctx.peer.ip().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    match ctx.host.as_deref().and_then(|h| HeaderValue::from_str(h).ok()) {
        Some(host) => {
            request.headers_mut().insert(X_FORWARDED_HOST, host);
        }
        None => {
            request.headers_mut().remove(X_FORWARDED_HOST);
        }
    }

    let (upstream_ws, _) = match tokio::time::timeout(timeout, connect_async(request)).await {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            warn!(upstream = %upstream, error = %e, "Upstream WebSocket connect failed");
            return;
        }
        Err(_) => {
            warn!(upstream = %upstream, timeout_secs = timeout.as_secs(), "Upstream WebSocket handshake timed out");
            return;
        }
    };

    metrics::record_ws_session(1);
    info!(upstream = %upstream, peer = %ctx.peer, "WebSocket session open");

    let (mut up_sink, mut up_stream) = upstream_ws.split();
    let (mut down_sink, mut down_stream) = client_ws.split();

    let client_to_upstream = async {
        while let Some(Ok(msg)) = down_stream.next().await {
            let forward = match msg {
                Message::Text(t) => TgMessage::Text(t.to_string().into()),
                Message::Binary(b) => TgMessage::Binary(b),
                Message::Ping(p) => TgMessage::Ping(p),
                Message::Pong(p) => TgMessage::Pong(p),
                Message::Close(frame) => TgMessage::Close(frame.map(to_tungstenite_close)),
            };
            if up_sink.send(forward).await.is_err() {
                break;
            }
        }
    };

    let upstream_to_client = async {
        while let Some(Ok(msg)) = up_stream.next().await {
            let forward = match msg {
                TgMessage::Text(t) => Message::Text(t.to_string().into()),
                TgMessage::Binary(b) => Message::Binary(b),
                TgMessage::Ping(p) => Message::Ping(p),
                TgMessage::Pong(p) => Message::Pong(p),
                TgMessage::Close(frame) => Message::Close(frame.map(to_axum_close)),
                // Raw frames never surface from a read loop.
                _ => continue,
            };
            if down_sink.send(forward).await.is_err() {
                break;
            }
        }
    };

    // Either direction ending tears down the session; dropping the halves
    // closes both sockets.
    tokio::select! {
        _ = client_to_upstream => {},
        _ = upstream_to_client => {},
    }

    metrics::record_ws_session(-1);
    info!(upstream = %upstream, peer = %ctx.peer, "WebSocket session closed");
}

fn to_tungstenite_close(frame: axum::extract::ws::CloseFrame) -> tungstenite::protocol::CloseFrame {
    tungstenite::protocol::CloseFrame {
        code: frame.code.into(),
        reason: frame.reason.to_string().into(),
    }
}

fn to_axum_close(frame: tungstenite::protocol::CloseFrame) -> axum::extract::ws::CloseFrame {
    axum::extract::ws::CloseFrame {
        code: frame.code.into(),
        reason: frame.reason.to_string().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn ctx(uri: &str) -> InboundContext {
        InboundContext::new(
            "127.0.0.1:5000".parse().unwrap(),
            Method::GET,
            uri.parse().unwrap(),
            axum::http::HeaderMap::new(),
        )
    }

    #[test]
    fn plain_target_gets_ws_scheme() {
        let target = Url::parse("http://backend.internal:9001").unwrap();
        let url = upstream_url(&target, false, &ctx("/socket?room=7")).unwrap();
        assert_eq!(url.as_str(), "ws://backend.internal:9001/socket?room=7");
    }

    #[test]
    fn secure_flag_selects_wss() {
        let target = Url::parse("http://backend.internal").unwrap();
        let url = upstream_url(&target, true, &ctx("/socket")).unwrap();
        assert_eq!(url.scheme(), "wss");
    }

    #[test]
    fn https_target_selects_wss() {
        let target = Url::parse("https://backend.internal").unwrap();
        let url = upstream_url(&target, false, &ctx("/socket")).unwrap();
        assert_eq!(url.scheme(), "wss");
    }
}
