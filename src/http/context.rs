//! Per-request state.

use std::net::SocketAddr;

use axum::http::{HeaderMap, Method, Uri};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Everything about the inbound request that admission, dispatch and hooks
/// need after the request body has been handed to the proxy engine.
///
/// Built once per request; the resolved route travels alongside it so no
/// stage looks the route up twice.
#[derive(Debug, Clone)]
pub struct InboundContext {
    /// Immediate TCP peer. This, never a client-supplied header, is what
    /// gets injected as `x-forwarded-for` upstream.
    pub peer: SocketAddr,
    /// Host header value, when the client sent one.
    pub host: Option<String>,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl InboundContext {
    pub fn new(
        peer: SocketAddr,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
    ) -> Self {
        let host = headers
            .get(axum::http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .or_else(|| uri.authority().map(|a| a.as_str().to_owned()));
        Self {
            peer,
            host,
            method,
            uri,
            headers,
        }
    }

    /// Client-supplied forwarded-for value, used only for CIDR admission.
    pub fn forwarded_for(&self) -> Option<&str> {
        self.headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }
}
