//! Error responder.
//!
//! Every rejection and failure in the pipeline funnels here. If a static
//! body was configured for the status code it is served; otherwise a short
//! plain-text fallback specific to the denial reason.

use std::collections::HashMap;
use std::path::Path;

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use bytes::Bytes;

/// Why a request is being rejected; carries the status and fallback body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Global flood gate tripped.
    RateLimited,
    /// No pattern matches the path at all.
    PathUnknown,
    /// Patterns matched but host narrowing left no route.
    NoRoute,
    /// Route resolved but its target is unusable.
    Misconfigured,
    /// Peer or forwarded address failed the route's CIDR check.
    IpBanned,
    /// File target unreadable.
    FileMissing,
    /// Upstream connect/transport failure, timeout, or handler error.
    Upstream,
}

impl Denial {
    pub fn status(self) -> StatusCode {
        match self {
            Denial::RateLimited | Denial::IpBanned | Denial::Misconfigured => {
                StatusCode::FORBIDDEN
            }
            Denial::PathUnknown | Denial::NoRoute | Denial::FileMissing => StatusCode::NOT_FOUND,
            Denial::Upstream => StatusCode::BAD_GATEWAY,
        }
    }

    fn fallback(self) -> &'static str {
        match self {
            Denial::RateLimited => "Flood protection",
            Denial::IpBanned => "ip banned",
            Denial::Misconfigured => "Path incorrectly configured",
            Denial::PathUnknown | Denial::NoRoute | Denial::FileMissing => "not found",
            Denial::Upstream => "server error",
        }
    }

    /// Label for admission metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Denial::RateLimited => "rate_limited",
            Denial::PathUnknown => "path_unknown",
            Denial::NoRoute => "no_route",
            Denial::Misconfigured => "misconfigured",
            Denial::IpBanned => "ip_banned",
            Denial::FileMissing => "file_missing",
            Denial::Upstream => "upstream",
        }
    }
}

/// Static bodies keyed by decimal status code, plus the fallback texts.
#[derive(Debug, Default)]
pub struct Responder {
    bodies: HashMap<String, Bytes>,
}

impl Responder {
    /// Scan a directory of `<code>.html` files. A missing directory just
    /// means every response uses the plain-text fallback.
    pub fn load(dir: &Path) -> Self {
        let mut bodies = HashMap::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Self { bodies };
        };
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "html") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.parse::<u16>().is_err() {
                continue;
            }
            match std::fs::read(&path) {
                Ok(data) => {
                    tracing::info!(code = %stem, path = %path.display(), "Loaded static error body");
                    bodies.insert(stem.to_string(), Bytes::from(data));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Unreadable static error body");
                }
            }
        }
        Self { bodies }
    }

    /// Register a static body for a status code, replacing any loaded one.
    pub fn insert(&mut self, code: u16, body: impl Into<Bytes>) {
        self.bodies.insert(code.to_string(), body.into());
    }

    /// Render the denial: static body when configured, plain-text fallback
    /// otherwise.
    pub fn reject(&self, denial: Denial) -> Response<Body> {
        let status = denial.status();
        let mut response = match self.bodies.get(status.as_str()) {
            Some(body) => {
                let mut r = Response::new(Body::from(body.clone()));
                r.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/html"),
                );
                r
            }
            None => {
                let mut r = Response::new(Body::from(denial.fallback()));
                r.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain"),
                );
                r
            }
        };
        *response.status_mut() = status;
        response
    }
}

/// For failed WebSocket upgrades: status only, no body, close the
/// connection. The upgrade flow never explains itself to the client.
pub fn close_without_body(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONNECTION,
        HeaderValue::from_static("close"),
    );
    response
}
