//! HTTP reverse proxy engine.
//!
//! Rebuilds the inbound request against the upstream origin, injects the
//! forwarded-* headers, runs the route's request hook, performs the exchange
//! under a timeout, then decorates the downstream response (CORS reflection,
//! response hook) and streams the body through unbuffered.

use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{PathAndQuery, Scheme};
use axum::http::{header, HeaderValue, Request, Response, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use url::Url;

use crate::http::context::{InboundContext, X_FORWARDED_FOR, X_FORWARDED_HOST};
use crate::http::respond::{Denial, Responder};
use crate::observability::metrics;
use crate::routing::Route;

pub type UpstreamClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, Body>;

/// Build the shared upstream client. One client serves both plain and TLS
/// origins; the request URI's scheme picks the leg.
pub fn upstream_client() -> UpstreamClient {
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .expect("native root certificates unavailable")
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector)
}

// Connection-scoped headers must not travel to the next hop.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Proxy one request to `target` and return the downstream response. All
/// failures (bad target authority, hook errors, connect/transport errors,
/// timeout) collapse to 502 through the responder.
pub async fn forward(
    client: &UpstreamClient,
    responder: &Responder,
    route: &Route,
    ctx: &InboundContext,
    target: &Url,
    timeout: Duration,
    request: Request<Body>,
) -> Response<Body> {
    let mut outbound = match rewrite_for_upstream(route, ctx, target, request) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(pattern = %route.pattern, error = %e, "Unusable upstream target");
            return responder.reject(Denial::Upstream);
        }
    };

    if let Some(hook) = &route.spec.rewrite_request {
        if let Err(e) = hook.rewrite(&mut outbound, ctx) {
            tracing::warn!(pattern = %route.pattern, error = %e, "Request hook failed");
            return responder.reject(Denial::Upstream);
        }
    }

    let upstream = match tokio::time::timeout(timeout, client.request(outbound)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(pattern = %route.pattern, error = %e, "Upstream request failed");
            metrics::record_upstream_error("transport");
            return responder.reject(Denial::Upstream);
        }
        Err(_) => {
            tracing::error!(pattern = %route.pattern, timeout_secs = timeout.as_secs(), "Upstream request timed out");
            metrics::record_upstream_error("timeout");
            return responder.reject(Denial::Upstream);
        }
    };

    metrics::record_upstream_status(upstream.status().as_u16());

    let (parts, body) = upstream.into_parts();
    let mut response = Response::from_parts(parts, Body::new(body));
    strip_hop_by_hop(response.headers_mut());

    if route.spec.enable_cors {
        reflect_cors(ctx, &mut response);
    }

    if let Some(hook) = &route.spec.rewrite_response {
        if let Err(e) = hook.rewrite(&mut response, ctx) {
            tracing::warn!(pattern = %route.pattern, error = %e, "Response hook failed");
            return responder.reject(Denial::Upstream);
        }
    }

    response
}

/// Point the request at the upstream origin, keeping the inbound path and
/// query, and overwrite the forwarded-* headers with trusted values.
fn rewrite_for_upstream(
    route: &Route,
    ctx: &InboundContext,
    target: &Url,
    request: Request<Body>,
) -> Result<Request<Body>, axum::http::Error> {
    let (mut parts, body) = request.into_parts();

    let scheme = if route.spec.secure || target.scheme() == "https" {
        Scheme::HTTPS
    } else {
        Scheme::HTTP
    };

    let mut authority = target.host_str().unwrap_or_default().to_string();
    if let Some(port) = target.port() {
        authority.push_str(&format!(":{port}"));
    }

    let path_and_query = parts
        .uri
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));

    parts.uri = Uri::builder()
        .scheme(scheme)
        .authority(authority.as_str())
        .path_and_query(path_and_query)
        .build()?;

    strip_hop_by_hop(&mut parts.headers);

    // Always the immediate peer; client-supplied values are discarded.
    parts.headers.insert(
        X_FORWARDED_FOR,
        HeaderValue::from_str(&ctx.peer.ip().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    match ctx.host.as_deref().and_then(|h| HeaderValue::from_str(h).ok()) {
        Some(host) => {
            parts.headers.insert(X_FORWARDED_HOST, host);
        }
        None => {
            parts.headers.remove(X_FORWARDED_HOST);
        }
    }
    // The upstream sees its own name, not ours.
    parts.headers.remove(header::HOST);

    Ok(Request::from_parts(parts, body))
}

fn strip_hop_by_hop(headers: &mut axum::http::HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Permissive CORS reflection: echo whatever the client asked for. Written
/// on the downstream response before the response hook runs.
fn reflect_cors(ctx: &InboundContext, response: &mut Response<Body>) {
    let headers = response.headers_mut();
    if let Some(method) = ctx.headers.get("access-control-request-method") {
        headers.insert("access-control-allow-methods", method.clone());
    }
    if let Some(requested) = ctx.headers.get("access-control-request-headers") {
        headers.insert("access-control-allow-headers", requested.clone());
    }
    if let Some(origin) = ctx.headers.get(header::ORIGIN) {
        headers.insert("access-control-allow-origin", origin.clone());
        headers.insert(
            "access-control-allow-credentials",
            HeaderValue::from_static("true"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn ctx(peer: &str, headers: &[(&str, &str)]) -> InboundContext {
        let mut map = axum::http::HeaderMap::new();
        for (k, v) in headers {
            map.insert(
                axum::http::HeaderName::try_from(*k).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        InboundContext::new(
            peer.parse().unwrap(),
            Method::GET,
            "/api/users?page=2".parse().unwrap(),
            map,
        )
    }

    fn sample_route(secure: bool) -> std::sync::Arc<Route> {
        use crate::config::schema::RouteSpec;
        use crate::routing::RouteTable;
        let spec = RouteSpec {
            target: Some(crate::config::schema::Target::Remote(
                Url::parse("http://unused.internal").unwrap(),
            )),
            secure,
            ..RouteSpec::default()
        };
        let table = RouteTable::build(vec![("/api*".to_string(), spec)]).unwrap();
        table.resolve("/api/users", None).unwrap()
    }

    #[test]
    fn forwarded_headers_overwrite_client_values() {
        let route = sample_route(false);
        let ctx = ctx(
            "10.1.2.3:55000",
            &[("host", "svc.example"), ("x-forwarded-for", "8.8.8.8")],
        );
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/users?page=2")
            .header("x-forwarded-for", "8.8.8.8")
            .body(Body::empty())
            .unwrap();

        let target = Url::parse("http://backend.internal:3000").unwrap();
        let out = rewrite_for_upstream(&route, &ctx, &target, request).unwrap();

        assert_eq!(out.uri().to_string(), "http://backend.internal:3000/api/users?page=2");
        assert_eq!(out.headers()[X_FORWARDED_FOR], "10.1.2.3");
        assert_eq!(out.headers()[X_FORWARDED_HOST], "svc.example");
    }

    #[test]
    fn secure_route_upgrades_scheme() {
        let route = sample_route(true);
        let ctx = ctx("10.1.2.3:55000", &[]);
        let request = Request::builder()
            .uri("/api/users")
            .body(Body::empty())
            .unwrap();
        let target = Url::parse("http://backend.internal").unwrap();
        let out = rewrite_for_upstream(&route, &ctx, &target, request).unwrap();
        assert_eq!(out.uri().scheme_str(), Some("https"));
    }

    #[test]
    fn hop_by_hop_headers_are_stripped() {
        let route = sample_route(false);
        let ctx = ctx("10.1.2.3:55000", &[]);
        let request = Request::builder()
            .uri("/api/users")
            .header("connection", "keep-alive")
            .header("te", "trailers")
            .header("x-custom", "kept")
            .body(Body::empty())
            .unwrap();
        let target = Url::parse("http://backend.internal").unwrap();
        let out = rewrite_for_upstream(&route, &ctx, &target, request).unwrap();
        assert!(out.headers().get("connection").is_none());
        assert!(out.headers().get("te").is_none());
        assert_eq!(out.headers()["x-custom"], "kept");
    }

    #[test]
    fn cors_reflects_request_metadata() {
        let ctx = ctx(
            "10.1.2.3:55000",
            &[
                ("origin", "https://a.test"),
                ("access-control-request-method", "PATCH"),
            ],
        );
        let mut response = Response::new(Body::empty());
        reflect_cors(&ctx, &mut response);
        assert_eq!(response.headers()["access-control-allow-origin"], "https://a.test");
        assert_eq!(response.headers()["access-control-allow-credentials"], "true");
        assert_eq!(response.headers()["access-control-allow-methods"], "PATCH");
        assert!(response.headers().get("access-control-allow-headers").is_none());
    }
}
