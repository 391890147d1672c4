//! HTTP server setup and the admission pipeline.
//!
//! # Responsibilities
//! - Build the axum app with the catch-all gateway handler
//! - Demultiplex regular requests from WebSocket upgrades
//! - Run admission: flood gate → path allow-list → route resolve → CIDR
//! - Hand admitted requests to the dispatcher

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, HeaderMap, Request, Response, StatusCode};
use axum::routing::any;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::schema::{ProxyConfig, Target};
use crate::http::context::InboundContext;
use crate::http::dispatch;
use crate::http::proxy::{self, UpstreamClient};
use crate::http::respond::{close_without_body, Denial, Responder};
use crate::http::websocket;
use crate::observability::metrics;
use crate::routing::{Route, RouteTable};
use crate::security::{cidr, FloodGate};

/// Application state injected into the gateway handler.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RouteTable>,
    pub flood: Arc<FloodGate>,
    pub responder: Arc<Responder>,
    pub client: UpstreamClient,
    pub upstream_timeout: Duration,
}

impl AppState {
    pub fn new(
        config: &ProxyConfig,
        table: Arc<RouteTable>,
        flood: Arc<FloodGate>,
        responder: Arc<Responder>,
    ) -> Self {
        Self {
            table,
            flood,
            responder,
            client: proxy::upstream_client(),
            upstream_timeout: Duration::from_secs(config.upstream_timeout_secs),
        }
    }
}

/// Build the axum app: every method on every path goes through the gateway.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", any(gateway))
        .route("/{*path}", any(gateway))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Entry point for every request.
async fn gateway(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response<Body> {
    let ctx = InboundContext::new(
        peer,
        request.method().clone(),
        request.uri().clone(),
        request.headers().clone(),
    );

    if is_upgrade(request.headers()) {
        return upgrade_flow(state, ctx, request).await;
    }

    // 1. Global flood gate.
    if !state.flood.admit() {
        tracing::warn!(peer = %peer, "Flood protection tripped");
        metrics::record_admission(Denial::RateLimited.as_str());
        return state.responder.reject(Denial::RateLimited);
    }

    // 2. Path allow-list: tells operators "not configured" apart from
    //    "forbidden" before any route state is consulted.
    if !state.table.is_allowed(ctx.path()) {
        tracing::debug!(path = %ctx.path(), "Path matches no pattern");
        metrics::record_admission(Denial::PathUnknown.as_str());
        return state.responder.reject(Denial::PathUnknown);
    }

    // 3. Route resolution with host narrowing.
    let Some(route) = state.table.resolve(ctx.path(), ctx.host.as_deref()) else {
        tracing::debug!(path = %ctx.path(), host = ?ctx.host, "No route after host narrowing");
        metrics::record_admission(Denial::NoRoute.as_str());
        return state.responder.reject(Denial::NoRoute);
    };

    // 4. Per-route CIDR admission.
    if !cidr::admit(
        route.allowed_nets.as_deref(),
        route.spec.ignore_proxied_ip,
        peer.ip(),
        ctx.forwarded_for(),
    ) {
        tracing::warn!(peer = %peer, pattern = %route.pattern, "CIDR admission rejected");
        metrics::record_admission(Denial::IpBanned.as_str());
        return state.responder.reject(Denial::IpBanned);
    }

    metrics::record_admission("admitted");
    dispatch::dispatch(&state, &ctx, &route, request).await
}

/// WebSocket upgrades resolve the route and run the CIDR check, but skip
/// the flood gate and the allow-list probe. Every failure closes the
/// connection without a body.
async fn upgrade_flow(
    state: AppState,
    ctx: InboundContext,
    request: Request<Body>,
) -> Response<Body> {
    let Some(route) = state.table.resolve(ctx.path(), ctx.host.as_deref()) else {
        tracing::debug!(path = %ctx.path(), "No route for upgrade");
        return close_without_body(StatusCode::NOT_FOUND);
    };

    if !cidr::admit(
        route.allowed_nets.as_deref(),
        route.spec.ignore_proxied_ip,
        ctx.peer.ip(),
        ctx.forwarded_for(),
    ) {
        tracing::warn!(peer = %ctx.peer, pattern = %route.pattern, "CIDR rejected upgrade");
        return close_without_body(StatusCode::FORBIDDEN);
    }

    let Some(upstream) = ws_target(&route, &ctx) else {
        tracing::warn!(pattern = %route.pattern, "Route cannot serve upgrades");
        return close_without_body(StatusCode::FORBIDDEN);
    };

    let (mut parts, _body) = request.into_parts();
    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(u) => u,
        Err(e) => {
            tracing::debug!(error = %e, "Malformed upgrade request");
            return close_without_body(StatusCode::BAD_REQUEST);
        }
    };

    let timeout = state.upstream_timeout;
    upgrade.on_upgrade(move |socket| websocket::run(socket, upstream, ctx, timeout))
}

/// Upstream WebSocket URL for an upgrade, if the route allows one: the
/// route must be flagged `websocket` and carry a single remote target.
fn ws_target(route: &Route, ctx: &InboundContext) -> Option<url::Url> {
    if !route.spec.websocket {
        return None;
    }
    match &route.spec.target {
        Some(Target::Remote(url)) => websocket::upstream_url(url, route.spec.secure, ctx),
        _ => None,
    }
}

/// Upgrade demultiplex: `Connection: upgrade` plus `Upgrade: websocket`.
fn is_upgrade(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        });
    let upgrade_websocket = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));
    connection_upgrade && upgrade_websocket
}
