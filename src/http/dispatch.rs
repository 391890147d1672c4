//! Dispatch: turn a resolved route into a response.

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use rand::Rng;
use url::Url;

use crate::config::schema::Target;
use crate::http::context::InboundContext;
use crate::http::proxy;
use crate::http::respond::Denial;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::Route;

const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Dispatch a non-upgrade request on its resolved route.
pub async fn dispatch(
    state: &AppState,
    ctx: &InboundContext,
    route: &Route,
    request: Request<Body>,
) -> Response<Body> {
    match &route.spec.target {
        None => {
            tracing::warn!(pattern = %route.pattern, "Route has no usable target");
            state.responder.reject(Denial::Misconfigured)
        }
        Some(Target::Handler(handler)) => match handler.handle(ctx).await {
            Ok(body) => ok_body(route, body.into(), "handler"),
            Err(e) => {
                tracing::error!(pattern = %route.pattern, error = %e, "Handler failed");
                state.responder.reject(Denial::Upstream)
            }
        },
        Some(Target::File(path)) => match tokio::fs::read(path).await {
            Ok(data) => ok_body(route, Body::from(data), "file"),
            Err(e) => {
                tracing::warn!(pattern = %route.pattern, path = %path.display(), error = %e, "File target unreadable");
                state.responder.reject(Denial::FileMissing)
            }
        },
        Some(Target::Remote(url)) => forward(state, ctx, route, url, request).await,
        Some(Target::Pool(urls)) => match pick(urls) {
            Some(url) => forward(state, ctx, route, url, request).await,
            None => {
                tracing::warn!(pattern = %route.pattern, "Empty target pool");
                state.responder.reject(Denial::Misconfigured)
            }
        },
    }
}

async fn forward(
    state: &AppState,
    ctx: &InboundContext,
    route: &Route,
    url: &Url,
    request: Request<Body>,
) -> Response<Body> {
    proxy::forward(
        &state.client,
        &state.responder,
        route,
        ctx,
        url,
        state.upstream_timeout,
        request,
    )
    .await
}

/// Uniform random pool member. No stickiness, no health tracking.
fn pick(urls: &[Url]) -> Option<&Url> {
    match urls {
        [] => None,
        [only] => Some(only),
        many => Some(&many[rand::thread_rng().gen_range(0..many.len())]),
    }
}

fn ok_body(route: &Route, body: Body, kind: &'static str) -> Response<Body> {
    let content_type = route
        .spec
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    metrics::record_dispatch(kind);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_of_one_always_selects_it() {
        let urls = vec![Url::parse("http://only.internal").unwrap()];
        for _ in 0..16 {
            assert_eq!(pick(&urls).unwrap().as_str(), "http://only.internal/");
        }
    }

    #[test]
    fn empty_pool_selects_nothing() {
        assert!(pick(&[]).is_none());
    }

    #[test]
    fn pick_stays_in_bounds() {
        let urls = vec![
            Url::parse("http://a.internal").unwrap(),
            Url::parse("http://b.internal").unwrap(),
            Url::parse("http://c.internal").unwrap(),
        ];
        for _ in 0..64 {
            assert!(urls.contains(pick(&urls).unwrap()));
        }
    }
}
