//! Process entry point: wire configuration, route table, TLS material and
//! the flood gate together, then serve until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edge_proxy::config::{load_routes, ProxyConfig};
use edge_proxy::http::{build_app, AppState, Responder};
use edge_proxy::observability::metrics;
use edge_proxy::routing::RouteTable;
use edge_proxy::security::FloodGate;
use edge_proxy::tls;
use edge_proxy::tls::store::CertStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edge_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ProxyConfig::from_env();
    tracing::info!(
        port = config.port,
        max_calls_per_second = config.max_calls_per_second,
        path_file = %config.path_file.display(),
        "Configuration loaded"
    );

    let routes = load_routes(&config)?;
    let table = Arc::new(RouteTable::build(routes)?);
    tracing::info!(routes = table.len(), "Route table built");

    let store = Arc::new(CertStore::load(&config.ssl_dir)?);
    let responder = Arc::new(Responder::load(&config.responses_dir));

    let flood = Arc::new(FloodGate::new(config.max_calls_per_second));
    let _drain = flood.spawn_drain();

    if let Some(addr) = config.metrics_address {
        metrics::init_metrics(addr);
    }

    let state = AppState::new(&config, table, flood, responder);
    let app = build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let tls_config =
        axum_server::tls_rustls::RustlsConfig::from_config(Arc::new(tls::server_config(store)));

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to install Ctrl+C handler");
            return;
        }
        tracing::info!("Shutdown signal received");
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(5)));
    });

    tracing::info!(address = %addr, "Listening for TLS connections");
    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
