//! TLS termination.
//!
//! # Responsibilities
//! - Load the default and per-SNI certificate/key pairs from disk
//! - Resolve the certificate for each handshake from the presented SNI
//! - Build the rustls server configuration the listener runs on
//!
//! # Design Decisions
//! - rustls, no OpenSSL dependency
//! - One synchronous directory walk at startup; deterministic population
//! - Unknown or absent SNI falls back to the default credential

pub mod resolver;
pub mod store;

use std::sync::Arc;

use crate::tls::resolver::SniResolver;
use crate::tls::store::CertStore;

/// Build the server TLS configuration around the SNI resolver.
pub fn server_config(store: Arc<CertStore>) -> rustls::ServerConfig {
    let mut config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(SniResolver::new(store)));
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    config
}
