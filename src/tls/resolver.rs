//! SNI-driven certificate resolution.

use std::sync::Arc;

use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;

use crate::tls::store::CertStore;

/// Resolves the handshake certificate from the client-presented SNI name.
///
/// Exact lowercase match into the store; anything else (no SNI, unknown
/// host) serves the default credential.
#[derive(Debug)]
pub struct SniResolver {
    store: Arc<CertStore>,
}

impl SniResolver {
    pub fn new(store: Arc<CertStore>) -> Self {
        Self { store }
    }
}

impl ResolvesServerCert for SniResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        match client_hello.server_name() {
            Some(name) => self
                .store
                .lookup(name)
                .or_else(|| Some(self.store.default_pair())),
            None => Some(self.store.default_pair()),
        }
    }
}
