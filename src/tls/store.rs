//! Certificate store: default pair plus per-hostname pairs.
//!
//! Layout on disk:
//! ```text
//! ssl/key.pem                      default private key
//! ssl/certificate.pem              default certificate chain
//! ssl/<hostname>/key.pem           per-SNI private key
//! ssl/<hostname>/certificate.pem   per-SNI certificate chain
//! ```
//! Directory names are the lowercased host names to match against SNI.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, RwLock};

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;

use crate::error::TlsError;

const KEY_FILE: &str = "key.pem";
const CERT_FILE: &str = "certificate.pem";

/// Prepared credentials keyed by lowercased host name, with a default.
///
/// The map is behind a lock because entries may still be appearing while the
/// listener is already accepting; after startup it is only read.
#[derive(Debug)]
pub struct CertStore {
    by_host: RwLock<HashMap<String, Arc<CertifiedKey>>>,
    default: Arc<CertifiedKey>,
}

impl CertStore {
    /// Walk the ssl directory: the default pair is required, per-host
    /// subdirectories are optional and skipped (with a warning) when their
    /// material is unreadable.
    pub fn load(dir: &Path) -> Result<Self, TlsError> {
        let default = load_pair(&dir.join(CERT_FILE), &dir.join(KEY_FILE))?;
        let store = Self {
            by_host: RwLock::new(HashMap::new()),
            default: Arc::new(default),
        };

        let entries = std::fs::read_dir(dir).map_err(|source| TlsError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(host) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match load_pair(&path.join(CERT_FILE), &path.join(KEY_FILE)) {
                Ok(pair) => {
                    tracing::info!(host = %host, "Loaded SNI certificate");
                    store.insert(host, pair);
                }
                Err(e) => {
                    tracing::warn!(host = %host, error = %e, "Skipping SNI certificate directory");
                }
            }
        }
        Ok(store)
    }

    /// Build a store from an already-prepared default pair (tests, embedders).
    pub fn with_default(default: CertifiedKey) -> Self {
        Self {
            by_host: RwLock::new(HashMap::new()),
            default: Arc::new(default),
        }
    }

    pub fn insert(&self, host: &str, pair: CertifiedKey) {
        self.by_host
            .write()
            .expect("cert store lock poisoned")
            .insert(host.to_ascii_lowercase(), Arc::new(pair));
    }

    /// Exact lowercased-hostname lookup; no suffix or wildcard matching, so
    /// an unrelated host can never receive another host's credential.
    pub fn lookup(&self, host: &str) -> Option<Arc<CertifiedKey>> {
        self.by_host
            .read()
            .expect("cert store lock poisoned")
            .get(&host.to_ascii_lowercase())
            .cloned()
    }

    pub fn default_pair(&self) -> Arc<CertifiedKey> {
        Arc::clone(&self.default)
    }
}

fn load_pair(cert_path: &Path, key_path: &Path) -> Result<CertifiedKey, TlsError> {
    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut BufReader::new(File::open(cert_path).map_err(|source| {
            TlsError::Io {
                path: cert_path.display().to_string(),
                source,
            }
        })?))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|source| TlsError::Io {
            path: cert_path.display().to_string(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificate(cert_path.display().to_string()));
    }

    let key: PrivateKeyDer<'static> =
        rustls_pemfile::private_key(&mut BufReader::new(File::open(key_path).map_err(
            |source| TlsError::Io {
                path: key_path.display().to_string(),
                source,
            },
        )?))
        .map_err(|source| TlsError::Io {
            path: key_path.display().to_string(),
            source,
        })?
        .ok_or_else(|| TlsError::NoKey(key_path.display().to_string()))?;

    let signing_key = rustls::crypto::aws_lc_rs::sign::any_supported_type(&key).map_err(|e| {
        TlsError::BadKey {
            path: key_path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    Ok(CertifiedKey::new(certs, signing_key))
}
