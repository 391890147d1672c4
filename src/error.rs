//! Error definitions shared across subsystems.

use thiserror::Error;

/// Errors raised while loading configuration and route documents.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a document or bundle from disk failed.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The route document was not valid JSON.
    #[error("parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A route entry could not be converted into a route spec.
    #[error("invalid route spec for pattern {pattern}: {reason}")]
    InvalidRoute { pattern: String, reason: String },
}

/// Errors raised while building the route table.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A route pattern was not a valid wildcard expression.
    #[error("invalid pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A CIDR entry in a route's allow list did not parse.
    #[error("invalid CIDR {cidr} on pattern {pattern}")]
    Cidr { pattern: String, cidr: String },
}

/// Errors raised while loading TLS key material.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificate found in {0}")]
    NoCertificate(String),

    #[error("no private key found in {0}")]
    NoKey(String),

    #[error("unusable key material in {path}: {reason}")]
    BadKey { path: String, reason: String },
}

/// Error returned by route-supplied hooks and handlers.
///
/// Hooks are opaque extensions; all the pipeline needs is a message to log
/// before surfacing 502 downstream.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<std::io::Error> for HookError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}
