//! Configuration schema definitions.
//!
//! `ProxyConfig` is the process configuration, populated from the
//! environment. `RouteSpec` is the per-route record as it appears in the
//! route document, with the callable fields (handler target, rewrite hooks)
//! only attachable in memory.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

use crate::hooks::{Handler, RewriteRequest, RewriteResponse};

/// Process configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// TLS listener port (`PROXY_PORT`).
    pub port: u16,

    /// Global admitted-requests budget per second (`PROXY_MAX_CALLS_PER_SECOND`).
    pub max_calls_per_second: u64,

    /// Route document path (`PATH_FILE`).
    pub path_file: PathBuf,

    /// Directory of additional route bundles merged over the document.
    pub paths_dir: PathBuf,

    /// TLS key material root: `<ssl_dir>/key.pem` + `certificate.pem` for the
    /// default pair, `<ssl_dir>/<hostname>/` for per-SNI pairs.
    pub ssl_dir: PathBuf,

    /// Static error bodies, one `<code>.html` per status code.
    pub responses_dir: PathBuf,

    /// Upstream exchange timeout in seconds; expiry surfaces as 502.
    pub upstream_timeout_secs: u64,

    /// Optional Prometheus exporter bind address.
    pub metrics_address: Option<SocketAddr>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 443,
            max_calls_per_second: 1000,
            path_file: PathBuf::from("paths.json"),
            paths_dir: PathBuf::from("paths"),
            ssl_dir: PathBuf::from("ssl"),
            responses_dir: PathBuf::from("responses"),
            upstream_timeout_secs: 30,
            metrics_address: None,
        }
    }
}

impl ProxyConfig {
    /// Build a configuration from the environment, falling back to defaults
    /// on missing or unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("PROXY_PORT", defaults.port),
            max_calls_per_second: env_parse(
                "PROXY_MAX_CALLS_PER_SECOND",
                defaults.max_calls_per_second,
            ),
            path_file: std::env::var("PATH_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.path_file),
            metrics_address: std::env::var("PROXY_METRICS_ADDRESS")
                .ok()
                .and_then(|v| v.parse().ok()),
            ..defaults
        }
    }
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(var = key, value = %raw, "Unparsable environment value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Where a matched request is dispatched.
#[derive(Clone)]
pub enum Target {
    /// Single upstream origin.
    Remote(Url),
    /// Pool of upstream origins; one is chosen uniformly at random.
    Pool(Vec<Url>),
    /// Local file served as the response body.
    File(PathBuf),
    /// User-supplied handler computing the body.
    Handler(Arc<dyn Handler>),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Remote(url) => f.debug_tuple("Remote").field(url).finish(),
            Target::Pool(urls) => f.debug_tuple("Pool").field(urls).finish(),
            Target::File(path) => f.debug_tuple("File").field(path).finish(),
            Target::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::One(s) => match s.strip_prefix("file:") {
                Some(path) => Ok(Target::File(PathBuf::from(path))),
                None => Url::parse(&s)
                    .map(Target::Remote)
                    .map_err(serde::de::Error::custom),
            },
            Raw::Many(list) => list
                .iter()
                .map(|s| Url::parse(s))
                .collect::<Result<Vec<_>, _>>()
                .map(Target::Pool)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// A single route record.
///
/// Field names mirror the route document. Hooks and handlers are skipped by
/// serde; document-loaded routes carry data only.
#[derive(Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteSpec {
    /// Upstream target. Absent means the route is unusable and requests to
    /// it are rejected as misconfigured.
    #[serde(alias = "to")]
    pub target: Option<Target>,

    /// Lower wins among candidates; absent sorts last.
    pub priority: Option<i64>,

    /// Host-header values this route serves; empty or absent matches any
    /// host. Comparison is case-insensitive.
    pub hostnames: Vec<String>,

    /// Whether the upstream leg uses TLS.
    pub secure: bool,

    /// Whether the route serves WebSocket upgrades.
    pub websocket: bool,

    /// CIDR allow list. `None` means unrestricted; `Some([])` denies all.
    /// A non-list document value is treated as unrestricted.
    #[serde(deserialize_with = "lenient_cidr_list")]
    pub allowed_cidrs: Option<Vec<String>>,

    /// When true the forwarded-for address is not also required to be
    /// allow-listed.
    #[serde(rename = "ignoreProxiedIP")]
    pub ignore_proxied_ip: bool,

    /// MIME override for file and handler responses.
    pub content_type: Option<String>,

    /// Emit permissive CORS reflection headers on proxied responses.
    pub enable_cors: bool,

    /// Invoked on the outbound proxy request before it leaves.
    #[serde(skip)]
    pub rewrite_request: Option<Arc<dyn RewriteRequest>>,

    /// Invoked on the downstream response after CORS headers are written.
    #[serde(skip)]
    pub rewrite_response: Option<Arc<dyn RewriteResponse>>,
}

impl fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteSpec")
            .field("target", &self.target)
            .field("priority", &self.priority)
            .field("hostnames", &self.hostnames)
            .field("secure", &self.secure)
            .field("websocket", &self.websocket)
            .field("allowed_cidrs", &self.allowed_cidrs)
            .field("ignore_proxied_ip", &self.ignore_proxied_ip)
            .field("content_type", &self.content_type)
            .field("enable_cors", &self.enable_cors)
            .field("rewrite_request", &self.rewrite_request.as_ref().map(|_| ".."))
            .field("rewrite_response", &self.rewrite_response.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Documents in the wild carry `allowedCidrs: false` or similar to mean
/// "unrestricted"; only an actual array restricts.
fn lenient_cidr_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
        )),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_string_forms() {
        let remote: Target = serde_json::from_str("\"https://upstream.example\"").unwrap();
        assert!(matches!(remote, Target::Remote(_)));

        let file: Target = serde_json::from_str("\"file:/var/data/logo.svg\"").unwrap();
        match file {
            Target::File(path) => assert_eq!(path, PathBuf::from("/var/data/logo.svg")),
            other => panic!("expected file target, got {other:?}"),
        }

        let pool: Target =
            serde_json::from_str("[\"http://a.internal\", \"http://b.internal\"]").unwrap();
        match pool {
            Target::Pool(urls) => assert_eq!(urls.len(), 2),
            other => panic!("expected pool target, got {other:?}"),
        }
    }

    #[test]
    fn route_spec_accepts_to_alias() {
        let spec: RouteSpec =
            serde_json::from_str(r#"{"to": "https://u1", "priority": 5}"#).unwrap();
        assert!(matches!(spec.target, Some(Target::Remote(_))));
        assert_eq!(spec.priority, Some(5));
    }

    #[test]
    fn non_list_cidrs_mean_unrestricted() {
        let spec: RouteSpec =
            serde_json::from_str(r#"{"to": "https://u1", "allowedCidrs": false}"#).unwrap();
        assert!(spec.allowed_cidrs.is_none());

        let spec: RouteSpec =
            serde_json::from_str(r#"{"to": "https://u1", "allowedCidrs": []}"#).unwrap();
        assert_eq!(spec.allowed_cidrs, Some(vec![]));
    }

    #[test]
    fn missing_target_is_allowed() {
        let spec: RouteSpec = serde_json::from_str(r#"{"priority": 1}"#).unwrap();
        assert!(spec.target.is_none());
    }

    #[test]
    fn env_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.port, 443);
        assert_eq!(config.max_calls_per_second, 1000);
        assert_eq!(config.path_file, PathBuf::from("paths.json"));
    }
}
