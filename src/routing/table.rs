//! Route table: ordered route set with best-match lookup.

use std::sync::Arc;

use ipnet::IpNet;

use crate::config::schema::RouteSpec;
use crate::error::RoutingError;
use crate::routing::matcher::PathPattern;

/// A compiled route: the document pattern, its predicate, the spec, and the
/// CIDR allow list parsed up front so admission never parses per request.
#[derive(Debug)]
pub struct Route {
    pub pattern: String,
    matcher: PathPattern,
    pub spec: RouteSpec,
    /// `None` = unrestricted, `Some([])` = deny all.
    pub allowed_nets: Option<Vec<IpNet>>,
    /// Position in the table; breaks priority ties.
    index: usize,
}

impl Route {
    /// Effective priority: absent sorts after every explicit value.
    fn effective_priority(&self) -> i64 {
        self.spec.priority.unwrap_or(i64::MAX)
    }
}

/// Immutable, insertion-ordered route set.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Compile an insertion-ordered (pattern, spec) list into a table.
    pub fn build(entries: Vec<(String, RouteSpec)>) -> Result<Self, RoutingError> {
        let mut routes = Vec::with_capacity(entries.len());
        for (index, (pattern, spec)) in entries.into_iter().enumerate() {
            let matcher = PathPattern::compile(&pattern)?;
            let allowed_nets = match &spec.allowed_cidrs {
                None => None,
                Some(list) => Some(
                    list.iter()
                        .map(|cidr| {
                            parse_net(cidr).ok_or_else(|| RoutingError::Cidr {
                                pattern: pattern.clone(),
                                cidr: cidr.clone(),
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                ),
            };
            routes.push(Arc::new(Route {
                pattern,
                matcher,
                spec,
                allowed_nets,
                index,
            }));
        }
        Ok(Self { routes })
    }

    /// True iff any pattern matches the path, hostnames ignored. Used by
    /// admission before route resolution to distinguish "not configured"
    /// from "forbidden".
    pub fn is_allowed(&self, path: &str) -> bool {
        self.routes.iter().any(|r| r.matcher.matches(path))
    }

    /// Best route for a path and optional host header: candidates must match
    /// the path and, when the route names hostnames, the host header
    /// case-insensitively. Lowest priority wins; ties break by insertion
    /// order.
    pub fn resolve(&self, path: &str, host: Option<&str>) -> Option<Arc<Route>> {
        self.routes
            .iter()
            .filter(|r| r.matcher.matches(path))
            .filter(|r| host_matches(&r.spec.hostnames, host))
            .min_by_key(|r| (r.effective_priority(), r.index))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn host_matches(hostnames: &[String], host: Option<&str>) -> bool {
    if hostnames.is_empty() {
        return true;
    }
    // A host-restricted route never matches a request without a host header.
    let Some(host) = host else { return false };
    // Ignore any :port suffix the client sent.
    let host = host.rsplit_once(':').map_or(host, |(name, port)| {
        if port.chars().all(|c| c.is_ascii_digit()) {
            name
        } else {
            host
        }
    });
    hostnames.iter().any(|h| h.eq_ignore_ascii_case(host))
}

/// Accept both `10.0.0.0/8` and bare addresses (treated as /32 or /128).
fn parse_net(cidr: &str) -> Option<IpNet> {
    if let Ok(net) = cidr.parse::<IpNet>() {
        return Some(net);
    }
    cidr.parse::<std::net::IpAddr>().ok().map(IpNet::from)
}
