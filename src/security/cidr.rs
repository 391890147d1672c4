//! Per-route IP admission over CIDR allow lists.
//!
//! Two addresses are considered: the immediate TCP peer and, when present,
//! the client-supplied `x-forwarded-for` value. The peer must always be
//! allow-listed; the forwarded address must also be unless the route sets
//! `ignoreProxiedIP`. Containment is numeric, IPv4 and IPv6 alike.

use std::net::IpAddr;

use ipnet::IpNet;

/// Admission decision for one route and one request.
///
/// - `nets` absent → unrestricted.
/// - `nets` present but empty → deny all.
/// - Unparsable forwarded value → deny, even with `ignore_proxied_ip`.
pub fn admit(
    nets: Option<&[IpNet]>,
    ignore_proxied_ip: bool,
    peer: IpAddr,
    forwarded_for: Option<&str>,
) -> bool {
    let Some(nets) = nets else {
        return true;
    };
    if nets.is_empty() {
        return false;
    }

    let forwarded = match forwarded_for {
        None => None,
        Some(raw) => match raw.trim().parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => return false,
        },
    };

    let contained = |ip: &IpAddr| nets.iter().any(|net| net.contains(ip));

    if !contained(&peer) {
        return false;
    }
    match forwarded {
        None => true,
        Some(_) if ignore_proxied_ip => true,
        Some(ip) => contained(&ip),
    }
}
