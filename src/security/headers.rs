//! Forwarded-header handling and client IP resolution.
//!
//! # Responsibilities
//! - Parse the trusted proxy list (IPs and CIDR prefixes)
//! - Resolve the client IP for request logs
//!
//! # Design Decisions
//! - Never trust existing X-Forwarded-For / X-Real-IP from untrusted peers
//! - An empty list trusts nobody
//! - X-Forwarded-For is walked right to left; the first hop that is not a
//!   trusted proxy is the client

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;
use ipnet::IpNet;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// A trusted-proxy entry that is neither an IP nor a CIDR prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid trusted proxy {entry:?}: expected an IP address or CIDR prefix")]
pub struct InvalidProxy {
    pub entry: String,
}

/// Network prefixes allowed to report the client address on our behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedProxies {
    nets: Vec<IpNet>,
}

impl TrustedProxies {
    /// Trust no proxy; the TCP peer is always the client.
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse IPs and CIDR prefixes, keeping their order.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, InvalidProxy> {
        let nets = entries
            .iter()
            .map(|entry| {
                let entry = entry.as_ref().trim();
                entry
                    .parse::<IpAddr>()
                    .map(IpNet::from)
                    .or_else(|_| entry.parse::<IpNet>())
                    .map_err(|_| InvalidProxy {
                        entry: entry.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { nets })
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    pub fn is_trusted(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.nets.iter().any(|net| net.contains(&ip))
    }

    /// Client address for a request received from `peer`.
    ///
    /// Returns an empty string when the peer address is unknown.
    pub fn client_ip(&self, peer: Option<SocketAddr>, headers: &HeaderMap) -> String {
        let Some(peer) = peer else {
            return String::new();
        };
        let remote = peer.ip().to_canonical();

        if !self.is_trusted(remote) {
            return remote.to_string();
        }

        [X_FORWARDED_FOR, X_REAL_IP]
            .into_iter()
            .filter_map(|name| headers.get(name)?.to_str().ok())
            .find_map(|value| self.first_untrusted_hop(value))
            .unwrap_or(remote)
            .to_string()
    }

    /// Walk a hop list right to left. Any unparseable hop voids the header.
    fn first_untrusted_hop(&self, value: &str) -> Option<IpAddr> {
        let hops: Vec<&str> = value.split(',').collect();
        for (index, hop) in hops.iter().enumerate().rev() {
            let ip: IpAddr = hop.trim().parse().ok()?;
            if index == 0 || !self.is_trusted(ip) {
                return Some(ip);
            }
        }
        None
    }
}
