//! Framework-agnostic view of an incoming request
//!
//! The HTTP layer copies the pieces the auth flow needs (host, headers, peer
//! address) into a [`RequestContext`]; nothing in this crate depends on the
//! web framework.

use std::collections::HashMap;
use std::net::IpAddr;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    host: Option<String>,
    /// Header names are stored lowercased
    headers: HashMap<String, String>,
    peer_addr: Option<IpAddr>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn with_peer_addr(mut self, addr: IpAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Host without port. Falls back to the `host` header.
    pub fn host(&self) -> Option<&str> {
        let raw = self.host.as_deref().or_else(|| self.header("host"))?;
        Some(strip_port(raw))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|value| value.as_str())
    }

    /// Value of the named cookie from the `cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        let cookies = self.header("cookie")?;
        cookies.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
    }

    /// Client address: first `x-forwarded-for` hop, else the socket peer.
    pub fn client_address(&self) -> Option<String> {
        self.client_address_behind(&[])
    }

    /// Like [`Self::client_address`], but with a non-empty `trusted_proxies`
    /// list `x-forwarded-for` is only honoured when the socket peer is one of
    /// those proxies.
    pub fn client_address_behind(&self, trusted_proxies: &[IpAddr]) -> Option<String> {
        let peer_trusted = trusted_proxies.is_empty()
            || self
                .peer_addr
                .is_some_and(|peer| trusted_proxies.contains(&peer));

        if peer_trusted {
            if let Some(forwarded) = self.header("x-forwarded-for") {
                let first = forwarded.split(',').next().map(str::trim).unwrap_or("");
                if !first.is_empty() {
                    return Some(first.to_string());
                }
            }
        }
        self.peer_addr.map(|addr| addr.to_string())
    }
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal, e.g. [::1]:4280
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}
