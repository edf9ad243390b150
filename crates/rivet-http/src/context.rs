//! Connection context.
//!
//! Carries the per-connection facts the parser needs but cannot derive
//! from the byte stream: the local and remote endpoints and whether the
//! transport is encrypted (which selects the URL scheme).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Endpoint and transport facts for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnContext {
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    encrypted: bool,
}

impl ConnContext {
    /// Create a context for a connection between the given endpoints.
    #[must_use]
    pub fn new(local_addr: SocketAddr, remote_addr: SocketAddr, encrypted: bool) -> Self {
        Self {
            local_addr,
            remote_addr,
            encrypted,
        }
    }

    /// The local (server-side) endpoint.
    #[must_use]
    pub fn local_addr(&self) -> &SocketAddr {
        &self.local_addr
    }

    /// The remote (client-side) endpoint.
    #[must_use]
    pub fn remote_addr(&self) -> &SocketAddr {
        &self.remote_addr
    }

    /// Whether the transport is encrypted.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// URL scheme implied by the transport.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.encrypted { "https" } else { "http" }
    }
}

impl Default for ConnContext {
    fn default() -> Self {
        Self {
            local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            remote_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            encrypted: false,
        }
    }
}
