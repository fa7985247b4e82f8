//! Destination endpoints.
//!
//! # Responsibilities
//! - Represent a single backend endpoint (host, port)
//! - Provide the stable identifier used by the health tracker and policies
//!
//! # Design Decisions
//! - `DestinationId` is a dense index into the registry arena
//! - Destinations are immutable after configuration load
//! - Equality of physical destinations is equality of `DestinationId`

use std::fmt;

/// Stable identifier for a destination within one configuration load.
///
/// Ids are dense indices assigned in registry construction order, which makes
/// them usable as direct indexes into per-destination state arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationId(pub(crate) u32);

impl DestinationId {
    /// Index into arenas sized to the registry's destination count.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// A single backend endpoint.
#[derive(Debug, Clone)]
pub struct Destination {
    /// Registry-assigned identifier.
    pub id: DestinationId,
    /// Host name or IP literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Destination {
    /// The `host:port` form used in configuration and logs.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Split a `host:port` server string.
///
/// The split is on the last colon so IPv6 literals in bracket form
/// (`[::1]:11211`) parse as written in the config.
pub fn parse_server_address(address: &str) -> Option<(String, u16)> {
    let (host, port) = address.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port: u16 = port.parse().ok()?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    Some((host.to_string(), port))
}
