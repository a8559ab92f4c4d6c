//! Type-safe identifiers for machines and games.
//!
//! [`MachineId`] is the network address a machine is reachable at and is the
//! identity of every durable Machine row. [`GameId`] wraps the generated
//! database key of a Game so that it cannot be confused with other row ids.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Identity of a machine on the network.
///
/// Holds the textual IP address the machine's datagrams originate from. The
/// same value is used as the host part of the machine's leaderboard URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(String);

impl MachineId {
    /// Creates a `MachineId` from any address-like string.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Creates a `MachineId` from a packet source IP.
    #[must_use]
    pub fn from_ip(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the address as an IP, if it is one.
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        self.0.parse().ok()
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IpAddr> for MachineId {
    fn from(ip: IpAddr) -> Self {
        Self::from_ip(ip)
    }
}

/// Generated identifier of a Game row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(i64);

impl GameId {
    /// Wraps a raw database key.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw database key.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for GameId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn machine_id_from_ip_matches_display() {
        let id = MachineId::from_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(id.as_str(), "10.0.0.5");
        assert_eq!(format!("{id}"), "10.0.0.5");
        assert_eq!(id.ip(), Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))));
    }

    #[test]
    fn machine_id_without_ip_has_no_ip() {
        let id = MachineId::new("pinball.local");
        assert_eq!(id.ip(), None);
    }

    #[test]
    fn game_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&GameId::new(42)).ok();
        assert_eq!(json.as_deref(), Some("42"));
    }

    #[test]
    fn machine_ids_work_as_map_keys() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(MachineId::new("10.0.0.1"), "mm");
        assert_eq!(map.get(&MachineId::new("10.0.0.1")), Some(&"mm"));
    }
}
