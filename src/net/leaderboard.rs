//! HTTP client for the machines' leaderboard endpoint.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Client;

use crate::domain::MachineId;
use crate::error::IngestError;
use crate::protocol::LeaderboardEntry;

/// Path of the leaderboard endpoint on every machine.
pub const LEADERBOARD_PATH: &str = "/api/leaders";

/// Pulls high-score tables from machines over plain HTTP.
#[derive(Debug, Clone)]
pub struct LeaderboardClient {
    client: Client,
    port: u16,
}

impl LeaderboardClient {
    /// Builds a client targeting `port` on every machine.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the HTTP client cannot be built.
    pub fn new(port: u16, timeout: Duration) -> Result<Self, IngestError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, port })
    }

    /// Leaderboard URL of a machine.
    #[must_use]
    pub fn url_for(&self, machine: &MachineId) -> String {
        match machine.ip() {
            Some(ip) if self.port == 80 => match ip {
                std::net::IpAddr::V4(v4) => format!("http://{v4}{LEADERBOARD_PATH}"),
                std::net::IpAddr::V6(v6) => format!("http://[{v6}]{LEADERBOARD_PATH}"),
            },
            Some(ip) => format!("http://{}{LEADERBOARD_PATH}", SocketAddr::new(ip, self.port)),
            None if self.port == 80 => format!("http://{machine}{LEADERBOARD_PATH}"),
            None => format!("http://{machine}:{}{LEADERBOARD_PATH}", self.port),
        }
    }

    /// Fetches and decodes a machine's leaderboard.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] on connection failure or a non-success
    /// status, and [`IngestError::Protocol`] if the body does not decode.
    pub async fn fetch(&self, machine: &MachineId) -> Result<Vec<LeaderboardEntry>, IngestError> {
        let url = self.url_for(machine);
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(LeaderboardEntry::decode_all(&body)?)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn client(port: u16) -> LeaderboardClient {
        let Ok(client) = LeaderboardClient::new(port, Duration::from_secs(1)) else {
            panic!("client build failed");
        };
        client
    }

    #[test]
    fn default_port_is_omitted() {
        assert_eq!(
            client(80).url_for(&MachineId::new("10.0.0.5")),
            "http://10.0.0.5/api/leaders"
        );
    }

    #[test]
    fn custom_port_is_appended() {
        assert_eq!(
            client(8080).url_for(&MachineId::new("10.0.0.5")),
            "http://10.0.0.5:8080/api/leaders"
        );
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        assert_eq!(
            client(80).url_for(&MachineId::new("fe80::1")),
            "http://[fe80::1]/api/leaders"
        );
        assert_eq!(
            client(8080).url_for(&MachineId::new("fe80::1")),
            "http://[fe80::1]:8080/api/leaders"
        );
    }

    #[test]
    fn hostnames_pass_through() {
        assert_eq!(
            client(80).url_for(&MachineId::new("pinball.local")),
            "http://pinball.local/api/leaders"
        );
    }

    #[tokio::test]
    async fn unreachable_machine_is_an_http_error() {
        // Port 9 on loopback is not served in the test environment.
        let result = client(9).fetch(&MachineId::new("127.0.0.1")).await;
        assert!(matches!(result, Err(IngestError::Http(_))));
    }
}
