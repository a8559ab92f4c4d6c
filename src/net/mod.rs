//! Network plumbing: UDP listeners and the leaderboard HTTP client.

pub mod leaderboard;
pub mod udp;

pub use leaderboard::LeaderboardClient;
pub use udp::{Datagram, DatagramListener};
