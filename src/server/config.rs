//! Server configuration resolved from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Server settings, read from `PAPERFLOW_HOST`, `PAPERFLOW_PORT`, and
/// `PAPERFLOW_RESULT_TTL_SECS` (a `.env` file is honored when present).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// How long an unfetched finished result is kept before the sweeper
    /// drops it.
    pub result_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            result_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        let host = std::env::var("PAPERFLOW_HOST")
            .ok()
            .and_then(|raw| {
                raw.parse()
                    .map_err(|_| tracing::warn!(%raw, "invalid PAPERFLOW_HOST, using default"))
                    .ok()
            })
            .unwrap_or(defaults.host);
        let port = std::env::var("PAPERFLOW_PORT")
            .ok()
            .and_then(|raw| {
                raw.parse()
                    .map_err(|_| tracing::warn!(%raw, "invalid PAPERFLOW_PORT, using default"))
                    .ok()
            })
            .unwrap_or(defaults.port);
        let result_ttl = std::env::var("PAPERFLOW_RESULT_TTL_SECS")
            .ok()
            .and_then(|raw| {
                raw.parse()
                    .map_err(|_| {
                        tracing::warn!(%raw, "invalid PAPERFLOW_RESULT_TTL_SECS, using default")
                    })
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(defaults.result_ttl);
        Self {
            host,
            port,
            result_ttl,
        }
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
