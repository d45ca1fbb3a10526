//! Command-line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

/// Default tracing filter when neither `--log` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "skync_server=info,tower_http=info";

#[derive(Debug, Clone, Parser)]
#[command(name = "skync-server", version, about = "WebSocket relay for the skync shared whiteboard")]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "SKYNC_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Tracing filter directive, used when `RUST_LOG` is unset.
    #[arg(long, env = "SKYNC_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log: String,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
