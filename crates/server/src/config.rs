// crates/server/src/config.rs
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use cc_dashboard_core::{default_claude_dir, DiscoveryError};
use cc_dashboard_stats::StatsConfig;
use clap::Parser;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47893;

#[derive(Debug, Clone, Parser)]
#[command(name = "cc-dashboard", version, about = "Usage and cost dashboard for Claude Code sessions")]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(long, env = "CC_DASHBOARD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "CC_DASHBOARD_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Live Claude data directory [default: ~/.claude]
    #[arg(long, env = "CC_DASHBOARD_CLAUDE_DIR")]
    pub claude_dir: Option<PathBuf>,

    /// Directory holding imported data
    #[arg(long, env = "CC_DASHBOARD_IMPORT_DIR", default_value = ".dashboard-data")]
    pub import_dir: PathBuf,

    /// Seconds a reconciliation result is reused
    #[arg(long, env = "CC_DASHBOARD_CACHE_TTL_SECS", default_value_t = 30)]
    pub cache_ttl_secs: u64,

    /// Number of sessions in the dashboard's recent list
    #[arg(long, env = "CC_DASHBOARD_RECENT_SESSIONS", default_value_t = 10)]
    pub recent_sessions: usize,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn live_dir(&self) -> Result<PathBuf, DiscoveryError> {
        match &self.claude_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_claude_dir(),
        }
    }

    pub fn stats_config(&self) -> StatsConfig {
        StatsConfig {
            recent_sessions: self.recent_sessions,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }
}
