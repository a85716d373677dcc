//! Command line and environment configuration.
use std::net::SocketAddr;
use std::time::Duration;

use crate::history::DEFAULT_CAPACITY;
use crate::pipeline::{Limits, DEFAULT_MAX_IMAGE_SIDE};

#[derive(clap::Parser, Debug, Clone)]
#[command(name = "qrstyle", version, about = "Styled QR code rendering service", long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "QRSTYLE_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Number of recent requests kept for the history endpoint
    #[arg(long, env = "QRSTYLE_HISTORY_CAPACITY", default_value_t = DEFAULT_CAPACITY, value_parser = parse_capacity)]
    pub history_capacity: usize,

    /// Give up on a logo after this many milliseconds and render without it
    #[arg(long, env = "QRSTYLE_LOGO_TIMEOUT_MS", default_value_t = 3000)]
    pub logo_timeout_ms: u64,

    /// Largest logo download accepted, in bytes
    #[arg(long, env = "QRSTYLE_LOGO_MAX_BYTES", default_value_t = 2 * 1024 * 1024)]
    pub logo_max_bytes: usize,

    /// Largest rendered image side, in pixels
    #[arg(long, env = "QRSTYLE_MAX_IMAGE_SIDE", default_value_t = DEFAULT_MAX_IMAGE_SIDE)]
    pub max_image_side: u32,

    /// Log filter directives, e.g. `qrstyle=debug,tower_http=info`. Falls back to RUST_LOG
    #[arg(long, env = "QRSTYLE_LOG_FILTER")]
    pub log_filter: Option<String>,
}

impl Config {
    pub fn logo_timeout(&self) -> Duration {
        Duration::from_millis(self.logo_timeout_ms)
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_image_side: self.max_image_side,
        }
    }
}

fn parse_capacity(s: &str) -> Result<usize, String> {
    let capacity: usize = s.parse().map_err(|e| format!("{e}"))?;
    if capacity == 0 {
        return Err("history capacity must be at least 1".to_string());
    }
    Ok(capacity)
}
