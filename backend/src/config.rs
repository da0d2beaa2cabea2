use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Gift exchange server
#[derive(Parser, Debug, Clone)]
#[command(name = "backend")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Directory holding one JSON file per room; rooms stay in memory when unset
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Fallback tracing filter when RUST_LOG is not set
    #[arg(long, env = "LOG_FILTER", default_value = "info")]
    pub log_filter: String,

    /// Days of inactivity before a participant's session cookie expires
    #[arg(long, env = "SESSION_DAYS", default_value_t = 60)]
    pub session_days: i64,
}
