use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Bootstrap settings. Everything else (vendor host, credentials, limits,
/// mail gate) lives in the parameter table of the control database.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about = "DSS attendance polling and migration service")]
pub struct AppConfig {
    /// Control database: parameter table, dining-room logs and audit log.
    #[clap(long, env = "CONTROL_DATABASE_URL", help = "PostgreSQL URL of the control database")]
    pub control_db_url: String,

    /// Attendance database: `iclock_transaction` and `personnel_employee`.
    #[clap(long, env = "ATTENDANCE_DATABASE_URL", help = "PostgreSQL URL of the attendance database")]
    pub attendance_db_url: String,

    #[clap(long, env = "POOL_MAX_SIZE", default_value_t = 8, help = "Connections per database pool")]
    pub pool_max_size: usize,

    #[clap(long, env = "HOST", default_value = "127.0.0.1", help = "Address to listen on")]
    pub host: String,

    #[clap(long, env = "PORT", default_value_t = 9994, help = "HTTP server port")]
    pub port: u16,

    #[clap(long, env = "VENDOR_TIMEOUT_SECS", default_value_t = 30, help = "Per-request timeout towards DSS")]
    pub vendor_timeout_secs: u64,

    #[clap(long, env = "LOG_DIR", default_value = "./logs", help = "Directory for log files")]
    pub log_dir: PathBuf,

    #[clap(long, env = "LOG_LEVEL", default_value = "info", help = "Default log filter when RUST_LOG is unset")]
    pub log_level: String,
}

impl AppConfig {
    /// Loads `.env` (if present) and parses CLI arguments over the environment.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::parse()
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
