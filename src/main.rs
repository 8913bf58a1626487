//! echoline: a concurrent line-oriented TCP echo server
//!
//! Features:
//! - Bounded concurrent-connection admission control
//! - Per-read inactivity timeout with a client notice
//! - Oversized-line rejection with stream resynchronization
//! - A tiny text command protocol (hello, bye, /time, /quit, /echo)
//! - Per-client append-only message logs
//! - Configuration via CLI arguments or TOML file

mod client_log;
mod command;
mod config;
mod server;
mod session;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        max_sessions = config.max_sessions,
        logs_dir = %config.logs_dir.display(),
        "Starting echoline server"
    );

    Server::new(config).run().await
}
