//! Per-client message log.
//!
//! Each session appends the lines it receives to a file named after the
//! peer address, under a fixed logs directory. The file is opened in append
//! mode, so a second session from the same ip:port continues the same file.

use chrono::{Local, SecondsFormat};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Append-only message log for one client session.
pub struct ClientLogger {
    file: File,
}

impl ClientLogger {
    /// Open (or create) the log file for a peer address.
    pub async fn open(logs_dir: &Path, peer: &str) -> io::Result<ClientLogger> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(log_path(logs_dir, peer))
            .await?;
        Ok(ClientLogger { file })
    }

    /// Append one message, prefixed with an RFC3339 timestamp.
    pub async fn append(&mut self, message: &str) -> io::Result<()> {
        let timestamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
        let entry = format!("[{}] {}\n", timestamp, message);
        self.file.write_all(entry.as_bytes()).await?;
        self.file.flush().await
    }
}

/// Derive the log file path for a peer address. Colons are not valid in
/// filenames on every platform, so `ip:port` becomes `ip_port`.
fn log_path(logs_dir: &Path, peer: &str) -> PathBuf {
    let safe_addr = peer.replace(':', "_");
    logs_dir.join(format!("client_{}.log", safe_addr))
}
