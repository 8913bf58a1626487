//! TCP server for the line protocol.
//!
//! Accepts connections, gates them through a bounded slot pool, and runs one
//! session task per admitted connection. Graceful shutdown stops accepting
//! and waits for in-flight sessions to finish.

use crate::config::Config;
use crate::session::{self, SessionEnd};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub const CAPACITY_NOTICE: &[u8] = b"Server is at max capacity. Try again later.\n";

/// Server instance
pub struct Server {
    config: Config,
    session_slots: Arc<Semaphore>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        let session_slots = Arc::new(Semaphore::new(config.max_sessions));
        Server {
            config,
            session_slots,
        }
    }

    /// Bind the listener and serve until a shutdown signal arrives
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        tokio::fs::create_dir_all(&self.config.logs_dir).await?;

        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        info!(
            address = %self.config.bind_addr(),
            max_sessions = self.config.max_sessions,
            "Server listening"
        );

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, draining sessions");
                    break;
                }

                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            self.admit(stream, addr.to_string(), &mut sessions);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                    // Reap finished session tasks as we go.
                    while sessions.try_join_next().is_some() {}
                }
            }
        }

        while sessions.join_next().await.is_some() {}
        info!("All sessions finished");
        Ok(())
    }

    /// Try to start a session for an accepted stream. A connection that
    /// cannot get a slot is told so and closed, never queued.
    fn admit(&self, mut stream: TcpStream, peer: String, sessions: &mut JoinSet<()>) {
        let permit = match self.session_slots.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(peer = %peer, "Rejected connection (max sessions reached)");
                tokio::spawn(async move {
                    let _ = stream.write_all(CAPACITY_NOTICE).await;
                });
                return;
            }
        };

        info!(peer = %peer, "New connection");
        let logs_dir = self.config.logs_dir.clone();

        sessions.spawn(async move {
            match session::run(stream, &peer, &logs_dir).await {
                Ok(SessionEnd::Quit) => info!(peer = %peer, "Client closed the session"),
                Ok(SessionEnd::Disconnected) => info!(peer = %peer, "Client disconnected"),
                Ok(SessionEnd::TimedOut) => {
                    warn!(peer = %peer, "Client inactive past the read deadline")
                }
                Err(e) => warn!(peer = %peer, error = %e, "Session ended with error"),
            }
            drop(permit);
        });
    }
}
