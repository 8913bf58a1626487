//! Per-connection session: the read/parse/dispatch loop.
//!
//! Each session owns one accepted stream. Reads are bounded by a 30-second
//! inactivity deadline, re-armed for every read so each individual read (not
//! the whole session) gets the full window. Lines longer than the fixed
//! buffer are rejected and the stream is resynchronized by draining with a
//! short deadline before normal reading resumes.

use crate::client_log::ClientLogger;
use crate::command::{self, Action};
use bytes::BytesMut;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, timeout_at, Instant};

/// Maximum line length, including the terminator
pub const MAX_MESSAGE_BYTES: usize = 1024;

/// Inactivity deadline for each read
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline bounding overflow resynchronization
pub const OVERFLOW_DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

pub const OVERSIZE_NOTICE: &[u8] =
    b"Message cannot be more than 1024 bytes (1024 regular characters).\n";
pub const EMPTY_PROMPT: &[u8] = b"Say something...\n";
pub const TIMEOUT_NOTICE: &[u8] = b"Connection timeout. Disconnecting...\n";

/// How a session ended, for the supervisor's console notices
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEnd {
    /// Client asked to close ("bye" or "/quit")
    Quit,
    /// Peer closed the stream
    Disconnected,
    /// Inactivity deadline expired
    TimedOut,
}

/// Session-fatal failures. Contained in the session's task; never propagate
/// to the accept loop or sibling sessions.
#[derive(Debug)]
pub enum SessionError {
    /// Read or write fault other than timeout or clean close
    Io(io::Error),
    /// The per-client log file could not be opened or written
    Logger(io::Error),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Io(e) => write!(f, "I/O error: {}", e),
            SessionError::Logger(e) => write!(f, "client log error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

/// Run one session to completion. The stream and the client logger are
/// dropped on every exit path when this returns.
pub async fn run<S>(mut stream: S, peer: &str, logs_dir: &Path) -> Result<SessionEnd, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut logger = ClientLogger::open(logs_dir, peer)
        .await
        .map_err(SessionError::Logger)?;
    let mut buf = [0u8; MAX_MESSAGE_BYTES];

    loop {
        let n = match timeout(READ_TIMEOUT, stream.read(&mut buf)).await {
            Err(_) => {
                // Best effort; the peer may already be gone.
                let _ = stream.write_all(TIMEOUT_NOTICE).await;
                return Ok(SessionEnd::TimedOut);
            }
            Ok(Ok(0)) => return Ok(SessionEnd::Disconnected),
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(SessionError::Io(e)),
        };

        // A read that fills the buffer means the line is over-long. Reject it
        // and drain the rest before reading normally again.
        if n == MAX_MESSAGE_BYTES {
            stream
                .write_all(OVERSIZE_NOTICE)
                .await
                .map_err(SessionError::Io)?;
            if let Some(end) = drain_overflow(&mut stream, &mut buf).await? {
                return Ok(end);
            }
            continue;
        }

        let line = String::from_utf8_lossy(&buf[..n]);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            stream
                .write_all(EMPTY_PROMPT)
                .await
                .map_err(SessionError::Io)?;
            continue;
        }

        let dispatch = command::dispatch(trimmed);
        if dispatch.action == Action::Terminate {
            if let Some(response) = dispatch.response {
                let _ = stream.write_all(&response).await;
            }
            return Ok(SessionEnd::Quit);
        }

        match dispatch.response {
            Some(response) => stream
                .write_all(&response)
                .await
                .map_err(SessionError::Io)?,
            None => {
                // Plain text: echo the trimmed line back.
                let mut echo = BytesMut::with_capacity(trimmed.len() + 1);
                echo.extend_from_slice(trimmed.as_bytes());
                echo.extend_from_slice(b"\n");
                stream.write_all(&echo).await.map_err(SessionError::Io)?;
            }
        }

        logger
            .append(trimmed)
            .await
            .map_err(SessionError::Logger)?;
    }
}

/// Discard the remainder of an over-long line. The overflow is over when a
/// read comes up short or the drain deadline elapses; either way the caller
/// returns to normal reading. One deadline covers the whole drain, so worst
/// case resynchronization latency is a single short timeout. Returns
/// `Some(SessionEnd)` if the peer disconnected mid-drain.
async fn drain_overflow<S>(
    stream: &mut S,
    buf: &mut [u8; MAX_MESSAGE_BYTES],
) -> Result<Option<SessionEnd>, SessionError>
where
    S: AsyncRead + Unpin,
{
    let deadline = Instant::now() + OVERFLOW_DRAIN_TIMEOUT;
    loop {
        match timeout_at(deadline, stream.read(buf)).await {
            Err(_) => return Ok(None),
            Ok(Ok(0)) => return Ok(Some(SessionEnd::Disconnected)),
            Ok(Ok(n)) if n < MAX_MESSAGE_BYTES => return Ok(None),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(SessionError::Io(e)),
        }
    }
}
