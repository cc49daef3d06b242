//! Append-only audit log of inbound requests.
//!
//! Every request is recorded once, before authentication or routing. Writes
//! are handed to a dedicated writer thread so the request path never waits on
//! storage and never sees a storage failure.
//!
//! ```text
//!  request ──▶ AuditLog::record ──▶ channel ──▶ writer thread ──▶ AuditSink
//!                (never blocks)                  (owns the sink)
//! ```
//!
//! # Example
//!
//! ```rust
//! use city_gallery::audit::{AuditEntry, AuditLog, MemoryAuditSink};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sink = MemoryAuditSink::new();
//! let log = AuditLog::spawn(sink.clone()).unwrap();
//!
//! log.record(AuditEntry::now("127.0.0.1", None, "GET", "/cities"));
//! log.flush().await.unwrap();
//!
//! assert_eq!(sink.records()[0].id, 1);
//! # }
//! ```

mod memory;
mod sqlite;

pub use memory::MemoryAuditSink;
pub use sqlite::SqliteAuditSink;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace, warn};

use crate::error::AuditError;

// =============================================================================
// Records
// =============================================================================

/// A request as captured on arrival, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// ISO-8601 UTC timestamp with millisecond precision
    pub timestamp: String,
    pub client_ip: String,
    pub user_agent: Option<String>,
    pub method: String,
    /// Path and query exactly as received
    pub url: String,
}

impl AuditEntry {
    /// Capture a request at the current time.
    pub fn now(
        client_ip: impl Into<String>,
        user_agent: Option<String>,
        method: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            client_ip: client_ip.into(),
            user_agent,
            method: method.into(),
            url: url.into(),
        }
    }
}

/// A stored audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: String,
    pub client_ip: String,
    pub user_agent: Option<String>,
    pub method: String,
    pub url: String,
}

impl AuditRecord {
    /// Attach an id to a captured entry.
    pub fn from_entry(id: i64, entry: AuditEntry) -> Self {
        Self {
            id,
            timestamp: entry.timestamp,
            client_ip: entry.client_ip,
            user_agent: entry.user_agent,
            method: entry.method,
            url: entry.url,
        }
    }
}

// =============================================================================
// AuditSink Trait
// =============================================================================

/// Storage backend for audit records.
///
/// A sink is owned by a single writer, which is what makes id assignment
/// gap-free without further locking.
pub trait AuditSink: Send + 'static {
    /// Append an entry and return it with its assigned id.
    fn append(&mut self, entry: AuditEntry) -> Result<AuditRecord, AuditError>;
}

// =============================================================================
// AuditLog
// =============================================================================

enum Command {
    Record(AuditEntry),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background audit writer.
///
/// Cloning is cheap; all clones feed the same writer.
#[derive(Clone)]
pub struct AuditLog {
    tx: mpsc::UnboundedSender<Command>,
}

impl AuditLog {
    /// Start a writer thread that owns `sink`.
    ///
    /// The thread exits once every handle has been dropped.
    pub fn spawn<S: AuditSink>(sink: S) -> Result<Self, AuditError> {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("audit-writer".to_string())
            .spawn(move || run_writer(sink, rx))?;

        Ok(Self { tx })
    }

    /// Queue an entry for writing. Never blocks and never fails the caller.
    pub fn record(&self, entry: AuditEntry) {
        if self.tx.send(Command::Record(entry)).is_err() {
            warn!("Audit writer is not running, dropping record");
        }
    }

    /// Wait until every entry queued before this call has been written.
    pub async fn flush(&self) -> Result<(), AuditError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(done_tx))
            .map_err(|_| AuditError::WriterClosed)?;
        done_rx.await.map_err(|_| AuditError::WriterClosed)
    }
}

fn run_writer<S: AuditSink>(mut sink: S, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::Record(entry) => match sink.append(entry) {
                Ok(record) => trace!(
                    id = record.id,
                    method = %record.method,
                    url = %record.url,
                    "Recorded request"
                ),
                Err(e) => error!(error = %e, "Failed to write audit record"),
            },
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Audit writer stopped");
}

// =============================================================================
// Tests
// =============================================================================
