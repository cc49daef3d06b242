//! In-memory audit sink.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::AuditError;

use super::{AuditEntry, AuditRecord, AuditSink};

/// Audit sink keeping records in a shared vector.
///
/// Clones share the same storage, so a test can keep one handle while the
/// writer owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records written so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&mut self, entry: AuditEntry) -> Result<AuditRecord, AuditError> {
        let mut records = self.records.lock();
        let record = AuditRecord::from_entry(records.len() as i64 + 1, entry);
        records.push(record.clone());
        Ok(record)
    }
}
