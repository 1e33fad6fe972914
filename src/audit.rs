//! Append-only activity trail.
//!
//! Records every operation that produces or hands out key material:
//! uploads, address grants, password links and deletions. Records carry
//! identifiers only, never keys, signatures or passwords. Pluggable sinks
//! forward each record to a file or any other store.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::FileId;

/// A sink that receives audit records.
pub trait AuditSink: Send {
    /// Called once for every appended record.
    fn append(&mut self, record: AuditRecord);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    Uploaded,
    Shared,
    PasswordLinkCreated,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event: AuditEvent,
    pub file_id: FileId,
    /// The address that performed the operation.
    pub actor: String,
    /// The grantee for `Shared`; empty otherwise.
    pub counterparty: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn now(event: AuditEvent, file_id: FileId, actor: &str) -> Self {
        Self {
            event,
            file_id,
            actor: actor.to_string(),
            counterparty: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_counterparty(mut self, counterparty: &str) -> Self {
        self.counterparty = counterparty.to_string();
        self
    }
}

/// An append-only log of activity records.
#[derive(Default)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
    forward_sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("records", &self.records)
            .field("forward_sinks", &self.forward_sinks.len())
            .finish()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward a copy of every future record to `sink`.
    pub fn add_forward_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.forward_sinks.push(sink);
    }

    pub fn append(&mut self, record: AuditRecord) {
        for sink in self.forward_sinks.iter_mut() {
            sink.append(record.clone());
        }
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditRecord> {
        self.records.iter()
    }

    /// Copy of the in-memory records.
    pub fn snapshot(&self) -> Vec<AuditRecord> {
        self.records.clone()
    }
}

// ---------------------------------------------------------------------------
// JSONL trail
// ---------------------------------------------------------------------------

/// Durable trail of uploads, shares, links and deletions: one JSON object
/// per line, flushed after every event. Reopening a path continues the
/// existing trail. A failed write is logged and the drive operation that
/// produced the event still succeeds.
pub struct FileAuditSink {
    path: PathBuf,
    file: File,
}

impl FileAuditSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, record: &AuditRecord) -> std::io::Result<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.file, "{line}")?;
        self.file.flush()
    }
}

impl AuditSink for FileAuditSink {
    fn append(&mut self, record: AuditRecord) {
        if let Err(err) = self.write_line(&record) {
            tracing::warn!(
                path = %self.path.display(),
                file_id = record.file_id,
                error = %err,
                "audit event not persisted"
            );
        }
    }
}
