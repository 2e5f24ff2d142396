// crates/genui-core/src/runtime/audit.rs
// ============================================================================
// Module: GenUI Audit Sinks
// Description: JSON-lines audit sinks for stderr, files, and discard.
// Purpose: Provide the stock AuditSink implementations.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Each event is written as one JSON line. Write failures are ignored: an
//! audit sink never fails a resolution pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::FeedbackAuditEvent;
use crate::core::PassAuditEvent;
use crate::core::TransformAuditEvent;
use crate::interfaces::AuditSink;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one event line to stderr.
    fn emit<T: Serialize>(event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record_pass(&self, event: &PassAuditEvent) {
        Self::emit(event);
    }

    fn record_transform(&self, event: &TransformAuditEvent) {
        Self::emit(event);
    }

    fn record_feedback(&self, event: &FeedbackAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one event line and flushes.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_pass(&self, event: &PassAuditEvent) {
        self.emit(event);
    }

    fn record_transform(&self, event: &TransformAuditEvent) {
        self.emit(event);
    }

    fn record_feedback(&self, event: &FeedbackAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_pass(&self, _event: &PassAuditEvent) {}
}
