// everest-control-core/src/runtime/audit.rs
// ============================================================================
// Module: Control Plane Audit Logging
// Description: Structured audit events for access decisions, failures, and provisioning.
// Purpose: Emit JSON-line audit logs without tying the core to a log pipeline.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit sinks receive three event families:
//! - [`AccessAuditEvent`] for single-object authorization decisions. List
//!   filtering never emits these; a hidden item leaves no trace.
//! - [`FailureAuditEvent`] for infrastructure faults, recorded before the
//!   error is propagated. Permission denials are never recorded here.
//! - [`ProvisionAuditEvent`] for each provisioning step transition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::Action;
use crate::core::ResourceType;
use crate::interfaces::AccessRequest;
use crate::interfaces::AuthzDecision;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Single-object authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AccessAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Subject evaluated.
    pub subject: String,
    /// Resource type checked.
    pub resource: ResourceType,
    /// Action checked.
    pub action: Action,
    /// Object checked, as `namespace/name`.
    pub object: String,
    /// Whether access was allowed.
    pub allowed: bool,
}

impl AccessAuditEvent {
    /// Creates an access event for a decided request.
    #[must_use]
    pub fn new(request: &AccessRequest<'_>, decision: AuthzDecision) -> Self {
        Self {
            event: "access_decision",
            timestamp_ms: now_ms(),
            subject: request.subject.to_string(),
            resource: request.resource,
            action: request.action,
            object: request.object.to_string(),
            allowed: decision.is_allowed(),
        }
    }
}

/// Infrastructure failure surfaced to a caller.
#[derive(Debug, Clone, Serialize)]
pub struct FailureAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation that failed.
    pub operation: String,
    /// Error message.
    pub message: String,
}

impl FailureAuditEvent {
    /// Creates a failure event.
    #[must_use]
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event: "infrastructure_failure",
            timestamp_ms: now_ms(),
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Provisioning step phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionPhase {
    /// Step started.
    Started,
    /// Release applied.
    Applied,
    /// Step failed.
    Failed,
}

/// Provisioning step transition for one namespace.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Namespace being provisioned.
    pub namespace: String,
    /// Step phase.
    pub phase: ProvisionPhase,
    /// Failure message for failed steps.
    pub message: Option<String>,
}

impl ProvisionAuditEvent {
    /// Creates a provisioning event.
    #[must_use]
    pub fn new(namespace: impl Into<String>, phase: ProvisionPhase, message: Option<String>) -> Self {
        Self {
            event: "namespace_provision",
            timestamp_ms: now_ms(),
            namespace: namespace.into(),
            phase,
            message,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for control-plane events.
pub trait AuditSink: Send + Sync {
    /// Records a single-object access decision.
    fn record_access(&self, event: &AccessAuditEvent);

    /// Records an infrastructure failure.
    fn record_failure(&self, _event: &FailureAuditEvent) {}

    /// Records a provisioning step transition.
    fn record_provision(&self, _event: &ProvisionAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record_access(&self, event: &AccessAuditEvent) {
        write_stderr(event);
    }

    fn record_failure(&self, event: &FailureAuditEvent) {
        write_stderr(event);
    }

    fn record_provision(&self, event: &ProvisionAuditEvent) {
        write_stderr(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
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

    /// Appends one serialized event.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_access(&self, event: &AccessAuditEvent) {
        self.append(event);
    }

    fn record_failure(&self, event: &FailureAuditEvent) {
        self.append(event);
    }

    fn record_provision(&self, event: &ProvisionAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_access(&self, _event: &AccessAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current time in milliseconds since the epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Writes one serialized event to stderr.
fn write_stderr<T: Serialize>(event: &T) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(std::io::stderr(), "{payload}");
    }
}
