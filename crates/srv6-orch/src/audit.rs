//! Structured audit logging for control-plane mutations.
//!
//! Every table mutation (policy, LocalSID, steering, behavior
//! registration) emits an immutable [`AuditRecord`] through the
//! [`audit_log!`] macro. Records are serialized as JSON under the
//! `audit` tracing target so they can be split off into a dedicated
//! sink for review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCategory {
    /// Resource creation events
    ResourceCreate,
    /// Resource modification events
    ResourceModify,
    /// Resource deletion events
    ResourceDelete,
    /// Network configuration changes
    NetworkConfig,
    /// Error and failure events
    ErrorCondition,
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditCategory::ResourceCreate => write!(f, "RESOURCE_CREATE"),
            AuditCategory::ResourceModify => write!(f, "RESOURCE_MODIFY"),
            AuditCategory::ResourceDelete => write!(f, "RESOURCE_DELETE"),
            AuditCategory::NetworkConfig => write!(f, "NETWORK_CONFIG"),
            AuditCategory::ErrorCondition => write!(f, "ERROR_CONDITION"),
        }
    }
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// Action completed successfully
    Success,
    /// Action failed
    Failure,
    /// Action completed but with a non-fatal warning
    Warning,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => write!(f, "success"),
            AuditOutcome::Failure => write!(f, "failure"),
            AuditOutcome::Warning => write!(f, "warning"),
        }
    }
}

/// Immutable structured audit record.
///
/// Built once via the builder methods and then logged; there is no
/// mutable access after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// UTC timestamp captured at construction
    pub timestamp: DateTime<Utc>,

    /// Event category
    pub category: AuditCategory,

    /// Source module generating the event
    pub source: String,

    /// Operation performed
    pub action: String,

    /// Outcome of the operation
    pub outcome: AuditOutcome,

    /// Identifier of the affected object (BSID, LocalSID address, steering key)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    /// Object classification ("sr_policy", "localsid", "steering_rule", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    /// Additional context as JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Error message if the outcome is a failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    /// Creates a new record with the current timestamp and a Success
    /// outcome; adjust with the builder methods before logging.
    pub fn new(
        category: AuditCategory,
        source: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            source: source.into(),
            action: action.into(),
            outcome: AuditOutcome::Success,
            object_id: None,
            object_type: None,
            details: None,
            error: None,
        }
    }

    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    pub fn with_object_type(mut self, obj_type: impl Into<String>) -> Self {
        self.object_type = Some(obj_type.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Sets the error message and marks the outcome as Failure.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.outcome = AuditOutcome::Failure;
        self
    }

    /// Serializes the record for SIEM-style ingestion.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization_failed","message":"{}"}}"#, e))
    }
}

/// Logs an [`AuditRecord`] at a level derived from its outcome:
/// Success at info, Warning at warn, Failure at warn.
#[macro_export]
macro_rules! audit_log {
    ($record:expr) => {
        let record = $record;
        match record.outcome {
            $crate::audit::AuditOutcome::Success => {
                tracing::info!(
                    target: "audit",
                    category = %record.category,
                    source = %record.source,
                    action = %record.action,
                    outcome = %record.outcome,
                    audit_json = %record.to_json(),
                    "AUDIT: {} - {} - {}",
                    record.category,
                    record.action,
                    record.outcome
                );
            }
            $crate::audit::AuditOutcome::Warning | $crate::audit::AuditOutcome::Failure => {
                tracing::warn!(
                    target: "audit",
                    category = %record.category,
                    source = %record.source,
                    action = %record.action,
                    outcome = %record.outcome,
                    audit_json = %record.to_json(),
                    "AUDIT: {} - {} - {}",
                    record.category,
                    record.action,
                    record.outcome
                );
            }
        }
    };
}

/// Info-level logging with a structured `source` field.
#[macro_export]
macro_rules! info_log {
    ($source:expr, $($arg:tt)*) => {
        tracing::info!(
            source = $source,
            $($arg)*
        )
    };
}

/// Warning-level logging with a structured `source` field.
#[macro_export]
macro_rules! warn_log {
    ($source:expr, $($arg:tt)*) => {
        tracing::warn!(
            source = $source,
            $($arg)*
        )
    };
}

/// Error-level logging with a structured `source` field.
#[macro_export]
macro_rules! error_log {
    ($source:expr, $($arg:tt)*) => {
        tracing::error!(
            source = $source,
            $($arg)*
        )
    };
}
