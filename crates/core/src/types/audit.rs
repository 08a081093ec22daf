//! Append-only audit trail entries for customer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Actor name recorded for actions performed by the sync engine itself.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Record created from an inbound Shopify event.
    CreatedFromShopify,
    /// Record created from an inbound POS event.
    CreatedFromPos,
    /// Record created by hand (dashboard or import).
    CreatedManually,
    /// A source event carried an external identifier already bound elsewhere.
    IdentifierConflict,
    /// Account status changed (records are flagged, never deleted).
    StatusChanged,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CreatedFromShopify => "CREATED_FROM_SHOPIFY",
            Self::CreatedFromPos => "CREATED_FROM_POS",
            Self::CreatedManually => "CREATED_MANUALLY",
            Self::IdentifierConflict => "IDENTIFIER_CONFLICT",
            Self::StatusChanged => "STATUS_CHANGED",
        };
        f.write_str(s)
    }
}

/// One entry in a record's append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// What happened.
    pub action: AuditAction,
    /// Who did it (a user email or [`SYSTEM_ACTOR`]).
    pub performed_by: String,
    /// When it happened.
    pub performed_at: DateTime<Utc>,
    /// Free-form context for operators.
    #[serde(default)]
    pub details: serde_json::Value,
}

impl AuditEntry {
    /// Build an entry attributed to the sync engine.
    #[must_use]
    pub fn system(action: AuditAction, at: DateTime<Utc>, details: serde_json::Value) -> Self {
        Self {
            action,
            performed_by: SYSTEM_ACTOR.to_owned(),
            performed_at: at,
            details,
        }
    }
}
