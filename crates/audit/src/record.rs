//! Persisted audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only projection of one domain event.
///
/// The event id is the primary key; a record is never updated or deleted
/// after insert. Inserting a duplicate id is the consumer's idempotency
/// signal, not a data error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_id: Uuid,
    pub event_time: DateTime<Utc>,
    /// Actor that performed the action, as the producer reported it.
    pub actor_id: Option<String>,
    pub entity_name: String,
    pub entity_id: Option<Uuid>,
    pub action: String,
    /// Optional human-readable description.
    pub message: Option<String>,
    pub source_service: String,
    pub correlation_id: Option<String>,
    /// Serialized JSON detail of the mutation, if the producer sent one.
    pub payload: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}
