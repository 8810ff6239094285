//! Idempotent audit consumer.
//!
//! Per message: RECEIVED → DESERIALIZED → DEDUP-CHECKED → one of
//! {INSERTED, SKIPPED-DUPLICATE, error}. Deduplication is structural: the
//! insert is keyed by event id and a duplicate-key failure means "already
//! processed", acknowledged without error. Everything else is classified so
//! the worker can decide between backoff and the dead-letter channel.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use corehr_events::WireMessage;

use crate::record::AuditRecord;
use crate::store::{AuditStore, AuditStoreError};

/// Wire-side view of a domain event.
///
/// Only the fields the audit trail needs are declared; unrecognized fields
/// are ignored for forward compatibility. The action is a free string so
/// events with actions this consumer has never seen are still recorded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditEventEnvelope {
    event_id: Uuid,
    #[serde(default)]
    event_time: Option<DateTime<Utc>>,
    #[serde(default)]
    actor_id: Option<String>,
    entity_name: String,
    #[serde(default)]
    entity_id: Option<Uuid>,
    action: String,
    #[serde(default)]
    message: Option<String>,
    source_service: String,
    #[serde(default)]
    correlation_id: Option<String>,
    #[serde(default)]
    payload: Option<JsonValue>,
    #[serde(default)]
    ip_address: Option<String>,
    #[serde(default)]
    user_agent: Option<String>,
}

impl AuditEventEnvelope {
    fn into_record(self) -> AuditRecord {
        // A payload that fails to re-serialize must not cost us the audit
        // entry; the record is kept without detail instead.
        let payload = match self.payload {
            None | Some(JsonValue::Null) => None,
            Some(value) => match serde_json::to_string(&value) {
                Ok(json) => Some(json),
                Err(err) => {
                    error!(event_id = %self.event_id, error = %err,
                        "payload serialization failed, storing record without payload");
                    None
                }
            },
        };

        AuditRecord {
            event_id: self.event_id,
            event_time: self.event_time.unwrap_or_else(Utc::now),
            actor_id: self.actor_id,
            entity_name: self.entity_name,
            entity_id: self.entity_id,
            action: self.action,
            message: self.message,
            source_service: self.source_service,
            correlation_id: self.correlation_id,
            payload,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at: Utc::now(),
        }
    }
}

/// Terminal outcome of processing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A new audit record was written.
    Inserted,
    /// The event id was already recorded; the redelivery was acknowledged.
    SkippedDuplicate,
}

/// Processing failure, classified for the retry policy.
#[derive(Debug, Error)]
pub enum ConsumeError {
    /// The message body is not a structurally valid event. Never retried.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The store rejected the record for integrity reasons other than the
    /// benign duplicate key. Never retried.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Transient store failure; retrying may succeed.
    #[error("audit store failure: {0}")]
    StoreUnavailable(String),
}

impl ConsumeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConsumeError::StoreUnavailable(_))
    }
}

/// Consumes domain events into the audit store, absorbing redeliveries.
#[derive(Debug, Clone)]
pub struct AuditConsumer<S> {
    store: S,
}

impl<S> AuditConsumer<S>
where
    S: AuditStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Process one delivery of a message.
    ///
    /// Safe to call any number of times with the same message: the first
    /// successful call inserts, every later one skips.
    pub fn process(&self, message: &WireMessage) -> Result<ProcessOutcome, ConsumeError> {
        let envelope: AuditEventEnvelope = serde_json::from_str(message.value())
            .map_err(|err| ConsumeError::Malformed(err.to_string()))?;

        let record = envelope.into_record();
        let event_id = record.event_id;
        let action = record.action.clone();
        let entity_name = record.entity_name.clone();

        match self.store.insert(record) {
            Ok(()) => {
                info!(%event_id, action, entity_name, "audit record saved");
                Ok(ProcessOutcome::Inserted)
            }
            Err(AuditStoreError::DuplicateEventId(_)) => {
                warn!(%event_id, "duplicate event id, skipping redelivery");
                Ok(ProcessOutcome::SkippedDuplicate)
            }
            Err(AuditStoreError::Integrity(reason)) => Err(ConsumeError::Integrity(reason)),
            Err(AuditStoreError::Unavailable(reason)) => {
                Err(ConsumeError::StoreUnavailable(reason))
            }
        }
    }
}
