//! Domain event envelope and its wire form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use corehr_core::{ActorId, RequestContext};

/// Suffix appended to a topic name to form its dead-letter channel.
pub const DEAD_LETTER_SUFFIX: &str = ".DLT";

/// Lifecycle action a domain event describes.
///
/// The wire format carries the action as a free string so consumers keep
/// working when producers add new actions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Create,
    Update,
    Terminate,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "CREATE",
            Action::Update => "UPDATE",
            Action::Terminate => "TERMINATE",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable domain event describing one accepted mutation.
///
/// - `event_id` doubles as the idempotency key for consumers and the bus
///   partition key for per-entity ordering.
/// - `actor_id` is the caller identity, or the well-known system actor for
///   background operations.
/// - `payload` is an arbitrary JSON detail of the mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    event_id: Uuid,
    event_time: DateTime<Utc>,
    actor_id: ActorId,
    entity_name: String,
    entity_id: Uuid,
    action: String,
    source_service: String,
    correlation_id: String,
    payload: JsonValue,
    ip_address: String,
    user_agent: String,
}

impl DomainEvent {
    /// Build an event from the caller context and mutation details.
    ///
    /// Assigns a fresh time-ordered event id and stamps the current time.
    pub fn new(
        ctx: &RequestContext,
        entity_name: impl Into<String>,
        entity_id: Uuid,
        action: Action,
        source_service: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_time: Utc::now(),
            actor_id: ctx.actor_id(),
            entity_name: entity_name.into(),
            entity_id,
            action: action.as_str().to_string(),
            source_service: source_service.into(),
            correlation_id: ctx.correlation_id().to_string(),
            payload,
            ip_address: ctx.ip_address().to_string(),
            user_agent: ctx.user_agent().to_string(),
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        self.event_time
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn entity_id(&self) -> Uuid {
        self.entity_id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn source_service(&self) -> &str {
        &self.source_service
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn payload(&self) -> &JsonValue {
        &self.payload
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Serialize into a keyed wire message for the given topic.
    ///
    /// The key is the string form of the event id, so all deliveries of one
    /// event land on the same ordered partition.
    pub fn to_wire(&self, topic: impl Into<String>) -> Result<WireMessage, serde_json::Error> {
        Ok(WireMessage {
            topic: topic.into(),
            key: self.event_id.to_string(),
            value: serde_json::to_string(self)?,
        })
    }
}

/// A keyed message as it travels over the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    topic: String,
    key: String,
    value: String,
}

impl WireMessage {
    pub fn new(topic: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Re-address this message to the dead-letter channel of its topic.
    pub fn into_dead_letter(self) -> Self {
        Self {
            topic: format!("{}{DEAD_LETTER_SUFFIX}", self.topic),
            ..self
        }
    }

    pub fn is_dead_letter(&self) -> bool {
        self.topic.ends_with(DEAD_LETTER_SUFFIX)
    }
}
