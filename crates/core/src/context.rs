//! Caller context passed explicitly through every operation.
//!
//! There is no ambient/thread-local identity lookup: whoever initiates a saga
//! supplies the actor, correlation id and request metadata up front.

use serde::{Deserialize, Serialize};

use crate::id::ActorId;

const UNKNOWN: &str = "unknown";

/// Identity and request metadata of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    actor_id: ActorId,
    correlation_id: String,
    ip_address: String,
    user_agent: String,
}

impl RequestContext {
    pub fn new(
        actor_id: ActorId,
        correlation_id: impl Into<String>,
        ip_address: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            actor_id,
            correlation_id: correlation_id.into(),
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Context for system-initiated calls (schedulers, maintenance) where no
    /// caller metadata exists.
    pub fn system(correlation_id: impl Into<String>) -> Self {
        Self {
            actor_id: ActorId::system(),
            correlation_id: correlation_id.into(),
            ip_address: UNKNOWN.to_string(),
            user_agent: UNKNOWN.to_string(),
        }
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_context_uses_system_actor_and_unknown_metadata() {
        let ctx = RequestContext::system("corr-1");
        assert!(ctx.actor_id().is_system());
        assert_eq!(ctx.ip_address(), "unknown");
        assert_eq!(ctx.user_agent(), "unknown");
        assert_eq!(ctx.correlation_id(), "corr-1");
    }
}
