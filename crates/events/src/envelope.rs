use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use forgecart_core::TenantId;

use crate::Event;

/// Envelope for an event, containing tenant + subject metadata.
///
/// Notes:
/// - **Multi-tenancy** is enforced here via `tenant_id`; consumers filter on it.
/// - `subject_id` identifies the entity the event is about (e.g. the order id).
/// - `payload` is the serialized domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    tenant_id: TenantId,

    subject_id: Uuid,
    subject_type: String,

    event_type: String,
    occurred_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        tenant_id: TenantId,
        subject_id: Uuid,
        subject_type: impl Into<String>,
        event_type: impl Into<String>,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            tenant_id,
            subject_id,
            subject_type: subject_type.into(),
            event_type: event_type.into(),
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn subject_id(&self) -> Uuid {
        self.subject_id
    }

    pub fn subject_type(&self) -> &str {
        &self.subject_type
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl EventEnvelope<JsonValue> {
    /// Wrap a typed domain event, serializing its payload to JSON.
    pub fn from_event<E>(
        tenant_id: TenantId,
        subject_id: Uuid,
        subject_type: impl Into<String>,
        event: &E,
    ) -> Result<Self, serde_json::Error>
    where
        E: Event + Serialize,
    {
        Ok(Self::new(
            Uuid::now_v7(),
            tenant_id,
            subject_id,
            subject_type,
            event.event_type(),
            event.occurred_at(),
            serde_json::to_value(event)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Pinged {
        at: DateTime<Utc>,
    }

    impl Event for Pinged {
        fn event_type(&self) -> &'static str {
            "test.pinged"
        }

        fn version(&self) -> u32 {
            1
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    #[test]
    fn from_event_copies_event_metadata() {
        let tenant_id = TenantId::new();
        let subject = Uuid::now_v7();
        let event = Pinged { at: Utc::now() };

        let env = EventEnvelope::from_event(tenant_id, subject, "test.subject", &event).unwrap();

        assert_eq!(env.tenant_id(), tenant_id);
        assert_eq!(env.subject_id(), subject);
        assert_eq!(env.event_type(), "test.pinged");
        assert_eq!(env.occurred_at(), event.at);
        assert!(env.payload().get("at").is_some());
    }
}
