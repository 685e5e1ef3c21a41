//! Stratum Streaming Events
//!
//! Event envelope carried on the outbound publish channel.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Event ID
// =============================================================================

/// Unique identifier for a published event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self(format!("evt_{:032x}", timestamp))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Event
// =============================================================================

/// One message published to a topic. The payload is the serialized property
/// or value batch; the partition key groups messages of one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub topic: String,
    pub payload: serde_json::Value,
    pub partition_key: Option<String>,
    pub timestamp: i64,
}

impl Event {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        Self {
            id: EventId::generate(),
            topic: topic.into(),
            payload,
            partition_key: None,
            timestamp,
        }
    }

    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_construction() {
        let event = Event::new("values", json!([[1000, 1.0]])).with_partition_key("thing-1_p1");
        assert_eq!(event.topic, "values");
        assert_eq!(event.partition_key.as_deref(), Some("thing-1_p1"));
        assert!(event.id.as_str().starts_with("evt_"));
        assert!(event.timestamp > 0);
    }
}
