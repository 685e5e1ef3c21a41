//! Stratum Publisher Interface
//!
//! The narrow publish interface the service layer consumes. Best-effort:
//! the caller logs failures and never retries here, and a failed publish
//! must not roll back the durable write that preceded it.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use stratum_common::Result;

use crate::channel::Channel;
use crate::event::Event;

// =============================================================================
// Publisher Trait
// =============================================================================

/// Outbound publish channel: one call delivers a batch of messages to a
/// topic, optionally grouped by a partition key.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        messages: Vec<serde_json::Value>,
        partition_key: Option<&str>,
    ) -> Result<()>;
}

// =============================================================================
// Channel Publisher
// =============================================================================

/// Publisher backed by in-process broadcast channels, created lazily per
/// topic.
#[derive(Default)]
pub struct ChannelPublisher {
    channels: RwLock<HashMap<String, Arc<Channel>>>,
}

impl ChannelPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&self, topic: &str) -> Arc<Channel> {
        if let Some(channel) = self.channels.read().get(topic) {
            return channel.clone();
        }
        let mut channels = self.channels.write();
        channels
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(Channel::new(topic)))
            .clone()
    }

    /// Subscribe to a topic's events.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Event> {
        self.channel(topic).subscribe()
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish(
        &self,
        topic: &str,
        messages: Vec<serde_json::Value>,
        partition_key: Option<&str>,
    ) -> Result<()> {
        let channel = self.channel(topic);
        for payload in messages {
            let mut event = Event::new(topic, payload);
            if let Some(key) = partition_key {
                event = event.with_partition_key(key);
            }
            channel.publish(event);
        }
        debug!(topic, "published message batch");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
