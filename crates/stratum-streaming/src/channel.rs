//! Stratum Streaming Channels
//!
//! In-process broadcast channels backing the publish interface. A publish
//! with no live subscribers is delivered to zero receivers and is not an
//! error; the channel is a side effect, never a dependency.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::event::Event;

// =============================================================================
// Channel
// =============================================================================

/// A single-topic broadcast channel.
pub struct Channel {
    topic: String,
    sender: broadcast::Sender<Event>,
    stats: RwLock<ChannelStats>,
}

impl Channel {
    pub fn new(topic: impl Into<String>) -> Self {
        Self::with_capacity(topic, 1024)
    }

    pub fn with_capacity(topic: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            topic: topic.into(),
            sender,
            stats: RwLock::new(ChannelStats::default()),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish an event; returns how many subscribers received it.
    pub fn publish(&self, event: Event) -> usize {
        let delivered = self.sender.send(event).unwrap_or(0);
        let mut stats = self.stats.write();
        stats.published += 1;
        stats.delivered += delivered as u64;
        delivered
    }

    /// Subscribe to this channel's events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats.read().clone()
    }
}

// =============================================================================
// Channel Statistics
// =============================================================================

/// Statistics for one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub published: u64,
    pub delivered: u64,
}

// =============================================================================
// Tests
// =============================================================================
