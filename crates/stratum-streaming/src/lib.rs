//! Stratum Streaming - Outbound Publish Channel
//!
//! Best-effort, publish-only side channel for property and value events.
//! The service layer publishes after durable writes; failures are logged by
//! the caller and never rolled back into the catalog write.
//!
//! @version 0.1.0
//! @author Stratum Development Team

pub mod channel;
pub mod event;
pub mod publisher;

pub use channel::{Channel, ChannelStats};
pub use event::{Event, EventId};
pub use publisher::{ChannelPublisher, Publisher};
