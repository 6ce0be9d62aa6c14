//! Coordinator Module
//!
//! Serialized task coordination:
//! - One dedicated thread owns the waiting, executing and finished queues
//! - Commands and pool notifications flow through a single ordered mailbox
//! - Listener callbacks are delivered in lifecycle order per task
//! - Pluggable callback delivery and bounded history retention

pub mod delivery;
pub mod events;
pub mod manager;
mod mailbox;
mod queues;


pub use delivery::{CallbackReceiver, ChannelDelivery, Delivery, InlineDelivery};
pub use events::CoordinatorEvent;
pub use manager::{Coordinator, CoordinatorBuilder, QueueStats};
