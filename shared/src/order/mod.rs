//! Order Module
//!
//! This module provides the order aggregate and its sub-entities:
//! - Order: the aggregate root with embedded items
//! - Lifecycle events: immutable business facts appended to the order
//! - Actors: who triggered a change

pub mod actor;
pub mod event;
pub mod snapshot;
pub mod types;

// Re-exports
pub use actor::TriggeredBy;
pub use event::{LifecycleEvent, LifecycleEventType, NotificationOutcome, NotificationSent};
pub use snapshot::Order;
pub use types::*;
