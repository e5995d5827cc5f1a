//! Shared types for the marketplace backend
//!
//! Order aggregate, lifecycle events, merchant directory and inventory
//! records, and the settings singleton. Pure data: no I/O.

pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
