//! Fulfillment engine - order aggregate, item state machine, assignment
//!
//! # Modules
//!
//! - [`actions`] - one handler per operation
//! - [`manager`] - transactional command execution + notification publish
//! - [`status`] - derived order status and item transitions
//! - [`traits`] - `CommandHandler` / `CommandContext`

pub mod actions;
pub mod error;
pub mod manager;
pub mod status;
pub mod traits;

pub use actions::{
    AssignItemAction, CancelOrderAction, ClaimItemAction, CommandAction, CreateOrderAction,
    RejectItemAction, UpdateItemStatusAction,
};
pub use error::{FulfillmentError, FulfillmentResult};
pub use manager::OrdersManager;
pub use status::{check_item_transition, derive_order_status};
