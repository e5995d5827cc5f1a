//! 通知派发
//!
//! - [`rules`]: static audience / channel table
//! - [`payload`]: sanitized webhook body
//! - [`dispatcher`]: HTTP delivery with retries
//! - [`worker`]: outbox consumer

pub mod dispatcher;
pub mod payload;
pub mod rules;
pub mod worker;

pub use dispatcher::{DispatchError, USER_AGENT, WebhookConfig, WebhookDispatcher};
pub use payload::WebhookPayload;
pub use rules::{Channels, NotificationRules, rules_for};
pub use worker::{NotificationWorker, SmartConfig};
