//! Lifecycle events - immutable business facts appended to an order

use super::actor::TriggeredBy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle event - immutable audit record
///
/// Only `notification_sent` is written after creation, once, when the
/// dispatch outcome is known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LifecycleEvent {
    /// Event unique ID
    pub event_id: String,
    /// Event type
    pub event_type: LifecycleEventType,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Operator who triggered this event
    pub triggered_by: TriggeredBy,
    /// Free-form key/value details
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Human-readable description
    pub event_description: String,
    /// Dispatch outcome (filled after the dispatch attempt)
    #[serde(default)]
    pub notification_sent: NotificationSent,
}

impl LifecycleEvent {
    pub fn new(
        event_type: LifecycleEventType,
        triggered_by: TriggeredBy,
        metadata: Map<String, Value>,
        event_description: impl Into<String>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type,
            timestamp: crate::util::now_millis(),
            triggered_by,
            metadata,
            event_description: event_description.into(),
            notification_sent: NotificationSent::default(),
        }
    }

    /// Whether a dispatch outcome has already been attached
    pub fn is_notified(&self) -> bool {
        self.notification_sent.n8n.is_some()
    }
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventType {
    // Lifecycle
    OrderCreated,
    OrderAssigned,
    OrderAccepted,
    OrderRejected,
    OrderShipped,
    OrderDelivered,
    OrderCancelled,

    // Payments
    PaymentConfirmed,
    PaymentFailed,

    // Inventory
    StockUpdated,

    // Refunds
    RefundInitiated,
    RefundCompleted,
}

impl LifecycleEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEventType::OrderCreated => "order_created",
            LifecycleEventType::OrderAssigned => "order_assigned",
            LifecycleEventType::OrderAccepted => "order_accepted",
            LifecycleEventType::OrderRejected => "order_rejected",
            LifecycleEventType::OrderShipped => "order_shipped",
            LifecycleEventType::OrderDelivered => "order_delivered",
            LifecycleEventType::OrderCancelled => "order_cancelled",
            LifecycleEventType::PaymentConfirmed => "payment_confirmed",
            LifecycleEventType::PaymentFailed => "payment_failed",
            LifecycleEventType::StockUpdated => "stock_updated",
            LifecycleEventType::RefundInitiated => "refund_initiated",
            LifecycleEventType::RefundCompleted => "refund_completed",
        }
    }

    /// Raised by collaborators outside the order state machine
    ///
    /// Only these may be recorded directly; the rest are produced by
    /// order commands.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            LifecycleEventType::PaymentConfirmed
                | LifecycleEventType::PaymentFailed
                | LifecycleEventType::StockUpdated
                | LifecycleEventType::RefundInitiated
                | LifecycleEventType::RefundCompleted
        )
    }
}

impl std::fmt::Display for LifecycleEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-channel notification outcomes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotificationSent {
    /// Outcome of the orchestrator webhook dispatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n8n: Option<NotificationOutcome>,
}

/// Result of one dispatch (after all retries)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationOutcome {
    pub sent: bool,
    pub sent_at: i64,
    /// Attempts made (including the successful one)
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
