//! Order aggregate root
//!
//! Monetary fields are computed once at creation and stored; nothing
//! recomputes them implicitly afterwards.

use super::event::LifecycleEvent;
use super::types::{CustomerSnapshot, ItemStatus, OrderItem, OrderStatus, StatusHistoryEntry};
use serde::{Deserialize, Serialize};

/// Order document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Order ID (assigned by server)
    pub order_id: String,
    /// Human-readable number, date-prefixed and sequential per day
    pub order_number: String,
    /// Customer snapshot
    pub customer: CustomerSnapshot,
    /// Items in insertion order
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub delivery_charge: f64,
    pub platform_fee: f64,
    /// subtotal + tax + delivery_charge + platform_fee
    pub total_amount: f64,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_instructions: Option<String>,
    /// Derived from item statuses
    pub order_status: OrderStatus,
    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,
    #[serde(default)]
    pub lifecycle: Vec<LifecycleEvent>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn item(&self, item_id: &str) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }

    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|i| i.item_id == item_id)
    }

    /// Whether every item has a merchant and is in `assigned` state
    pub fn all_items_assigned(&self) -> bool {
        !self.items.is_empty()
            && self
                .items
                .iter()
                .all(|i| i.item_status == ItemStatus::Assigned && i.is_assigned())
    }

    pub fn item_statuses(&self) -> Vec<ItemStatus> {
        self.items.iter().map(|i| i.item_status).collect()
    }

    pub fn event(&self, event_id: &str) -> Option<&LifecycleEvent> {
        self.lifecycle.iter().find(|e| e.event_id == event_id)
    }

    pub fn event_mut(&mut self, event_id: &str) -> Option<&mut LifecycleEvent> {
        self.lifecycle.iter_mut().find(|e| e.event_id == event_id)
    }

    /// Whether the stored total matches its components (to the cent)
    pub fn totals_consistent(&self) -> bool {
        let sum = self.subtotal + self.tax + self.delivery_charge + self.platform_fee;
        ((sum - self.total_amount) * 100.0).round() == 0.0
    }
}
