//! Shared types for the order aggregate

use crate::models::GeoPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Item Status
// ============================================================================

/// 订单项状态
///
/// ```text
/// pending → assigned → processing → shipped → delivered
///    └─────────┴───────────┴──→ cancelled
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// 待分配
    #[default]
    Pending,
    /// 已分配商家
    Assigned,
    /// 商家处理中
    Processing,
    /// 已发货
    Shipped,
    /// 已送达
    Delivered,
    /// 已取消
    Cancelled,
}

impl ItemStatus {
    /// Position on the forward fulfillment path (`None` for cancelled)
    pub fn progress(self) -> Option<u8> {
        match self {
            ItemStatus::Pending => Some(0),
            ItemStatus::Assigned => Some(1),
            ItemStatus::Processing => Some(2),
            ItemStatus::Shipped => Some(3),
            ItemStatus::Delivered => Some(4),
            ItemStatus::Cancelled => None,
        }
    }

    /// Whether an item in this state may still be cancelled
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            ItemStatus::Pending | ItemStatus::Assigned | ItemStatus::Processing
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Assigned => "assigned",
            ItemStatus::Processing => "processing",
            ItemStatus::Shipped => "shipped",
            ItemStatus::Delivered => "delivered",
            ItemStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Order Status
// ============================================================================

/// 订单状态 (由订单项状态推导，客户端不可直接设置)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Assigned,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Approved,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Approved => "approved",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Order Item
// ============================================================================

/// Stock held against an item at one merchant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockAllocation {
    pub merchant_id: String,
    pub quantity: u32,
}

/// One product line within an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Item ID (unique within the order)
    pub item_id: String,
    /// Product ID
    pub product_id: String,
    /// Product name snapshot
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Unit weight in kg
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub quantity: u32,
    pub unit_price: f64,
    /// quantity × unit_price
    pub total_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_merchant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_merchant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<i64>,
    pub item_status: ItemStatus,
    /// Merchants that declined this item (never cleared)
    #[serde(default)]
    pub rejected_by: BTreeSet<String>,
    /// Stock currently held for this item, per merchant
    #[serde(default)]
    pub allocations: Vec<StockAllocation>,
    /// Whether the full quantity is held at the assigned merchant
    #[serde(default)]
    pub stock_settled: bool,
}

impl OrderItem {
    /// Units held at a given merchant
    pub fn held_at(&self, merchant_id: &str) -> u32 {
        self.allocations
            .iter()
            .filter(|a| a.merchant_id == merchant_id)
            .map(|a| a.quantity)
            .sum()
    }

    /// Units held across all merchants
    pub fn total_allocated(&self) -> u32 {
        self.allocations.iter().map(|a| a.quantity).sum()
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_merchant_id.is_some()
    }

    /// Whether the given merchant owns this item
    pub fn is_assigned_to(&self, merchant_id: &str) -> bool {
        self.assigned_merchant_id.as_deref() == Some(merchant_id)
    }

    /// Record a merchant rejection. Returns `true` if the merchant was not yet recorded.
    pub fn record_rejection(&mut self, merchant_id: &str) -> bool {
        self.rejected_by.insert(merchant_id.to_string())
    }

    pub fn has_rejected(&self, merchant_id: &str) -> bool {
        self.rejected_by.contains(merchant_id)
    }
}

// ============================================================================
// Customer / History
// ============================================================================

/// Customer details copied onto the order at creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerSnapshot {
    pub customer_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    /// Delivery coordinates supplied by the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

/// Status history entry (append-only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Requested order line (input to order creation)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineInput {
    pub product_id: String,
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> OrderItem {
        OrderItem {
            item_id: "i-1".to_string(),
            product_id: "p-1".to_string(),
            product_name: "Rice 5kg".to_string(),
            sku: None,
            unit: None,
            weight: None,
            quantity: 3,
            unit_price: 10.0,
            total_price: 30.0,
            assigned_merchant_id: None,
            assigned_merchant_name: None,
            assigned_at: None,
            item_status: ItemStatus::Pending,
            rejected_by: BTreeSet::new(),
            allocations: vec![
                StockAllocation {
                    merchant_id: "m-1".to_string(),
                    quantity: 2,
                },
                StockAllocation {
                    merchant_id: "m-2".to_string(),
                    quantity: 1,
                },
            ],
            stock_settled: false,
        }
    }

    #[test]
    fn test_held_at_sums_per_merchant() {
        let item = item();
        assert_eq!(item.held_at("m-1"), 2);
        assert_eq!(item.held_at("m-3"), 0);
        assert_eq!(item.total_allocated(), 3);
    }

    #[test]
    fn test_record_rejection_is_idempotent() {
        let mut item = item();
        assert!(item.record_rejection("m-9"));
        assert!(!item.record_rejection("m-9"));
        assert_eq!(item.rejected_by.len(), 1);
    }

    #[test]
    fn test_cancellable_states() {
        assert!(ItemStatus::Pending.is_cancellable());
        assert!(ItemStatus::Processing.is_cancellable());
        assert!(!ItemStatus::Shipped.is_cancellable());
        assert!(!ItemStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Delivered).unwrap();
        assert_eq!(json, "\"delivered\"");
    }
}
