//! Webhook payload
//!
//! Allow-listed projection of an order event. Internal bookkeeping
//! (allocations, rejections, lifecycle history) never leaves the server.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use shared::models::{GeoPoint, Merchant};
use shared::order::{
    ItemStatus, LifecycleEventType, Order, OrderItem, OrderStatus, TriggeredBy,
};

use super::rules::{NotificationRules, rules_for};
use crate::eligibility::RankedMerchant;
use crate::geo::Priority;
use crate::lifecycle::{AssignmentData, DispatchJob};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub event_type: LifecycleEventType,
    pub event_id: String,
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// RFC 3339 (UTC)
    pub timestamp: String,
    pub description: String,
    pub metadata: Map<String, Value>,
    pub order_data: OrderData,
    pub triggered_by: ActorSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_data: Option<MerchantData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_data: Option<SmartData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_data: Option<AssignmentData>,
    pub notification_rules: NotificationRules,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub order_number: String,
    pub customer: CustomerData,
    pub totals: Totals,
    pub order_status: OrderStatus,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_instructions: Option<String>,
    pub items: Vec<ItemSummary>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerData {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub delivery_charge: f64,
    pub platform_fee: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub item_id: String,
    pub product_name: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub unit_price: f64,
    pub total_price: f64,
    pub item_status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_merchant_name: Option<String>,
}

/// Actor without contact details
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActorSummary {
    pub user_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MerchantData {
    pub merchant_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct SmartData {
    /// km
    pub distance: f64,
    pub score: u32,
    pub priority: Priority,
}

impl From<&OrderItem> for ItemSummary {
    fn from(item: &OrderItem) -> Self {
        Self {
            item_id: item.item_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            unit_price: item.unit_price,
            total_price: item.total_price,
            item_status: item.item_status,
            assigned_merchant_name: item.assigned_merchant_name.clone(),
        }
    }
}

impl From<&Order> for OrderData {
    fn from(order: &Order) -> Self {
        Self {
            order_number: order.order_number.clone(),
            customer: CustomerData {
                name: order.customer.name.clone(),
                phone: order.customer.phone.clone(),
                address: order.customer.address.clone(),
                area: order.customer.area.clone(),
            },
            totals: Totals {
                subtotal: order.subtotal,
                tax: order.tax,
                delivery_charge: order.delivery_charge,
                platform_fee: order.platform_fee,
                total_amount: order.total_amount,
            },
            order_status: order.order_status,
            payment_method: order.payment_method.clone(),
            delivery_instructions: order.delivery_instructions.clone(),
            items: order.items.iter().map(ItemSummary::from).collect(),
        }
    }
}

impl From<&TriggeredBy> for ActorSummary {
    fn from(actor: &TriggeredBy) -> Self {
        Self {
            user_type: actor.user_type(),
            user_id: actor.user_id().map(str::to_string),
            name: actor.display_name().to_string(),
        }
    }
}

impl From<&Merchant> for MerchantData {
    fn from(merchant: &Merchant) -> Self {
        Self {
            merchant_id: merchant.merchant_id.clone(),
            name: merchant.name.clone(),
            phone: merchant.phone.clone(),
            email: merchant.email.clone(),
        }
    }
}

fn rfc3339(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl WebhookPayload {
    /// Generic payload for a dispatch job
    pub fn from_job(job: &DispatchJob) -> Self {
        let event = &job.event;
        Self {
            event_type: event.event_type,
            event_id: event.event_id.clone(),
            order_id: job.order.order_id.clone(),
            item_id: job.item_id.clone(),
            timestamp: rfc3339(event.timestamp),
            description: event.event_description.clone(),
            metadata: event.metadata.clone(),
            order_data: OrderData::from(&job.order),
            triggered_by: ActorSummary::from(&event.triggered_by),
            customer_location: job.order.customer.location.filter(|p| !p.is_unset()),
            merchant_data: None,
            smart_data: None,
            assignment_data: job.assignment.clone(),
            notification_rules: rules_for(event.event_type),
        }
    }

    pub fn with_merchant(mut self, merchant: &Merchant) -> Self {
        self.merchant_data = Some(MerchantData::from(merchant));
        self
    }

    /// Per-candidate variant for new-order fan-out
    pub fn for_candidate(mut self, item_id: &str, candidate: &RankedMerchant) -> Self {
        self.item_id = Some(item_id.to_string());
        self.merchant_data = Some(MerchantData::from(&candidate.merchant));
        self.smart_data = Some(SmartData {
            distance: candidate.distance_km,
            score: candidate.score.total,
            priority: candidate.priority,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{CustomerSnapshot, LifecycleEvent, StockAllocation};

    fn job() -> DispatchJob {
        let item = OrderItem {
            item_id: "i-1".to_string(),
            product_id: "p-1".to_string(),
            product_name: "Basmati Rice".to_string(),
            sku: None,
            unit: Some("kg".to_string()),
            weight: Some(1.0),
            quantity: 2,
            unit_price: 90.0,
            total_price: 180.0,
            assigned_merchant_id: None,
            assigned_merchant_name: None,
            assigned_at: None,
            item_status: ItemStatus::Pending,
            rejected_by: ["m-x".to_string()].into_iter().collect(),
            allocations: vec![StockAllocation {
                merchant_id: "m-a".to_string(),
                quantity: 2,
            }],
            stock_settled: false,
        };
        let event = LifecycleEvent::new(
            LifecycleEventType::OrderCreated,
            TriggeredBy::Customer {
                user_id: "c-1".to_string(),
                name: "Asha".to_string(),
                phone: Some("+919999999999".to_string()),
            },
            Map::new(),
            "Order placed",
        );
        let order = Order {
            order_id: "o-1".to_string(),
            order_number: "ORD202610160001".to_string(),
            customer: CustomerSnapshot {
                customer_id: "c-1".to_string(),
                name: "Asha".to_string(),
                phone: Some("+919999999999".to_string()),
                address: None,
                area: Some("Indiranagar".to_string()),
                location: Some(GeoPoint::new(77.64, 12.97)),
            },
            items: vec![item],
            subtotal: 180.0,
            tax: 9.0,
            delivery_charge: 40.0,
            platform_fee: 3.6,
            total_amount: 232.6,
            payment_method: "cod".to_string(),
            delivery_instructions: None,
            order_status: OrderStatus::Pending,
            status_history: vec![],
            lifecycle: vec![event.clone()],
            created_at: 0,
            updated_at: 0,
        };
        DispatchJob {
            order,
            event,
            item_id: None,
            assignment: None,
        }
    }

    #[test]
    fn test_payload_is_allow_listed() {
        let json = serde_json::to_value(WebhookPayload::from_job(&job())).unwrap();

        assert_eq!(json["eventType"], "order_created");
        assert_eq!(json["orderId"], "o-1");
        assert_eq!(json["orderData"]["orderNumber"], "ORD202610160001");
        assert_eq!(json["orderData"]["totals"]["totalAmount"], 232.6);
        assert_eq!(json["orderData"]["items"][0]["productName"], "Basmati Rice");
        assert_eq!(json["triggeredBy"]["userType"], "customer");
        assert_eq!(json["customerLocation"]["lat"], 12.97);
        assert!(json["notificationRules"]["merchant"]["whatsapp"].as_bool().unwrap());

        // internal fields stay inside
        let item = &json["orderData"]["items"][0];
        assert!(item.get("allocations").is_none());
        assert!(item.get("rejectedBy").is_none());
        assert!(json["orderData"].get("lifecycle").is_none());
        assert!(json["triggeredBy"].get("phone").is_none());
        assert!(json.get("itemId").is_none());
        assert!(json.get("smartData").is_none());
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        assert_eq!(rfc3339(1_760_000_000_000), "2025-10-09T08:53:20.000Z");
    }
}
