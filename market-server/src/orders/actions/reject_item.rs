//! RejectItem command handler
//!
//! Adds the merchant to the item's `rejected_by` set. Idempotent; never
//! changes the item status. Only pending or assigned items can be declined.

use serde::Deserialize;
use shared::order::{ItemStatus, LifecycleEventType, Order, TriggeredBy};

use super::item_not_found;
use crate::lifecycle::EventDraft;
use crate::orders::error::{FulfillmentError, FulfillmentResult};
use crate::orders::traits::{CommandContext, CommandHandler};

/// RejectItem action
#[derive(Debug, Clone, Deserialize)]
pub struct RejectItemAction {
    pub order_id: String,
    pub item_id: String,
    /// Required when an admin rejects on a merchant's behalf
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl RejectItemAction {
    fn rejecting_merchant(&self, actor: &TriggeredBy) -> FulfillmentResult<String> {
        match actor {
            TriggeredBy::Merchant { user_id, .. } => match &self.merchant_id {
                Some(id) if id != user_id => Err(FulfillmentError::Forbidden(
                    "Merchants may only reject on their own behalf".to_string(),
                )),
                _ => Ok(user_id.clone()),
            },
            TriggeredBy::Admin { .. } => self.merchant_id.clone().ok_or_else(|| {
                FulfillmentError::Validation("merchant_id is required".to_string())
            }),
            TriggeredBy::Customer { .. } | TriggeredBy::System => Err(
                FulfillmentError::Forbidden("Only merchants can reject items".to_string()),
            ),
        }
    }
}

impl CommandHandler for RejectItemAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        actor: &TriggeredBy,
    ) -> FulfillmentResult<Order> {
        let merchant_id = self.rejecting_merchant(actor)?;

        let mut order = ctx.load_order(&self.order_id)?;
        let item = order
            .item_mut(&self.item_id)
            .ok_or_else(|| item_not_found(&self.item_id))?;

        if !matches!(item.item_status, ItemStatus::Pending | ItemStatus::Assigned) {
            return Err(FulfillmentError::Validation(format!(
                "Cannot reject an item that is {}",
                item.item_status
            )));
        }

        if item.is_assigned_to(&merchant_id) {
            return Err(FulfillmentError::Validation(format!(
                "Item {} is assigned to {}, it cannot be rejected",
                self.item_id, merchant_id
            )));
        }

        if !item.record_rejection(&merchant_id) {
            tracing::debug!(
                order_id = %self.order_id,
                item_id = %self.item_id,
                merchant_id = %merchant_id,
                "Item already rejected by merchant"
            );
            return Ok(order);
        }
        let rejected_count = item.rejected_by.len();
        let product_name = item.product_name.clone();

        let mut draft = EventDraft::new(
            LifecycleEventType::OrderRejected,
            format!("Merchant {merchant_id} declined {product_name}"),
        )
        .item(self.item_id.as_str())
        .meta("itemId", self.item_id.as_str())
        .meta("merchantId", merchant_id.as_str())
        .meta("rejectedCount", rejected_count);
        if let Some(reason) = &self.reason {
            draft = draft.meta("reason", reason.as_str());
        }
        ctx.record(&mut order, actor, draft);
        order.updated_at = ctx.now;

        tracing::info!(
            order_id = %self.order_id,
            item_id = %self.item_id,
            merchant_id = %merchant_id,
            "Item rejected"
        );
        Ok(order)
    }
}
