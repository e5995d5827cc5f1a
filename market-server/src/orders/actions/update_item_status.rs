//! UpdateItemStatus command handler
//!
//! Moves one item forward (or cancels it). Assigned merchants may move only
//! their own items; admins may move any item.

use serde::Deserialize;
use shared::order::{ItemStatus, LifecycleEventType, Order, TriggeredBy};

use super::item_not_found;
use crate::inventory::InventoryError;
use crate::lifecycle::EventDraft;
use crate::orders::error::{FulfillmentError, FulfillmentResult};
use crate::orders::status::{check_item_transition, refresh_order_status};
use crate::orders::traits::{CommandContext, CommandHandler};

/// UpdateItemStatus action
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemStatusAction {
    pub order_id: String,
    pub item_id: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub note: Option<String>,
}

fn event_type_for(status: ItemStatus) -> Option<LifecycleEventType> {
    match status {
        ItemStatus::Shipped => Some(LifecycleEventType::OrderShipped),
        ItemStatus::Delivered => Some(LifecycleEventType::OrderDelivered),
        ItemStatus::Cancelled => Some(LifecycleEventType::OrderCancelled),
        _ => None,
    }
}

impl CommandHandler for UpdateItemStatusAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        actor: &TriggeredBy,
    ) -> FulfillmentResult<Order> {
        let now = ctx.now;
        let ledger = ctx.ledger();
        let txn = ctx.txn();
        let auto_reduce = ctx.settings.auto_reduce_stock_on_delivery;

        let mut order = ctx.load_order(&self.order_id)?;
        let item = order
            .item_mut(&self.item_id)
            .ok_or_else(|| item_not_found(&self.item_id))?;

        // 1. Authorization
        match actor {
            TriggeredBy::Admin { .. } => {}
            TriggeredBy::Merchant { user_id, .. } if item.is_assigned_to(user_id) => {}
            TriggeredBy::Merchant { .. } => {
                return Err(FulfillmentError::Forbidden(
                    "Item is not assigned to this merchant".to_string(),
                ));
            }
            TriggeredBy::Customer { .. } | TriggeredBy::System => {
                return Err(FulfillmentError::Forbidden(
                    "Only the assigned merchant or an admin can update item status".to_string(),
                ));
            }
        }

        // 2. Transition
        let from = item.item_status;
        check_item_transition(from, self.status).map_err(FulfillmentError::Validation)?;

        // 3. Stock side effects
        let mut stock_moved = None;
        match self.status {
            ItemStatus::Cancelled => {
                let released = ledger.release(txn, item)?;
                tracing::debug!(item_id = %self.item_id, released, "Item stock released");
            }
            ItemStatus::Delivered if auto_reduce => {
                if let Some(merchant_id) = item.assigned_merchant_id.clone() {
                    match ledger.settle(txn, item, &merchant_id) {
                        Ok(settlement) if settlement.moved_stock() => {
                            stock_moved = Some((merchant_id, settlement));
                        }
                        Ok(_) => {}
                        Err(InventoryError::RowNotFound { .. }) => {
                            tracing::warn!(
                                item_id = %self.item_id,
                                merchant_id = %merchant_id,
                                "No inventory row for delivering merchant, stock not reduced"
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            _ => {}
        }

        item.item_status = self.status;
        let product_id = item.product_id.clone();
        let product_name = item.product_name.clone();
        let quantity = item.quantity;

        // 4. Lifecycle
        if let Some(event_type) = event_type_for(self.status) {
            let mut draft = EventDraft::new(
                event_type,
                format!("{product_name} is now {}", self.status),
            )
            .item(self.item_id.as_str())
            .meta("itemId", self.item_id.as_str())
            .meta("fromStatus", from.as_str())
            .meta("toStatus", self.status.as_str());
            if let Some(note) = &self.note {
                draft = draft.meta("note", note.as_str());
            }
            ctx.record(&mut order, actor, draft);
        }

        if let Some((merchant_id, settlement)) = stock_moved {
            let draft = EventDraft::new(
                LifecycleEventType::StockUpdated,
                format!("Stock for {product_name} settled on delivery"),
            )
            .item(self.item_id.as_str())
            .meta("itemId", self.item_id.as_str())
            .meta("merchantId", merchant_id.as_str())
            .meta("productId", product_id.as_str())
            .meta("quantity", quantity)
            .meta("taken", settlement.taken)
            .meta("released", settlement.released);
            ctx.record(&mut order, actor, draft);
        }

        // 5. Derived status
        refresh_order_status(&mut order, now, self.note.clone(), false);

        tracing::info!(
            order_id = %order.order_id,
            item_id = %self.item_id,
            from = %from,
            to = %self.status,
            order_status = %order.order_status,
            "Item status updated"
        );
        Ok(order)
    }
}
