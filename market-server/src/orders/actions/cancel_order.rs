//! CancelOrder command handler
//!
//! Cancels every remaining item and returns all held stock. Allowed only
//! while every live item is still cancellable.

use serde::Deserialize;
use shared::order::{ItemStatus, LifecycleEventType, Order, TriggeredBy};

use crate::lifecycle::EventDraft;
use crate::orders::error::{FulfillmentError, FulfillmentResult};
use crate::orders::status::refresh_order_status;
use crate::orders::traits::{CommandContext, CommandHandler};

/// CancelOrder action
#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderAction {
    pub order_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl CommandHandler for CancelOrderAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        actor: &TriggeredBy,
    ) -> FulfillmentResult<Order> {
        let now = ctx.now;
        let ledger = ctx.ledger();
        let txn = ctx.txn();

        let mut order = ctx.load_order(&self.order_id)?;

        // 1. Authorization: own order, or admin
        match actor {
            TriggeredBy::Customer { user_id, .. } if *user_id == order.customer.customer_id => {}
            TriggeredBy::Admin { .. } => {}
            _ => {
                return Err(FulfillmentError::Forbidden(
                    "Only the ordering customer or an admin can cancel this order".to_string(),
                ));
            }
        }

        // 2. Every live item must be cancellable
        let live: Vec<usize> = order
            .items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.item_status != ItemStatus::Cancelled)
            .map(|(idx, _)| idx)
            .collect();
        if live.is_empty() {
            return Err(FulfillmentError::Validation(
                "Order is already cancelled".to_string(),
            ));
        }
        if let Some(item) = live
            .iter()
            .map(|&idx| &order.items[idx])
            .find(|i| !i.item_status.is_cancellable())
        {
            return Err(FulfillmentError::Validation(format!(
                "Item {} is already {}, order can no longer be cancelled",
                item.item_id, item.item_status
            )));
        }

        // 3. Release stock, cancel items
        let mut released_units = 0;
        for idx in live {
            let item = &mut order.items[idx];
            released_units += ledger.release(txn, item)?;
            item.item_status = ItemStatus::Cancelled;
        }

        // 4. Lifecycle + derived status
        let reason = self
            .reason
            .clone()
            .unwrap_or_else(|| "Order cancelled".to_string());
        let draft = EventDraft::new(
            LifecycleEventType::OrderCancelled,
            format!("Order {} cancelled by {}", order.order_number, actor.display_name()),
        )
        .meta("reason", reason.as_str())
        .meta("releasedUnits", released_units);
        ctx.record(&mut order, actor, draft);
        refresh_order_status(&mut order, now, Some(reason), false);

        tracing::info!(
            order_id = %order.order_id,
            released_units,
            "Order cancelled"
        );
        Ok(order)
    }
}
