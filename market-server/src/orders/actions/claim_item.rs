//! ClaimItem command handler
//!
//! Merchant self-service assignment. First merchant wins: the claim only
//! succeeds while the item is still unassigned, checked inside the write
//! transaction so concurrent claims serialize.

use serde::Deserialize;
use shared::order::{ItemStatus, Order, TriggeredBy};

use super::{bind_merchant, ensure_merchant_sells, item_not_found};
use crate::lifecycle::AssignmentKind;
use crate::orders::error::{FulfillmentError, FulfillmentResult};
use crate::orders::traits::{CommandContext, CommandHandler};

/// ClaimItem action
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimItemAction {
    pub order_id: String,
    pub item_id: String,
}

impl CommandHandler for ClaimItemAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        actor: &TriggeredBy,
    ) -> FulfillmentResult<Order> {
        let Some(merchant_id) = actor.merchant_id() else {
            return Err(FulfillmentError::Forbidden(
                "Only merchants can claim items".to_string(),
            ));
        };

        let mut order = ctx.load_order(&self.order_id)?;
        let item = order
            .item(&self.item_id)
            .ok_or_else(|| item_not_found(&self.item_id))?;

        if item.item_status == ItemStatus::Cancelled {
            return Err(FulfillmentError::Validation(format!(
                "Item {} is cancelled",
                self.item_id
            )));
        }
        if item.is_assigned() || item.item_status != ItemStatus::Pending {
            return Err(FulfillmentError::Conflict(format!(
                "Item {} has already been claimed",
                self.item_id
            )));
        }
        let product_id = item.product_id.clone();

        let merchant = ctx.load_merchant(merchant_id)?;
        ensure_merchant_sells(ctx, &merchant, &product_id)?;

        bind_merchant(
            ctx,
            &mut order,
            &self.item_id,
            &merchant,
            AssignmentKind::Claim,
            actor,
            false,
        )?;

        tracing::info!(
            order_id = %order.order_id,
            item_id = %self.item_id,
            merchant_id = %merchant_id,
            "Item claimed"
        );
        Ok(order)
    }
}
