//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific operation on the order aggregate.

use shared::models::Merchant;
use shared::order::{ItemStatus, LifecycleEventType, Order, TriggeredBy};

use crate::inventory::InventoryError;
use crate::lifecycle::{AssignmentData, AssignmentKind, EventDraft};
use crate::orders::error::{FulfillmentError, FulfillmentResult};
use crate::orders::status::refresh_order_status;
use crate::orders::traits::{CommandContext, CommandHandler};

mod assign_item;
mod cancel_order;
mod claim_item;
mod create_order;
mod reject_item;
mod update_item_status;

pub use assign_item::AssignItemAction;
pub use cancel_order::CancelOrderAction;
pub use claim_item::ClaimItemAction;
pub use create_order::CreateOrderAction;
pub use reject_item::RejectItemAction;
pub use update_item_status::UpdateItemStatusAction;

/// CommandAction enum - dispatches to concrete action implementations
#[derive(Debug, Clone)]
pub enum CommandAction {
    CreateOrder(CreateOrderAction),
    AssignItem(AssignItemAction),
    ClaimItem(ClaimItemAction),
    RejectItem(RejectItemAction),
    UpdateItemStatus(UpdateItemStatusAction),
    CancelOrder(CancelOrderAction),
}

impl CommandAction {
    pub fn name(&self) -> &'static str {
        match self {
            CommandAction::CreateOrder(_) => "create_order",
            CommandAction::AssignItem(_) => "assign_item",
            CommandAction::ClaimItem(_) => "claim_item",
            CommandAction::RejectItem(_) => "reject_item",
            CommandAction::UpdateItemStatus(_) => "update_item_status",
            CommandAction::CancelOrder(_) => "cancel_order",
        }
    }
}

/// Manual implementation of CommandHandler for CommandAction
impl CommandHandler for CommandAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        actor: &TriggeredBy,
    ) -> FulfillmentResult<Order> {
        match self {
            CommandAction::CreateOrder(action) => action.execute(ctx, actor),
            CommandAction::AssignItem(action) => action.execute(ctx, actor),
            CommandAction::ClaimItem(action) => action.execute(ctx, actor),
            CommandAction::RejectItem(action) => action.execute(ctx, actor),
            CommandAction::UpdateItemStatus(action) => action.execute(ctx, actor),
            CommandAction::CancelOrder(action) => action.execute(ctx, actor),
        }
    }
}

// ========== Shared helpers ==========

fn item_not_found(item_id: &str) -> FulfillmentError {
    FulfillmentError::ItemNotFound(item_id.to_string())
}

/// Merchant must be approved and sell the product on an enabled row
fn ensure_merchant_sells(
    ctx: &CommandContext<'_>,
    merchant: &Merchant,
    product_id: &str,
) -> FulfillmentResult<()> {
    if !merchant.is_approved() {
        return Err(FulfillmentError::Validation(format!(
            "Merchant {} is not approved",
            merchant.merchant_id
        )));
    }
    let row = ctx
        .storage()
        .get_merchant_product_txn(ctx.txn(), &merchant.merchant_id, product_id)?
        .ok_or_else(|| FulfillmentError::MerchantProductNotFound {
            merchant_id: merchant.merchant_id.clone(),
            product_id: product_id.to_string(),
        })?;
    if !row.enabled {
        return Err(FulfillmentError::Validation(format!(
            "Merchant {} has disabled product {}",
            merchant.merchant_id, product_id
        )));
    }
    Ok(())
}

/// Bind an item to a merchant: settle stock, set assignment, record the event
///
/// With `allow_missing_row` an assignment to a merchant without an inventory
/// row proceeds and leaves the item unsettled.
fn bind_merchant(
    ctx: &mut CommandContext<'_>,
    order: &mut Order,
    item_id: &str,
    merchant: &Merchant,
    kind: AssignmentKind,
    actor: &TriggeredBy,
    allow_missing_row: bool,
) -> FulfillmentResult<()> {
    let now = ctx.now;
    let ledger = ctx.ledger();
    let txn = ctx.txn();

    let item = order.item_mut(item_id).ok_or_else(|| item_not_found(item_id))?;
    match ledger.settle(txn, item, &merchant.merchant_id) {
        Ok(settlement) => {
            tracing::debug!(
                item_id = %item_id,
                merchant_id = %merchant.merchant_id,
                released = settlement.released,
                taken = settlement.taken,
                "Stock settled onto merchant"
            );
        }
        Err(InventoryError::RowNotFound { .. }) if allow_missing_row => {
            tracing::warn!(
                item_id = %item_id,
                merchant_id = %merchant.merchant_id,
                product_id = %item.product_id,
                "Assigned without inventory row, stock left unsettled"
            );
            item.stock_settled = false;
        }
        Err(e) => return Err(e.into()),
    }

    item.assigned_merchant_id = Some(merchant.merchant_id.clone());
    item.assigned_merchant_name = Some(merchant.name.clone());
    item.assigned_at = Some(now);
    item.item_status = ItemStatus::Assigned;
    let product_name = item.product_name.clone();

    let (event_type, description) = match kind {
        AssignmentKind::Claim => (
            LifecycleEventType::OrderAccepted,
            format!("{} accepted {}", merchant.name, product_name),
        ),
        AssignmentKind::Manual | AssignmentKind::Auto => (
            LifecycleEventType::OrderAssigned,
            format!("{} assigned to {}", product_name, merchant.name),
        ),
    };
    let assignment = AssignmentData {
        merchant_id: merchant.merchant_id.clone(),
        merchant_name: merchant.name.clone(),
        assignment_type: kind,
        assigned_at: now,
    };
    let draft = EventDraft::new(event_type, description)
        .item(item_id)
        .meta("itemId", item_id)
        .meta("merchantId", merchant.merchant_id.as_str())
        .meta("merchantName", merchant.name.as_str())
        .meta("assignmentType", kind.as_str())
        .assignment(assignment);
    ctx.record(order, actor, draft);

    refresh_order_status(order, now, None, true);
    Ok(())
}
