//! AssignItem command handler
//!
//! Manual assignment when a merchant is given, otherwise an approved merchant
//! that can cover the full quantity, preferring the one already holding the
//! item's reserved stock. No distance or score weighting applies here.

use serde::Deserialize;
use shared::models::{Merchant, MerchantProduct};
use shared::order::{ItemStatus, Order, OrderItem, TriggeredBy};

use super::{bind_merchant, ensure_merchant_sells, item_not_found};
use crate::lifecycle::AssignmentKind;
use crate::orders::error::{FulfillmentError, FulfillmentResult};
use crate::orders::traits::{CommandContext, CommandHandler};

/// AssignItem action
#[derive(Debug, Clone, Deserialize)]
pub struct AssignItemAction {
    pub order_id: String,
    pub item_id: String,
    /// `None` selects a merchant automatically
    #[serde(default)]
    pub merchant_id: Option<String>,
    /// Skip the sells-this-product check (admin / system only)
    #[serde(default)]
    pub bypass_validation: bool,
}

impl AssignItemAction {
    fn authorize(&self, actor: &TriggeredBy) -> FulfillmentResult<()> {
        match actor {
            TriggeredBy::Admin { .. } | TriggeredBy::System => Ok(()),
            TriggeredBy::Merchant { user_id, .. } => {
                if self.bypass_validation {
                    return Err(FulfillmentError::Forbidden(
                        "Only admins may bypass assignment validation".to_string(),
                    ));
                }
                match &self.merchant_id {
                    Some(id) if id == user_id => Ok(()),
                    _ => Err(FulfillmentError::Forbidden(
                        "Merchants may only assign items to themselves".to_string(),
                    )),
                }
            }
            TriggeredBy::Customer { .. } => Err(FulfillmentError::Forbidden(
                "Customers cannot assign items".to_string(),
            )),
        }
    }
}

/// Pick a merchant able to cover the whole item
///
/// A candidate is an enabled row whose merchant is approved, has not rejected
/// the item, and whose held units plus remaining stock reach the quantity.
/// Merchants already holding more of the item come first; ties keep key order.
fn auto_select(ctx: &CommandContext<'_>, item: &OrderItem) -> FulfillmentResult<Merchant> {
    let mut rows: Vec<(u32, MerchantProduct)> = ctx
        .storage()
        .list_product_rows_txn(ctx.txn(), &item.product_id)?
        .into_iter()
        .filter(|row| row.enabled && !item.has_rejected(&row.merchant_id))
        .map(|row| (item.held_at(&row.merchant_id), row))
        .filter(|(held, row)| held.saturating_add(row.stock) >= item.quantity)
        .collect();
    rows.sort_by(|(a, _), (b, _)| b.cmp(a));

    for (held, row) in rows {
        let Some(merchant) = ctx.storage().get_merchant_txn(ctx.txn(), &row.merchant_id)? else {
            continue;
        };
        if merchant.is_approved() {
            tracing::debug!(
                item_id = %item.item_id,
                merchant_id = %merchant.merchant_id,
                held,
                stock = row.stock,
                "Auto-selected merchant"
            );
            return Ok(merchant);
        }
    }
    Err(FulfillmentError::Validation(format!(
        "No eligible merchant can cover {} x {}",
        item.quantity, item.product_id
    )))
}

impl CommandHandler for AssignItemAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        actor: &TriggeredBy,
    ) -> FulfillmentResult<Order> {
        self.authorize(actor)?;

        let mut order = ctx.load_order(&self.order_id)?;
        let item = order
            .item(&self.item_id)
            .ok_or_else(|| item_not_found(&self.item_id))?
            .clone();

        // 只有 pending 可指派；admin/system 可改派 assigned
        match item.item_status {
            ItemStatus::Pending => {}
            ItemStatus::Assigned if actor.is_admin() || actor.is_system() => {}
            ItemStatus::Assigned => {
                return Err(FulfillmentError::Conflict(format!(
                    "Item {} is already assigned",
                    self.item_id
                )));
            }
            other => {
                return Err(FulfillmentError::Validation(format!(
                    "Cannot assign an item that is {other}"
                )));
            }
        }

        let (merchant, kind) = match &self.merchant_id {
            Some(merchant_id) => {
                let merchant = ctx.load_merchant(merchant_id)?;
                if !self.bypass_validation {
                    ensure_merchant_sells(ctx, &merchant, &item.product_id)?;
                }
                (merchant, AssignmentKind::Manual)
            }
            None => (auto_select(ctx, &item)?, AssignmentKind::Auto),
        };

        if item.is_assigned_to(&merchant.merchant_id) {
            return Err(FulfillmentError::Conflict(format!(
                "Item {} is already assigned to {}",
                self.item_id, merchant.merchant_id
            )));
        }

        bind_merchant(
            ctx,
            &mut order,
            &self.item_id,
            &merchant,
            kind,
            actor,
            self.bypass_validation,
        )?;

        tracing::info!(
            order_id = %order.order_id,
            item_id = %self.item_id,
            merchant_id = %merchant.merchant_id,
            assignment_type = kind.as_str(),
            "Item assigned"
        );
        Ok(order)
    }
}
