//! OrdersManager - the fulfillment engine entry point
//!
//! # Command Flow
//!
//! ```text
//! execute(actor, action)
//!     ├─ 1. Take settings snapshot (before the transaction)
//!     ├─ 2. Begin write transaction (single writer: per-order + per-row serialization)
//!     ├─ 3. Create CommandContext
//!     ├─ 4. Execute action → mutated order + appended lifecycle events
//!     ├─ 5. Persist order
//!     ├─ 6. Commit transaction
//!     ├─ 7. Publish dispatch jobs to the notification outbox
//!     └─ 8. Return the committed order
//! ```
//!
//! Any error before step 6 drops the transaction: nothing is persisted and
//! no notification is published.

use chrono_tz::Tz;
use shared::order::{LifecycleEvent, Order, TriggeredBy};
use std::sync::Arc;
#[cfg(test)]
use tokio::sync::mpsc;

use super::actions::{
    AssignItemAction, CancelOrderAction, ClaimItemAction, CommandAction, CreateOrderAction,
    RejectItemAction, UpdateItemStatusAction,
};
use super::error::{FulfillmentError, FulfillmentResult};
use super::traits::{CommandContext, CommandHandler};
use crate::db::MarketStorage;
use crate::inventory::InventoryLedger;
use crate::lifecycle::{EventDraft, LifecycleLog};
use crate::services::SettingsProvider;

/// OrdersManager for command processing
pub struct OrdersManager {
    storage: MarketStorage,
    ledger: InventoryLedger,
    settings: Arc<SettingsProvider>,
    lifecycle: LifecycleLog,
    /// 业务时区
    tz: Tz,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<MarketStorage>")
            .field("tz", &self.tz)
            .finish()
    }
}

impl OrdersManager {
    pub fn new(
        storage: MarketStorage,
        settings: Arc<SettingsProvider>,
        lifecycle: LifecycleLog,
        tz: Tz,
    ) -> Self {
        Self {
            ledger: InventoryLedger::new(storage.clone()),
            storage,
            settings,
            lifecycle,
            tz,
        }
    }

    /// Create an OrdersManager with existing storage (for testing)
    #[cfg(test)]
    pub fn with_storage(
        storage: MarketStorage,
    ) -> (Self, mpsc::Receiver<crate::lifecycle::DispatchJob>) {
        Self::with_outbox_capacity(storage, 1024)
    }

    #[cfg(test)]
    pub fn with_outbox_capacity(
        storage: MarketStorage,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<crate::lifecycle::DispatchJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        let settings = Arc::new(SettingsProvider::new(
            storage.clone(),
            std::time::Duration::ZERO,
        ));
        let lifecycle = LifecycleLog::new(storage.clone(), tx);
        (
            Self::new(storage, settings, lifecycle, chrono_tz::Asia::Kolkata),
            rx,
        )
    }

    pub fn storage(&self) -> &MarketStorage {
        &self.storage
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn lifecycle(&self) -> &LifecycleLog {
        &self.lifecycle
    }

    pub fn settings(&self) -> &SettingsProvider {
        &self.settings
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Execute an action in one write transaction and publish its events
    pub fn execute(&self, actor: &TriggeredBy, action: CommandAction) -> FulfillmentResult<Order> {
        tracing::debug!(action = action.name(), user_type = actor.user_type(), "Processing command");

        // 1. Settings snapshot (may create the singleton, so never inside our txn)
        let settings = self.settings.snapshot()?;

        // 2. Begin write transaction
        let txn = self.storage.begin_write()?;

        // 3-4. Execute
        let result = {
            let mut ctx = CommandContext::new(&txn, &self.storage, &self.ledger, settings, self.tz);
            action
                .execute(&mut ctx, actor)
                .map(|order| (order, ctx.into_pending()))
        };
        let (order, pending) = match result {
            Ok(r) => r,
            Err(e) => {
                log_rejection(action.name(), &e);
                return Err(e);
            }
        };

        // 5-6. Persist + commit
        self.storage.store_order(&txn, &order)?;
        txn.commit()?;

        // 7. Publish
        self.lifecycle
            .publish(LifecycleLog::jobs_for(&order, pending));

        Ok(order)
    }

    // ========== Operations ==========

    pub fn create_order(
        &self,
        actor: &TriggeredBy,
        action: CreateOrderAction,
    ) -> FulfillmentResult<Order> {
        let order = self.execute(actor, CommandAction::CreateOrder(action))?;
        tracing::info!(
            order_id = %order.order_id,
            order_number = %order.order_number,
            total_amount = order.total_amount,
            "Order created"
        );
        Ok(order)
    }

    pub fn assign_item(
        &self,
        actor: &TriggeredBy,
        action: AssignItemAction,
    ) -> FulfillmentResult<Order> {
        self.execute(actor, CommandAction::AssignItem(action))
    }

    pub fn claim_item(&self, actor: &TriggeredBy, action: ClaimItemAction) -> FulfillmentResult<Order> {
        self.execute(actor, CommandAction::ClaimItem(action))
    }

    pub fn reject_item(
        &self,
        actor: &TriggeredBy,
        action: RejectItemAction,
    ) -> FulfillmentResult<Order> {
        self.execute(actor, CommandAction::RejectItem(action))
    }

    pub fn update_item_status(
        &self,
        actor: &TriggeredBy,
        action: UpdateItemStatusAction,
    ) -> FulfillmentResult<Order> {
        self.execute(actor, CommandAction::UpdateItemStatus(action))
    }

    pub fn cancel_order(
        &self,
        actor: &TriggeredBy,
        action: CancelOrderAction,
    ) -> FulfillmentResult<Order> {
        self.execute(actor, CommandAction::CancelOrder(action))
    }

    /// Record an externally raised lifecycle event (payments, refunds, ...)
    pub fn record_event(
        &self,
        order_id: &str,
        actor: &TriggeredBy,
        draft: EventDraft,
    ) -> FulfillmentResult<LifecycleEvent> {
        if !(actor.is_admin() || actor.is_system()) {
            return Err(FulfillmentError::Forbidden(
                "Only admins and system collaborators can record lifecycle events".to_string(),
            ));
        }
        if !draft.event_type.is_external() {
            return Err(FulfillmentError::Validation(format!(
                "{} is produced by order commands and cannot be recorded directly",
                draft.event_type
            )));
        }
        self.lifecycle.record(order_id, actor, draft)
    }

    pub fn get_order(&self, order_id: &str) -> FulfillmentResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_id.to_string()))
    }

    pub fn get_order_by_number(&self, order_number: &str) -> FulfillmentResult<Order> {
        self.storage
            .get_order_by_number(order_number)?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_number.to_string()))
    }
}

fn log_rejection(action: &str, err: &FulfillmentError) {
    match err {
        FulfillmentError::Storage(e) => {
            tracing::error!(action, error = %e, "Command failed on storage");
        }
        e => {
            tracing::debug!(action, error = %e, "Command rejected");
        }
    }
}

#[cfg(test)]
mod tests;
