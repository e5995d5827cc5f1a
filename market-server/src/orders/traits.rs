//! Command handler seam
//!
//! Every order action runs against a [`CommandContext`] that borrows the
//! single redb write transaction, so reads, stock moves and the order write
//! commit or roll back together.

use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use redb::WriteTransaction;
use shared::models::{AppSettings, Merchant, Product};
use shared::order::{Order, TriggeredBy};

use super::error::{FulfillmentError, FulfillmentResult};
use crate::db::MarketStorage;
use crate::inventory::InventoryLedger;
use crate::lifecycle::{EventDraft, LifecycleLog, PendingDispatch};

/// Execution context for one command
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a MarketStorage,
    ledger: &'a InventoryLedger,
    /// Settings snapshot taken before the transaction began
    pub settings: AppSettings,
    /// 业务时区
    pub tz: Tz,
    /// Server timestamp for this command (Unix millis)
    pub now: i64,
    pending: Vec<PendingDispatch>,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        txn: &'a WriteTransaction,
        storage: &'a MarketStorage,
        ledger: &'a InventoryLedger,
        settings: AppSettings,
        tz: Tz,
    ) -> Self {
        Self {
            txn,
            storage,
            ledger,
            settings,
            tz,
            now: shared::util::now_millis(),
            pending: Vec::new(),
        }
    }

    pub fn txn(&self) -> &'a WriteTransaction {
        self.txn
    }

    pub fn storage(&self) -> &'a MarketStorage {
        self.storage
    }

    pub fn ledger(&self) -> &'a InventoryLedger {
        self.ledger
    }

    /// Business-local wall clock for `now`
    pub fn local_now(&self) -> NaiveDateTime {
        DateTime::from_timestamp_millis(self.now)
            .unwrap_or_default()
            .with_timezone(&self.tz)
            .naive_local()
    }

    pub fn load_order(&self, order_id: &str) -> FulfillmentResult<Order> {
        self.storage
            .get_order_txn(self.txn, order_id)?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_id.to_string()))
    }

    pub fn load_product(&self, product_id: &str) -> FulfillmentResult<Product> {
        self.storage
            .get_product_txn(self.txn, product_id)?
            .ok_or_else(|| FulfillmentError::ProductNotFound(product_id.to_string()))
    }

    pub fn load_merchant(&self, merchant_id: &str) -> FulfillmentResult<Merchant> {
        self.storage
            .get_merchant_txn(self.txn, merchant_id)?
            .ok_or_else(|| FulfillmentError::MerchantNotFound(merchant_id.to_string()))
    }

    /// Append a lifecycle event to the order and queue it for dispatch after commit
    pub fn record(&mut self, order: &mut Order, actor: &TriggeredBy, draft: EventDraft) {
        self.pending.push(LifecycleLog::append(order, actor, draft));
    }

    /// Events appended by this command, in order
    pub fn into_pending(self) -> Vec<PendingDispatch> {
        self.pending
    }
}

/// Command handler trait
///
/// Returns the mutated order; the manager persists it and commits.
pub trait CommandHandler {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        actor: &TriggeredBy,
    ) -> FulfillmentResult<Order>;
}
