//! Inventory ledger
//!
//! 每条 (merchant, product) 库存行的读-检查-写都在调用方传入的 redb 写事务内完成，
//! 单写者保证了条件扣减的原子性：并发请求争抢最后一件库存时只有一个能成功。
//!
//! 库存流转记录在订单项的 `allocations` 上：
//! - 下单：按库存从多到少贪心预留 ([`InventoryLedger::reserve`])
//! - 指派/认领：结算到指派商户 ([`InventoryLedger::settle`])，释放其他商户的预留
//! - 取消：全部释放 ([`InventoryLedger::release`])
//!
//! 同一件商品因此不会被扣减两次。

use shared::models::MerchantProduct;
use shared::order::{OrderItem, StockAllocation};
use thiserror::Error;

use crate::db::{MarketStorage, StorageError};
use redb::WriteTransaction;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(
        "Insufficient stock at merchant {merchant_id} for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        merchant_id: String,
        product_id: String,
        requested: u32,
        available: u32,
    },

    #[error("Merchant {merchant_id} does not sell product {product_id}")]
    RowNotFound {
        merchant_id: String,
        product_id: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<redb::CommitError> for InventoryError {
    fn from(err: redb::CommitError) -> Self {
        InventoryError::Storage(err.into())
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Result of a greedy reservation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservation {
    /// Units taken per merchant, largest pool first
    pub allocations: Vec<StockAllocation>,
    /// Units that could not be reserved
    pub shortfall: u32,
}

impl Reservation {
    pub fn reserved(&self) -> u32 {
        self.allocations.iter().map(|a| a.quantity).sum()
    }
}

/// Stock moved by one settlement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settlement {
    /// Units returned to other merchants
    pub released: u32,
    /// Units newly taken from the assigned merchant
    pub taken: u32,
}

impl Settlement {
    pub fn moved_stock(&self) -> bool {
        self.released > 0 || self.taken > 0
    }
}

/// Per-(merchant, product) stock counters
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    storage: MarketStorage,
}

impl InventoryLedger {
    pub fn new(storage: MarketStorage) -> Self {
        Self { storage }
    }

    /// Enabled rows with stock for a product, largest pool first (ties by merchant_id)
    pub fn candidate_rows(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
    ) -> InventoryResult<Vec<MerchantProduct>> {
        let mut rows: Vec<MerchantProduct> = self
            .storage
            .list_product_rows_txn(txn, product_id)?
            .into_iter()
            .filter(MerchantProduct::is_available)
            .collect();
        rows.sort_by(|a, b| {
            b.stock
                .cmp(&a.stock)
                .then_with(|| a.merchant_id.cmp(&b.merchant_id))
        });
        Ok(rows)
    }

    /// Aggregate sellable stock across merchants
    pub fn total_available(&self, txn: &WriteTransaction, product_id: &str) -> InventoryResult<u32> {
        Ok(self
            .candidate_rows(txn, product_id)?
            .iter()
            .map(|r| r.stock)
            .fold(0u32, u32::saturating_add))
    }

    /// Greedy multi-merchant reservation
    ///
    /// Draws from the largest pool first until `quantity` is covered or no
    /// stock remains. Never fails on shortfall; the caller decides.
    pub fn reserve(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
        quantity: u32,
    ) -> InventoryResult<Reservation> {
        let mut remaining = quantity;
        let mut reservation = Reservation::default();

        for row in self.candidate_rows(txn, product_id)? {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(row.stock);
            self.decrement_for(txn, &row.merchant_id, product_id, take)?;
            reservation.allocations.push(StockAllocation {
                merchant_id: row.merchant_id,
                quantity: take,
            });
            remaining -= take;
        }

        reservation.shortfall = remaining;
        Ok(reservation)
    }

    /// Conditional decrement of one row; fails rather than going below zero
    pub fn decrement_for(
        &self,
        txn: &WriteTransaction,
        merchant_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> InventoryResult<MerchantProduct> {
        let mut row = self.load_row(txn, merchant_id, product_id)?;
        row.stock = row
            .stock
            .checked_sub(quantity)
            .ok_or_else(|| InventoryError::InsufficientStock {
                merchant_id: merchant_id.to_string(),
                product_id: product_id.to_string(),
                requested: quantity,
                available: row.stock,
            })?;
        row.updated_at = shared::util::now_millis();
        self.storage.store_merchant_product_txn(txn, &row)?;
        Ok(row)
    }

    /// Restock / rollback
    pub fn increment(
        &self,
        txn: &WriteTransaction,
        merchant_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> InventoryResult<MerchantProduct> {
        let mut row = self.load_row(txn, merchant_id, product_id)?;
        row.stock = row.stock.saturating_add(quantity);
        row.updated_at = shared::util::now_millis();
        self.storage.store_merchant_product_txn(txn, &row)?;
        Ok(row)
    }

    /// Move an item's held stock onto `merchant_id`
    ///
    /// Allocations held at other merchants are returned; the assigned merchant
    /// is decremented only by what it does not already hold. Idempotent once
    /// the item is fully held by `merchant_id`.
    pub fn settle(
        &self,
        txn: &WriteTransaction,
        item: &mut OrderItem,
        merchant_id: &str,
    ) -> InventoryResult<Settlement> {
        let held = item.held_at(merchant_id);
        let need = item.quantity.saturating_sub(held);
        let mut settlement = Settlement::default();

        if need > 0 {
            self.decrement_for(txn, merchant_id, &item.product_id, need)?;
            settlement.taken = need;
        }

        for allocation in item.allocations.iter().filter(|a| a.merchant_id != merchant_id) {
            self.release_allocation(txn, &item.product_id, allocation)?;
            settlement.released += allocation.quantity;
        }

        // 若预留超出数量（手工修正过库存行），多余部分退回
        if held > item.quantity {
            let surplus = held - item.quantity;
            self.increment(txn, merchant_id, &item.product_id, surplus)?;
            settlement.released += surplus;
        }

        item.allocations = vec![StockAllocation {
            merchant_id: merchant_id.to_string(),
            quantity: item.quantity,
        }];
        item.stock_settled = true;
        Ok(settlement)
    }

    /// Return every allocation of an item to its merchant
    pub fn release(&self, txn: &WriteTransaction, item: &mut OrderItem) -> InventoryResult<u32> {
        let mut released = 0;
        for allocation in &item.allocations {
            self.release_allocation(txn, &item.product_id, allocation)?;
            released += allocation.quantity;
        }
        item.allocations.clear();
        item.stock_settled = false;
        Ok(released)
    }

    /// Standalone atomic decrement in its own transaction
    pub fn decrement(
        &self,
        merchant_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> InventoryResult<MerchantProduct> {
        let txn = self.storage.begin_write()?;
        let row = self.decrement_for(&txn, merchant_id, product_id, quantity)?;
        txn.commit()?;
        Ok(row)
    }

    /// Standalone restock in its own transaction
    pub fn restock(
        &self,
        merchant_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> InventoryResult<MerchantProduct> {
        let txn = self.storage.begin_write()?;
        let row = self.increment(&txn, merchant_id, product_id, quantity)?;
        txn.commit()?;
        Ok(row)
    }

    fn release_allocation(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
        allocation: &StockAllocation,
    ) -> InventoryResult<()> {
        match self.increment(txn, &allocation.merchant_id, product_id, allocation.quantity) {
            Ok(_) => Ok(()),
            // 库存行已被商户删除：无处归还
            Err(InventoryError::RowNotFound { .. }) => {
                tracing::warn!(
                    merchant_id = %allocation.merchant_id,
                    product_id = %product_id,
                    quantity = allocation.quantity,
                    "Inventory row vanished, held stock dropped"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn load_row(
        &self,
        txn: &WriteTransaction,
        merchant_id: &str,
        product_id: &str,
    ) -> InventoryResult<MerchantProduct> {
        self.storage
            .get_merchant_product_txn(txn, merchant_id, product_id)?
            .ok_or_else(|| InventoryError::RowNotFound {
                merchant_id: merchant_id.to_string(),
                product_id: product_id.to_string(),
            })
    }
}
