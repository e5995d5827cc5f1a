//! redb-based storage layer for the fulfillment core
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order documents (items + lifecycle embedded) |
//! | `order_numbers` | `order_number` | `order_id` | Lookup by human-readable number |
//! | `merchant_products` | `(product_id, merchant_id)` | `MerchantProduct` | Inventory rows |
//! | `merchants` | `merchant_id` | `Merchant` | Merchant directory |
//! | `products` | `product_id` | `Product` | Catalog entries |
//! | `settings` | `"app"` | `AppSettings` | Settings singleton |
//! | `counters` | name | `u64` | Daily order sequence |
//!
//! # Concurrency
//!
//! redb admits a single write transaction at a time. Every read-check-write on
//! a stock row and every order mutation happens inside one write transaction,
//! so conditional stock updates are atomic and concurrent mutations of the same
//! order cannot lose updates. Dropping a transaction without commit rolls it back.

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::models::{AppSettings, Merchant, MerchantProduct, Product};
use shared::order::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Order number index: key = order_number, value = order_id
const ORDER_NUMBERS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("order_numbers");

/// Inventory rows: key = (product_id, merchant_id), value = JSON-serialized MerchantProduct
const MERCHANT_PRODUCTS_TABLE: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("merchant_products");

/// Merchants: key = merchant_id, value = JSON-serialized Merchant
const MERCHANTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("merchants");

/// Products: key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

/// Settings singleton: key = "app", value = JSON-serialized AppSettings
const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

/// Counters: key = name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const SETTINGS_KEY: &str = "app";
const ORDER_DATE_KEY: &str = "order_date";
const ORDER_SEQ_KEY: &str = "order_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Marketplace storage backed by redb
#[derive(Clone)]
pub struct MarketStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for MarketStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketStorage").finish_non_exhaustive()
    }
}

impl MarketStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init_tables(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Open an in-memory database (tests, demos)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init_tables(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn init_tables(db: &Database) -> StorageResult<()> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_NUMBERS_TABLE)?;
            let _ = write_txn.open_table(MERCHANT_PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(MERCHANTS_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(SETTINGS_TABLE)?;
            let _ = write_txn.open_table(COUNTERS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction (blocks while another writer is active)
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    // ========== Order Counter (for order number) ==========

    /// Next order sequence for the given business date (`YYYYMMDD`)
    ///
    /// The counter restarts at 1 whenever the date changes.
    pub fn next_daily_sequence(&self, txn: &WriteTransaction, date: u64) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let stored_date = table.get(ORDER_DATE_KEY)?.map(|g| g.value()).unwrap_or(0);

        let next = if stored_date != date {
            table.insert(ORDER_DATE_KEY, date)?;
            1
        } else {
            table.get(ORDER_SEQ_KEY)?.map(|g| g.value()).unwrap_or(0) + 1
        };
        table.insert(ORDER_SEQ_KEY, next)?;
        Ok(next)
    }

    // ========== Order Operations ==========

    /// Store an order (insert or replace)
    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.order_id.as_str(), value.as_slice())?;

        let mut numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;
        numbers.insert(order.order_number.as_str(), order.order_id.as_str())?;
        Ok(())
    }

    /// Get an order by ID
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by ID (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Resolve an order number to its order
    pub fn get_order_by_number(&self, order_number: &str) -> StorageResult<Option<Order>> {
        let order_id = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(ORDER_NUMBERS_TABLE)?;
            match table.get(order_number)? {
                Some(id) => id.value().to_string(),
                None => return Ok(None),
            }
        };
        self.get_order(&order_id)
    }

    /// All stored orders, ordered by order_id
    pub fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }

    // ========== Catalog ==========

    pub fn upsert_product(&self, product: &Product) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PRODUCTS_TABLE)?;
            let value = serde_json::to_vec(product)?;
            table.insert(product.product_id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_product_txn(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
    ) -> StorageResult<Option<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        match table.get(product_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // ========== Merchant Directory ==========

    pub fn upsert_merchant(&self, merchant: &Merchant) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(MERCHANTS_TABLE)?;
            let value = serde_json::to_vec(merchant)?;
            table.insert(merchant.merchant_id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_merchant(&self, merchant_id: &str) -> StorageResult<Option<Merchant>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MERCHANTS_TABLE)?;
        match table.get(merchant_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_merchant_txn(
        &self,
        txn: &WriteTransaction,
        merchant_id: &str,
    ) -> StorageResult<Option<Merchant>> {
        let table = txn.open_table(MERCHANTS_TABLE)?;
        match table.get(merchant_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // ========== Inventory Rows ==========

    pub fn upsert_merchant_product(&self, row: &MerchantProduct) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        self.store_merchant_product_txn(&txn, row)?;
        txn.commit()?;
        Ok(())
    }

    pub fn store_merchant_product_txn(
        &self,
        txn: &WriteTransaction,
        row: &MerchantProduct,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(MERCHANT_PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(row)?;
        table.insert(
            (row.product_id.as_str(), row.merchant_id.as_str()),
            value.as_slice(),
        )?;
        Ok(())
    }

    pub fn get_merchant_product(
        &self,
        merchant_id: &str,
        product_id: &str,
    ) -> StorageResult<Option<MerchantProduct>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MERCHANT_PRODUCTS_TABLE)?;
        match table.get((product_id, merchant_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_merchant_product_txn(
        &self,
        txn: &WriteTransaction,
        merchant_id: &str,
        product_id: &str,
    ) -> StorageResult<Option<MerchantProduct>> {
        let table = txn.open_table(MERCHANT_PRODUCTS_TABLE)?;
        match table.get((product_id, merchant_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All inventory rows for a product, ordered by merchant_id
    pub fn list_product_rows(&self, product_id: &str) -> StorageResult<Vec<MerchantProduct>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MERCHANT_PRODUCTS_TABLE)?;
        collect_product_rows(&table, product_id)
    }

    /// All inventory rows for a product (within transaction)
    pub fn list_product_rows_txn(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
    ) -> StorageResult<Vec<MerchantProduct>> {
        let table = txn.open_table(MERCHANT_PRODUCTS_TABLE)?;
        collect_product_rows(&table, product_id)
    }

    // ========== Settings Singleton ==========

    /// Load the settings row, creating it with defaults if absent
    pub fn load_or_init_settings(&self) -> StorageResult<AppSettings> {
        {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(SETTINGS_TABLE)?;
            if let Some(value) = table.get(SETTINGS_KEY)? {
                return Ok(serde_json::from_slice(value.value())?);
            }
        }

        let txn = self.db.begin_write()?;
        let settings = {
            let mut table = txn.open_table(SETTINGS_TABLE)?;
            // Another writer may have created it between the read and the write
            let existing = match table.get(SETTINGS_KEY)? {
                Some(value) => Some(serde_json::from_slice::<AppSettings>(value.value())?),
                None => None,
            };
            match existing {
                Some(settings) => settings,
                None => {
                    let settings = AppSettings {
                        updated_at: shared::util::now_millis(),
                        ..AppSettings::default()
                    };
                    let value = serde_json::to_vec(&settings)?;
                    table.insert(SETTINGS_KEY, value.as_slice())?;
                    tracing::info!("Settings singleton created with defaults");
                    settings
                }
            }
        };
        txn.commit()?;
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &AppSettings) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS_TABLE)?;
            let value = serde_json::to_vec(settings)?;
            table.insert(SETTINGS_KEY, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

fn collect_product_rows<T>(table: &T, product_id: &str) -> StorageResult<Vec<MerchantProduct>>
where
    T: ReadableTable<(&'static str, &'static str), &'static [u8]>,
{
    let mut rows = Vec::new();
    for result in table.range((product_id, "")..)? {
        let (key, value) = result?;
        if key.value().0 != product_id {
            break;
        }
        rows.push(serde_json::from_slice(value.value())?);
    }
    Ok(rows)
}
