//! Fulfillment errors

use thiserror::Error;

use crate::db::StorageError;
use crate::inventory::InventoryError;

/// Domain error taxonomy of the fulfillment engine
///
/// Every variant aborts the triggering operation; nothing is persisted.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Merchant not found: {0}")]
    MerchantNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Merchant {merchant_id} does not sell product {product_id}")]
    MerchantProductNotFound {
        merchant_id: String,
        product_id: String,
    },

    #[error(
        "Insufficient stock at merchant {merchant_id} for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        merchant_id: String,
        product_id: String,
        requested: u32,
        available: u32,
    },

    #[error("Product {product_id} is out of stock: requested {requested}, available {available}")]
    OutOfStock {
        product_id: String,
        requested: u32,
        available: u32,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<InventoryError> for FulfillmentError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InsufficientStock {
                merchant_id,
                product_id,
                requested,
                available,
            } => FulfillmentError::InsufficientStock {
                merchant_id,
                product_id,
                requested,
                available,
            },
            InventoryError::RowNotFound {
                merchant_id,
                product_id,
            } => FulfillmentError::MerchantProductNotFound {
                merchant_id,
                product_id,
            },
            InventoryError::Storage(e) => FulfillmentError::Storage(e),
        }
    }
}

impl From<redb::CommitError> for FulfillmentError {
    fn from(err: redb::CommitError) -> Self {
        FulfillmentError::Storage(err.into())
    }
}

pub type FulfillmentResult<T> = Result<T, FulfillmentError>;
