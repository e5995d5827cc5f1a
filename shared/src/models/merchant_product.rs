//! Merchant Product (inventory row)

use serde::{Deserialize, Serialize};

/// One merchant's sellable stock of one product
///
/// Unique per (merchant_id, product_id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MerchantProduct {
    pub merchant_id: String,
    pub product_id: String,
    pub price: f64,
    pub stock: u32,
    pub enabled: bool,
    #[serde(default)]
    pub updated_at: i64,
}

impl MerchantProduct {
    /// Enabled and holding stock
    pub fn is_available(&self) -> bool {
        self.enabled && self.stock > 0
    }
}
