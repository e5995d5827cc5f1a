//! Product Model

use serde::{Deserialize, Serialize};

/// Catalog product (maintained outside the fulfillment core)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Unit weight in kg
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Catalog price, used when price display is `catalog`
    pub base_price: f64,
    pub enabled: bool,
}
