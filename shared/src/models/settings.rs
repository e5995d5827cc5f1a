//! App Settings Model
//!
//! Business configuration singleton. Exactly one row exists per deployment;
//! it is created with [`AppSettings::default`] on first read.

use serde::{Deserialize, Serialize};

/// Delivery charge policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryConfig {
    /// Constant charge
    Fixed { charge: f64 },
    /// Free at or above the threshold, flat charge below it
    Threshold {
        free_delivery_threshold: f64,
        #[serde(default)]
        below_threshold_charge: f64,
    },
    /// Per-km beyond a free base distance
    Distance {
        base_distance_km: f64,
        per_km_rate: f64,
    },
    /// Per-kg beyond a free weight allowance
    Weight {
        free_weight_limit_kg: f64,
        per_kg_rate: f64,
    },
}

/// How a line's unit price is chosen among merchant offers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceDisplayMode {
    #[default]
    Lowest,
    Highest,
    Average,
    /// Catalog base price
    Catalog,
}

/// Order creation behavior when aggregate stock is short
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockValidationMode {
    /// Reject the order
    #[default]
    Strict,
    /// Accept, reserve what exists and log the shortfall
    Lenient,
}

/// App settings singleton
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppSettings {
    /// Fraction, e.g. 0.18
    pub tax_rate: f64,
    pub delivery: DeliveryConfig,
    /// Fraction, e.g. 0.02
    pub platform_fee_rate: f64,
    pub min_order_value: f64,
    #[serde(default)]
    pub price_display: PriceDisplayMode,
    #[serde(default)]
    pub stock_validation: StockValidationMode,
    #[serde(default)]
    pub auto_reduce_stock_on_delivery: bool,
    #[serde(default)]
    pub updated_at: i64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            tax_rate: 0.05,
            delivery: DeliveryConfig::Threshold {
                free_delivery_threshold: 500.0,
                below_threshold_charge: 40.0,
            },
            platform_fee_rate: 0.02,
            min_order_value: 0.0,
            price_display: PriceDisplayMode::Lowest,
            stock_validation: StockValidationMode::Strict,
            auto_reduce_stock_on_delivery: false,
            updated_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_config_tagged() {
        let cfg: DeliveryConfig =
            serde_json::from_str(r#"{"type":"threshold","free_delivery_threshold":1000}"#)
                .unwrap();
        assert_eq!(
            cfg,
            DeliveryConfig::Threshold {
                free_delivery_threshold: 1000.0,
                below_threshold_charge: 0.0,
            }
        );
    }
}
