//! Merchant Model

use serde::{Deserialize, Serialize};

/// Geographic point
///
/// `(0, 0)` is the "unset" sentinel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Exactly (0, 0)
    pub fn is_unset(&self) -> bool {
        self.lng == 0.0 && self.lat == 0.0
    }
}

/// Merchant approval status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MerchantStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Suspended,
}

/// Weekly opening window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkingHours {
    /// "HH:MM" local time
    pub start: String,
    /// "HH:MM" local time
    pub end: String,
    /// Three-letter lowercase day codes ("mon", "tue", ...)
    pub days: Vec<String>,
}

/// Capacity and availability counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MerchantAvailability {
    pub is_active: bool,
    pub max_daily_orders: u32,
    /// Soft counter maintained outside the fulfillment core
    pub current_day_orders: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_order_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<WorkingHours>,
}

impl Default for MerchantAvailability {
    fn default() -> Self {
        Self {
            is_active: true,
            max_daily_orders: 50,
            current_day_orders: 0,
            last_order_at: None,
            working_hours: None,
        }
    }
}

/// Merchant directory entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Merchant {
    pub merchant_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub active_status: MerchantStatus,
    #[serde(default)]
    pub location: GeoPoint,
    #[serde(default)]
    pub availability: MerchantAvailability,
    /// Average rating (1-5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl Merchant {
    pub fn is_approved(&self) -> bool {
        self.active_status == MerchantStatus::Approved
    }
}
