//! Weighted merchant score
//!
//! | Component | Weight | Formula |
//! |-----------|--------|---------|
//! | distance | 50 | `max(0, 50 - km × 2.5)` |
//! | availability | 25 | `max(0, 100 - capacity used %) × 0.25`, 0 if inactive |
//! | recency | 15 | 100 (<2h) / 80 (<6h) / 60 (<24h) / 30, 50 if never; × 0.15 |
//! | rating | 10 | `rating × 2`, rating defaults to 4 |
//!
//! Used for notification targeting only, never for assignment.

use serde::Serialize;
use shared::models::{Merchant, MerchantAvailability};

const HOUR_MS: i64 = 60 * 60 * 1000;
const DEFAULT_RATING: f64 = 4.0;

/// Priority label derived from the final score
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn from_score(score: u32) -> Self {
        if score > 80 {
            Priority::High
        } else if score > 60 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

/// Per-component scores and the rounded total
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ScoreBreakdown {
    pub distance: f64,
    pub availability: f64,
    pub recency: f64,
    pub rating: f64,
    pub total: u32,
}

impl ScoreBreakdown {
    pub fn priority(&self) -> Priority {
        Priority::from_score(self.total)
    }
}

pub fn distance_score(distance_km: f64) -> f64 {
    (50.0 - distance_km * 2.5).max(0.0)
}

pub fn availability_score(availability: &MerchantAvailability) -> f64 {
    if !availability.is_active {
        return 0.0;
    }
    // 上限为 0 视为已满
    let used_percent = if availability.max_daily_orders == 0 {
        100.0
    } else {
        availability.current_day_orders as f64 / availability.max_daily_orders as f64 * 100.0
    };
    (100.0 - used_percent).max(0.0) * 0.25
}

pub fn recency_score(last_order_at: Option<i64>, now_ms: i64) -> f64 {
    let raw = match last_order_at {
        None => 50.0,
        Some(at) => {
            let elapsed = now_ms.saturating_sub(at);
            if elapsed < 2 * HOUR_MS {
                100.0
            } else if elapsed < 6 * HOUR_MS {
                80.0
            } else if elapsed < 24 * HOUR_MS {
                60.0
            } else {
                30.0
            }
        }
    };
    raw * 0.15
}

pub fn rating_score(rating: Option<f64>) -> f64 {
    rating.unwrap_or(DEFAULT_RATING) * 2.0
}

/// Score a merchant at a known distance
pub fn merchant_score(merchant: &Merchant, distance_km: f64, now_ms: i64) -> ScoreBreakdown {
    let distance = distance_score(distance_km);
    let availability = availability_score(&merchant.availability);
    let recency = recency_score(merchant.availability.last_order_at, now_ms);
    let rating = rating_score(merchant.rating);

    let total = (distance + availability + recency + rating).round().max(0.0) as u32;

    ScoreBreakdown {
        distance,
        availability,
        recency,
        rating,
        total,
    }
}
