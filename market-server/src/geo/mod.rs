//! Geo scoring - pure functions used by merchant eligibility and ranking
//!
//! - [`distance`]: great-circle distance
//! - [`schedule`]: working-hours check
//! - [`scoring`]: weighted merchant score and priority label

pub mod distance;
pub mod schedule;
pub mod scoring;

pub use distance::{EARTH_RADIUS_KM, distance_between, haversine_km};
pub use schedule::is_within_working_hours;
pub use scoring::{Priority, ScoreBreakdown, merchant_score};
