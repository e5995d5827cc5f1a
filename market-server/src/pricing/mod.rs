//! Pricing Module
//!
//! Derives per-line unit prices and order totals from a settings snapshot.
//! All monetary arithmetic goes through `rust_decimal` and is rounded to
//! two decimals after each individual computation.

mod money;
mod order_calculator;
mod unit_price;

pub use money::*;
pub use order_calculator::*;
pub use unit_price::*;
