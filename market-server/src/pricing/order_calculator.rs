//! Order-Level Totals Calculator
//!
//! Pure function of (priced lines, delivery context, settings snapshot):
//! - subtotal = Σ line totals
//! - tax = subtotal × tax_rate
//! - delivery charge by the configured policy (fixed / threshold / distance / weight)
//! - platform fee = subtotal × platform_fee_rate
//! - total = subtotal + tax + delivery + platform fee

use rust_decimal::prelude::*;
use shared::models::{AppSettings, DeliveryConfig};

use super::money::{round_money, to_decimal, to_f64};

/// One priced order line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedLine {
    pub unit_price: f64,
    pub quantity: u32,
    /// Unit weight in kg, if known
    pub weight: Option<f64>,
}

impl PricedLine {
    /// quantity × unit_price, rounded
    pub fn total_price(&self) -> f64 {
        to_f64(to_decimal(self.unit_price) * Decimal::from(self.quantity))
    }
}

/// Inputs beyond the line items
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeliveryContext {
    /// Delivery distance in km (distance-based policy)
    pub distance_km: Option<f64>,
}

/// Stored monetary fields of an order
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub delivery_charge: f64,
    pub platform_fee: f64,
    pub total_amount: f64,
}

/// Calculate order totals
///
/// Every component is rounded to 2 decimals as soon as it is computed; the
/// total is the sum of the rounded components.
pub fn calculate_order_totals(
    lines: &[PricedLine],
    context: &DeliveryContext,
    settings: &AppSettings,
) -> OrderTotals {
    let subtotal = round_money(
        lines
            .iter()
            .map(|l| to_decimal(l.total_price()))
            .sum::<Decimal>(),
    );

    let tax = round_money(subtotal * to_decimal(settings.tax_rate));
    let delivery_charge = round_money(delivery_charge(lines, context, subtotal, &settings.delivery));
    let platform_fee = round_money(subtotal * to_decimal(settings.platform_fee_rate));
    let total_amount = subtotal + tax + delivery_charge + platform_fee;

    OrderTotals {
        subtotal: to_f64(subtotal),
        tax: to_f64(tax),
        delivery_charge: to_f64(delivery_charge),
        platform_fee: to_f64(platform_fee),
        total_amount: to_f64(total_amount),
    }
}

fn delivery_charge(
    lines: &[PricedLine],
    context: &DeliveryContext,
    subtotal: Decimal,
    config: &DeliveryConfig,
) -> Decimal {
    match config {
        DeliveryConfig::Fixed { charge } => to_decimal(*charge),
        DeliveryConfig::Threshold {
            free_delivery_threshold,
            below_threshold_charge,
        } => {
            if subtotal >= to_decimal(*free_delivery_threshold) {
                Decimal::ZERO
            } else {
                to_decimal(*below_threshold_charge)
            }
        }
        DeliveryConfig::Distance {
            base_distance_km,
            per_km_rate,
        } => {
            let distance = to_decimal(context.distance_km.unwrap_or(0.0));
            let extra = (distance - to_decimal(*base_distance_km)).max(Decimal::ZERO);
            extra * to_decimal(*per_km_rate)
        }
        DeliveryConfig::Weight {
            free_weight_limit_kg,
            per_kg_rate,
        } => {
            let total_weight: Decimal = lines
                .iter()
                .map(|l| to_decimal(l.weight.unwrap_or(0.0)) * Decimal::from(l.quantity))
                .sum();
            let extra = (total_weight - to_decimal(*free_weight_limit_kg)).max(Decimal::ZERO);
            extra * to_decimal(*per_kg_rate)
        }
    }
}
