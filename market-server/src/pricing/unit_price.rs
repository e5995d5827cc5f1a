//! Per-line unit price from the price display policy

use rust_decimal::prelude::*;
use shared::models::{MerchantProduct, PriceDisplayMode, Product};

use super::money::{to_decimal, to_f64};

/// Unit price for a product given its sellable merchant rows
///
/// Only enabled rows with stock are considered. Falls back to the catalog
/// base price when no merchant currently sells the product.
pub fn unit_price_for(product: &Product, rows: &[MerchantProduct], mode: PriceDisplayMode) -> f64 {
    let prices: Vec<Decimal> = rows
        .iter()
        .filter(|r| r.is_available())
        .map(|r| to_decimal(r.price))
        .collect();

    if prices.is_empty() || mode == PriceDisplayMode::Catalog {
        return to_f64(to_decimal(product.base_price));
    }

    let price = match mode {
        PriceDisplayMode::Lowest => prices.iter().copied().min().unwrap_or_default(),
        PriceDisplayMode::Highest => prices.iter().copied().max().unwrap_or_default(),
        PriceDisplayMode::Average => {
            let sum: Decimal = prices.iter().copied().sum();
            sum / Decimal::from(prices.len())
        }
        PriceDisplayMode::Catalog => to_decimal(product.base_price),
    };
    to_f64(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            product_id: "p-1".to_string(),
            name: "Toor Dal 1kg".to_string(),
            sku: None,
            unit: Some("kg".to_string()),
            weight: Some(1.0),
            base_price: 150.0,
            enabled: true,
        }
    }

    fn row(merchant_id: &str, price: f64, stock: u32) -> MerchantProduct {
        MerchantProduct {
            merchant_id: merchant_id.to_string(),
            product_id: "p-1".to_string(),
            price,
            stock,
            enabled: true,
            updated_at: 0,
        }
    }

    #[test]
    fn test_display_modes() {
        let rows = vec![row("m-1", 140.0, 3), row("m-2", 155.0, 1), row("m-3", 99.0, 0)];
        let p = product();

        assert_eq!(unit_price_for(&p, &rows, PriceDisplayMode::Lowest), 140.0);
        assert_eq!(unit_price_for(&p, &rows, PriceDisplayMode::Highest), 155.0);
        assert_eq!(unit_price_for(&p, &rows, PriceDisplayMode::Average), 147.5);
        assert_eq!(unit_price_for(&p, &rows, PriceDisplayMode::Catalog), 150.0);
    }

    #[test]
    fn test_no_sellers_falls_back_to_catalog() {
        assert_eq!(unit_price_for(&product(), &[], PriceDisplayMode::Lowest), 150.0);
    }
}
