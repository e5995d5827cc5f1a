//! Eligible merchant lookup
//!
//! Filter chain per product:
//! 1. enabled inventory row with stock
//! 2. merchant approved, active, below the current-orders cap
//! 3. both locations set, within `max_distance_km`
//! 4. open now (business-local working hours)

use chrono::NaiveDateTime;
use serde::Serialize;
use shared::models::{GeoPoint, Merchant, MerchantProduct};

use crate::db::{MarketStorage, StorageResult};
use crate::geo::{self, Priority, ScoreBreakdown};

/// Lookup parameters
#[derive(Debug, Clone)]
pub struct EligibilityQuery {
    pub product_id: String,
    pub customer_location: GeoPoint,
    pub max_distance_km: f64,
    pub max_current_orders: u32,
}

/// A merchant that passed every filter
#[derive(Debug, Clone, Serialize)]
pub struct EligibleMerchant {
    pub merchant: Merchant,
    pub row: MerchantProduct,
    pub distance_km: f64,
}

/// An eligible merchant with its score
#[derive(Debug, Clone, Serialize)]
pub struct RankedMerchant {
    pub merchant: Merchant,
    pub row: MerchantProduct,
    pub distance_km: f64,
    pub score: ScoreBreakdown,
    pub priority: Priority,
}

#[derive(Debug, Clone)]
pub struct MerchantEligibility {
    storage: MarketStorage,
}

impl MerchantEligibility {
    pub fn new(storage: MarketStorage) -> Self {
        Self { storage }
    }

    /// Merchants able to fulfil `query.product_id` for a customer at `query.customer_location`
    ///
    /// `local_now` is the current business-local time used for the working-hours check.
    pub fn find_eligible(
        &self,
        query: &EligibilityQuery,
        local_now: NaiveDateTime,
    ) -> StorageResult<Vec<EligibleMerchant>> {
        if query.customer_location.is_unset() {
            tracing::debug!(product_id = %query.product_id, "Customer location unset, no eligible merchants");
            return Ok(Vec::new());
        }

        let mut eligible = Vec::new();
        for row in self.storage.list_product_rows(&query.product_id)? {
            if !row.is_available() {
                continue;
            }
            let Some(merchant) = self.storage.get_merchant(&row.merchant_id)? else {
                continue;
            };
            if !merchant.is_approved()
                || !merchant.availability.is_active
                || merchant.availability.current_day_orders >= query.max_current_orders
            {
                continue;
            }
            let Some(distance_km) = geo::distance_between(query.customer_location, merchant.location)
            else {
                continue;
            };
            if distance_km > query.max_distance_km {
                continue;
            }
            if !geo::is_within_working_hours(merchant.availability.working_hours.as_ref(), local_now)
            {
                continue;
            }

            eligible.push(EligibleMerchant {
                merchant,
                row,
                distance_km,
            });
        }

        tracing::debug!(
            product_id = %query.product_id,
            count = eligible.len(),
            "Eligible merchants found"
        );
        Ok(eligible)
    }
}

/// Score, sort descending and keep the top `top_n`
///
/// Ties are broken by distance, then merchant id.
pub fn rank(eligible: Vec<EligibleMerchant>, now_ms: i64, top_n: usize) -> Vec<RankedMerchant> {
    let mut ranked: Vec<RankedMerchant> = eligible
        .into_iter()
        .map(|e| {
            let score = geo::merchant_score(&e.merchant, e.distance_km, now_ms);
            RankedMerchant {
                priority: score.priority(),
                merchant: e.merchant,
                row: e.row,
                distance_km: e.distance_km,
                score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total
            .cmp(&a.score.total)
            .then_with(|| a.distance_km.total_cmp(&b.distance_km))
            .then_with(|| a.merchant.merchant_id.cmp(&b.merchant.merchant_id))
    });
    ranked.truncate(top_n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::models::{MerchantAvailability, MerchantStatus, WorkingHours};

    // Bangalore MG Road
    const CUSTOMER: GeoPoint = GeoPoint {
        lng: 77.6070,
        lat: 12.9756,
    };

    fn merchant(id: &str, location: GeoPoint) -> Merchant {
        Merchant {
            merchant_id: id.to_string(),
            name: format!("Merchant {id}"),
            phone: None,
            email: None,
            active_status: MerchantStatus::Approved,
            location,
            availability: MerchantAvailability::default(),
            rating: None,
        }
    }

    fn seed(storage: &MarketStorage, merchant: &Merchant, stock: u32) {
        storage.upsert_merchant(merchant).unwrap();
        storage
            .upsert_merchant_product(&MerchantProduct {
                merchant_id: merchant.merchant_id.clone(),
                product_id: "p-1".to_string(),
                price: 20.0,
                stock,
                enabled: true,
                updated_at: 0,
            })
            .unwrap();
    }

    fn query() -> EligibilityQuery {
        EligibilityQuery {
            product_id: "p-1".to_string(),
            customer_location: CUSTOMER,
            max_distance_km: 15.0,
            max_current_orders: 10,
        }
    }

    fn tuesday_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 13)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_merchant_beyond_max_distance_is_excluded() {
        let storage = MarketStorage::open_in_memory().unwrap();
        // ~0.2° north of the customer, roughly 20 km away
        let mut far = merchant("m-far", GeoPoint::new(77.6070, 13.1555));
        far.rating = Some(5.0);
        seed(&storage, &far, 100);
        seed(&storage, &merchant("m-near", GeoPoint::new(77.6100, 12.9800)), 1);

        let eligibility = MerchantEligibility::new(storage);
        let found = eligibility.find_eligible(&query(), tuesday_noon()).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].merchant.merchant_id, "m-near");
    }

    #[test]
    fn test_filters_status_capacity_location_and_hours() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let near = GeoPoint::new(77.6100, 12.9800);

        let mut suspended = merchant("m-suspended", near);
        suspended.active_status = MerchantStatus::Suspended;
        seed(&storage, &suspended, 5);

        let mut busy = merchant("m-busy", near);
        busy.availability.current_day_orders = 10;
        seed(&storage, &busy, 5);

        seed(&storage, &merchant("m-nowhere", GeoPoint::default()), 5);

        let mut closed = merchant("m-closed", near);
        closed.availability.working_hours = Some(WorkingHours {
            start: "09:00".to_string(),
            end: "18:00".to_string(),
            days: vec!["mon".to_string()],
        });
        seed(&storage, &closed, 5);

        seed(&storage, &merchant("m-empty", near), 0);
        seed(&storage, &merchant("m-ok", near), 5);

        let eligibility = MerchantEligibility::new(storage);
        let found = eligibility.find_eligible(&query(), tuesday_noon()).unwrap();

        let ids: Vec<_> = found.iter().map(|e| e.merchant.merchant_id.as_str()).collect();
        assert_eq!(ids, vec!["m-ok"]);
    }

    #[test]
    fn test_rank_orders_by_score_and_truncates() {
        let storage = MarketStorage::open_in_memory().unwrap();
        seed(&storage, &merchant("m-1", GeoPoint::new(77.6070, 13.0556)), 5); // ~8.9 km
        seed(&storage, &merchant("m-2", GeoPoint::new(77.6080, 12.9766)), 5); // ~0.15 km
        seed(&storage, &merchant("m-3", GeoPoint::new(77.6070, 13.0156)), 5); // ~4.4 km

        let eligibility = MerchantEligibility::new(storage);
        let found = eligibility.find_eligible(&query(), tuesday_noon()).unwrap();
        let ranked = rank(found, 0, 2);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].merchant.merchant_id, "m-2");
        assert_eq!(ranked[1].merchant.merchant_id, "m-3");
        assert!(ranked[0].score.total >= ranked[1].score.total);
    }
}
