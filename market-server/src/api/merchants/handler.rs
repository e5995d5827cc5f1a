//! Merchant API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use shared::models::GeoPoint;
use shared::order::TriggeredBy;

use crate::auth::Actor;
use crate::core::ServerState;
use crate::eligibility::{self, EligibilityQuery, RankedMerchant};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct EligibleQuery {
    pub product_id: String,
    pub lat: f64,
    pub lng: f64,
    /// 覆盖配置中的默认值
    #[serde(default)]
    pub max_distance_km: Option<f64>,
    #[serde(default)]
    pub top_n: Option<usize>,
}

impl EligibleQuery {
    /// NaN 会绕过距离过滤，必须在这里拦截
    fn validate_location(&self) -> AppResult<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(AppError::validation("lat must be between -90 and 90"));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(AppError::validation("lng must be between -180 and 180"));
        }
        match self.max_distance_km {
            Some(d) if !d.is_finite() || d <= 0.0 => Err(AppError::validation(
                "max_distance_km must be a positive number",
            )),
            _ => Ok(()),
        }
    }
}

/// Ranked eligible merchants for a product near a location
pub async fn eligible(
    State(state): State<ServerState>,
    Actor(actor): Actor,
    Query(query): Query<EligibleQuery>,
) -> AppResult<Json<Vec<RankedMerchant>>> {
    if !matches!(actor, TriggeredBy::Admin { .. } | TriggeredBy::System) {
        return Err(AppError::Forbidden(
            "Only admins can preview merchant targeting".to_string(),
        ));
    }
    if query.product_id.trim().is_empty() {
        return Err(AppError::validation("product_id is required"));
    }
    query.validate_location()?;

    let smart = state.config.smart;
    let tz = state.config.timezone;
    let finder = state.eligibility.clone();
    let top_n = query.top_n.unwrap_or(smart.top_n);
    let lookup = EligibilityQuery {
        product_id: query.product_id,
        customer_location: GeoPoint::new(query.lng, query.lat),
        max_distance_km: query.max_distance_km.unwrap_or(smart.max_distance_km),
        max_current_orders: smart.max_current_orders,
    };

    let ranked = tokio::task::spawn_blocking(move || {
        let now = chrono::Utc::now();
        finder
            .find_eligible(&lookup, now.with_timezone(&tz).naive_local())
            .map(|eligible| eligibility::rank(eligible, now.timestamp_millis(), top_n))
    })
    .await
    .map_err(|e| AppError::internal(format!("Eligibility task failed: {e}")))?
    .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(ranked))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(lat: f64, lng: f64, max_distance_km: Option<f64>) -> EligibleQuery {
        EligibleQuery {
            product_id: "p-1".to_string(),
            lat,
            lng,
            max_distance_km,
            top_n: None,
        }
    }

    #[test]
    fn test_location_bounds() {
        assert!(query(12.97, 77.64, None).validate_location().is_ok());
        assert!(query(-90.0, 180.0, Some(5.0)).validate_location().is_ok());

        assert!(query(f64::NAN, 77.64, None).validate_location().is_err());
        assert!(query(12.97, f64::INFINITY, None).validate_location().is_err());
        assert!(query(100.0, 77.64, None).validate_location().is_err());
        assert!(query(12.97, -181.0, None).validate_location().is_err());
        assert!(query(12.97, 77.64, Some(f64::NAN)).validate_location().is_err());
        assert!(query(12.97, 77.64, Some(0.0)).validate_location().is_err());
    }
}
