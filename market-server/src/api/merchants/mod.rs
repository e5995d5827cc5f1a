//! Merchant API Module
//!
//! Ranked preview of the merchants an order for a product would notify.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Merchant router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/merchants", routes())
}

fn routes() -> Router<ServerState> {
    Router::new().route("/eligible", get(handler::eligible))
}
