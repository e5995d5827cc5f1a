//! Order API Module
//!
//! All mutations go through [`OrdersManager`](crate::orders::OrdersManager);
//! handlers only translate HTTP into commands.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/number/{order_number}", get(handler::get_by_number))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/lifecycle", post(handler::record_event))
        // Item operations
        .route("/{id}/items/{item_id}/assign", post(handler::assign_item))
        .route("/{id}/items/{item_id}/claim", post(handler::claim_item))
        .route("/{id}/items/{item_id}/reject", post(handler::reject_item))
        .route("/{id}/items/{item_id}/status", post(handler::update_item_status))
}
