//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use shared::order::{ItemStatus, LifecycleEvent, LifecycleEventType, Order, TriggeredBy};

use crate::auth::Actor;
use crate::core::ServerState;
use crate::lifecycle::EventDraft;
use crate::orders::{
    AssignItemAction, CancelOrderAction, ClaimItemAction, CreateOrderAction, FulfillmentResult,
    RejectItemAction, UpdateItemStatusAction,
};
use crate::utils::{AppError, AppResult};

/// Run a manager call on the blocking pool (redb transactions are synchronous)
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> FulfillmentResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(format!("Order task failed: {e}")))?
        .map_err(Into::into)
}

/// Customers only see their own orders
fn ensure_visible(actor: &TriggeredBy, order: &Order) -> AppResult<()> {
    match actor {
        TriggeredBy::Customer { user_id, .. } if *user_id != order.customer.customer_id => Err(
            AppError::Forbidden("Order belongs to another customer".to_string()),
        ),
        _ => Ok(()),
    }
}

/// Create order
pub async fn create(
    State(state): State<ServerState>,
    Actor(actor): Actor,
    Json(payload): Json<CreateOrderAction>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let orders = state.orders();
    let order = blocking(move || orders.create_order(&actor, payload)).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let orders = state.orders();
    let order = blocking(move || orders.get_order(&id)).await?;
    ensure_visible(&actor, &order)?;
    Ok(Json(order))
}

/// Get order by order number
pub async fn get_by_number(
    State(state): State<ServerState>,
    Actor(actor): Actor,
    Path(order_number): Path<String>,
) -> AppResult<Json<Order>> {
    let orders = state.orders();
    let order = blocking(move || orders.get_order_by_number(&order_number)).await?;
    ensure_visible(&actor, &order)?;
    Ok(Json(order))
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub bypass_validation: bool,
}

/// Assign item (manual with merchant_id, automatic without)
pub async fn assign_item(
    State(state): State<ServerState>,
    Actor(actor): Actor,
    Path((id, item_id)): Path<(String, String)>,
    payload: Option<Json<AssignRequest>>,
) -> AppResult<Json<Order>> {
    let Json(payload) = payload.unwrap_or_default();
    let action = AssignItemAction {
        order_id: id,
        item_id,
        merchant_id: payload.merchant_id,
        bypass_validation: payload.bypass_validation,
    };
    let orders = state.orders();
    let order = blocking(move || orders.assign_item(&actor, action)).await?;
    Ok(Json(order))
}

/// Claim item (merchant)
pub async fn claim_item(
    State(state): State<ServerState>,
    Actor(actor): Actor,
    Path((id, item_id)): Path<(String, String)>,
) -> AppResult<Json<Order>> {
    let action = ClaimItemAction {
        order_id: id,
        item_id,
    };
    let orders = state.orders();
    let order = blocking(move || orders.claim_item(&actor, action)).await?;
    Ok(Json(order))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Reject item (merchant, or admin on a merchant's behalf)
pub async fn reject_item(
    State(state): State<ServerState>,
    Actor(actor): Actor,
    Path((id, item_id)): Path<(String, String)>,
    payload: Option<Json<RejectRequest>>,
) -> AppResult<Json<Order>> {
    let Json(payload) = payload.unwrap_or_default();
    let action = RejectItemAction {
        order_id: id,
        item_id,
        merchant_id: payload.merchant_id,
        reason: payload.reason,
    };
    let orders = state.orders();
    let order = blocking(move || orders.reject_item(&actor, action)).await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ItemStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// Update item status
pub async fn update_item_status(
    State(state): State<ServerState>,
    Actor(actor): Actor,
    Path((id, item_id)): Path<(String, String)>,
    Json(payload): Json<StatusRequest>,
) -> AppResult<Json<Order>> {
    let action = UpdateItemStatusAction {
        order_id: id,
        item_id,
        status: payload.status,
        note: payload.note,
    };
    let orders = state.orders();
    let order = blocking(move || orders.update_item_status(&actor, action)).await?;
    Ok(Json(order))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Cancel the whole order
pub async fn cancel(
    State(state): State<ServerState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    payload: Option<Json<CancelRequest>>,
) -> AppResult<Json<Order>> {
    let Json(payload) = payload.unwrap_or_default();
    let action = CancelOrderAction {
        order_id: id,
        reason: payload.reason,
    };
    let orders = state.orders();
    let order = blocking(move || orders.cancel_order(&actor, action)).await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct LifecycleRequest {
    pub event_type: LifecycleEventType,
    pub description: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Record an external lifecycle event (payments, refunds)
pub async fn record_event(
    State(state): State<ServerState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(payload): Json<LifecycleRequest>,
) -> AppResult<(StatusCode, Json<LifecycleEvent>)> {
    if payload.description.trim().is_empty() {
        return Err(AppError::validation("description is required"));
    }
    let draft =
        EventDraft::new(payload.event_type, payload.description).with_metadata(payload.metadata);
    let orders = state.orders();
    let event = blocking(move || orders.record_event(&id, &actor, draft)).await?;
    Ok((StatusCode::CREATED, Json(event)))
}
