//! Owner order routes: the live order board and its status actions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Json, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::AuthUser;
use super::error_response;
use crate::domain::gst::rupees;
use crate::domain::status::{OrderStatus, StatusBadge};
use crate::services::order::{self, DailyStats, Order, OrderError, OrderFilter, OrderSummary};
use crate::state::AppState;

const DEFAULT_STATS_DAYS: i32 = 7;

pub(crate) fn order_error_to_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::NotFound(_) | OrderError::RestaurantNotFound(_) => StatusCode::NOT_FOUND,
        OrderError::Empty
        | OrderError::InvalidTable(_)
        | OrderError::InvalidQuantity
        | OrderError::UnknownItem(_) => StatusCode::BAD_REQUEST,
        OrderError::Unavailable(_)
        | OrderError::Transition(_)
        | OrderError::PaymentNotAllowed(_)
        | OrderError::Conflict(_) => StatusCode::CONFLICT,
        OrderError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn order_error(err: &OrderError) -> Response {
    error_response(order_error_to_status(err), err)
}

/// An order as the dashboard shows it.
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub item_count: u32,
    pub total_display: String,
    pub badge: StatusBadge,
    pub payment_badge: StatusBadge,
    /// Label of the button that advances the order, if any.
    pub next_action: Option<&'static str>,
    pub can_cancel: bool,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            item_count: order.item_count(),
            total_display: rupees(order.total),
            badge: order.status.badge(),
            payment_badge: order.payment_status.badge(),
            next_action: order.status.action_label(),
            can_cancel: order.status.can_transition_to(OrderStatus::Cancelled),
            order,
        }
    }
}

// =============================================================================
// READS
// =============================================================================

/// `GET /api/owner/orders[?status=&limit=]`: newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<OrderView>>, Response> {
    let orders = order::list_for_owner(&state.pool, auth.owner.id, filter)
        .await
        .map_err(|e| order_error(&e))?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

/// `GET /api/owner/orders/summary`
pub async fn order_summary(State(state): State<AppState>, auth: AuthUser) -> Result<Json<OrderSummary>, Response> {
    order::summary(&state.pool, auth.owner.id)
        .await
        .map(Json)
        .map_err(|e| order_error(&e))
}

#[derive(Deserialize)]
pub struct StatsQuery {
    days: Option<i32>,
}

/// `GET /api/owner/orders/stats[?days=]`: per-day counts and revenue.
pub async fn order_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<StatsQuery>,
) -> Result<Json<Vec<DailyStats>>, Response> {
    order::daily_stats(&state.pool, auth.owner.id, params.days.unwrap_or(DEFAULT_STATS_DAYS))
        .await
        .map(Json)
        .map_err(|e| order_error(&e))
}

/// `GET /api/owner/orders/{id}`
pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, Response> {
    order::get_for_owner(&state.pool, auth.owner.id, id)
        .await
        .map(|o| Json(o.into()))
        .map_err(|e| order_error(&e))
}

// =============================================================================
// ACTIONS
// =============================================================================

/// `POST /api/owner/orders/{id}/advance`: one step along the flow.
pub async fn advance_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, Response> {
    order::advance(&state.pool, &state.feed, auth.owner.id, id)
        .await
        .map(|o| Json(o.into()))
        .map_err(|e| order_error(&e))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    status: OrderStatus,
}

/// `POST /api/owner/orders/{id}/status`: explicit target status.
pub async fn set_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<OrderView>, Response> {
    order::transition(&state.pool, &state.feed, auth.owner.id, id, body.status)
        .await
        .map(|o| Json(o.into()))
        .map_err(|e| order_error(&e))
}

/// `POST /api/owner/orders/{id}/cancel`
pub async fn cancel_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, Response> {
    order::cancel(&state.pool, &state.feed, auth.owner.id, id)
        .await
        .map(|o| Json(o.into()))
        .map_err(|e| order_error(&e))
}

/// `POST /api/owner/orders/{id}/paid`: record a cash payment.
pub async fn mark_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, Response> {
    order::mark_paid(&state.pool, &state.feed, auth.owner.id, id)
        .await
        .map(|o| Json(o.into()))
        .map_err(|e| order_error(&e))
}

#[cfg(test)]
#[path = "orders_test.rs"]
mod tests;
