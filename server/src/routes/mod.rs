//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the owner API (session cookie), the customer API
//! (table-session cookie), the realtime feed socket, stored menu images under
//! `/uploads`, and the static front end from `STATIC_DIR`. Navigations that
//! match no file fall back to `offline.html`.

pub mod auth;
pub mod customer;
pub mod menu;
pub mod orders;
pub mod owner;
pub mod ws;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use axum::Router;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::domain::gst::{self, BreakdownLine, GstBreakdown};
use crate::frame::ErrorCode;
use crate::state::AppState;

/// Generic text for 5xx bodies; details go to the log only.
const INTERNAL_ERROR_MESSAGE: &str = "something went wrong, please try again";

/// Uploaded images are content-addressed, so they never change in place.
const UPLOAD_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// JSON API routes.
fn api_routes() -> Router<AppState> {
    Router::new()
        // Owner auth.
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/ws-ticket", post(auth::ws_ticket))
        .route("/auth/google", get(auth::google_redirect))
        .route("/auth/google/callback", get(auth::google_callback))
        // Owner dashboard.
        .route("/api/owner/profile", get(owner::profile).patch(owner::update_profile))
        .route("/api/owner/qr", get(owner::qr_codes))
        .route("/api/owner/menu", get(menu::list_items).post(menu::create_item))
        .route(
            "/api/owner/menu/{id}",
            get(menu::get_item)
                .patch(menu::update_item)
                .delete(menu::delete_item),
        )
        .route("/api/owner/menu/{id}/image", post(menu::upload_image).layer(menu::upload_body_limit()))
        .route("/api/owner/orders", get(orders::list_orders))
        .route("/api/owner/orders/summary", get(orders::order_summary))
        .route("/api/owner/orders/stats", get(orders::order_stats))
        .route("/api/owner/orders/{id}", get(orders::get_order))
        .route("/api/owner/orders/{id}/advance", post(orders::advance_order))
        .route("/api/owner/orders/{id}/status", post(orders::set_status))
        .route("/api/owner/orders/{id}/cancel", post(orders::cancel_order))
        .route("/api/owner/orders/{id}/paid", post(orders::mark_paid))
        // Customer ordering.
        .route("/qr", get(customer::qr_entry))
        .route("/api/customer/session", get(customer::get_session).delete(customer::clear_session))
        .route("/api/customer/session/table", put(customer::select_table))
        .route("/api/customer/tables", get(customer::list_tables))
        .route("/api/customer/menu", get(customer::menu))
        .route("/api/customer/cart", get(customer::get_cart))
        .route("/api/customer/cart/items", post(customer::add_to_cart))
        .route("/api/customer/cart/items/{id}", axum::routing::delete(customer::remove_from_cart))
        .route("/api/customer/checkout", get(customer::checkout_quote).post(customer::checkout))
        .route("/api/customer/orders/sync", post(customer::sync_orders))
        .route("/api/customer/orders/{id}", get(customer::track_order))
        .route("/api/customer/orders/{id}/share", get(customer::share_order))
        // Public.
        .route("/api/gst/quote", get(gst_quote))
        .route("/api/diagnostics", get(diagnostics))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
}

/// Full application: API, uploaded images, and the static front end.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let uploads = Router::new()
        .fallback_service(ServeDir::new(state.images.root()))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(UPLOAD_CACHE_CONTROL),
        ));

    let static_dir = state.config.static_dir.clone();
    let site = ServeDir::new(&static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(static_dir.join("offline.html")));

    api_routes()
        .nest_service("/uploads", uploads)
        .fallback_service(site)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// ERROR BODIES
// =============================================================================

/// JSON error body shared by every route module.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub retryable: bool,
}

/// Error response with an explicit message.
pub(crate) fn error_with_message(status: StatusCode, err: &(impl ErrorCode + ?Sized), message: String) -> Response {
    let body = ErrorBody { error: message, code: err.error_code().to_owned(), retryable: err.retryable() };
    (status, Json(body)).into_response()
}

/// Error response for a typed service error. Server errors are logged and
/// their details withheld from the client.
pub(crate) fn error_response(status: StatusCode, err: &(impl ErrorCode + ?Sized)) -> Response {
    if status.is_server_error() {
        tracing::error!(error = %err, code = err.error_code(), "request failed");
        return error_with_message(status, err, INTERNAL_ERROR_MESSAGE.to_owned());
    }
    error_with_message(status, err, err.to_string())
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub(crate) struct BadRequest {
    message: String,
}

impl BadRequest {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl ErrorCode for BadRequest {
    fn error_code(&self) -> &'static str {
        "E_BAD_REQUEST"
    }
}

// =============================================================================
// PUBLIC HANDLERS
// =============================================================================

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[derive(Deserialize)]
pub struct QuoteQuery {
    subtotal: Decimal,
    rate: Option<Decimal>,
    #[serde(default)]
    inter_state: bool,
}

#[derive(Debug, Serialize)]
pub struct Quote {
    #[serde(flatten)]
    pub breakdown: GstBreakdown,
    pub lines: Vec<BreakdownLine>,
    pub total_display: String,
}

impl Quote {
    pub(crate) fn new(breakdown: GstBreakdown) -> Self {
        Self {
            lines: gst::format_gst_breakdown(&breakdown),
            total_display: gst::rupees(breakdown.total),
            breakdown,
        }
    }
}

/// `GET /api/gst/quote`: tax breakdown for a subtotal. The rate defaults to
/// the configured restaurant rate.
async fn gst_quote(State(state): State<AppState>, Query(params): Query<QuoteQuery>) -> Result<Json<Quote>, Response> {
    let subtotal = gst::validate_amount(params.subtotal).map_err(|e| error_response(StatusCode::BAD_REQUEST, &e))?;
    let rate = gst::validate_rate(params.rate.unwrap_or(state.config.gst_rate))
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &e))?;
    Ok(Json(Quote::new(gst::calculate_gst(subtotal, rate, params.inter_state))))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnosticCheck {
    pub check: String,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Diagnostics {
    pub ok: bool,
    pub checks: Vec<DiagnosticCheck>,
}

/// `GET /api/diagnostics`: pass/fail checks for troubleshooting a
/// deployment. The route is public, so failure details go to the log only.
async fn diagnostics(State(state): State<AppState>) -> Json<Diagnostics> {
    let mut checks = Vec::new();

    let db = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&state.pool).await;
    if let Err(e) = &db {
        tracing::warn!(error = %e, "diagnostics: database unreachable");
    }
    checks.push(DiagnosticCheck {
        check: "database connection".into(),
        ok: db.is_ok(),
        detail: if db.is_ok() { "connected" } else { "unreachable" }.into(),
    });

    for table in ["owners", "menu_items", "orders"] {
        let access = sqlx::query_scalar::<_, i32>(&format!("SELECT 1 FROM {table} LIMIT 1"))
            .fetch_optional(&state.pool)
            .await;
        if let Err(e) = &access {
            tracing::warn!(error = %e, table, "diagnostics: table not readable");
        }
        checks.push(DiagnosticCheck {
            check: format!("{table} table access"),
            ok: access.is_ok(),
            detail: if access.is_ok() { "readable" } else { "unavailable" }.into(),
        });
    }

    let uploads_ok = tokio::fs::metadata(state.images.root())
        .await
        .is_ok_and(|m| m.is_dir());
    checks.push(DiagnosticCheck {
        check: "upload directory".into(),
        ok: uploads_ok,
        detail: if uploads_ok { "present" } else { "missing" }.into(),
    });

    checks.push(DiagnosticCheck {
        check: "google sign-in".into(),
        ok: true,
        detail: if state.google.is_some() { "configured" } else { "disabled" }.into(),
    });

    let ok = checks.iter().all(|c| c.ok);
    if !ok {
        tracing::warn!(failed = checks.iter().filter(|c| !c.ok).count(), "diagnostics reported failures");
    }
    Json(Diagnostics { ok, checks })
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
