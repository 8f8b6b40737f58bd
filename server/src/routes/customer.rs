//! Customer ordering routes: QR entry, table session, menu, cart, checkout,
//! order tracking, and offline sync.
//!
//! DESIGN
//! ======
//! Customers never sign in. A `table_session` cookie points at an in-memory
//! [`TableSession`] that holds the restaurant, the table, and the cart. Every
//! handler that reads the session refreshes the cookie, so an active phone
//! keeps its cart until it goes idle.
//!
//! Customer-facing messages are localized from `?lang=` or
//! `Accept-Language` (English and Hindi).

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use super::auth::{build_cookie, expired_cookie, owner_error};
use super::orders::{order_error, order_error_to_status};
use super::{BadRequest, Quote, error_response, error_with_message};
use crate::domain::cart::{Cart, CartError, CartLine};
use crate::domain::gst::{self, BreakdownLine, GstBreakdown};
use crate::domain::i18n::{Key, Language, status_key, translate};
use crate::domain::status::{OrderStatus, StatusBadge, TrackerStep, tracker};
use crate::domain::whatsapp::{self, MessageLine, OrderConfirmation};
use crate::services::menu::{self, MenuItem};
use crate::services::order::{self, OfflineOrder, Order, OrderError, PlaceOrder, SyncOutcome};
use crate::services::owner::{self, OwnerError};
use crate::services::table_session::{TableSession, TableSessionError};
use crate::state::AppState;

pub(crate) const TABLE_COOKIE_NAME: &str = "table_session";

/// Header carrying a client-generated key that makes checkout idempotent.
const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// Upper bound on one offline sync batch.
const MAX_SYNC_BATCH: usize = 50;

/// Cookie lifetime cap; the store's idle timeout is what really expires
/// sessions.
const MAX_COOKIE_MINUTES: i64 = 60 * 24 * 7;

const TABLE_PICKER_PATH: &str = "/customer/table";
const MENU_PATH: &str = "/customer/menu";

// =============================================================================
// LANGUAGE
// =============================================================================

#[derive(Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

/// Customer language from `?lang=`, else `Accept-Language`, else English.
#[derive(Debug, Clone, Copy)]
pub struct Lang(pub Language);

impl<S: Send + Sync> FromRequestParts<S> for Lang {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_query = Query::<LangQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.lang)
            .and_then(|raw| Language::parse(&raw));
        let lang = from_query.unwrap_or_else(|| {
            parts
                .headers
                .get(header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok())
                .map_or(Language::En, Language::from_accept_language)
        });
        Ok(Self(lang))
    }
}

// =============================================================================
// ERRORS
// =============================================================================

pub(crate) fn table_session_error_to_status(err: &TableSessionError) -> StatusCode {
    match err {
        TableSessionError::UnknownSession => StatusCode::NOT_FOUND,
        TableSessionError::InvalidTable { .. } | TableSessionError::EmptyCart => StatusCode::BAD_REQUEST,
        TableSessionError::MissingRestaurant | TableSessionError::MissingTable => StatusCode::CONFLICT,
    }
}

fn table_session_error(lang: Language, err: &TableSessionError) -> Response {
    let status = table_session_error_to_status(err);
    let message = match err {
        TableSessionError::MissingRestaurant => translate(lang, Key::RescanQr).to_owned(),
        TableSessionError::MissingTable => translate(lang, Key::SelectTable).to_owned(),
        TableSessionError::EmptyCart => translate(lang, Key::EmptyCart).to_owned(),
        TableSessionError::UnknownSession | TableSessionError::InvalidTable { .. } => err.to_string(),
    };
    error_with_message(status, err, message)
}

/// Restaurant lookups from customer routes: an unknown id means a bad QR.
fn restaurant_error(lang: Language, err: &OwnerError) -> Response {
    match err {
        OwnerError::NotFound(_) => {
            error_with_message(StatusCode::NOT_FOUND, err, translate(lang, Key::RescanQr).to_owned())
        }
        _ => owner_error(err),
    }
}

// =============================================================================
// SESSION PLUMBING
// =============================================================================

fn cookie_token(jar: &CookieJar) -> Option<String> {
    jar.get(TABLE_COOKIE_NAME)
        .map(Cookie::value)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn table_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let minutes = i64::try_from(state.config.table_session_ttl_minutes)
        .unwrap_or(MAX_COOKIE_MINUTES)
        .min(MAX_COOKIE_MINUTES);
    build_cookie(TABLE_COOKIE_NAME, token, state.config.cookie_secure, Duration::minutes(minutes))
}

/// Live session for this request, creating one when the cookie is missing
/// or stale. The returned jar refreshes the cookie.
async fn ensure_session(state: &AppState, jar: CookieJar) -> (CookieJar, String, TableSession) {
    let (token, session) = state.tables.ensure(cookie_token(&jar).as_deref()).await;
    let jar = jar.add(table_cookie(state, token.clone()));
    (jar, token, session)
}

/// Run `f` against the request's session. A session that expired mid-request
/// surfaces as `UnknownSession`.
async fn with_session<R>(
    state: &AppState,
    token: &str,
    lang: Language,
    f: impl FnOnce(&mut TableSession) -> R,
) -> Result<R, Response> {
    state
        .tables
        .update(token, f)
        .await
        .map_err(|e| table_session_error(lang, &e))
}

// =============================================================================
// VIEWS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub item_count: u32,
    pub subtotal: Decimal,
    pub subtotal_display: String,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let subtotal = cart.subtotal();
        Self {
            lines: cart.lines().to_vec(),
            item_count: cart.item_count(),
            subtotal,
            subtotal_display: gst::rupees(subtotal),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub restaurant_id: Option<Uuid>,
    pub table_number: Option<u16>,
    pub last_order_id: Option<Uuid>,
    pub cart: CartView,
}

impl From<&TableSession> for SessionView {
    fn from(session: &TableSession) -> Self {
        Self {
            restaurant_id: session.owner_id,
            table_number: session.table_number,
            last_order_id: session.last_order_id,
            cart: CartView::from(&session.cart),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartUpdate {
    pub message: &'static str,
    pub item_id: Uuid,
    /// Units of this item now in the cart.
    pub quantity: u32,
    pub cart: CartView,
}

/// Order as the confirmation and tracking pages show it.
#[derive(Debug, Serialize)]
pub struct TrackedOrder {
    pub order: Order,
    pub status_label: &'static str,
    pub headline: &'static str,
    pub message: &'static str,
    pub badge: StatusBadge,
    pub progress: Option<f64>,
    pub steps: Vec<TrackerStep>,
    pub bill: Vec<BreakdownLine>,
}

impl TrackedOrder {
    fn new(order: Order, lang: Language) -> Self {
        let status = order.status;
        Self {
            status_label: translate(lang, status_key(status)),
            headline: status.headline(),
            message: status.message(),
            badge: status.badge(),
            progress: status.progress(),
            steps: tracker(status),
            bill: gst::format_gst_breakdown(&bill_breakdown(&order)),
            order,
        }
    }
}

/// Tax breakdown stored on an order row.
fn bill_breakdown(order: &Order) -> GstBreakdown {
    GstBreakdown {
        subtotal: order.subtotal,
        cgst: order.cgst,
        sgst: order.sgst,
        igst: order.igst,
        gst_rate: order.gst_rate,
        total_gst: order.gst_amount,
        total: order.total,
    }
}

fn message_lines(order: &Order) -> Vec<MessageLine<'_>> {
    order
        .items
        .iter()
        .map(|item| MessageLine {
            name: &item.name,
            quantity: u32::try_from(item.quantity).unwrap_or(0),
            price: item.price,
        })
        .collect()
}

fn confirmation_message(order: &Order, restaurant_name: &str) -> String {
    let order_id = order.id.to_string();
    let lines = message_lines(order);
    whatsapp::order_confirmation_message(&OrderConfirmation {
        order_id: &order_id,
        restaurant_name,
        table_number: order.table_number,
        total: order.total,
        items: &lines,
    })
}

// =============================================================================
// QR ENTRY + SESSION
// =============================================================================

#[derive(Deserialize)]
pub struct QrQuery {
    restaurant: Option<Uuid>,
    table: Option<u16>,
}

/// `GET /qr?restaurant=&table=`: the URL printed on table QR codes. Seeds
/// the session, then sends the phone to the table picker or the menu.
pub async fn qr_entry(
    State(state): State<AppState>,
    jar: CookieJar,
    Lang(lang): Lang,
    Query(params): Query<QrQuery>,
) -> Response {
    if let Some(restaurant) = params.restaurant {
        if let Err(e) = owner::get_owner(&state.pool, restaurant).await {
            return restaurant_error(lang, &e);
        }
    }

    let token = cookie_token(&jar);
    let (token, session) = match state
        .tables
        .seed_from_qr(token.as_deref(), params.restaurant, params.table)
        .await
    {
        Ok(seeded) => seeded,
        Err(e) => return table_session_error(lang, &e),
    };

    tracing::info!(restaurant = ?session.owner_id, table = ?session.table_number, "qr scanned");
    let target = if session.table_number.is_some() { MENU_PATH } else { TABLE_PICKER_PATH };
    (jar.add(table_cookie(&state, token)), Redirect::to(target)).into_response()
}

/// `GET /api/customer/session`
pub async fn get_session(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<SessionView>) {
    let (jar, _, session) = ensure_session(&state, jar).await;
    (jar, Json(SessionView::from(&session)))
}

/// `DELETE /api/customer/session`: customer went home; forget the table.
pub async fn clear_session(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    if let Some(token) = cookie_token(&jar) {
        state.tables.clear(&token).await;
    }
    (jar.add(expired_cookie(TABLE_COOKIE_NAME, state.config.cookie_secure)), StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct TableRequest {
    table: u16,
}

/// `PUT /api/customer/session/table`
pub async fn select_table(
    State(state): State<AppState>,
    jar: CookieJar,
    Lang(lang): Lang,
    Json(body): Json<TableRequest>,
) -> Result<(CookieJar, Json<SessionView>), Response> {
    let (jar, token, _) = ensure_session(&state, jar).await;
    let session = state
        .tables
        .select_table(&token, body.table)
        .await
        .map_err(|e| table_session_error(lang, &e))?;
    Ok((jar, Json(SessionView::from(&session))))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TablesView {
    pub tables: Vec<u16>,
}

/// `GET /api/customer/tables`: the table picker's choices.
pub async fn list_tables(State(state): State<AppState>) -> Json<TablesView> {
    Json(TablesView { tables: state.tables.table_numbers() })
}

// =============================================================================
// MENU + CART
// =============================================================================

#[derive(Deserialize)]
pub struct MenuQuery {
    restaurant: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MenuEntry {
    #[serde(flatten)]
    pub item: MenuItem,
    pub price_display: String,
    pub in_cart: u32,
}

#[derive(Debug, Serialize)]
pub struct MenuView {
    pub restaurant_id: Uuid,
    pub restaurant_name: String,
    pub table_number: Option<u16>,
    pub items: Vec<MenuEntry>,
    pub cart: CartView,
}

/// `GET /api/customer/menu[?restaurant=]`: available items for the
/// session's restaurant. A `restaurant` parameter switches restaurants.
pub async fn menu(
    State(state): State<AppState>,
    jar: CookieJar,
    Lang(lang): Lang,
    Query(params): Query<MenuQuery>,
) -> Result<(CookieJar, Json<MenuView>), Response> {
    // Look the restaurant up before switching so a bad id leaves the cart alone.
    let requested = match params.restaurant {
        Some(restaurant_id) => Some(
            owner::get_owner(&state.pool, restaurant_id)
                .await
                .map_err(|e| restaurant_error(lang, &e))?,
        ),
        None => None,
    };

    let (jar, token, _) = ensure_session(&state, jar).await;
    let session = with_session(&state, &token, lang, |session| {
        if let Some(restaurant_id) = params.restaurant {
            session.set_restaurant(restaurant_id);
        }
        session.clone()
    })
    .await?;
    let restaurant_id = session
        .owner_id
        .ok_or(TableSessionError::MissingRestaurant)
        .map_err(|e| table_session_error(lang, &e))?;

    let restaurant = match requested {
        Some(restaurant) => restaurant,
        None => owner::get_owner(&state.pool, restaurant_id)
            .await
            .map_err(|e| restaurant_error(lang, &e))?,
    };
    let items = menu::list_available(&state.pool, restaurant_id).await.map_err(|e| {
        tracing::error!(error = %e, %restaurant_id, "customer menu load failed");
        error_with_message(StatusCode::INTERNAL_SERVER_ERROR, &e, translate(lang, Key::MenuLoadFailed).to_owned())
    })?;

    let items = items
        .into_iter()
        .map(|item| MenuEntry {
            price_display: gst::rupees(item.price),
            in_cart: session.cart.quantity_of(item.id),
            item,
        })
        .collect();
    Ok((
        jar,
        Json(MenuView {
            restaurant_id,
            restaurant_name: restaurant.restaurant_name,
            table_number: session.table_number,
            items,
            cart: CartView::from(&session.cart),
        }),
    ))
}

/// `GET /api/customer/cart`
pub async fn get_cart(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<CartView>) {
    let (jar, _, session) = ensure_session(&state, jar).await;
    (jar, Json(CartView::from(&session.cart)))
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    menu_item_id: Uuid,
}

/// `POST /api/customer/cart/items`: one more unit of an item. The price
/// shown in the cart is the menu price right now.
pub async fn add_to_cart(
    State(state): State<AppState>,
    jar: CookieJar,
    Lang(lang): Lang,
    Json(body): Json<AddItemRequest>,
) -> Result<(CookieJar, Json<CartUpdate>), Response> {
    let (jar, token, session) = ensure_session(&state, jar).await;
    let restaurant_id = session
        .owner_id
        .ok_or(TableSessionError::MissingRestaurant)
        .map_err(|e| table_session_error(lang, &e))?;

    let item = menu::get(&state.pool, restaurant_id, body.menu_item_id)
        .await
        .map_err(|e| super::menu::menu_error(&e))?;
    if !item.is_available {
        return Err(order_error(&OrderError::Unavailable(item.name)));
    }

    let snapshot = (&item).into();
    let (quantity, cart) = with_session(&state, &token, lang, |session| {
        // The restaurant may have changed since the lookup above.
        if session.owner_id != Some(item.owner_id) {
            return Err(TableSessionError::MissingRestaurant);
        }
        let quantity = session.cart.add(snapshot);
        Ok((quantity, CartView::from(&session.cart)))
    })
    .await?
    .map_err(|e| table_session_error(lang, &e))?;

    Ok((
        jar,
        Json(CartUpdate { message: translate(lang, Key::ItemAdded), item_id: item.id, quantity, cart }),
    ))
}

#[derive(Deserialize)]
pub struct RemoveQuery {
    #[serde(default)]
    all: bool,
}

/// `DELETE /api/customer/cart/items/{id}[?all=true]`: one unit, or the
/// whole line.
pub async fn remove_from_cart(
    State(state): State<AppState>,
    jar: CookieJar,
    Lang(lang): Lang,
    Path(item_id): Path<Uuid>,
    Query(params): Query<RemoveQuery>,
) -> Result<(CookieJar, Json<CartUpdate>), Response> {
    let (jar, token, _) = ensure_session(&state, jar).await;
    let (quantity, cart) = with_session(&state, &token, lang, |session| {
        if session.cart.quantity_of(item_id) == 0 {
            return Err(CartError::NotInCart(item_id));
        }
        let quantity = if params.all {
            session.cart.remove_line(item_id);
            0
        } else {
            session.cart.remove_one(item_id)
        };
        Ok((quantity, CartView::from(&session.cart)))
    })
    .await?
    .map_err(|e| error_response(StatusCode::NOT_FOUND, &e))?;

    Ok((
        jar,
        Json(CartUpdate { message: translate(lang, Key::ItemRemoved), item_id, quantity, cart }),
    ))
}

// =============================================================================
// CHECKOUT
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CheckoutQuote {
    pub restaurant_id: Uuid,
    pub table_number: u16,
    pub cart: CartView,
    pub quote: Quote,
}

/// `GET /api/customer/checkout`: bill preview for the current cart.
pub async fn checkout_quote(
    State(state): State<AppState>,
    jar: CookieJar,
    Lang(lang): Lang,
) -> Result<(CookieJar, Json<CheckoutQuote>), Response> {
    let (jar, _, session) = ensure_session(&state, jar).await;
    let (restaurant_id, table_number) = session
        .checkout_target()
        .map_err(|e| table_session_error(lang, &e))?;
    let breakdown =
        gst::calculate_order_total(&session.cart.priced_lines(), state.config.gst_rate, state.config.gst_inter_state);

    Ok((
        jar,
        Json(CheckoutQuote {
            restaurant_id,
            table_number,
            cart: CartView::from(&session.cart),
            quote: Quote::new(breakdown),
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct CheckoutResult {
    pub message: &'static str,
    /// True when the idempotency key matched an order placed earlier.
    pub duplicate: bool,
    pub confirmation_url: String,
    /// Share the confirmation on WhatsApp.
    pub share_url: String,
    /// Alert the restaurant's own WhatsApp number, when it has one.
    pub restaurant_alert_url: Option<String>,
    #[serde(flatten)]
    pub tracked: TrackedOrder,
}

/// `POST /api/customer/checkout`: place the cart as an order. Prices come
/// from the current menu, not the cart. An `Idempotency-Key` header makes
/// retries safe.
pub async fn checkout(
    State(state): State<AppState>,
    jar: CookieJar,
    Lang(lang): Lang,
    headers: HeaderMap,
) -> Result<(StatusCode, CookieJar, Json<CheckoutResult>), Response> {
    let (jar, token, session) = ensure_session(&state, jar).await;
    let (restaurant_id, table_number) = session
        .checkout_target()
        .map_err(|e| table_session_error(lang, &e))?;
    let client_ref = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let request = PlaceOrder {
        owner_id: restaurant_id,
        table_number: i32::from(table_number),
        lines: session.cart.to_order_lines(),
        client_ref,
    };
    let placed = order::place_order(&state.pool, &state.feed, state.checkout_settings(), &request)
        .await
        .map_err(|e| {
            let status = order_error_to_status(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, %restaurant_id, "checkout failed");
                return error_with_message(status, &e, translate(lang, Key::OrderFailed).to_owned());
            }
            error_response(status, &e)
        })?;

    if let Err(e) = state.tables.complete_checkout(&token, placed.order.id, &request.lines).await {
        tracing::warn!(error = %e, order_id = %placed.order.id, "table session gone after checkout");
    }

    let restaurant = owner::get_owner(&state.pool, restaurant_id).await.ok();
    let restaurant_name = restaurant
        .as_ref()
        .map_or(owner::DEFAULT_RESTAURANT_NAME, |r| r.restaurant_name.as_str());
    let share_url = whatsapp::whatsapp_url(None, &confirmation_message(&placed.order, restaurant_name));
    let restaurant_alert_url = restaurant.as_ref().and_then(|r| r.phone.as_deref()).map(|phone| {
        let alert = whatsapp::new_order_alert_message(
            &placed.order.id.to_string(),
            placed.order.table_number,
            placed.order.total,
            placed.order.item_count(),
            None,
        );
        whatsapp::whatsapp_url(Some(phone), &alert)
    });

    let status = if placed.duplicate { StatusCode::OK } else { StatusCode::CREATED };
    let result = CheckoutResult {
        message: translate(lang, Key::OrderPlaced),
        duplicate: placed.duplicate,
        confirmation_url: format!("/customer/confirmation/{}", placed.order.id),
        share_url,
        restaurant_alert_url,
        tracked: TrackedOrder::new(placed.order, lang),
    };
    Ok((status, jar, Json(result)))
}

// =============================================================================
// TRACKING + SHARING
// =============================================================================

/// `GET /api/customer/orders/{id}`: confirmation and live tracker view.
/// The order id is the capability; no session is needed.
pub async fn track_order(
    State(state): State<AppState>,
    Lang(lang): Lang,
    Path(order_id): Path<Uuid>,
) -> Result<Json<TrackedOrder>, Response> {
    order::get_public(&state.pool, order_id)
        .await
        .map(|o| Json(TrackedOrder::new(o, lang)))
        .map_err(|e| order_error(&e))
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareKind {
    #[default]
    Confirmation,
    Ready,
}

#[derive(Deserialize)]
pub struct ShareQuery {
    phone: Option<String>,
    #[serde(default)]
    kind: ShareKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareLink {
    pub message: String,
    pub url: String,
}

/// `GET /api/customer/orders/{id}/share[?phone=&kind=]`: WhatsApp link
/// with the order confirmation, or the ready notice once it is on its way.
pub async fn share_order(
    State(state): State<AppState>,
    Lang(lang): Lang,
    Path(order_id): Path<Uuid>,
    Query(params): Query<ShareQuery>,
) -> Result<Json<ShareLink>, Response> {
    if let Some(phone) = params.phone.as_deref() {
        if !whatsapp::is_valid_indian_phone(phone) {
            return Err(error_response(StatusCode::BAD_REQUEST, &BadRequest::new("invalid phone number")));
        }
    }

    let order = order::get_public(&state.pool, order_id)
        .await
        .map_err(|e| order_error(&e))?;
    let message = match params.kind {
        ShareKind::Confirmation => {
            let restaurant = owner::get_owner(&state.pool, order.owner_id)
                .await
                .map_err(|e| restaurant_error(lang, &e))?;
            confirmation_message(&order, &restaurant.restaurant_name)
        }
        ShareKind::Ready => {
            if !matches!(order.status, OrderStatus::OnTheWay | OrderStatus::Completed) {
                return Err(error_response(StatusCode::CONFLICT, &BadRequest::new("order is not ready yet")));
            }
            whatsapp::order_ready_message(&order.id.to_string(), order.table_number)
        }
    };

    Ok(Json(ShareLink { url: whatsapp::whatsapp_url(params.phone.as_deref(), &message), message }))
}

// =============================================================================
// OFFLINE SYNC
// =============================================================================

#[derive(Deserialize)]
pub struct SyncRequest {
    orders: Vec<OfflineOrder>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub results: Vec<SyncOutcome>,
}

/// `POST /api/customer/orders/sync`: replay orders queued while offline.
/// Each entry gets its own outcome; a bad entry never fails the batch.
pub async fn sync_orders(
    State(state): State<AppState>,
    Json(body): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, Response> {
    if body.orders.len() > MAX_SYNC_BATCH {
        return Err(error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            &BadRequest::new(format!("at most {MAX_SYNC_BATCH} orders per sync")),
        ));
    }
    let results = order::sync_offline(&state.pool, &state.feed, state.checkout_settings(), &body.orders).await;
    tracing::info!(batch = body.orders.len(), "offline orders synced");
    Ok(Json(SyncResponse { results }))
}

#[cfg(test)]
#[path = "customer_test.rs"]
mod tests;
