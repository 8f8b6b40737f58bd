//! Orders: checkout, the owner's status workflow, payments, and reporting.
//!
//! DESIGN
//! ======
//! Checkout never trusts client prices. Lines are re-priced from the current
//! menu inside the same transaction that allocates the invoice number and
//! inserts the order, so a bill always matches what was on the menu when it
//! was placed and invoice numbers have no gaps from failed inserts.
//!
//! Status changes are compare-and-set: the `UPDATE` only matches while the
//! row still has the status the transition was validated against. Two owner
//! devices pressing "advance" at once produce one step and one `Conflict`.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every mutation publishes an `orders` change. Placement also alerts the
//! owner; status moves alert customers watching that order.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::macros::offset;
use time::{Date, OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::domain::cart::{MAX_QUANTITY, OrderLine};
use crate::domain::gst::{PricedLine, calculate_order_total, invoice_number};
use crate::domain::notify::{new_order_notification, status_notification};
use crate::domain::status::{OrderStatus, PaymentStatus, TransitionError};
use crate::frame::ErrorCode;
use crate::services::feed::{ChangeEvent, ChangeKind, FeedHub, FeedTable, NotifyTarget};
use crate::services::menu::{self, MenuItem};
use crate::services::owner::{self, OwnerError};

/// Restaurants bill in Indian Standard Time; invoice dates and daily stats
/// follow it.
const BUSINESS_OFFSET: UtcOffset = offset!(+5:30);
const BUSINESS_TIME_ZONE: &str = "Asia/Kolkata";

const DEFAULT_LIST_LIMIT: i64 = 200;
const MAX_STATS_DAYS: i32 = 366;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("order not found: {0}")]
    NotFound(Uuid),
    #[error("restaurant not found: {0}")]
    RestaurantNotFound(Uuid),
    #[error("order has no items")]
    Empty,
    #[error("table number {0} is not valid")]
    InvalidTable(i32),
    #[error("quantity must be between 1 and {MAX_QUANTITY}")]
    InvalidQuantity,
    #[error("menu item {0} is not on this menu")]
    UnknownItem(Uuid),
    #[error("{0} is currently unavailable")]
    Unavailable(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("payment is already {0}")]
    PaymentNotAllowed(PaymentStatus),
    #[error("order {0} was changed by someone else; reload and try again")]
    Conflict(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for OrderError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ORDER_NOT_FOUND",
            Self::RestaurantNotFound(_) => "E_RESTAURANT_NOT_FOUND",
            Self::Empty => "E_ORDER_EMPTY",
            Self::InvalidTable(_) => "E_INVALID_TABLE",
            Self::InvalidQuantity => "E_INVALID_QUANTITY",
            Self::UnknownItem(_) => "E_UNKNOWN_ITEM",
            Self::Unavailable(_) => "E_ITEM_UNAVAILABLE",
            Self::Transition(e) => e.error_code(),
            Self::PaymentNotAllowed(_) => "E_PAYMENT_NOT_ALLOWED",
            Self::Conflict(_) => "E_ORDER_CONFLICT",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Null once the menu item has been deleted.
    pub menu_item_id: Option<Uuid>,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub table_number: i32,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    #[sqlx(try_from = "String")]
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub subtotal: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub gst_rate: Decimal,
    pub gst_amount: Decimal,
    pub total: Decimal,
    pub invoice_number: String,
    pub client_ref: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .map(|item| u32::try_from(item.quantity).unwrap_or(0))
            .sum()
    }
}

/// Tax and table settings applied at checkout.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutSettings {
    pub gst_rate: Decimal,
    pub inter_state: bool,
    pub table_count: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    pub owner_id: Uuid,
    pub table_number: i32,
    pub lines: Vec<OrderLine>,
    /// Client-generated id that makes a replayed submission return the
    /// original order.
    #[serde(default)]
    pub client_ref: Option<String>,
}

/// Result of [`place_order`].
#[derive(Debug, Clone)]
pub struct Placed {
    pub order: Order,
    /// `true` when `client_ref` matched an existing order.
    pub duplicate: bool,
}

/// One bill line priced from the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedItem {
    pub menu_item_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OrderFilter {
    #[serde(default, deserialize_with = "legacy_status")]
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
}

/// Status filters also accept the older `pending` vocabulary.
fn legacy_status<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<OrderStatus>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|raw| OrderStatus::from_legacy(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailyStats {
    pub day: Date,
    pub orders: i64,
    /// Sum of totals, cancelled orders excluded.
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    /// One entry per status, in flow order, zeros included.
    pub by_status: Vec<StatusCount>,
    pub active: i64,
    pub total: i64,
}

// =============================================================================
// PRICING (pure)
// =============================================================================

/// Merge repeated menu items and check quantities. First-seen order is kept.
///
/// # Errors
///
/// `Empty` for no lines, `InvalidQuantity` for zero or oversized quantities.
pub fn merge_lines(lines: &[OrderLine]) -> Result<Vec<OrderLine>, OrderError> {
    let mut merged: Vec<OrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(OrderError::InvalidQuantity);
        }
        match merged.iter_mut().find(|m| m.menu_item_id == line.menu_item_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(*line),
        }
    }
    if merged.is_empty() {
        return Err(OrderError::Empty);
    }
    if merged.iter().any(|l| l.quantity > MAX_QUANTITY) {
        return Err(OrderError::InvalidQuantity);
    }
    Ok(merged)
}

/// Price merged lines against the restaurant's current menu rows.
///
/// # Errors
///
/// `UnknownItem` when an id is missing from `menu`, `Unavailable` when the
/// item is switched off.
pub fn price_lines(lines: &[OrderLine], menu: &[MenuItem]) -> Result<Vec<PricedItem>, OrderError> {
    let by_id: HashMap<Uuid, &MenuItem> = menu.iter().map(|item| (item.id, item)).collect();
    lines
        .iter()
        .map(|line| {
            let item = by_id
                .get(&line.menu_item_id)
                .ok_or(OrderError::UnknownItem(line.menu_item_id))?;
            if !item.is_available {
                return Err(OrderError::Unavailable(item.name.clone()));
            }
            Ok(PricedItem {
                menu_item_id: item.id,
                name: item.name.clone(),
                price: item.price,
                quantity: line.quantity,
            })
        })
        .collect()
}

fn validate_table(table_number: i32, table_count: u16) -> Result<(), OrderError> {
    if table_number < 1 || table_number > i32::from(table_count) {
        return Err(OrderError::InvalidTable(table_number));
    }
    Ok(())
}

/// Count per status in flow order, with the active total.
#[must_use]
pub fn summarize(counts: &[(OrderStatus, i64)]) -> OrderSummary {
    let by_status: Vec<StatusCount> = crate::domain::status::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: counts
                .iter()
                .filter(|(s, _)| *s == status)
                .map(|(_, n)| n)
                .sum(),
        })
        .collect();
    let active = by_status
        .iter()
        .filter(|c| c.status.is_active())
        .map(|c| c.count)
        .sum();
    let total = by_status.iter().map(|c| c.count).sum();
    OrderSummary { by_status, active, total }
}

// =============================================================================
// CHECKOUT
// =============================================================================

const ORDER_COLUMNS: &str = "id, owner_id, table_number, status, payment_status, payment_method, \
     subtotal, cgst, sgst, igst, gst_rate, gst_amount, total, invoice_number, client_ref, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, menu_item_id, name, price, quantity, subtotal";

/// Place an order. Status starts `waiting`, payment `pending`, method `cash`.
///
/// # Errors
///
/// Validation errors for bad tables, lines, or menu items; `Database` when
/// the transaction fails.
pub async fn place_order(
    pool: &PgPool,
    feed: &FeedHub,
    settings: CheckoutSettings,
    request: &PlaceOrder,
) -> Result<Placed, OrderError> {
    validate_table(request.table_number, settings.table_count)?;
    let lines = merge_lines(&request.lines)?;
    let client_ref = request
        .client_ref
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    if let Some(client_ref) = client_ref {
        if let Some(order) = find_by_client_ref(pool, request.owner_id, client_ref).await? {
            return Ok(Placed { order, duplicate: true });
        }
    }

    match insert_order(pool, settings, request, &lines, client_ref).await {
        Ok(order) => {
            tracing::info!(
                owner_id = %order.owner_id,
                order_id = %order.id,
                table = order.table_number,
                total = %order.total,
                invoice = %order.invoice_number,
                "order placed"
            );
            publish(feed, ChangeKind::Insert, &order).await;
            let alert = new_order_notification(order.id, order.table_number, order.item_count(), order.total);
            feed.notify(order.owner_id, &alert, NotifyTarget::Owner).await;
            Ok(Placed { order, duplicate: false })
        }
        // Lost a race with a concurrent replay of the same client_ref.
        Err(OrderError::Database(sqlx::Error::Database(db))) if db.is_unique_violation() => {
            let Some(client_ref) = client_ref else {
                return Err(OrderError::Database(sqlx::Error::Database(db)));
            };
            match find_by_client_ref(pool, request.owner_id, client_ref).await? {
                Some(order) => Ok(Placed { order, duplicate: true }),
                None => Err(OrderError::Database(sqlx::Error::Database(db))),
            }
        }
        Err(e) => Err(e),
    }
}

async fn insert_order(
    pool: &PgPool,
    settings: CheckoutSettings,
    request: &PlaceOrder,
    lines: &[OrderLine],
    client_ref: Option<&str>,
) -> Result<Order, OrderError> {
    let mut tx = pool.begin().await?;

    let ids: Vec<Uuid> = lines.iter().map(|l| l.menu_item_id).collect();
    let menu_rows = menu::snapshots(&mut *tx, request.owner_id, &ids).await?;
    let priced = price_lines(lines, &menu_rows)?;
    let bill_lines: Vec<PricedLine> = priced
        .iter()
        .map(|p| PricedLine { price: p.price, quantity: p.quantity })
        .collect();
    let bill = calculate_order_total(&bill_lines, settings.gst_rate, settings.inter_state);

    let seq = owner::next_invoice_seq(&mut *tx, request.owner_id)
        .await
        .map_err(|e| match e {
            OwnerError::Database(db) => OrderError::Database(db),
            _ => OrderError::RestaurantNotFound(request.owner_id),
        })?;
    let today = OffsetDateTime::now_utc().to_offset(BUSINESS_OFFSET).date();
    let invoice = invoice_number(seq, today);

    let mut order = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO orders (owner_id, table_number, subtotal, cgst, sgst, igst, gst_rate, gst_amount, total,
                             invoice_number, client_ref)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(request.owner_id)
    .bind(request.table_number)
    .bind(bill.subtotal)
    .bind(bill.cgst)
    .bind(bill.sgst)
    .bind(bill.igst)
    .bind(bill.gst_rate)
    .bind(bill.total_gst)
    .bind(bill.total)
    .bind(&invoice)
    .bind(client_ref)
    .fetch_one(&mut *tx)
    .await?;

    let order_id = order.id;
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO order_items (order_id, menu_item_id, name, price, quantity, subtotal) ");
    builder.push_values(priced.iter(), |mut row, item| {
        let quantity = i32::try_from(item.quantity).unwrap_or(i32::MAX);
        row.push_bind(order_id)
            .push_bind(item.menu_item_id)
            .push_bind(item.name.clone())
            .push_bind(item.price)
            .push_bind(quantity)
            .push_bind(item.price * Decimal::from(item.quantity));
    });
    builder.push(format!(" RETURNING {ITEM_COLUMNS}"));
    order.items = builder
        .build_query_as::<OrderItem>()
        .fetch_all(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(order)
}

// =============================================================================
// READS
// =============================================================================

async fn attach_items(pool: &PgPool, orders: &mut [Order]) -> Result<(), OrderError> {
    if orders.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY name"
    ))
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }
    for order in orders.iter_mut() {
        order.items = grouped.remove(&order.id).unwrap_or_default();
    }
    Ok(())
}

async fn find_by_client_ref(pool: &PgPool, owner_id: Uuid, client_ref: &str) -> Result<Option<Order>, OrderError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE owner_id = $1 AND client_ref = $2"
    ))
    .bind(owner_id)
    .bind(client_ref)
    .fetch_optional(pool)
    .await?;
    let Some(order) = order else {
        return Ok(None);
    };
    let mut orders = [order];
    attach_items(pool, &mut orders).await?;
    let [order] = orders;
    Ok(Some(order))
}

/// A restaurant's orders with items, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_owner(pool: &PgPool, owner_id: Uuid, filter: OrderFilter) -> Result<Vec<Order>, OrderError> {
    let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, DEFAULT_LIST_LIMIT);
    let mut orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE owner_id = $1 AND ($2::text IS NULL OR status = $2)
         ORDER BY created_at DESC
         LIMIT $3"
    ))
    .bind(owner_id)
    .bind(filter.status.map(OrderStatus::as_str))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    attach_items(pool, &mut orders).await?;
    Ok(orders)
}

/// # Errors
///
/// `NotFound` for unknown orders or orders of another restaurant.
pub async fn get_for_owner(pool: &PgPool, owner_id: Uuid, order_id: Uuid) -> Result<Order, OrderError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND owner_id = $2"
    ))
    .bind(order_id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?
    .ok_or(OrderError::NotFound(order_id))?;
    let mut orders = [order];
    attach_items(pool, &mut orders).await?;
    let [order] = orders;
    Ok(order)
}

/// Customer lookup by id alone; the unguessable id is the capability.
///
/// # Errors
///
/// `NotFound` for unknown orders.
pub async fn get_public(pool: &PgPool, order_id: Uuid) -> Result<Order, OrderError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(order_id)
        .fetch_optional(pool)
        .await?
        .ok_or(OrderError::NotFound(order_id))?;
    let mut orders = [order];
    attach_items(pool, &mut orders).await?;
    let [order] = orders;
    Ok(order)
}

// =============================================================================
// STATUS + PAYMENT
// =============================================================================

/// Move an order to `target`.
///
/// # Errors
///
/// `Transition` for moves the status model forbids, `Conflict` when the
/// order changed between read and write.
pub async fn transition(
    pool: &PgPool,
    feed: &FeedHub,
    owner_id: Uuid,
    order_id: Uuid,
    target: OrderStatus,
) -> Result<Order, OrderError> {
    let current = get_for_owner(pool, owner_id, order_id).await?;
    apply_transition(pool, feed, current, target).await
}

/// Move an order one step forward.
///
/// # Errors
///
/// `Transition(Terminal)` for finished orders, plus the errors of
/// [`transition`].
pub async fn advance(pool: &PgPool, feed: &FeedHub, owner_id: Uuid, order_id: Uuid) -> Result<Order, OrderError> {
    let current = get_for_owner(pool, owner_id, order_id).await?;
    let next = current
        .status
        .next()
        .ok_or(TransitionError::Terminal(current.status))?;
    apply_transition(pool, feed, current, next).await
}

/// Cancel an order that nobody has accepted yet.
///
/// # Errors
///
/// `Transition` once the order has left `waiting`.
pub async fn cancel(pool: &PgPool, feed: &FeedHub, owner_id: Uuid, order_id: Uuid) -> Result<Order, OrderError> {
    transition(pool, feed, owner_id, order_id, OrderStatus::Cancelled).await
}

async fn apply_transition(pool: &PgPool, feed: &FeedHub, current: Order, target: OrderStatus) -> Result<Order, OrderError> {
    current.status.transition(target)?;

    let mut order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET status = $3, updated_at = now()
         WHERE id = $1 AND owner_id = $2 AND status = $4
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(current.id)
    .bind(current.owner_id)
    .bind(target.as_str())
    .bind(current.status.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(OrderError::Conflict(current.id))?;
    order.items = current.items;

    tracing::info!(order_id = %order.id, from = %current.status, to = %target, "order status changed");
    publish(feed, ChangeKind::Update, &order).await;
    let note = status_notification(order.id, order.status, order.table_number);
    feed.notify(order.owner_id, &note, NotifyTarget::Order(order.id)).await;
    Ok(order)
}

/// Record a cash payment.
///
/// # Errors
///
/// `Transition(Terminal)` for finished orders, `PaymentNotAllowed` when
/// already paid, `Conflict` on a concurrent change.
pub async fn mark_paid(pool: &PgPool, feed: &FeedHub, owner_id: Uuid, order_id: Uuid) -> Result<Order, OrderError> {
    let current = get_for_owner(pool, owner_id, order_id).await?;
    if current.status.is_terminal() {
        return Err(TransitionError::Terminal(current.status).into());
    }
    if !current.payment_status.can_mark_paid() {
        return Err(OrderError::PaymentNotAllowed(current.payment_status));
    }

    let mut order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET payment_status = 'paid', updated_at = now()
         WHERE id = $1 AND owner_id = $2 AND status = $3 AND payment_status = $4
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(current.id)
    .bind(owner_id)
    .bind(current.status.as_str())
    .bind(current.payment_status.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(OrderError::Conflict(order_id))?;
    order.items = current.items;

    tracing::info!(%order_id, "order marked paid");
    publish(feed, ChangeKind::Update, &order).await;
    Ok(order)
}

// =============================================================================
// REPORTING
// =============================================================================

/// Orders and revenue per business day over the last `days` days, newest
/// first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn daily_stats(pool: &PgPool, owner_id: Uuid, days: i32) -> Result<Vec<DailyStats>, OrderError> {
    let stats = sqlx::query_as::<_, DailyStats>(
        "SELECT (created_at AT TIME ZONE $3)::date AS day,
                count(*) AS orders,
                COALESCE(sum(total) FILTER (WHERE status <> 'cancelled'), 0) AS revenue
         FROM orders
         WHERE owner_id = $1 AND created_at >= now() - make_interval(days => $2)
         GROUP BY day
         ORDER BY day DESC",
    )
    .bind(owner_id)
    .bind(days.clamp(1, MAX_STATS_DAYS))
    .bind(BUSINESS_TIME_ZONE)
    .fetch_all(pool)
    .await?;
    Ok(stats)
}

/// Order counts per status.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn summary(pool: &PgPool, owner_id: Uuid) -> Result<OrderSummary, OrderError> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, count(*) FROM orders WHERE owner_id = $1 GROUP BY status")
            .bind(owner_id)
            .fetch_all(pool)
            .await?;
    let counts: Vec<(OrderStatus, i64)> = rows
        .into_iter()
        .filter_map(|(status, n)| status.parse().ok().map(|s| (s, n)))
        .collect();
    Ok(summarize(&counts))
}

// =============================================================================
// OFFLINE SYNC
// =============================================================================

/// An order queued on a customer device while offline.
#[derive(Debug, Clone, Deserialize)]
pub struct OfflineOrder {
    pub client_ref: String,
    pub restaurant: Uuid,
    pub table_number: i32,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Synced,
    Duplicate,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub client_ref: String,
    pub state: SyncState,
    pub order_id: Option<Uuid>,
    pub reason: Option<String>,
    /// Rejected entries worth keeping in the queue for another attempt.
    pub retryable: bool,
}

/// Replay a batch of offline orders through [`place_order`], one outcome per
/// entry in input order.
pub async fn sync_offline(
    pool: &PgPool,
    feed: &FeedHub,
    settings: CheckoutSettings,
    batch: &[OfflineOrder],
) -> Vec<SyncOutcome> {
    let mut outcomes = Vec::with_capacity(batch.len());
    for entry in batch {
        let outcome = if entry.client_ref.trim().is_empty() {
            SyncOutcome {
                client_ref: entry.client_ref.clone(),
                state: SyncState::Rejected,
                order_id: None,
                reason: Some("client_ref is required".into()),
                retryable: false,
            }
        } else {
            let request = PlaceOrder {
                owner_id: entry.restaurant,
                table_number: entry.table_number,
                lines: entry.lines.clone(),
                client_ref: Some(entry.client_ref.clone()),
            };
            match place_order(pool, feed, settings, &request).await {
                Ok(placed) => SyncOutcome {
                    client_ref: entry.client_ref.clone(),
                    state: if placed.duplicate { SyncState::Duplicate } else { SyncState::Synced },
                    order_id: Some(placed.order.id),
                    reason: None,
                    retryable: false,
                },
                Err(e) => {
                    tracing::warn!(client_ref = %entry.client_ref, error = %e, "offline order rejected");
                    SyncOutcome {
                        client_ref: entry.client_ref.clone(),
                        state: SyncState::Rejected,
                        order_id: None,
                        reason: Some(e.to_string()),
                        retryable: e.retryable(),
                    }
                }
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}

async fn publish(feed: &FeedHub, kind: ChangeKind, order: &Order) {
    let record = match serde_json::to_value(order) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(order_id = %order.id, error = %e, "order: change record did not serialize");
            return;
        }
    };
    let event = ChangeEvent { table: FeedTable::Orders, kind, record, order_id: Some(order.id) };
    feed.publish(order.owner_id, &event).await;
}


#[cfg(test)]
#[path = "order_test.rs"]
mod tests;
