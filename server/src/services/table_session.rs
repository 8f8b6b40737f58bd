//! Customer table sessions: which restaurant and table a phone is ordering
//! for, plus its cart.
//!
//! DESIGN
//! ======
//! Sessions are ephemeral and live in memory, keyed by an opaque token held
//! in the `table_session` cookie. A QR scan seeds the restaurant and/or the
//! table; either may be missing and is filled in later (table picker, menu
//! link). Nothing here is durable: a restart or an idle timeout simply sends
//! the customer back to the QR code.
//!
//! TRADE-OFFS
//! ==========
//! One `RwLock` guards the whole map. Every operation is a short,
//! non-blocking map edit, so contention is not a concern at restaurant
//! scale.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::cart::{Cart, OrderLine};
use crate::frame::ErrorCode;
use crate::services::session::generate_token;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableSessionError {
    #[error("table session not found or expired")]
    UnknownSession,
    #[error("table {table} does not exist (tables 1 to {max})")]
    InvalidTable { table: u16, max: u16 },
    #[error("restaurant not identified; please re-scan the QR code")]
    MissingRestaurant,
    #[error("no table selected")]
    MissingTable,
    #[error("cart is empty")]
    EmptyCart,
}

impl ErrorCode for TableSessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSession => "E_TABLE_SESSION_UNKNOWN",
            Self::InvalidTable { .. } => "E_INVALID_TABLE",
            Self::MissingRestaurant => "E_MISSING_RESTAURANT",
            Self::MissingTable => "E_MISSING_TABLE",
            Self::EmptyCart => "E_CART_EMPTY",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableSession {
    pub owner_id: Option<Uuid>,
    pub table_number: Option<u16>,
    pub cart: Cart,
    /// Most recent order placed from this session, for the confirmation page.
    pub last_order_id: Option<Uuid>,
}

impl TableSession {
    /// Restaurant and table to place an order for.
    ///
    /// # Errors
    ///
    /// `MissingRestaurant`, `MissingTable`, or `EmptyCart`, checked in that
    /// order.
    pub fn checkout_target(&self) -> Result<(Uuid, u16), TableSessionError> {
        let owner_id = self.owner_id.ok_or(TableSessionError::MissingRestaurant)?;
        let table = self.table_number.ok_or(TableSessionError::MissingTable)?;
        if self.cart.is_empty() {
            return Err(TableSessionError::EmptyCart);
        }
        Ok((owner_id, table))
    }

    /// Point the session at a restaurant. Switching restaurants empties the
    /// cart since its items belong to the old menu.
    pub fn set_restaurant(&mut self, owner_id: Uuid) {
        if self.owner_id != Some(owner_id) {
            self.cart.clear();
            self.last_order_id = None;
        }
        self.owner_id = Some(owner_id);
    }
}

struct Entry {
    session: TableSession,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct TableSessionStore {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
    table_count: u16,
    ttl: Duration,
}

impl TableSessionStore {
    #[must_use]
    pub fn new(table_count: u16, ttl: Duration) -> Self {
        Self { sessions: Arc::default(), table_count, ttl }
    }

    /// Selectable table numbers.
    #[must_use]
    pub fn table_numbers(&self) -> Vec<u16> {
        (1..=self.table_count).collect()
    }

    /// # Errors
    ///
    /// `InvalidTable` outside `1..=table_count`.
    pub fn validate_table(&self, table: u16) -> Result<u16, TableSessionError> {
        if table == 0 || table > self.table_count {
            return Err(TableSessionError::InvalidTable { table, max: self.table_count });
        }
        Ok(table)
    }

    /// Snapshot of a live session. Refreshes its idle timer.
    pub async fn get(&self, token: &str) -> Option<TableSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(token)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Return the session for `token`, creating a fresh one (with a new
    /// token) when it is missing or expired.
    pub async fn ensure(&self, token: Option<&str>) -> (String, TableSession) {
        let mut sessions = self.sessions.write().await;
        if let Some(token) = token {
            if let Some(entry) = sessions.get_mut(token) {
                entry.last_seen = Instant::now();
                return (token.to_owned(), entry.session.clone());
            }
        }
        let token = generate_token();
        sessions.insert(token.clone(), Entry { session: TableSession::default(), last_seen: Instant::now() });
        (token, TableSession::default())
    }

    /// QR entry point. Either parameter may be absent; present ones overwrite
    /// what the session had.
    ///
    /// # Errors
    ///
    /// `InvalidTable` for a table outside the restaurant; nothing is stored
    /// in that case.
    pub async fn seed_from_qr(
        &self,
        token: Option<&str>,
        restaurant: Option<Uuid>,
        table: Option<u16>,
    ) -> Result<(String, TableSession), TableSessionError> {
        let table = table.map(|t| self.validate_table(t)).transpose()?;
        let (token, _) = self.ensure(token).await;
        let session = self
            .update(&token, |session| {
                if let Some(owner_id) = restaurant {
                    session.set_restaurant(owner_id);
                }
                if table.is_some() {
                    session.table_number = table;
                }
                session.clone()
            })
            .await?;
        tracing::debug!(?restaurant, ?table, "table session seeded from QR");
        Ok((token, session))
    }

    /// # Errors
    ///
    /// `InvalidTable` or `UnknownSession`.
    pub async fn select_table(&self, token: &str, table: u16) -> Result<TableSession, TableSessionError> {
        let table = self.validate_table(table)?;
        self.update(token, |session| {
            session.table_number = Some(table);
            session.clone()
        })
        .await
    }

    /// Run `f` against a live session and refresh its idle timer.
    ///
    /// # Errors
    ///
    /// `UnknownSession` when the token is missing or expired.
    pub async fn update<R>(&self, token: &str, f: impl FnOnce(&mut TableSession) -> R) -> Result<R, TableSessionError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(token)
            .ok_or(TableSessionError::UnknownSession)?;
        entry.last_seen = Instant::now();
        Ok(f(&mut entry.session))
    }

    /// Record a placed order: takes the submitted lines off the cart and
    /// remembers the order.
    ///
    /// # Errors
    ///
    /// `UnknownSession` when the session expired during checkout.
    pub async fn complete_checkout(
        &self,
        token: &str,
        order_id: Uuid,
        submitted: &[OrderLine],
    ) -> Result<(), TableSessionError> {
        self.update(token, |session| {
            session.cart.remove_submitted(submitted);
            session.last_order_id = Some(order_id);
        })
        .await
    }

    /// Forget a session (customer navigated home). Returns whether it existed.
    pub async fn clear(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than the TTL as of `now`. Returns how
    /// many were removed.
    pub async fn sweep_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= self.ttl);
        before - sessions.len()
    }

    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }
}

/// Spawn the idle-session sweeper. Returns a handle for shutdown.
pub fn spawn_sweeper(store: TableSessionStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = store.sweep().await;
            if removed > 0 {
                let remaining = store.session_count().await;
                tracing::info!(removed, remaining, "expired table sessions swept");
            }
        }
    })
}

#[cfg(test)]
#[path = "table_session_test.rs"]
mod tests;
