//! Owner sessions and feed-socket tickets.
//!
//! ARCHITECTURE
//! ============
//! HTTP auth uses long-lived session tokens in an HttpOnly cookie, while feed
//! socket upgrades use one-time short-lived tickets so the session token never
//! appears in a URL.
//!
//! TRADE-OFFS
//! ==========
//! Ticket consumption is destructive (`DELETE ... RETURNING`) to guarantee
//! single use; this favors replay safety over reconnect convenience.

use rand::Rng;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

/// Generate a short-lived 16-byte hex WS ticket.
#[must_use]
pub(crate) fn generate_ws_ticket() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

/// Owner row returned from session validation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionOwner {
    pub id: Uuid,
    pub email: String,
    pub restaurant_name: String,
    /// How the owner signed in (`"google"` or `"password"`).
    pub auth_method: String,
}

/// Create a session for the given owner, returning the token.
pub async fn create_session(pool: &PgPool, owner_id: Uuid, ttl_hours: i64) -> Result<String, sqlx::Error> {
    let token = generate_token();
    sqlx::query("INSERT INTO sessions (token, owner_id, expires_at) VALUES ($1, $2, now() + make_interval(hours => $3))")
        .bind(&token)
        .bind(owner_id)
        .bind(i32::try_from(ttl_hours).unwrap_or(i32::MAX))
        .execute(pool)
        .await?;
    Ok(token)
}

/// Validate a session token and return the associated owner.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<SessionOwner>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT
              o.id,
              o.email,
              o.restaurant_name,
              CASE WHEN o.google_sub IS NOT NULL THEN 'google' ELSE 'password' END AS auth_method
          FROM sessions s
          JOIN owners o ON o.id = s.owner_id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| SessionOwner {
        id: r.get("id"),
        email: r.get("email"),
        restaurant_name: r.get("restaurant_name"),
        auth_method: r.get("auth_method"),
    }))
}

/// Delete a session by token.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Drop expired sessions and tickets. Returns the number of rows removed.
pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let sessions = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
        .execute(pool)
        .await?;
    let tickets = sqlx::query("DELETE FROM ws_tickets WHERE expires_at <= now()")
        .execute(pool)
        .await?;
    Ok(sessions.rows_affected() + tickets.rows_affected())
}

/// Spawn the periodic purge of expired sessions and tickets. Returns a
/// handle for shutdown.
pub fn spawn_purge_task(pool: PgPool, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match purge_expired(&pool).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "expired sessions purged"),
                Err(e) => tracing::warn!(error = %e, "session purge failed"),
            }
        }
    })
}

/// Create a short-lived WS ticket for the given owner.
pub async fn create_ws_ticket(pool: &PgPool, owner_id: Uuid) -> Result<String, sqlx::Error> {
    let ticket = generate_ws_ticket();
    sqlx::query("INSERT INTO ws_tickets (ticket, owner_id) VALUES ($1, $2)")
        .bind(&ticket)
        .bind(owner_id)
        .execute(pool)
        .await?;
    Ok(ticket)
}

/// Consume a WS ticket atomically, returning the `owner_id` if valid.
pub async fn consume_ws_ticket(pool: &PgPool, ticket: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let row = sqlx::query("DELETE FROM ws_tickets WHERE ticket = $1 AND expires_at > now() RETURNING owner_id")
        .bind(ticket)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.get("owner_id")))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
