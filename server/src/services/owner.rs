//! Owner accounts: password signup/login, OAuth upsert, profile, and the
//! per-restaurant invoice counter.
//!
//! ERROR HANDLING
//! ==============
//! Login failures never reveal whether the email exists; unknown email and
//! wrong password both surface as `InvalidCredentials`.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::gst::is_valid_gstin;
use crate::domain::whatsapp::is_valid_indian_phone;
use crate::frame::ErrorCode;

/// Restaurant name used when signup or OAuth leaves it blank.
pub const DEFAULT_RESTAURANT_NAME: &str = "My Restaurant";

const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OwnerError {
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("owner not found: {0}")]
    NotFound(Uuid),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for OwnerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmailTaken => "E_EMAIL_TAKEN",
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::NotFound(_) => "E_OWNER_NOT_FOUND",
            Self::InvalidInput(_) => "E_INVALID_INPUT",
            Self::Hash(_) => "E_PASSWORD_HASH",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OwnerProfile {
    pub id: Uuid,
    pub email: String,
    pub restaurant_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gstin: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOwner {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub restaurant_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub restaurant_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gstin: Option<String>,
}

/// Identity returned by an OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

// =============================================================================
// VALIDATION
// =============================================================================

fn normalize_email(raw: &str) -> Result<String, OwnerError> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !valid {
        return Err(OwnerError::InvalidInput("email address is not valid".into()));
    }
    Ok(email)
}

fn restaurant_name_or_default(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_RESTAURANT_NAME)
        .to_owned()
}

fn validate_phone(phone: Option<&str>) -> Result<Option<String>, OwnerError> {
    match phone.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) if is_valid_indian_phone(p) => Ok(Some(p.to_owned())),
        Some(_) => Err(OwnerError::InvalidInput("phone must be a valid Indian mobile number".into())),
        None => Ok(None),
    }
}

fn validate_gstin(gstin: Option<&str>) -> Result<Option<String>, OwnerError> {
    match gstin.map(|g| g.trim().to_ascii_uppercase()).filter(|g| !g.is_empty()) {
        Some(g) if is_valid_gstin(&g) => Ok(Some(g)),
        Some(_) => Err(OwnerError::InvalidInput("GSTIN is not valid".into())),
        None => Ok(None),
    }
}

// =============================================================================
// PASSWORDS
// =============================================================================

fn hash_password(password: &str) -> Result<String, OwnerError> {
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| OwnerError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// ACCOUNTS
// =============================================================================

const PROFILE_COLUMNS: &str = "id, email, restaurant_name, phone, address, gstin, created_at";

/// Create a password account.
///
/// # Errors
///
/// `InvalidInput` for a malformed email, short password, or bad phone;
/// `EmailTaken` when the email is already registered.
pub async fn signup(pool: &PgPool, new_owner: &NewOwner) -> Result<OwnerProfile, OwnerError> {
    let email = normalize_email(&new_owner.email)?;
    if new_owner.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(OwnerError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let phone = validate_phone(new_owner.phone.as_deref())?;
    let restaurant_name = restaurant_name_or_default(new_owner.restaurant_name.as_deref());
    let password_hash = hash_password(&new_owner.password)?;

    let result = sqlx::query_as::<_, OwnerProfile>(&format!(
        "INSERT INTO owners (email, password_hash, restaurant_name, phone, address)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(&email)
    .bind(&password_hash)
    .bind(&restaurant_name)
    .bind(&phone)
    .bind(new_owner.address.as_deref().map(str::trim))
    .fetch_one(pool)
    .await;

    match result {
        Ok(owner) => {
            tracing::info!(owner_id = %owner.id, "owner signed up");
            Ok(owner)
        }
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(OwnerError::EmailTaken),
        Err(e) => Err(e.into()),
    }
}

/// Check an email/password pair and return the owner id.
///
/// # Errors
///
/// `InvalidCredentials` for unknown emails, OAuth-only accounts, and wrong
/// passwords.
pub async fn login(pool: &PgPool, email: &str, password: &str) -> Result<Uuid, OwnerError> {
    let email = email.trim().to_ascii_lowercase();
    let row: Option<(Uuid, Option<String>)> = sqlx::query_as("SELECT id, password_hash FROM owners WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?;

    let Some((id, Some(hash))) = row else {
        return Err(OwnerError::InvalidCredentials);
    };
    if !verify_password(password, &hash) {
        return Err(OwnerError::InvalidCredentials);
    }
    Ok(id)
}

/// Create or link the owner for an OAuth identity. An existing password
/// account with the same email is linked rather than duplicated.
///
/// # Errors
///
/// `InvalidInput` when the provider returns an unusable email.
pub async fn upsert_oauth_owner(pool: &PgPool, identity: &OAuthIdentity) -> Result<Uuid, OwnerError> {
    let email = normalize_email(&identity.email)?;
    let restaurant_name = restaurant_name_or_default(identity.name.as_deref());

    let id: Uuid = sqlx::query_scalar(
        r"INSERT INTO owners (email, google_sub, restaurant_name)
          VALUES ($1, $2, $3)
          ON CONFLICT (email) DO UPDATE SET google_sub = EXCLUDED.google_sub
          RETURNING id",
    )
    .bind(&email)
    .bind(&identity.subject)
    .bind(&restaurant_name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// # Errors
///
/// `NotFound` for unknown ids.
pub async fn get_owner(pool: &PgPool, owner_id: Uuid) -> Result<OwnerProfile, OwnerError> {
    sqlx::query_as::<_, OwnerProfile>(&format!("SELECT {PROFILE_COLUMNS} FROM owners WHERE id = $1"))
        .bind(owner_id)
        .fetch_optional(pool)
        .await?
        .ok_or(OwnerError::NotFound(owner_id))
}

/// Apply a partial profile update.
///
/// # Errors
///
/// `InvalidInput` for a blank restaurant name, bad phone or GSTIN;
/// `NotFound` for unknown ids.
pub async fn update_profile(pool: &PgPool, owner_id: Uuid, update: &ProfileUpdate) -> Result<OwnerProfile, OwnerError> {
    let restaurant_name = match update.restaurant_name.as_deref().map(str::trim) {
        Some("") => return Err(OwnerError::InvalidInput("restaurant name must not be empty".into())),
        other => other.map(str::to_owned),
    };
    let phone = validate_phone(update.phone.as_deref())?;
    let gstin = validate_gstin(update.gstin.as_deref())?;

    sqlx::query_as::<_, OwnerProfile>(&format!(
        "UPDATE owners SET
             restaurant_name = COALESCE($2, restaurant_name),
             phone = COALESCE($3, phone),
             address = COALESCE($4, address),
             gstin = COALESCE($5, gstin)
         WHERE id = $1
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(owner_id)
    .bind(restaurant_name)
    .bind(phone)
    .bind(update.address.as_deref().map(str::trim))
    .bind(gstin)
    .fetch_optional(pool)
    .await?
    .ok_or(OwnerError::NotFound(owner_id))
}

/// Allocate the next invoice sequence number for a restaurant. Runs on the
/// caller's connection so it commits or rolls back with the order insert.
///
/// # Errors
///
/// `NotFound` for unknown ids.
pub async fn next_invoice_seq(conn: &mut PgConnection, owner_id: Uuid) -> Result<i64, OwnerError> {
    sqlx::query_scalar("UPDATE owners SET invoice_seq = invoice_seq + 1 WHERE id = $1 RETURNING invoice_seq")
        .bind(owner_id)
        .fetch_optional(conn)
        .await?
        .ok_or(OwnerError::NotFound(owner_id))
}

#[cfg(test)]
#[path = "owner_test.rs"]
mod tests;
