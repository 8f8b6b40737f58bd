//! Menu items: owner CRUD, the customer-facing listing, and checkout
//! snapshots.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every mutation publishes a `menu_items` change on the feed so an owner's
//! other open dashboards refresh. Customers never subscribe to menu changes;
//! they read the menu when they open it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::cart::CartItemSnapshot;
use crate::domain::gst::{round2, validate_amount};
use crate::frame::ErrorCode;
use crate::services::feed::{ChangeEvent, ChangeKind, FeedHub, FeedTable};
use crate::services::storage::ImageStore;

const MAX_NAME_LEN: usize = 120;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("menu item not found: {0}")]
    NotFound(Uuid),
    #[error("invalid menu item: {0}")]
    InvalidInput(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for MenuError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_MENU_ITEM_NOT_FOUND",
            Self::InvalidInput(_) => "E_INVALID_INPUT",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MenuItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub is_available: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&MenuItem> for CartItemSnapshot {
    fn from(item: &MenuItem) -> Self {
        Self { id: item.id, name: item.name.clone(), price: item.price, image_url: item.image_url.clone() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMenuItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Partial update. `None` leaves a field alone; an empty string clears the
/// optional text fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub is_available: Option<bool>,
}

// =============================================================================
// VALIDATION
// =============================================================================

fn validate_name(raw: &str) -> Result<String, MenuError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(MenuError::InvalidInput("name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(MenuError::InvalidInput(format!("name must be at most {MAX_NAME_LEN} characters")));
    }
    Ok(name.to_owned())
}

fn validate_price(price: Decimal) -> Result<Decimal, MenuError> {
    validate_amount(price)
        .map(round2)
        .map_err(|e| MenuError::InvalidInput(e.to_string()))
}

fn trimmed(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Item images must be uploads this restaurant owns. Blank clears the image.
///
/// # Errors
///
/// `InvalidInput` for any other URL.
pub fn check_image_url(images: &ImageStore, owner_id: Uuid, url: Option<&str>) -> Result<(), MenuError> {
    match url.map(str::trim) {
        None | Some("") => Ok(()),
        Some(url) if images.is_owner_url(owner_id, url) => Ok(()),
        Some(_) => Err(MenuError::InvalidInput("image_url must be an uploaded image".into())),
    }
}

impl NewMenuItem {
    fn validated(&self) -> Result<Self, MenuError> {
        Ok(Self {
            name: validate_name(&self.name)?,
            description: trimmed(self.description.as_deref()),
            price: validate_price(self.price)?,
            image_url: trimmed(self.image_url.as_deref()),
            category: trimmed(self.category.as_deref()),
            is_available: self.is_available,
        })
    }
}

impl MenuItemUpdate {
    fn validated(&self) -> Result<Self, MenuError> {
        Ok(Self {
            name: self.name.as_deref().map(validate_name).transpose()?,
            description: self.description.as_deref().map(|s| s.trim().to_owned()),
            price: self.price.map(validate_price).transpose()?,
            image_url: self.image_url.as_deref().map(|s| s.trim().to_owned()),
            category: self.category.as_deref().map(|s| s.trim().to_owned()),
            is_available: self.is_available,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.category.is_none()
            && self.is_available.is_none()
    }
}

// =============================================================================
// QUERIES
// =============================================================================

const COLUMNS: &str = "id, owner_id, name, description, price, image_url, category, is_available, created_at, updated_at";

/// Every item of a restaurant, available or not, by category then name.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<MenuItem>, MenuError> {
    let items = sqlx::query_as::<_, MenuItem>(&format!(
        "SELECT {COLUMNS} FROM menu_items WHERE owner_id = $1 ORDER BY category NULLS LAST, name"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// The customer menu: available items ordered by name.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_available(pool: &PgPool, owner_id: Uuid) -> Result<Vec<MenuItem>, MenuError> {
    let items = sqlx::query_as::<_, MenuItem>(&format!(
        "SELECT {COLUMNS} FROM menu_items WHERE owner_id = $1 AND is_available ORDER BY name"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// # Errors
///
/// `NotFound` when the item does not exist or belongs to another owner.
pub async fn get(pool: &PgPool, owner_id: Uuid, id: Uuid) -> Result<MenuItem, MenuError> {
    sqlx::query_as::<_, MenuItem>(&format!("SELECT {COLUMNS} FROM menu_items WHERE id = $1 AND owner_id = $2"))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?
        .ok_or(MenuError::NotFound(id))
}

/// Current rows for `ids` within one restaurant. Ids that do not exist there
/// are simply absent from the result. Takes any executor so checkout can
/// price inside its transaction.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn snapshots<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    owner_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<MenuItem>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, MenuItem>(&format!("SELECT {COLUMNS} FROM menu_items WHERE owner_id = $1 AND id = ANY($2)"))
        .bind(owner_id)
        .bind(ids)
        .fetch_all(executor)
        .await
}

/// Whether any item of this restaurant still points at `image_url`. Stored
/// images are content-addressed, so two items can share one file.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn image_in_use(pool: &PgPool, owner_id: Uuid, image_url: &str) -> Result<bool, MenuError> {
    let in_use = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM menu_items WHERE owner_id = $1 AND image_url = $2)")
        .bind(owner_id)
        .bind(image_url)
        .fetch_one(pool)
        .await?;
    Ok(in_use)
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// # Errors
///
/// `InvalidInput` for a blank name or out-of-range price.
pub async fn create(pool: &PgPool, feed: &FeedHub, owner_id: Uuid, new_item: &NewMenuItem) -> Result<MenuItem, MenuError> {
    let new_item = new_item.validated()?;
    let item = sqlx::query_as::<_, MenuItem>(&format!(
        "INSERT INTO menu_items (owner_id, name, description, price, image_url, category, is_available)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {COLUMNS}"
    ))
    .bind(owner_id)
    .bind(&new_item.name)
    .bind(&new_item.description)
    .bind(new_item.price)
    .bind(&new_item.image_url)
    .bind(&new_item.category)
    .bind(new_item.is_available)
    .fetch_one(pool)
    .await?;

    tracing::info!(%owner_id, item_id = %item.id, "menu item created");
    publish(feed, ChangeKind::Insert, &item).await;
    Ok(item)
}

/// Apply a partial update.
///
/// # Errors
///
/// `InvalidInput` for bad fields, `NotFound` for unknown or foreign items.
pub async fn update(
    pool: &PgPool,
    feed: &FeedHub,
    owner_id: Uuid,
    id: Uuid,
    update: &MenuItemUpdate,
) -> Result<MenuItem, MenuError> {
    let update = update.validated()?;
    if update.is_empty() {
        return get(pool, owner_id, id).await;
    }

    let item = sqlx::query_as::<_, MenuItem>(&format!(
        "UPDATE menu_items SET
             name = COALESCE($3, name),
             description = CASE WHEN $4::text IS NULL THEN description ELSE NULLIF($4, '') END,
             price = COALESCE($5, price),
             image_url = CASE WHEN $6::text IS NULL THEN image_url ELSE NULLIF($6, '') END,
             category = CASE WHEN $7::text IS NULL THEN category ELSE NULLIF($7, '') END,
             is_available = COALESCE($8, is_available),
             updated_at = now()
         WHERE id = $1 AND owner_id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(owner_id)
    .bind(&update.name)
    .bind(&update.description)
    .bind(update.price)
    .bind(&update.image_url)
    .bind(&update.category)
    .bind(update.is_available)
    .fetch_optional(pool)
    .await?
    .ok_or(MenuError::NotFound(id))?;

    publish(feed, ChangeKind::Update, &item).await;
    Ok(item)
}

/// Point an item at a newly stored image. Returns the updated item and the
/// image URL it had before, so the caller can delete the old file.
///
/// # Errors
///
/// `NotFound` for unknown or foreign items.
pub async fn replace_image(
    pool: &PgPool,
    feed: &FeedHub,
    owner_id: Uuid,
    id: Uuid,
    image_url: &str,
) -> Result<(MenuItem, Option<String>), MenuError> {
    let mut tx = pool.begin().await?;
    let previous: Option<Option<String>> =
        sqlx::query_scalar("SELECT image_url FROM menu_items WHERE id = $1 AND owner_id = $2 FOR UPDATE")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(previous) = previous else {
        return Err(MenuError::NotFound(id));
    };

    let item = sqlx::query_as::<_, MenuItem>(&format!(
        "UPDATE menu_items SET image_url = $3, updated_at = now()
         WHERE id = $1 AND owner_id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(owner_id)
    .bind(image_url)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    publish(feed, ChangeKind::Update, &item).await;
    Ok((item, previous.filter(|old| old != image_url)))
}

/// Delete an item and return the removed row. Past orders keep their copied
/// name and price; their `menu_item_id` becomes null.
///
/// # Errors
///
/// `NotFound` for unknown or foreign items.
pub async fn delete(pool: &PgPool, feed: &FeedHub, owner_id: Uuid, id: Uuid) -> Result<MenuItem, MenuError> {
    let item = sqlx::query_as::<_, MenuItem>(&format!(
        "DELETE FROM menu_items WHERE id = $1 AND owner_id = $2 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?
    .ok_or(MenuError::NotFound(id))?;

    tracing::info!(%owner_id, item_id = %id, "menu item deleted");
    publish(feed, ChangeKind::Delete, &item).await;
    Ok(item)
}

async fn publish(feed: &FeedHub, kind: ChangeKind, item: &MenuItem) {
    let record = match serde_json::to_value(item) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(item_id = %item.id, error = %e, "menu: change record did not serialize");
            return;
        }
    };
    let event = ChangeEvent { table: FeedTable::MenuItems, kind, record, order_id: None };
    feed.publish(item.owner_id, &event).await;
}

#[cfg(test)]
#[path = "menu_test.rs"]
mod tests;
