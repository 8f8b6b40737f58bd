//! Owner menu routes: CRUD plus image upload.

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use uuid::Uuid;

use super::auth::AuthUser;
use super::{BadRequest, error_response};
use crate::services::menu::{self, MenuError, MenuItem, MenuItemUpdate, NewMenuItem};
use crate::services::storage::{MAX_FILE_SIZE, StorageError};
use crate::state::AppState;

/// Multipart overhead allowed on top of the image itself.
const MULTIPART_SLACK: usize = 64 * 1024;

pub(crate) fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_FILE_SIZE + MULTIPART_SLACK)
}

pub(crate) fn menu_error_to_status(err: &MenuError) -> StatusCode {
    match err {
        MenuError::NotFound(_) => StatusCode::NOT_FOUND,
        MenuError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        MenuError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn storage_error_to_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        StorageError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        StorageError::Empty | StorageError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        StorageError::Processing(_) | StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn menu_error(err: &MenuError) -> Response {
    error_response(menu_error_to_status(err), err)
}

/// Remove a replaced or orphaned image unless another item still uses it.
/// Failures only cost disk space.
async fn discard_image(state: &AppState, owner_id: Uuid, url: &str) {
    match menu::image_in_use(&state.pool, owner_id, url).await {
        Ok(false) => {}
        Ok(true) => return,
        Err(e) => {
            tracing::warn!(error = %e, url, "image usage check failed; keeping file");
            return;
        }
    }
    if let Err(e) = state.images.delete_by_url(owner_id, url).await {
        tracing::warn!(error = %e, url, "stale menu image not deleted");
    }
}

// =============================================================================
// CRUD
// =============================================================================

/// `GET /api/owner/menu`: every item, grouped by category.
pub async fn list_items(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<MenuItem>>, Response> {
    menu::list_for_owner(&state.pool, auth.owner.id)
        .await
        .map(Json)
        .map_err(|e| menu_error(&e))
}

/// `POST /api/owner/menu`
pub async fn create_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewMenuItem>,
) -> Result<(StatusCode, Json<MenuItem>), Response> {
    menu::check_image_url(&state.images, auth.owner.id, body.image_url.as_deref()).map_err(|e| menu_error(&e))?;
    let item = menu::create(&state.pool, &state.feed, auth.owner.id, &body)
        .await
        .map_err(|e| menu_error(&e))?;
    tracing::info!(owner_id = %auth.owner.id, item_id = %item.id, name = %item.name, "menu item created");
    Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /api/owner/menu/{id}`
pub async fn get_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MenuItem>, Response> {
    menu::get(&state.pool, auth.owner.id, id)
        .await
        .map(Json)
        .map_err(|e| menu_error(&e))
}

/// `PATCH /api/owner/menu/{id}`: partial update. Clearing `image_url`
/// (empty string) also deletes the stored file.
pub async fn update_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MenuItemUpdate>,
) -> Result<Json<MenuItem>, Response> {
    menu::check_image_url(&state.images, auth.owner.id, body.image_url.as_deref()).map_err(|e| menu_error(&e))?;
    let previous_image = if body.image_url.is_some() {
        menu::get(&state.pool, auth.owner.id, id)
            .await
            .map_err(|e| menu_error(&e))?
            .image_url
    } else {
        None
    };

    let item = menu::update(&state.pool, &state.feed, auth.owner.id, id, &body)
        .await
        .map_err(|e| menu_error(&e))?;

    if let Some(previous) = previous_image.filter(|p| item.image_url.as_deref() != Some(p.as_str())) {
        discard_image(&state, auth.owner.id, &previous).await;
    }
    Ok(Json(item))
}

/// `DELETE /api/owner/menu/{id}`: removes the item and its image.
pub async fn delete_item(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Response {
    match menu::delete(&state.pool, &state.feed, auth.owner.id, id).await {
        Ok(item) => {
            if let Some(url) = &item.image_url {
                discard_image(&state, auth.owner.id, url).await;
            }
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => menu_error(&e),
    }
}

// =============================================================================
// IMAGE UPLOAD
// =============================================================================

/// `POST /api/owner/menu/{id}/image`: multipart upload of one image file.
/// The image is resized and re-encoded before the item points at it.
pub async fn upload_image(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<MenuItem>, Response> {
    // Fail before touching the disk when the item is not this owner's.
    menu::get(&state.pool, auth.owner.id, id)
        .await
        .map_err(|e| menu_error(&e))?;

    let (filename, bytes) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, &BadRequest::new(e.body_text())))?;
        let Some(field) = field else {
            return Err(error_response(StatusCode::BAD_REQUEST, &BadRequest::new("no image file in upload")));
        };
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, &BadRequest::new(e.body_text())))?;
        break (filename, bytes);
    };

    let stored = state
        .images
        .store_menu_image(auth.owner.id, bytes.to_vec(), &filename)
        .await
        .map_err(|e| error_response(storage_error_to_status(&e), &e))?;

    let (item, previous) = match menu::replace_image(&state.pool, &state.feed, auth.owner.id, id, &stored.url).await {
        Ok(result) => result,
        Err(e) => {
            discard_image(&state, auth.owner.id, &stored.url).await;
            return Err(menu_error(&e));
        }
    };
    if let Some(previous) = previous.filter(|p| *p != stored.url) {
        discard_image(&state, auth.owner.id, &previous).await;
    }

    tracing::info!(
        owner_id = %auth.owner.id,
        item_id = %id,
        width = stored.width,
        height = stored.height,
        size = stored.size,
        "menu image stored"
    );
    Ok(Json(item))
}

#[cfg(test)]
#[path = "menu_test.rs"]
mod tests;
