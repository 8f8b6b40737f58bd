//! Owner profile and table QR routes.

use axum::extract::State;
use axum::response::{Json, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::{AuthUser, owner_error};
use crate::config::AppConfig;
use crate::domain::whatsapp;
use crate::services::owner::{self, OwnerProfile, ProfileUpdate};
use crate::state::AppState;

/// `GET /api/owner/profile`
pub async fn profile(State(state): State<AppState>, auth: AuthUser) -> Result<Json<OwnerProfile>, Response> {
    owner::get_owner(&state.pool, auth.owner.id)
        .await
        .map(Json)
        .map_err(|e| owner_error(&e))
}

/// `PATCH /api/owner/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<OwnerProfile>, Response> {
    let profile = owner::update_profile(&state.pool, auth.owner.id, &body)
        .await
        .map_err(|e| owner_error(&e))?;
    tracing::info!(owner_id = %profile.id, "owner profile updated");
    Ok(Json(profile))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TableQr {
    pub table: u16,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QrCodes {
    pub restaurant_name: String,
    /// Restaurant-wide code; customers pick their table after scanning.
    pub url: String,
    pub share_message: String,
    pub share_url: String,
    pub tables: Vec<TableQr>,
}

pub(crate) fn qr_codes_for(config: &AppConfig, owner_id: Uuid, restaurant_name: &str) -> QrCodes {
    let url = config.qr_url(owner_id, None);
    let share_message = whatsapp::qr_share_message(restaurant_name, &url);
    QrCodes {
        restaurant_name: restaurant_name.to_owned(),
        share_url: whatsapp::whatsapp_url(None, &share_message),
        share_message,
        tables: (1..=config.table_count)
            .map(|table| TableQr { table, url: config.qr_url(owner_id, Some(table)) })
            .collect(),
        url,
    }
}

/// `GET /api/owner/qr`: the URLs to print as QR codes, restaurant-wide and
/// per table, plus a WhatsApp share link.
pub async fn qr_codes(State(state): State<AppState>, auth: AuthUser) -> Json<QrCodes> {
    Json(qr_codes_for(&state.config, auth.owner.id, &auth.owner.restaurant_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_helpers::test_config;

    #[test]
    fn qr_codes_cover_every_table() {
        let config = test_config();
        let owner_id = Uuid::new_v4();
        let codes = qr_codes_for(&config, owner_id, "Sharma Dhaba");

        assert_eq!(codes.url, format!("http://localhost:3000/qr?restaurant={owner_id}"));
        assert_eq!(codes.tables.len(), usize::from(config.table_count));
        assert_eq!(codes.tables[6].table, 7);
        assert!(codes.tables[6].url.ends_with("&table=7"));
    }

    #[test]
    fn share_link_carries_the_restaurant_url() {
        let config = test_config();
        let codes = qr_codes_for(&config, Uuid::new_v4(), "Sharma Dhaba");

        assert!(codes.share_message.contains("Sharma Dhaba"));
        assert!(codes.share_message.contains(&codes.url));
        assert!(codes.share_url.starts_with("https://wa.me/"));
    }
}
