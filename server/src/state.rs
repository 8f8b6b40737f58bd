//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool, the loaded configuration, and the in-memory
//! services: the realtime feed hub, customer table sessions, and the image
//! store. Everything durable lives in Postgres; everything here can be
//! rebuilt from a restart.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::feed::FeedHub;
use crate::services::oauth::GoogleConfig;
use crate::services::order::CheckoutSettings;
use crate::services::storage::ImageStore;
use crate::services::table_session::TableSessionStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub feed: FeedHub,
    pub tables: TableSessionStore,
    pub images: ImageStore,
    /// `None` when Google sign-in is not configured.
    pub google: Option<Arc<GoogleConfig>>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, config: AppConfig, google: Option<GoogleConfig>) -> Self {
        let tables = TableSessionStore::new(
            config.table_count,
            Duration::from_secs(config.table_session_ttl_minutes.saturating_mul(60)),
        );
        let images = ImageStore::new(config.upload_dir.clone(), config.uploads_base_url());
        Self { pool, config: Arc::new(config), feed: FeedHub::new(), tables, images, google: google.map(Arc::new) }
    }

    /// Tax and table settings for checkout.
    #[must_use]
    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            gst_rate: self.config.gst_rate,
            inter_state: self.config.gst_inter_state,
            table_count: self.config.table_count,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::config::test_helpers::test_config;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool(config: &AppConfig) -> PgPool {
        PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(2))
            .connect_lazy(&config.database_url)
            .expect("connect_lazy should not fail")
    }

    /// Create a test `AppState` with a dummy `PgPool` (`connect_lazy`, no live DB).
    #[must_use]
    pub fn test_app_state() -> AppState {
        let config = test_config();
        AppState::new(lazy_pool(&config), config, None)
    }

    /// Test state whose image store writes under `upload_dir`.
    #[must_use]
    pub fn test_app_state_with_uploads(upload_dir: &std::path::Path) -> AppState {
        let mut config = test_config();
        config.upload_dir = upload_dir.to_path_buf();
        AppState::new(lazy_pool(&config), config, None)
    }

    /// Test state with Google sign-in configured.
    #[must_use]
    pub fn test_app_state_with_google() -> AppState {
        let config = test_config();
        let google = GoogleConfig {
            client_id: "test-client".into(),
            client_secret: "test-secret".into(),
            redirect_uri: "http://localhost:3000/auth/google/callback".into(),
        };
        AppState::new(lazy_pool(&config), config, Some(google))
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
