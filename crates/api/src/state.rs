//! Shared application state for the Axum API server.

use donorlink_engine::store::PgNotificationStore;
use sqlx::PgPool;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub store: PgNotificationStore,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            store: PgNotificationStore::new(pool),
        }
    }
}
