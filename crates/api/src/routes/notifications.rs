//! Delivery status lookup.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use donorlink_common::error::AppError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/notifications/{id}/delivery-status",
        get(get_delivery_status),
    )
}

/// GET /notifications/:id/delivery-status
async fn get_delivery_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status = state.store.delivery_status(&id).await?;
    Ok(Json(status))
}
