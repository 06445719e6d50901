use axum::{Json, extract::State};
use serde_json::{Value, json};

use pulse_types::models::Stats;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// Platform-wide counts, recomputed on every call.
pub async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    let stats = with_db(&state, |db| db.stats()).await?;
    Ok(Json(stats))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
