use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::Value;

use crate::presentation::state::AppState;

use super::error::ApiError;
use super::openai_types::ConfigResponse;

pub async fn get_config_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(ConfigResponse {
        engine: state.transcription_service.config().await,
    })
}

/// Applies a partial engine configuration. Models whose settings changed are
/// evicted and rebuilt on next use; an invalid update changes nothing.
#[tracing::instrument(skip(state, update))]
pub async fn update_config_handler(
    State(state): State<AppState>,
    Json(update): Json<Value>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let engine = state.transcription_service.update_config(&update).await?;
    tracing::info!("Engine configuration updated");
    Ok(Json(ConfigResponse { engine }))
}
