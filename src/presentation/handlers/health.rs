use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub scaffold: bool,
    pub loaded_models: Vec<String>,
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let loaded_models = state
        .transcription_service
        .registry()
        .cached_identifiers()
        .await;

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            scaffold: state.scaffold_config.enabled,
            loaded_models,
        }),
    )
}
