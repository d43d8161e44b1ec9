use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::presentation::state::AppState;

use super::openai_types::ModelsResponse;

pub async fn models_handler(State(state): State<AppState>) -> impl IntoResponse {
    let identifiers = state.transcription_service.models().await;
    (
        StatusCode::OK,
        Json(ModelsResponse::from_identifiers(identifiers)),
    )
}
