use std::sync::Arc;

use crate::application::services::TranscriptionService;
use crate::presentation::config::{ScaffoldConfig, Settings};

#[derive(Clone)]
pub struct AppState {
    pub transcription_service: Arc<TranscriptionService>,
    pub settings: Arc<Settings>,
    pub scaffold_config: ScaffoldConfig,
}
