use serde::Serialize;

use crate::domain::{EngineConfig, ModelIdentifier};

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub object: &'static str,
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub owned_by: String,
}

impl ModelsResponse {
    pub fn from_identifiers(identifiers: Vec<ModelIdentifier>) -> Self {
        Self {
            object: "list",
            data: identifiers
                .into_iter()
                .map(|identifier| ModelInfo {
                    id: identifier.as_str().to_string(),
                    object: "model",
                    created: 0,
                    owned_by: identifier.engine().as_str().to_string(),
                })
                .collect(),
        }
    }
}

/// Same root key that `POST /v1/config` accepts.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResponse {
    pub engine: EngineConfig,
}
