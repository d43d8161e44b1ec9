use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::Engine;

#[derive(Debug, Clone, Serialize)]
pub struct LoadRequest {
    pub engine: Engine,
    pub model: String,
    /// Local weight directory, or the model name when the worker resolves
    /// weights itself.
    pub weights: String,
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_type: Option<String>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InferRequest {
    pub engine: Engine,
    pub model: String,
    pub audio_path: PathBuf,
    pub options: Map<String, Value>,
}

pub type NativeStream = Pin<Box<dyn Stream<Item = Result<Value, RuntimeError>> + Send + 'static>>;

/// Transport to an engine's inference worker. Results are returned in the
/// engine's native JSON shape; adapters own their interpretation.
#[async_trait]
pub trait InferenceRuntime: Send + Sync {
    async fn load(&self, request: &LoadRequest) -> Result<(), RuntimeError>;

    async fn infer(&self, request: &InferRequest) -> Result<Value, RuntimeError>;

    async fn infer_stream(&self, request: &InferRequest) -> Result<NativeStream, RuntimeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("inference worker unreachable: {0}")]
    Unreachable(String),
    #[error("inference worker returned status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid response from inference worker: {0}")]
    InvalidResponse(String),
}
