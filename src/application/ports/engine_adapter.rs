use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{Engine, Segment, Task, TimestampGranularities, Transcript};

#[derive(Debug, Clone, Default)]
pub struct TranscriptionOptions {
    pub task: Task,
    pub language: Option<String>,
    /// Steering text: initial prompt for Whisper-style engines, hotword list
    /// for FunASR.
    pub prompt: Option<String>,
    pub temperature: f32,
    pub granularities: TimestampGranularities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCapabilities {
    pub streaming: bool,
    pub word_timestamps: bool,
    pub translation: bool,
}

/// Incremental adapter output. Language and duration are known before the
/// first segment arrives; segments come over the channel in emission order.
/// Dropping the receiver stops the producer.
pub struct SegmentStream {
    pub language: String,
    pub duration: f64,
    pub segments: mpsc::Receiver<Result<Segment, AdapterError>>,
}

#[async_trait]
pub trait EngineAdapter: Send + Sync {
    fn engine(&self) -> Engine;

    fn model_name(&self) -> &str;

    fn capabilities(&self) -> EngineCapabilities;

    async fn transcribe_file(
        &self,
        audio: &Path,
        options: &TranscriptionOptions,
    ) -> Result<Transcript, AdapterError>;

    async fn transcribe_stream(
        &self,
        _audio: &Path,
        _options: &TranscriptionOptions,
    ) -> Result<SegmentStream, AdapterError> {
        Err(AdapterError::UnsupportedOperation(format!(
            "{} does not support streaming transcription",
            self.engine()
        )))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    #[error("model loading failed: {0}")]
    ModelLoad(String),
    #[error("audio not found: {0}")]
    AudioNotFound(String),
    #[error("engine runtime error: {0}")]
    EngineRuntime(String),
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}
