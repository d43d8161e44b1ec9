use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{Stream, StreamExt};
use serde_json::Value;

use crate::application::ports::{AdapterError, EngineAdapter, TranscriptionOptions};
use crate::domain::{
    EngineConfig, ModelIdentifier, ResponseFormat, StreamEvent, Transcript,
    UnsupportedResponseFormat,
};

use super::format_renderer::{RenderedBody, render};
use super::inference_pool::{InferencePool, PoolError};
use super::model_registry::{ModelRegistry, RegistryError};
use super::stream_encoder::encode_stream;

/// Request-facing entry point: resolves the model, runs the engine on the
/// inference pool and hands the result to the renderer or stream encoder.
pub struct TranscriptionService {
    registry: Arc<ModelRegistry>,
    pool: Arc<InferencePool>,
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    ResponseFormat(#[from] UnsupportedResponseFormat),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("response rendering failed: {0}")]
    Render(#[from] serde_json::Error),
}

impl TranscriptionError {
    pub fn is_client_fault(&self) -> bool {
        match self {
            TranscriptionError::Registry(e) => e.is_client_fault(),
            TranscriptionError::Adapter(e) => matches!(
                e,
                AdapterError::AudioNotFound(_) | AdapterError::UnsupportedOperation(_)
            ),
            TranscriptionError::ResponseFormat(_) => true,
            TranscriptionError::Pool(_) | TranscriptionError::Render(_) => false,
        }
    }
}

impl TranscriptionService {
    pub fn new(registry: Arc<ModelRegistry>, pool: Arc<InferencePool>) -> Self {
        Self { registry, pool }
    }

    #[tracing::instrument(skip(self, audio, options), fields(task = %options.task))]
    pub async fn transcribe(
        &self,
        model: &str,
        audio: PathBuf,
        options: TranscriptionOptions,
    ) -> Result<Transcript, TranscriptionError> {
        let adapter = self.resolve(model).await?;
        warn_if_words_unavailable(adapter.as_ref(), &options);

        let transcript = self
            .pool
            .run(async move { adapter.transcribe_file(&audio, &options).await })
            .await??;

        tracing::info!(
            segments = transcript.segments.len(),
            language = %transcript.language,
            duration = transcript.duration,
            "Transcription completed"
        );

        Ok(transcript)
    }

    pub async fn transcribe_formatted(
        &self,
        model: &str,
        audio: PathBuf,
        options: TranscriptionOptions,
        format: ResponseFormat,
    ) -> Result<RenderedBody, TranscriptionError> {
        let transcript = self.transcribe(model, audio, options).await?;
        Ok(render(&transcript, format)?)
    }

    /// Starts an incremental transcription. Errors before the first segment
    /// are returned directly; later ones end the event stream.
    pub async fn transcribe_stream(
        &self,
        model: &str,
        audio: PathBuf,
        options: TranscriptionOptions,
    ) -> Result<impl Stream<Item = Result<StreamEvent, AdapterError>> + Send + 'static, TranscriptionError>
    {
        tracing::debug!(model = %model, task = %options.task, "Starting streaming transcription");
        let adapter = self.resolve(model).await?;
        if !adapter.capabilities().streaming {
            return Err(AdapterError::UnsupportedOperation(format!(
                "{} does not support streaming transcription",
                adapter.engine()
            ))
            .into());
        }
        warn_if_words_unavailable(adapter.as_ref(), &options);

        let (segments, lease) = self
            .pool
            .run_leased(async move { adapter.transcribe_stream(&audio, &options).await })
            .await?;
        let mut events = Box::pin(encode_stream(segments?));

        // The segment producer keeps decoding on the pool until the stream ends.
        Ok(async_stream::stream! {
            let _lease = lease;
            while let Some(event) = events.next().await {
                yield event;
            }
        })
    }

    pub async fn update_config(&self, update: &Value) -> Result<EngineConfig, TranscriptionError> {
        Ok(self.registry.update(update).await?)
    }

    pub async fn config(&self) -> EngineConfig {
        self.registry.config().await
    }

    pub async fn models(&self) -> Vec<ModelIdentifier> {
        self.registry.config().await.identifiers()
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    async fn resolve(&self, model: &str) -> Result<Arc<dyn EngineAdapter>, TranscriptionError> {
        let registry = Arc::clone(&self.registry);
        let model = model.to_string();
        Ok(self
            .pool
            .run(async move { registry.resolve(&model).await })
            .await??)
    }
}

fn warn_if_words_unavailable(adapter: &dyn EngineAdapter, options: &TranscriptionOptions) {
    if options.granularities.word && !adapter.capabilities().word_timestamps {
        tracing::warn!(
            engine = %adapter.engine(),
            model = %adapter.model_name(),
            "Word timestamps requested but not produced by this engine, segments carry empty word lists"
        );
    }
}
