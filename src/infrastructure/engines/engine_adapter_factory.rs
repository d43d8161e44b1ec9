use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ports::{AdapterError, AdapterFactory, EngineAdapter, InferenceRuntime};
use crate::domain::{Engine, EngineSettings, ModelIdentifier};
use crate::infrastructure::runtime::HttpInferenceRuntime;

use super::faster_whisper_adapter::FasterWhisperAdapter;
use super::funasr_adapter::FunAsrAdapter;
use super::sensevoice_adapter::SenseVoiceAdapter;

enum RuntimeSource {
    /// One worker per engine section, addressed by its configured endpoint.
    Http(reqwest::Client),
    Shared(Arc<dyn InferenceRuntime>),
}

pub struct EngineAdapterFactory {
    source: RuntimeSource,
}

impl EngineAdapterFactory {
    pub fn http(client: reqwest::Client) -> Self {
        Self {
            source: RuntimeSource::Http(client),
        }
    }

    pub fn with_runtime(runtime: Arc<dyn InferenceRuntime>) -> Self {
        Self {
            source: RuntimeSource::Shared(runtime),
        }
    }

    fn runtime_for(&self, settings: &EngineSettings) -> Arc<dyn InferenceRuntime> {
        match &self.source {
            RuntimeSource::Http(client) => Arc::new(HttpInferenceRuntime::new(
                client.clone(),
                &settings.endpoint,
            )),
            RuntimeSource::Shared(runtime) => Arc::clone(runtime),
        }
    }
}

#[async_trait]
impl AdapterFactory for EngineAdapterFactory {
    async fn create(
        &self,
        identifier: &ModelIdentifier,
        settings: &EngineSettings,
    ) -> Result<Arc<dyn EngineAdapter>, AdapterError> {
        let runtime = self.runtime_for(settings);

        tracing::debug!(
            model = %identifier,
            device = %settings.device,
            endpoint = %settings.endpoint,
            "Constructing engine adapter"
        );

        match identifier.engine() {
            Engine::FasterWhisper => {
                let adapter = FasterWhisperAdapter::new(identifier.name(), settings, runtime).await?;
                Ok(Arc::new(adapter))
            }
            Engine::FunAsr => {
                let adapter = FunAsrAdapter::new(identifier.name(), settings, runtime).await?;
                Ok(Arc::new(adapter))
            }
            Engine::SenseVoice => {
                let adapter = SenseVoiceAdapter::new(identifier.name(), settings, runtime).await?;
                Ok(Arc::new(adapter))
            }
        }
    }
}
