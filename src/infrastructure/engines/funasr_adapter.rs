use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, json};

use crate::application::ports::{
    AdapterError, EngineAdapter, EngineCapabilities, InferRequest, InferenceRuntime,
    TranscriptionOptions,
};
use crate::domain::{Engine, EngineSettings, Transcript, Word};

use super::model_loading::{
    ensure_audio_readable, ensure_task_supported, load_model, validate_device,
};
use super::transcript_normalizer::{
    SegmentDraft, TranscriptBuilder, decode_native, millis_to_seconds, runtime_failure,
};

const DEVICES: &[&str] = &["cpu", "cuda", "cuda:N", "mps"];
const DEFAULT_LANGUAGE: &str = "zh";

const CAPABILITIES: EngineCapabilities = EngineCapabilities {
    streaming: false,
    word_timestamps: true,
    translation: false,
};

pub struct FunAsrAdapter {
    model: String,
    runtime: Arc<dyn InferenceRuntime>,
}

/// FunASR's `generate` returns a batch; a single-file call carries one entry.
#[derive(Deserialize)]
#[serde(untagged)]
enum NativeOutput {
    Batch(Vec<NativeResult>),
    Single(NativeResult),
}

#[derive(Deserialize)]
struct NativeResult {
    #[serde(default)]
    text: String,
    #[serde(default)]
    sentence_info: Option<Vec<NativeSentence>>,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

/// Timestamps in milliseconds.
#[derive(Deserialize)]
struct NativeSentence {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    word_list: Option<Vec<NativeWord>>,
}

#[derive(Deserialize)]
struct NativeWord {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    word: String,
    #[serde(default)]
    prob: f64,
}

impl NativeSentence {
    fn into_draft(self) -> SegmentDraft {
        SegmentDraft {
            start: millis_to_seconds(self.start),
            end: millis_to_seconds(self.end),
            text: self.text,
            words: self.word_list.map(|words| {
                words
                    .into_iter()
                    .map(|w| Word {
                        start: millis_to_seconds(w.start),
                        end: millis_to_seconds(w.end),
                        text: w.word,
                        probability: w.prob,
                    })
                    .collect()
            }),
            ..SegmentDraft::default()
        }
    }
}

impl FunAsrAdapter {
    pub async fn new(
        model: &str,
        settings: &EngineSettings,
        runtime: Arc<dyn InferenceRuntime>,
    ) -> Result<Self, AdapterError> {
        validate_device(Engine::FunAsr, &settings.device, DEVICES)?;
        load_model(runtime.as_ref(), Engine::FunAsr, model, settings, None).await?;

        Ok(Self {
            model: model.to_string(),
            runtime,
        })
    }

    fn request(&self, audio: &Path, options: &TranscriptionOptions) -> InferRequest {
        let mut native = Map::new();
        if let Some(language) = &options.language {
            native.insert("language".to_string(), json!(language));
        }
        if let Some(hotword) = &options.prompt {
            native.insert("hotword".to_string(), json!(hotword));
        }
        native.insert("sentence_timestamp".to_string(), json!(true));

        if options.temperature != 0.0 {
            tracing::debug!(
                temperature = options.temperature,
                "FunASR ignores sampling temperature"
            );
        }

        InferRequest {
            engine: Engine::FunAsr,
            model: self.model.clone(),
            audio_path: audio.to_path_buf(),
            options: native,
        }
    }
}

#[async_trait]
impl EngineAdapter for FunAsrAdapter {
    fn engine(&self) -> Engine {
        Engine::FunAsr
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> EngineCapabilities {
        CAPABILITIES
    }

    async fn transcribe_file(
        &self,
        audio: &Path,
        options: &TranscriptionOptions,
    ) -> Result<Transcript, AdapterError> {
        ensure_task_supported(Engine::FunAsr, CAPABILITIES, options.task)?;
        ensure_audio_readable(audio).await?;

        let request = self.request(audio, options);
        let value = self
            .runtime
            .infer(&request)
            .await
            .map_err(runtime_failure)?;

        let first = match decode_native::<NativeOutput>(value)? {
            NativeOutput::Batch(results) => results.into_iter().next(),
            NativeOutput::Single(result) => Some(result),
        };

        let mut builder = TranscriptBuilder::new(options.task, options.granularities.word);
        let Some(result) = first else {
            let language = options
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
            return Ok(builder.finish(language, 0.0));
        };

        match result.sentence_info {
            Some(sentences) if !sentences.is_empty() => {
                for sentence in sentences {
                    builder.push(sentence.into_draft());
                }
            }
            _ if !result.text.trim().is_empty() => {
                builder.push(SegmentDraft {
                    start: 0.0,
                    end: result.duration.unwrap_or(0.0),
                    text: result.text,
                    ..SegmentDraft::default()
                });
            }
            _ => {}
        }

        let duration = result.duration.unwrap_or_else(|| builder.last_end());
        let language = result
            .lang
            .or_else(|| options.language.clone())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Ok(builder.finish(language, duration))
    }
}
