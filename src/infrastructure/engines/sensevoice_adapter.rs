use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, json};

use crate::application::ports::{
    AdapterError, EngineAdapter, EngineCapabilities, InferRequest, InferenceRuntime,
    TranscriptionOptions,
};
use crate::domain::{Engine, EngineSettings, Transcript};

use super::model_loading::{
    ensure_audio_readable, ensure_task_supported, load_model, validate_device,
};
use super::transcript_normalizer::{
    SegmentDraft, TranscriptBuilder, decode_native, runtime_failure,
};

const DEVICES: &[&str] = &["cpu", "cuda", "cuda:N", "mps"];
const DEFAULT_LANGUAGE: &str = "zh";
const AUTO_LANGUAGE: &str = "auto";
const NO_SPEECH: &str = "nospeech";

const CAPABILITIES: EngineCapabilities = EngineCapabilities {
    streaming: false,
    word_timestamps: false,
    translation: false,
};

pub struct SenseVoiceAdapter {
    model: String,
    use_itn: bool,
    runtime: Arc<dyn InferenceRuntime>,
}

#[derive(Deserialize)]
struct NativeEntry {
    #[serde(default)]
    text: String,
    #[serde(default)]
    duration: Option<f64>,
}

/// Rich transcription output with its `<|...|>` markers separated out.
#[derive(Debug, Clone, PartialEq)]
pub struct RichText {
    pub tags: Vec<String>,
    pub text: String,
}

impl RichText {
    pub fn parse(raw: &str) -> Self {
        let mut tags = Vec::new();
        let mut text = String::with_capacity(raw.len());
        let mut rest = raw;

        while let Some(open) = rest.find("<|") {
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("|>") else {
                break;
            };
            text.push_str(&rest[..open]);
            tags.push(after_open[..close].to_string());
            rest = &after_open[close + 2..];
        }
        text.push_str(rest);

        Self {
            tags,
            text: text.trim().to_string(),
        }
    }

    /// The leading tag names the detected language, unless the model found no
    /// speech or could not decide.
    pub fn language(&self) -> Option<&str> {
        self.tags
            .first()
            .map(String::as_str)
            .filter(|tag| *tag != NO_SPEECH && *tag != AUTO_LANGUAGE)
            .filter(|tag| !tag.is_empty() && tag.chars().all(|c| c.is_ascii_lowercase()))
    }
}

impl SenseVoiceAdapter {
    pub async fn new(
        model: &str,
        settings: &EngineSettings,
        runtime: Arc<dyn InferenceRuntime>,
    ) -> Result<Self, AdapterError> {
        validate_device(Engine::SenseVoice, &settings.device, DEVICES)?;
        load_model(runtime.as_ref(), Engine::SenseVoice, model, settings, None).await?;

        let use_itn = settings
            .extra
            .get("use_itn")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        Ok(Self {
            model: model.to_string(),
            use_itn,
            runtime,
        })
    }

    fn request(&self, audio: &Path, options: &TranscriptionOptions) -> InferRequest {
        let mut native = Map::new();
        native.insert(
            "language".to_string(),
            json!(options.language.as_deref().unwrap_or(AUTO_LANGUAGE)),
        );
        native.insert("use_itn".to_string(), json!(self.use_itn));

        InferRequest {
            engine: Engine::SenseVoice,
            model: self.model.clone(),
            audio_path: audio.to_path_buf(),
            options: native,
        }
    }
}

#[async_trait]
impl EngineAdapter for SenseVoiceAdapter {
    fn engine(&self) -> Engine {
        Engine::SenseVoice
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
        ensure_task_supported(Engine::SenseVoice, CAPABILITIES, options.task)?;
        ensure_audio_readable(audio).await?;

        if options.granularities.word {
            tracing::debug!(
                model = %self.model,
                "SenseVoice has no word timestamps, segments carry empty word lists"
            );
        }

        let request = self.request(audio, options);
        let value = self
            .runtime
            .infer(&request)
            .await
            .map_err(runtime_failure)?;
        let entries: Vec<NativeEntry> = decode_native(value)?;

        let mut builder = TranscriptBuilder::new(options.task, options.granularities.word);
        let mut detected = None;
        let mut offset = 0.0;

        for entry in entries {
            let rich = RichText::parse(&entry.text);
            if detected.is_none() {
                detected = rich.language().map(str::to_string);
            }
            let end = offset + entry.duration.unwrap_or(0.0);
            builder.push(SegmentDraft {
                start: offset,
                end,
                text: rich.text,
                ..SegmentDraft::default()
            });
            offset = end;
        }

        let language = detected
            .or_else(|| options.language.clone())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Ok(builder.finish(language, offset))
    }
}
