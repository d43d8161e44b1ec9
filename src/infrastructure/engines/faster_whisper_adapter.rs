use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::StreamExt;
use serde::Deserialize;
use serde_json::{Map, json};
use tokio::sync::mpsc;

use crate::application::ports::{
    AdapterError, EngineAdapter, EngineCapabilities, InferRequest, InferenceRuntime,
    SegmentStream, TranscriptionOptions,
};
use crate::domain::{Engine, EngineSettings, Transcript, Word};

use super::model_loading::{
    ensure_audio_readable, ensure_task_supported, load_model, validate_device,
};
use super::transcript_normalizer::{
    SegmentDraft, SegmentNumbering, TranscriptBuilder, decode_native, runtime_failure,
};

const DEVICES: &[&str] = &["cpu", "cuda", "auto"];
const COMPUTE_TYPES: &[&str] = &[
    "default",
    "auto",
    "int8",
    "int8_float16",
    "int8_float32",
    "int8_bfloat16",
    "int16",
    "float16",
    "bfloat16",
    "float32",
];
const DEFAULT_COMPUTE_TYPE: &str = "int8";
const SEGMENT_CHANNEL_CAPACITY: usize = 16;

const CAPABILITIES: EngineCapabilities = EngineCapabilities {
    streaming: true,
    word_timestamps: true,
    translation: true,
};

pub struct FasterWhisperAdapter {
    model: String,
    runtime: Arc<dyn InferenceRuntime>,
}

#[derive(Deserialize)]
struct NativeResult {
    segments: Vec<NativeSegment>,
    info: NativeInfo,
}

#[derive(Deserialize)]
struct NativeInfo {
    language: String,
    duration: f64,
}

#[derive(Deserialize)]
struct NativeSegment {
    #[serde(default)]
    seek: i64,
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    tokens: Vec<i64>,
    #[serde(default)]
    temperature: f64,
    #[serde(default)]
    avg_logprob: f64,
    #[serde(default)]
    compression_ratio: f64,
    #[serde(default)]
    no_speech_prob: f64,
    #[serde(default)]
    words: Option<Vec<NativeWord>>,
}

#[derive(Deserialize)]
struct NativeWord {
    start: f64,
    end: f64,
    word: String,
    #[serde(default)]
    probability: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum NativeStreamRecord {
    Info(NativeInfo),
    Segment(NativeSegment),
}

impl NativeSegment {
    fn into_draft(self) -> SegmentDraft {
        SegmentDraft {
            seek: self.seek,
            start: self.start,
            end: self.end,
            text: self.text,
            tokens: self.tokens,
            temperature: self.temperature,
            avg_logprob: self.avg_logprob,
            compression_ratio: self.compression_ratio,
            no_speech_prob: self.no_speech_prob,
            words: self.words.map(|words| {
                words
                    .into_iter()
                    .map(|w| Word {
                        start: w.start,
                        end: w.end,
                        text: w.word,
                        probability: w.probability,
                    })
                    .collect()
            }),
        }
    }
}

impl FasterWhisperAdapter {
    pub async fn new(
        model: &str,
        settings: &EngineSettings,
        runtime: Arc<dyn InferenceRuntime>,
    ) -> Result<Self, AdapterError> {
        validate_device(Engine::FasterWhisper, &settings.device, DEVICES)?;

        let compute_type = settings
            .compute_type
            .as_deref()
            .unwrap_or(DEFAULT_COMPUTE_TYPE);
        if !COMPUTE_TYPES.contains(&compute_type) {
            return Err(AdapterError::ModelLoad(format!(
                "compute type '{}' is not supported by {}",
                compute_type,
                Engine::FasterWhisper
            )));
        }

        load_model(
            runtime.as_ref(),
            Engine::FasterWhisper,
            model,
            settings,
            Some(compute_type),
        )
        .await?;

        Ok(Self {
            model: model.to_string(),
            runtime,
        })
    }

    fn request(&self, audio: &Path, options: &TranscriptionOptions) -> InferRequest {
        let mut native = Map::new();
        native.insert("task".to_string(), json!(options.task.as_str()));
        if let Some(language) = &options.language {
            native.insert("language".to_string(), json!(language));
        }
        if let Some(prompt) = &options.prompt {
            native.insert("initial_prompt".to_string(), json!(prompt));
        }
        native.insert("temperature".to_string(), json!(options.temperature));
        native.insert(
            "word_timestamps".to_string(),
            json!(options.granularities.word),
        );

        InferRequest {
            engine: Engine::FasterWhisper,
            model: self.model.clone(),
            audio_path: audio.to_path_buf(),
            options: native,
        }
    }
}

#[async_trait]
impl EngineAdapter for FasterWhisperAdapter {
    fn engine(&self) -> Engine {
        Engine::FasterWhisper
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
        ensure_task_supported(Engine::FasterWhisper, CAPABILITIES, options.task)?;
        ensure_audio_readable(audio).await?;

        let request = self.request(audio, options);
        let value = self
            .runtime
            .infer(&request)
            .await
            .map_err(runtime_failure)?;
        let native: NativeResult = decode_native(value)?;

        let mut builder = TranscriptBuilder::new(options.task, options.granularities.word);
        for segment in native.segments {
            builder.push(segment.into_draft());
        }

        Ok(builder.finish(native.info.language, native.info.duration))
    }

    async fn transcribe_stream(
        &self,
        audio: &Path,
        options: &TranscriptionOptions,
    ) -> Result<SegmentStream, AdapterError> {
        ensure_task_supported(Engine::FasterWhisper, CAPABILITIES, options.task)?;
        ensure_audio_readable(audio).await?;

        let request = self.request(audio, options);
        let mut native = self
            .runtime
            .infer_stream(&request)
            .await
            .map_err(runtime_failure)?;

        let info = match native.next().await {
            Some(Ok(value)) => match decode_native::<NativeStreamRecord>(value)? {
                NativeStreamRecord::Info(info) => info,
                NativeStreamRecord::Segment(_) => {
                    return Err(AdapterError::EngineRuntime(
                        "stream did not start with transcription info".to_string(),
                    ));
                }
            },
            Some(Err(e)) => return Err(runtime_failure(e)),
            None => {
                return Err(AdapterError::EngineRuntime(
                    "stream ended before transcription info".to_string(),
                ));
            }
        };

        let (tx, rx) = mpsc::channel(SEGMENT_CHANNEL_CAPACITY);
        let mut numbering = SegmentNumbering::new(options.granularities.word);
        let model = self.model.clone();

        tokio::spawn(async move {
            while let Some(item) = native.next().await {
                let message = item
                    .map_err(runtime_failure)
                    .and_then(decode_native::<NativeStreamRecord>)
                    .and_then(|record| match record {
                        NativeStreamRecord::Segment(segment) => {
                            Ok(numbering.number(segment.into_draft()))
                        }
                        NativeStreamRecord::Info(_) => Err(AdapterError::EngineRuntime(
                            "duplicate info record in stream".to_string(),
                        )),
                    });
                let failed = message.is_err();

                if tx.send(message).await.is_err() {
                    tracing::debug!(model = %model, "Segment consumer dropped, stopping decode");
                    break;
                }
                if failed {
                    break;
                }
            }
        });

        Ok(SegmentStream {
            language: info.language,
            duration: info.duration,
            segments: rx,
        })
    }
}
