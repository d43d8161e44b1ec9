use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::application::ports::{
    InferRequest, InferenceRuntime, LoadRequest, NativeStream, RuntimeError,
};
use crate::domain::Engine;

/// In-process stand-in for the inference workers. Returns canned native
/// payloads per engine. Request capture is opt-in via [`recording`](Self::recording).
#[derive(Default)]
pub struct MockInferenceRuntime {
    results: HashMap<Engine, Value>,
    streams: HashMap<Engine, Vec<Value>>,
    load_failure: Option<String>,
    load_delay: Option<Duration>,
    stream_failure: Option<(usize, String)>,
    record_requests: bool,
    loads: AtomicUsize,
    requests: Mutex<Vec<InferRequest>>,
}

impl MockInferenceRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plausible output for every engine, used when the service runs without
    /// inference workers.
    pub fn scaffold() -> Self {
        Self::new()
            .with_result(
                Engine::FasterWhisper,
                json!({
                    "info": {"language": "en", "duration": 2.5},
                    "segments": [
                        {"start": 0.0, "end": 1.2, "text": " Scaffold transcription.",
                         "avg_logprob": -0.2, "compression_ratio": 1.1, "no_speech_prob": 0.01,
                         "words": [
                            {"start": 0.0, "end": 0.6, "word": " Scaffold", "probability": 0.98},
                            {"start": 0.6, "end": 1.2, "word": " transcription.", "probability": 0.95}
                         ]},
                        {"start": 1.2, "end": 2.5, "text": " No worker attached."}
                    ]
                }),
            )
            .with_stream(
                Engine::FasterWhisper,
                vec![
                    json!({"info": {"language": "en", "duration": 2.5}}),
                    json!({"segment": {"start": 0.0, "end": 1.2, "text": " Scaffold transcription."}}),
                    json!({"segment": {"start": 1.2, "end": 2.5, "text": " No worker attached."}}),
                ],
            )
            .with_result(
                Engine::FunAsr,
                json!([{
                    "text": "脚手架转写",
                    "sentence_info": [
                        {"start": 0, "end": 1500, "text": "脚手架转写"}
                    ]
                }]),
            )
            .with_result(
                Engine::SenseVoice,
                json!([{"text": "<|zh|><|NEUTRAL|><|Speech|><|withitn|>脚手架转写。", "duration": 1.5}]),
            )
    }

    pub fn with_result(mut self, engine: Engine, result: Value) -> Self {
        self.results.insert(engine, result);
        self
    }

    pub fn with_stream(mut self, engine: Engine, records: Vec<Value>) -> Self {
        self.streams.insert(engine, records);
        self
    }

    pub fn failing_load(mut self, message: &str) -> Self {
        self.load_failure = Some(message.to_string());
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Emits `records_before` stream records, then a transport error.
    pub fn failing_stream_after(mut self, records_before: usize, message: &str) -> Self {
        self.stream_failure = Some((records_before, message.to_string()));
        self
    }

    pub fn recording(mut self) -> Self {
        self.record_requests = true;
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<InferRequest> {
        self.requests.lock().await.clone()
    }

    async fn record(&self, request: &InferRequest) {
        if self.record_requests {
            self.requests.lock().await.push(request.clone());
        }
    }

    fn missing(engine: Engine) -> RuntimeError {
        RuntimeError::Rejected {
            status: 404,
            message: format!("no canned output for {}", engine),
        }
    }
}

#[async_trait]
impl InferenceRuntime for MockInferenceRuntime {
    async fn load(&self, request: &LoadRequest) -> Result<(), RuntimeError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.load_failure {
            Some(message) => Err(RuntimeError::Rejected {
                status: 500,
                message: format!("{}: {}", request.model, message),
            }),
            None => Ok(()),
        }
    }

    async fn infer(&self, request: &InferRequest) -> Result<Value, RuntimeError> {
        self.record(request).await;
        self.results
            .get(&request.engine)
            .cloned()
            .ok_or_else(|| Self::missing(request.engine))
    }

    async fn infer_stream(&self, request: &InferRequest) -> Result<NativeStream, RuntimeError> {
        self.record(request).await;
        let records = self
            .streams
            .get(&request.engine)
            .cloned()
            .ok_or_else(|| Self::missing(request.engine))?;

        let mut items: Vec<Result<Value, RuntimeError>> = records.into_iter().map(Ok).collect();
        if let Some((before, message)) = &self.stream_failure {
            items.truncate(*before);
            items.push(Err(RuntimeError::Unreachable(message.clone())));
        }

        Ok(Box::pin(futures::stream::iter(items)))
    }
}
