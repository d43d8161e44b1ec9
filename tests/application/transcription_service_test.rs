use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use serde_json::json;

use asr_hub::application::ports::{AdapterError, TranscriptionOptions};
use asr_hub::application::services::{
    InferencePool, ModelRegistry, TranscriptionError, TranscriptionService,
};
use asr_hub::domain::{
    Engine, EngineConfig, ResponseFormat, StreamEvent, Task, TimestampGranularities,
};
use asr_hub::infrastructure::engines::EngineAdapterFactory;
use asr_hub::infrastructure::runtime::MockInferenceRuntime;

use crate::helpers::{
    CountingFactory, audio_fixture, faster_whisper_result, faster_whisper_stream,
};

fn service_with(runtime: MockInferenceRuntime) -> TranscriptionService {
    service_on_pool(runtime, Arc::new(InferencePool::new(1, 2).unwrap()))
}

fn service_on_pool(runtime: MockInferenceRuntime, pool: Arc<InferencePool>) -> TranscriptionService {
    let factory = Arc::new(EngineAdapterFactory::with_runtime(Arc::new(runtime)));
    let registry = Arc::new(ModelRegistry::new(factory, EngineConfig::default()));
    TranscriptionService::new(registry, pool)
}

/// More segments than the adapter's channel buffers, so the producer stays
/// parked on the pool until the consumer drains it.
fn long_whisper_stream(segments: usize) -> Vec<serde_json::Value> {
    let mut records = vec![json!({"info": {"language": "en", "duration": segments as f64}})];
    records.extend((0..segments).map(|i| {
        json!({"segment": {"start": i as f64, "end": i as f64 + 1.0, "text": format!(" part {}", i)}})
    }));
    records
}

fn whisper_runtime() -> MockInferenceRuntime {
    MockInferenceRuntime::new()
        .with_result(Engine::FasterWhisper, faster_whisper_result())
        .with_stream(Engine::FasterWhisper, faster_whisper_stream())
}

#[tokio::test]
async fn given_audio_when_transcribing_then_segments_renumbered_from_zero() {
    let service = service_with(whisper_runtime());
    let audio = audio_fixture();

    let transcript = service
        .transcribe(
            "faster-whisper/large-v3",
            audio.path().to_path_buf(),
            TranscriptionOptions::default(),
        )
        .await
        .unwrap();

    let ids: Vec<usize> = transcript.segments.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![0, 1]);
    assert_eq!(transcript.text, "Hello there. General Kenobi.");
    assert_eq!(transcript.language, "en");
    assert!(transcript.segments.iter().all(|s| s.words.is_none()));
}

#[tokio::test]
async fn given_word_granularity_when_transcribing_then_every_segment_has_word_list() {
    let service = service_with(whisper_runtime());
    let audio = audio_fixture();
    let options = TranscriptionOptions {
        granularities: TimestampGranularities::parse(["word"]),
        ..TranscriptionOptions::default()
    };

    let transcript = service
        .transcribe("faster-whisper/large-v3", audio.path().to_path_buf(), options)
        .await
        .unwrap();

    assert_eq!(transcript.segments[0].words.as_ref().unwrap().len(), 2);
    assert_eq!(transcript.segments[1].words, Some(vec![]));
}

#[tokio::test]
async fn given_srt_format_when_transcribing_then_rendered_subtitles() {
    let service = service_with(whisper_runtime());
    let audio = audio_fixture();

    let rendered = service
        .transcribe_formatted(
            "faster-whisper/large-v3",
            audio.path().to_path_buf(),
            TranscriptionOptions::default(),
            ResponseFormat::Srt,
        )
        .await
        .unwrap();

    assert!(rendered.body.starts_with("1\n00:00:00,000 --> 00:00:01,500\n Hello there.\n\n"));
}

#[tokio::test]
async fn given_missing_audio_when_transcribing_then_client_fault() {
    let service = service_with(whisper_runtime());

    let err = service
        .transcribe(
            "faster-whisper/large-v3",
            "/nonexistent/audio.wav".into(),
            TranscriptionOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TranscriptionError::Adapter(AdapterError::AudioNotFound(_))
    ));
    assert!(err.is_client_fault());
}

#[tokio::test]
async fn given_translate_on_funasr_when_transcribing_then_unsupported_operation() {
    let service = service_with(
        MockInferenceRuntime::new().with_result(Engine::FunAsr, serde_json::json!([])),
    );
    let audio = audio_fixture();
    let options = TranscriptionOptions {
        task: Task::Translate,
        ..TranscriptionOptions::default()
    };

    let err = service
        .transcribe("funasr/paraformer-zh", audio.path().to_path_buf(), options)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TranscriptionError::Adapter(AdapterError::UnsupportedOperation(_))
    ));
    assert!(err.is_client_fault());
}

#[tokio::test]
async fn given_failing_model_load_when_transcribing_then_infrastructure_fault() {
    let service = service_with(whisper_runtime().failing_load("out of memory"));
    let audio = audio_fixture();

    let err = service
        .transcribe(
            "faster-whisper/large-v3",
            audio.path().to_path_buf(),
            TranscriptionOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TranscriptionError::Registry(_)));
    assert!(!err.is_client_fault());
}

#[tokio::test]
async fn given_streaming_request_when_transcribing_then_deltas_then_done() {
    let service = service_with(whisper_runtime());
    let audio = audio_fixture();

    let events: Vec<StreamEvent> = service
        .transcribe_stream(
            "faster-whisper/large-v3",
            audio.path().to_path_buf(),
            TranscriptionOptions::default(),
        )
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(events.len(), 3);
    assert_eq!(
        events[2],
        StreamEvent::TextDone {
            text: "Hello there. General Kenobi.".to_string(),
            language: "en".to_string(),
            duration: 3.5,
        }
    );
}

#[tokio::test]
async fn given_streaming_on_sensevoice_when_transcribing_then_unsupported_before_any_event() {
    let service = service_with(MockInferenceRuntime::scaffold());
    let audio = audio_fixture();

    let result = service
        .transcribe_stream(
            "sensevoice/small",
            audio.path().to_path_buf(),
            TranscriptionOptions::default(),
        )
        .await;

    assert!(matches!(
        result,
        Err(TranscriptionError::Adapter(AdapterError::UnsupportedOperation(_)))
    ));
}

#[tokio::test]
async fn given_configured_models_when_listing_then_identifiers_returned() {
    let service = service_with(whisper_runtime());
    service
        .update_config(&serde_json::json!({
            "engine": {"faster-whisper": {"models": {"large-v3": {}}}}
        }))
        .await
        .unwrap();

    let models: Vec<String> = service
        .models()
        .await
        .iter()
        .map(|m| m.to_string())
        .collect();

    assert_eq!(models, vec!["faster-whisper/large-v3"]);
}

#[tokio::test]
async fn given_live_stream_when_pool_has_one_permit_then_permit_held_until_stream_dropped() {
    let pool = Arc::new(InferencePool::new(1, 1).unwrap());
    let service = service_on_pool(
        MockInferenceRuntime::new().with_stream(Engine::FasterWhisper, long_whisper_stream(40)),
        Arc::clone(&pool),
    );
    let audio = audio_fixture();

    let first = service
        .transcribe_stream(
            "faster-whisper/large-v3",
            audio.path().to_path_buf(),
            TranscriptionOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(pool.available_permits(), 0);

    let second = tokio::time::timeout(
        Duration::from_millis(100),
        service.transcribe_stream(
            "faster-whisper/large-v3",
            audio.path().to_path_buf(),
            TranscriptionOptions::default(),
        ),
    )
    .await;
    assert!(second.is_err());

    drop(first);
    assert_eq!(pool.available_permits(), 1);
}

#[tokio::test]
async fn given_stream_consumed_to_end_when_done_then_permit_released() {
    let pool = Arc::new(InferencePool::new(1, 1).unwrap());
    let service = service_on_pool(
        MockInferenceRuntime::new().with_stream(Engine::FasterWhisper, long_whisper_stream(40)),
        Arc::clone(&pool),
    );
    let audio = audio_fixture();

    let stream = service
        .transcribe_stream(
            "faster-whisper/large-v3",
            audio.path().to_path_buf(),
            TranscriptionOptions::default(),
        )
        .await
        .unwrap();
    let events: Vec<_> = stream.collect().await;

    assert_eq!(events.len(), 41);
    assert!(events.last().unwrap().as_ref().unwrap().is_done());
    assert_eq!(pool.available_permits(), 1);
}

#[tokio::test]
async fn given_adapter_without_streaming_capability_when_streaming_then_unsupported_without_invoking() {
    let factory = Arc::new(CountingFactory::default());
    let registry = Arc::new(ModelRegistry::new(factory, EngineConfig::default()));
    let pool = Arc::new(InferencePool::new(1, 1).unwrap());
    let service = TranscriptionService::new(registry, Arc::clone(&pool));
    let audio = audio_fixture();

    let result = service
        .transcribe_stream(
            "faster-whisper/large-v3",
            audio.path().to_path_buf(),
            TranscriptionOptions::default(),
        )
        .await;

    assert!(matches!(
        result,
        Err(TranscriptionError::Adapter(AdapterError::UnsupportedOperation(ref message)))
            if message.contains("streaming")
    ));
    assert_eq!(pool.available_permits(), 1);
}
