use std::sync::Arc;

use serde_json::json;

use asr_hub::application::ports::{AdapterError, EngineAdapter, TranscriptionOptions};
use asr_hub::domain::{Engine, EngineConfig, EngineSettings, Task, TimestampGranularities};
use asr_hub::infrastructure::engines::FasterWhisperAdapter;
use asr_hub::infrastructure::runtime::MockInferenceRuntime;

use crate::helpers::{audio_fixture, faster_whisper_result, faster_whisper_stream};

fn settings() -> EngineSettings {
    EngineConfig::default().settings_for(Engine::FasterWhisper, "large-v3")
}

fn runtime() -> Arc<MockInferenceRuntime> {
    Arc::new(
        MockInferenceRuntime::new()
            .with_result(Engine::FasterWhisper, faster_whisper_result())
            .with_stream(Engine::FasterWhisper, faster_whisper_stream())
            .recording(),
    )
}

#[tokio::test]
async fn given_default_settings_when_constructing_then_model_loaded_once() {
    let runtime = runtime();

    let adapter = FasterWhisperAdapter::new("large-v3", &settings(), runtime.clone())
        .await
        .unwrap();

    assert_eq!(runtime.load_count(), 1);
    assert_eq!(adapter.model_name(), "large-v3");
    assert!(adapter.capabilities().streaming);
    assert!(adapter.capabilities().translation);
}

#[tokio::test]
async fn given_unsupported_device_when_constructing_then_model_load_error() {
    let mut settings = settings();
    settings.device = "mps".to_string();

    let result = FasterWhisperAdapter::new("large-v3", &settings, runtime()).await;

    assert!(matches!(result, Err(AdapterError::ModelLoad(msg)) if msg.contains("mps")));
}

#[tokio::test]
async fn given_unsupported_compute_type_when_constructing_then_model_load_error() {
    let mut settings = settings();
    settings.compute_type = Some("int4".to_string());
    let runtime = runtime();

    let result = FasterWhisperAdapter::new("large-v3", &settings, runtime.clone()).await;

    assert!(matches!(result, Err(AdapterError::ModelLoad(msg)) if msg.contains("int4")));
    assert_eq!(runtime.load_count(), 0);
}

#[tokio::test]
async fn given_missing_weight_path_when_constructing_then_model_load_error() {
    let mut settings = settings();
    settings.path = Some("/nonexistent/weights/large-v3".to_string());

    let result = FasterWhisperAdapter::new("large-v3", &settings, runtime()).await;

    assert!(matches!(result, Err(AdapterError::ModelLoad(_))));
}

#[tokio::test]
async fn given_options_when_transcribing_then_native_vocabulary_sent() {
    let runtime = runtime();
    let adapter = FasterWhisperAdapter::new("large-v3", &settings(), runtime.clone())
        .await
        .unwrap();
    let audio = audio_fixture();
    let options = TranscriptionOptions {
        task: Task::Translate,
        language: Some("de".to_string()),
        prompt: Some("Glossary: Kenobi".to_string()),
        temperature: 0.2,
        granularities: TimestampGranularities::parse(["word"]),
    };

    adapter.transcribe_file(audio.path(), &options).await.unwrap();

    let requests = runtime.requests().await;
    let sent = &requests[0].options;
    assert_eq!(sent["task"], json!("translate"));
    assert_eq!(sent["language"], json!("de"));
    assert_eq!(sent["initial_prompt"], json!("Glossary: Kenobi"));
    assert_eq!(sent["word_timestamps"], json!(true));
    assert_eq!(requests[0].audio_path, audio.path());
}

#[tokio::test]
async fn given_native_result_when_transcribing_then_diagnostics_and_words_kept() {
    let adapter = FasterWhisperAdapter::new("large-v3", &settings(), runtime())
        .await
        .unwrap();
    let audio = audio_fixture();
    let options = TranscriptionOptions {
        granularities: TimestampGranularities::parse(["word"]),
        ..TranscriptionOptions::default()
    };

    let transcript = adapter.transcribe_file(audio.path(), &options).await.unwrap();

    let first = &transcript.segments[0];
    assert_eq!(first.id, 0);
    assert_eq!(first.avg_logprob, -0.25);
    assert_eq!(first.tokens, vec![50364, 2425]);
    assert_eq!(first.words.as_ref().unwrap()[1].text, " there.");
    assert_eq!(transcript.segments[1].seek, 150);
    assert_eq!(transcript.duration, 3.5);
}

#[tokio::test]
async fn given_stream_when_consuming_then_language_known_before_segments() {
    let adapter = FasterWhisperAdapter::new("large-v3", &settings(), runtime())
        .await
        .unwrap();
    let audio = audio_fixture();

    let mut stream = adapter
        .transcribe_stream(audio.path(), &TranscriptionOptions::default())
        .await
        .unwrap();

    assert_eq!(stream.language, "en");
    assert_eq!(stream.duration, 3.5);
    let first = stream.segments.recv().await.unwrap().unwrap();
    let second = stream.segments.recv().await.unwrap().unwrap();
    assert_eq!((first.id, second.id), (0, 1));
    assert!(stream.segments.recv().await.is_none());
}

#[tokio::test]
async fn given_transport_failure_mid_stream_when_consuming_then_error_then_closed() {
    let runtime = Arc::new(
        MockInferenceRuntime::new()
            .with_stream(Engine::FasterWhisper, faster_whisper_stream())
            .failing_stream_after(2, "connection reset"),
    );
    let adapter = FasterWhisperAdapter::new("large-v3", &settings(), runtime)
        .await
        .unwrap();
    let audio = audio_fixture();

    let mut stream = adapter
        .transcribe_stream(audio.path(), &TranscriptionOptions::default())
        .await
        .unwrap();

    assert!(stream.segments.recv().await.unwrap().is_ok());
    assert!(matches!(
        stream.segments.recv().await.unwrap(),
        Err(AdapterError::EngineRuntime(msg)) if msg.contains("connection reset")
    ));
    assert!(stream.segments.recv().await.is_none());
}

#[tokio::test]
async fn given_stream_without_info_record_when_starting_then_engine_runtime_error() {
    let runtime = Arc::new(MockInferenceRuntime::new().with_stream(
        Engine::FasterWhisper,
        vec![json!({"segment": {"start": 0.0, "end": 1.0, "text": " hi"}})],
    ));
    let adapter = FasterWhisperAdapter::new("large-v3", &settings(), runtime)
        .await
        .unwrap();
    let audio = audio_fixture();

    let result = adapter
        .transcribe_stream(audio.path(), &TranscriptionOptions::default())
        .await;

    assert!(matches!(result, Err(AdapterError::EngineRuntime(_))));
}
