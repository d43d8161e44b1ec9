use std::path::PathBuf;

use axum::Router;
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Json;
use futures::stream::StreamExt;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;

use asr_hub::application::ports::{InferRequest, InferenceRuntime, LoadRequest, RuntimeError};
use asr_hub::domain::Engine;
use asr_hub::infrastructure::runtime::HttpInferenceRuntime;

async fn spawn_worker(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn infer_request() -> InferRequest {
    InferRequest {
        engine: Engine::FasterWhisper,
        model: "large-v3".to_string(),
        audio_path: PathBuf::from("/tmp/audio.wav"),
        options: Map::new(),
    }
}

fn load_request() -> LoadRequest {
    LoadRequest {
        engine: Engine::FasterWhisper,
        model: "large-v3".to_string(),
        weights: "large-v3".to_string(),
        device: "cpu".to_string(),
        compute_type: Some("int8".to_string()),
        extra: Map::new(),
    }
}

async fn echo_transcribe(Json(request): Json<Value>) -> Json<Value> {
    Json(json!({"echo": request}))
}

async fn chunked_ndjson() -> Response {
    // Second record is split across chunks.
    let chunks: Vec<Result<&'static str, std::io::Error>> = vec![
        Ok("{\"info\":{\"language\":\"en\",\"duration\":2.0}}\n{\"segment\":"),
        Ok("{\"start\":0.0,\"end\":1.0,\"text\":\" hi\"}}\n\n"),
        Ok("{\"segment\":{\"start\":1.0,\"end\":2.0,\"text\":\" there\"}}"),
    ];
    Response::builder()
        .header("content-type", "application/x-ndjson")
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .unwrap()
}

#[tokio::test]
async fn given_worker_accepts_load_when_loading_then_ok() {
    let base = spawn_worker(Router::new().route("/models/load", post(|| async { StatusCode::OK }))).await;
    let runtime = HttpInferenceRuntime::new(reqwest::Client::new(), &format!("{}/", base));

    let result = runtime.load(&load_request()).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn given_worker_rejects_load_when_loading_then_rejected_with_status_and_body() {
    let base = spawn_worker(Router::new().route(
        "/models/load",
        post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "unknown compute type").into_response() }),
    ))
    .await;
    let runtime = HttpInferenceRuntime::new(reqwest::Client::new(), &base);

    let result = runtime.load(&load_request()).await;

    assert!(matches!(
        result,
        Err(RuntimeError::Rejected { status: 422, ref message }) if message == "unknown compute type"
    ));
}

#[tokio::test]
async fn given_worker_when_inferring_then_request_serialized_with_engine_wire_name() {
    let base = spawn_worker(Router::new().route("/transcribe", post(echo_transcribe))).await;
    let runtime = HttpInferenceRuntime::new(reqwest::Client::new(), &base);

    let value = runtime.infer(&infer_request()).await.unwrap();

    assert_eq!(value["echo"]["engine"], "faster-whisper");
    assert_eq!(value["echo"]["audio_path"], "/tmp/audio.wav");
}

#[tokio::test]
async fn given_chunked_ndjson_when_streaming_then_records_reassembled() {
    let base = spawn_worker(Router::new().route("/transcribe/stream", post(chunked_ndjson))).await;
    let runtime = HttpInferenceRuntime::new(reqwest::Client::new(), &base);

    let records: Vec<Value> = runtime
        .infer_stream(&infer_request())
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["info"]["language"], "en");
    assert_eq!(records[1]["segment"]["text"], " hi");
    assert_eq!(records[2]["segment"]["text"], " there");
}

#[tokio::test]
async fn given_malformed_line_when_streaming_then_invalid_response_item() {
    let base = spawn_worker(Router::new().route(
        "/transcribe/stream",
        post(|| async { "{\"info\":{}}\nnot json\n" }),
    ))
    .await;
    let runtime = HttpInferenceRuntime::new(reqwest::Client::new(), &base);

    let records: Vec<Result<Value, RuntimeError>> = runtime
        .infer_stream(&infer_request())
        .await
        .unwrap()
        .collect()
        .await;

    assert!(records[0].is_ok());
    assert!(matches!(records[1], Err(RuntimeError::InvalidResponse(_))));
}

#[tokio::test]
async fn given_no_worker_when_inferring_then_unreachable() {
    let runtime = HttpInferenceRuntime::new(reqwest::Client::new(), "http://127.0.0.1:1");

    let result = runtime.infer(&infer_request()).await;

    assert!(matches!(result, Err(RuntimeError::Unreachable(_))));
}
