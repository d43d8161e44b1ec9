use std::convert::Infallible;
use std::path::Path;

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::StreamExt;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::application::ports::TranscriptionOptions;
use crate::domain::{ResponseFormat, Task, TimestampGranularities};
use crate::infrastructure::observability::sanitize_prompt;
use crate::presentation::state::AppState;

use super::error::ApiError;

const UPLOAD_PREFIX: &str = "asr-upload-";

/// Multipart request body shared by transcription and translation.
#[derive(Default)]
struct TranscriptionForm {
    upload: Option<NamedTempFile>,
    model: Option<String>,
    language: Option<String>,
    prompt: Option<String>,
    hotword: Option<String>,
    temperature: Option<String>,
    response_format: Option<String>,
    stream: Option<String>,
    granularities: Vec<String>,
}

#[tracing::instrument(skip(state, multipart))]
pub async fn transcriptions_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    handle(state, multipart, Task::Transcribe).await
}

#[tracing::instrument(skip(state, multipart))]
pub async fn translations_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    handle(state, multipart, Task::Translate).await
}

async fn handle(state: AppState, multipart: Multipart, task: Task) -> Result<Response, ApiError> {
    let mut form = read_form(multipart).await?;

    let upload = form
        .upload
        .take()
        .ok_or_else(|| ApiError::bad_request("No audio file uploaded"))?;
    let model = form
        .model
        .take()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.settings.transcription.default_model.clone());

    let format = match form.response_format.as_deref() {
        Some(value) => value
            .parse::<ResponseFormat>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => ResponseFormat::default(),
    };
    let temperature = match form.temperature.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => value
            .parse::<f32>()
            .map_err(|_| ApiError::bad_request(format!("Invalid temperature: {}", value)))?,
        _ => 0.0,
    };
    let stream = match form.stream.as_deref().map(str::trim) {
        None | Some("") => false,
        Some(value) => parse_flag(value)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid stream flag: {}", value)))?,
    };

    if task == Task::Translate && form.language.is_some() {
        tracing::debug!("Ignoring language on translation request");
        form.language = None;
    }

    // An explicit hotword list wins over a free-form prompt.
    let steering = form.hotword.take().or(form.prompt.take());
    if let Some(text) = &steering {
        tracing::debug!(prompt = %sanitize_prompt(text), "Steering text supplied");
    }

    let options = TranscriptionOptions {
        task,
        language: form.language.take().filter(|l| !l.trim().is_empty()),
        prompt: steering,
        temperature,
        granularities: TimestampGranularities::parse(
            form.granularities.iter().map(String::as_str),
        ),
    };

    tracing::info!(
        model = %model,
        task = %task,
        response_format = ?format,
        stream = stream,
        "Processing transcription request"
    );

    let audio = upload.path().to_path_buf();
    let service = &state.transcription_service;

    if stream {
        let events = service.transcribe_stream(&model, audio, options).await?;
        let mut events = Box::pin(events);

        let sse_stream = async_stream::stream! {
            // The staged upload must outlive the decode.
            let _upload = upload;

            while let Some(event) = events.next().await {
                match event {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => yield Ok::<_, Infallible>(Event::default().data(json)),
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize stream event");
                            break;
                        }
                    },
                    Err(e) => {
                        tracing::error!(error = %e, "Transcription stream aborted");
                        break;
                    }
                }
            }
        };

        return Ok(Sse::new(sse_stream).into_response());
    }

    let rendered = service
        .transcribe_formatted(&model, audio, options, format)
        .await?;
    drop(upload);

    Ok(([(header::CONTENT_TYPE, rendered.content_type)], rendered.body).into_response())
}

async fn read_form(mut multipart: Multipart) -> Result<TranscriptionForm, ApiError> {
    let mut form = TranscriptionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => form.upload = Some(stage_upload(field).await?),
            "model" => form.model = Some(field_text(field).await?),
            "language" => form.language = Some(field_text(field).await?),
            "prompt" => form.prompt = Some(field_text(field).await?),
            "hotword" | "hotwords" => form.hotword = Some(field_text(field).await?),
            "temperature" => form.temperature = Some(field_text(field).await?),
            "response_format" => form.response_format = Some(field_text(field).await?),
            "stream" => form.stream = Some(field_text(field).await?),
            "timestamp_granularities[]" | "timestamp_granularities" => {
                form.granularities.push(field_text(field).await?)
            }
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

async fn field_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read form field: {}", e)))
}

/// Streams the uploaded audio into a temporary file that keeps the original
/// extension, since inference workers sniff the container from it.
async fn stage_upload(mut field: Field<'_>) -> Result<NamedTempFile, ApiError> {
    let suffix = field
        .file_name()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    let upload = tempfile::Builder::new()
        .prefix(UPLOAD_PREFIX)
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| ApiError::internal(format!("Failed to stage upload: {}", e)))?;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .open(upload.path())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to stage upload: {}", e)))?;

    let mut written: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to stage upload: {}", e)))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to stage upload: {}", e)))?;

    if written == 0 {
        return Err(ApiError::bad_request("Uploaded audio file is empty"));
    }

    tracing::debug!(bytes = written, path = %upload.path().display(), "Audio upload staged");
    Ok(upload)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
