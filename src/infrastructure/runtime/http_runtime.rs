use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::{Client, Response};
use serde_json::Value;

use crate::application::ports::{
    InferRequest, InferenceRuntime, LoadRequest, NativeStream, RuntimeError,
};

/// Client for an engine's inference worker. Each engine section points at
/// its own worker endpoint.
pub struct HttpInferenceRuntime {
    client: Client,
    base_url: String,
}

impl HttpInferenceRuntime {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, RuntimeError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RuntimeError::Unreachable(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RuntimeError::Rejected { status, message });
        }

        Ok(response)
    }
}

fn parse_line(line: &[u8]) -> Option<Result<Value, RuntimeError>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(line)
            .map_err(|e| RuntimeError::InvalidResponse(format!("ndjson line: {}", e))),
    )
}

#[async_trait]
impl InferenceRuntime for HttpInferenceRuntime {
    async fn load(&self, request: &LoadRequest) -> Result<(), RuntimeError> {
        tracing::debug!(
            engine = %request.engine,
            model = %request.model,
            base_url = %self.base_url,
            "Requesting model load from inference worker"
        );
        self.post("/models/load", request).await?;
        Ok(())
    }

    async fn infer(&self, request: &InferRequest) -> Result<Value, RuntimeError> {
        let response = self.post("/transcribe", request).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| RuntimeError::InvalidResponse(format!("body: {}", e)))
    }

    async fn infer_stream(&self, request: &InferRequest) -> Result<NativeStream, RuntimeError> {
        let response = self.post("/transcribe/stream", request).await?;
        let mut bytes = response.bytes_stream();

        let lines = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut failed = false;

            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        buffer.extend_from_slice(&chunk);
                        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                            let line: Vec<u8> = buffer.drain(..=pos).collect();
                            if let Some(item) = parse_line(&line) {
                                yield item;
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(RuntimeError::Unreachable(format!("stream: {}", e)));
                        failed = true;
                        break;
                    }
                }
            }

            if !failed {
                if let Some(item) = parse_line(&buffer) {
                    yield item;
                }
            }
        };

        Ok(Box::pin(lines))
    }
}
