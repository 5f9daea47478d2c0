//! HTTP transport for generation streams.
//!
//! The controller talks to the generation endpoint through the
//! [`GenerationTransport`] trait so tests can script byte streams without a
//! network. The real implementation posts the prompt as JSON and exposes
//! the chunked response body as it arrives.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Serialize;

use crate::session::GenerationError;

/// Body of the generation request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
}

/// Chunked response body; chunk boundaries carry no meaning.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, GenerationError>> + Send>>;

/// Opens one streaming response per generation request.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn open_stream(&self, request: GenerationRequest) -> Result<ByteStream, GenerationError>;
}

/// Transport backed by a real HTTP endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl GenerationTransport for HttpTransport {
    async fn open_stream(&self, request: GenerationRequest) -> Result<ByteStream, GenerationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::error!("generation endpoint rejected request: HTTP {status}");
            return Err(GenerationError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(GenerationError::from));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_prompt_body() {
        let json = serde_json::to_value(GenerationRequest {
            prompt: "build a todo app".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"prompt": "build a todo app"}));
    }
}
