//! Jina AI segmenter.
//!
//! Uses the `/v1/segment` endpoint. Requires the `JINA_API_KEY` environment variable
//! (or an explicit key) and an async runtime compatible with `reqwest`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{SegmentFuture, Segmenter};
use crate::error::SegmentationError;

const ENDPOINT: &str = "https://api.jina.ai/v1/segment";
/// The segmenter rejects inputs at or above this many characters.
const MAX_INPUT_CHARS: usize = 64_000;

/// Semantic segmentation through the Jina AI segmenter API.
#[derive(Debug, Clone)]
pub struct JinaSegmenter {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl JinaSegmenter {
    /// Creates a segmenter with an explicit API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_key: api_key.into(),
            endpoint: ENDPOINT.to_owned(),
        }
    }

    /// Creates a segmenter from `JINA_API_KEY`, or `None` when it is unset or empty.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var("JINA_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(Self::new)
    }

    /// Overrides the endpoint URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn request(&self, text: &str, max_chunk_len: usize) -> Result<Vec<String>, SegmentationError> {
        if self.api_key.trim().is_empty() {
            return Err(SegmentationError::Unavailable("no Jina API key configured".to_owned()));
        }
        let len = text.chars().count();
        if len >= MAX_INPUT_CHARS {
            return Err(SegmentationError::TooLarge {
                len,
                limit: MAX_INPUT_CHARS,
            });
        }

        let body = SegmentRequest {
            content: text,
            return_tokens: false,
            return_chunks: true,
            max_chunk_length: max_chunk_len,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SegmentationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(SegmentationError::Request(format!("status {status}: {detail}")));
        }

        let parsed: SegmentResponse = response
            .json()
            .await
            .map_err(|e| SegmentationError::Request(format!("invalid response: {e}")))?;
        if parsed.chunks.is_empty() {
            return Err(SegmentationError::Empty);
        }
        Ok(parsed.chunks)
    }
}

impl Segmenter for JinaSegmenter {
    fn name(&self) -> &'static str {
        "jina"
    }

    fn segment<'a>(&'a self, text: &'a str, max_chunk_len: usize) -> SegmentFuture<'a> {
        Box::pin(self.request(text, max_chunk_len))
    }
}

#[derive(Debug, Serialize)]
struct SegmentRequest<'a> {
    content: &'a str,
    return_tokens: bool,
    return_chunks: bool,
    max_chunk_length: usize,
}

#[derive(Debug, Deserialize)]
struct SegmentResponse {
    #[serde(default)]
    chunks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_input_is_refused_without_a_request() {
        let segmenter = JinaSegmenter::new("test-key").with_endpoint("http://127.0.0.1:9");
        let text = "a".repeat(MAX_INPUT_CHARS);
        let result = tokio_test::block_on(segmenter.segment(&text, 1_000));
        assert!(matches!(
            result,
            Err(SegmentationError::TooLarge { limit: MAX_INPUT_CHARS, .. })
        ));
    }

    #[test]
    fn blank_key_is_unavailable() {
        let segmenter = JinaSegmenter::new("  ").with_endpoint("http://127.0.0.1:9");
        let result = tokio_test::block_on(segmenter.segment("some text", 100));
        assert!(matches!(result, Err(SegmentationError::Unavailable(_))));
    }

    #[test]
    fn request_body_matches_api() {
        let body = SegmentRequest {
            content: "hello",
            return_tokens: false,
            return_chunks: true,
            max_chunk_length: 500,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["return_chunks"], true);
        assert_eq!(value["max_chunk_length"], 500);
    }
}
