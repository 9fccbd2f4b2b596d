//! Delegated summaries from an external text-generation service.
//!
//! The service is reached through [`TextGenerator`]. Every failure is
//! swallowed here and replaced by a fixed message; the local template is
//! never used as a fallback.

pub mod openai;

pub use openai::OpenAiClient;

use crate::models::Record;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// System instruction sent with every request.
pub const SYSTEM_PROMPT: &str = "You are a real estate analysis assistant.";

/// Returned when the service answers without any generated text.
pub const NO_CONTENT_MESSAGE: &str = "AI analysis failed: No response content.";

/// Returned on any other failure.
pub const FAILURE_MESSAGE: &str = "AI summary generation failed.";

/// Errors from the text-generation service.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to encode data sample: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("response contained no choices")]
    EmptyResponse,
}

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// An opaque service that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, SummaryError>;
}

/// Settings for delegated summaries.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub sample_rows: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            sample_rows: 5,
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

/// Builds prompts from the record table and calls the generator.
#[derive(Clone)]
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, config: SummarizerConfig) -> Self {
        Self { generator, config }
    }

    /// Summarize the head of the table for `query`.
    ///
    /// The sample is taken from the whole table, not from the rows that
    /// match the query.
    pub async fn summarize(&self, records: &[Record], query: &str) -> String {
        match self.try_summarize(records, query).await {
            Ok(text) => text,
            Err(SummaryError::EmptyResponse) => {
                warn!("Text generation returned no content");
                NO_CONTENT_MESSAGE.to_string()
            }
            Err(e) => {
                warn!("Text generation failed: {}", e);
                FAILURE_MESSAGE.to_string()
            }
        }
    }

    async fn try_summarize(&self, records: &[Record], query: &str) -> Result<String, SummaryError> {
        let request = self.build_request(records, query)?;
        debug!("Sending {} sample rows for query '{}'", self.sample_len(records), query);
        self.generator.generate(&request).await
    }

    fn sample_len(&self, records: &[Record]) -> usize {
        records.len().min(self.config.sample_rows)
    }

    /// Prompt for `query` with the first rows of the table embedded as JSON.
    pub fn build_request(
        &self,
        records: &[Record],
        query: &str,
    ) -> Result<GenerationRequest, SummaryError> {
        let sample = serde_json::to_string(&records[..self.sample_len(records)])?;

        Ok(GenerationRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: format!(
                "Analyze this real estate data and provide a concise summary: {} for the query: '{}'",
                sample, query
            ),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        })
    }
}

#[cfg(test)]
pub mod testing {
    //! Canned generators for handler and summarizer tests.

    use super::*;
    use std::sync::Mutex;

    pub enum Reply {
        Text(String),
        Empty,
        Fail,
    }

    /// Records every request and answers with a fixed reply.
    pub struct StubGenerator {
        reply: Reply,
        pub requests: Mutex<Vec<GenerationRequest>>,
    }

    impl StubGenerator {
        pub fn new(reply: Reply) -> Self {
            Self {
                reply,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, SummaryError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Reply::Text(text) => Ok(text.clone()),
                Reply::Empty => Err(SummaryError::EmptyResponse),
                Reply::Fail => Err(SummaryError::Api {
                    status: 500,
                    body: "boom".to_string(),
                }),
            }
        }
    }
}
