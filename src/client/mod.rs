//! External model collaborators: image summarization and answer synthesis.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::models::{ImageInput, QueryResult};
use crate::utils::retry::{RetryConfig, with_retry};

/// Produces one dense natural-language description of an image.
#[async_trait]
pub trait ImageSummarizer: Send + Sync {
    async fn summarize(&self, image: &ImageInput) -> Result<String, UpstreamError>;
}

/// Everything the reasoning model is conditioned on.
#[derive(Debug, Clone, Copy)]
pub struct AnswerRequest<'a> {
    pub question: &'a str,
    pub context: &'a QueryResult,
    pub image: Option<&'a ImageInput>,
}

/// Turns a question plus retrieved context into an answer.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn answer(&self, request: AnswerRequest<'_>) -> Result<String, UpstreamError>;
}

/// Summarizer decorator that retries transient upstream failures.
pub struct RetryingSummarizer<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: ImageSummarizer> RetryingSummarizer<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<S: ImageSummarizer> ImageSummarizer for RetryingSummarizer<S> {
    async fn summarize(&self, image: &ImageInput) -> Result<String, UpstreamError> {
        let inner = &self.inner;
        with_retry(&self.config, move || inner.summarize(image)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Flaky {
        calls: AtomicU32,
        failures: u32,
    }

    #[async_trait]
    impl ImageSummarizer for Flaky {
        async fn summarize(&self, _image: &ImageInput) -> Result<String, UpstreamError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(UpstreamError::Status {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: String::new(),
                })
            } else {
                Ok("a line chart".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_retrying_summarizer_recovers() {
        let summarizer = RetryingSummarizer::new(
            Flaky {
                calls: AtomicU32::new(0),
                failures: 2,
            },
            RetryConfig::new(3).with_initial_delay(Duration::from_millis(5)),
        );
        let image = ImageInput::new(vec![1, 2, 3], "image/png");

        let summary = summarizer.summarize(&image).await.unwrap();
        assert_eq!(summary, "a line chart");
        assert_eq!(summarizer.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retrying_summarizer_gives_up() {
        let summarizer = RetryingSummarizer::new(
            Flaky {
                calls: AtomicU32::new(0),
                failures: 10,
            },
            RetryConfig::new(2).with_initial_delay(Duration::from_millis(5)),
        );
        let image = ImageInput::new(vec![1], "image/png");

        assert!(summarizer.summarize(&image).await.is_err());
        assert_eq!(summarizer.inner.calls.load(Ordering::SeqCst), 2);
    }
}
