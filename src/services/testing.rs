//! Deterministic doubles for the embedding and vision collaborators.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::embedding::{Embedder, normalize, validate_inputs};
use crate::client::ImageSummarizer;
use crate::error::{EmbeddingError, UpstreamError};
use crate::models::ImageInput;

const BAG_DIMENSION: usize = 256;

/// Hashes lowercase alphanumeric words into a fixed number of buckets.
pub struct BagOfWordsEmbedder {
    dimension: usize,
}

impl BagOfWordsEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: BAG_DIMENSION,
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.dimension;
            v[bucket] += 1.0;
        }
        normalize(&v)
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf29ce484222325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        validate_inputs(texts)?;
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "bag-of-words"
    }
}

/// Records every batch passed to the wrapped embedder.
pub struct CountingEmbedder<E> {
    inner: E,
    batches: Mutex<Vec<Vec<String>>>,
}

impl<E: Embedder> CountingEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CountingEmbedder<E> {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(texts.to_vec());
        }
        self.inner.embed(texts).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

/// Always returns one vector too few.
pub struct ShortEmbedder;

#[async_trait]
impl Embedder for ShortEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(vec![vec![1.0, 0.0]; texts.len().saturating_sub(1)])
    }

    fn dimension(&self) -> usize {
        2
    }

    fn model_id(&self) -> &str {
        "short"
    }
}

pub struct StaticSummarizer {
    summary: String,
    calls: AtomicUsize,
}

impl StaticSummarizer {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSummarizer for StaticSummarizer {
    async fn summarize(&self, _image: &ImageInput) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.summary.clone())
    }
}

pub struct FailingSummarizer;

#[async_trait]
impl ImageSummarizer for FailingSummarizer {
    async fn summarize(&self, _image: &ImageInput) -> Result<String, UpstreamError> {
        Err(UpstreamError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "model overloaded".to_string(),
        })
    }
}

/// Never completes.
pub struct StalledSummarizer;

#[async_trait]
impl ImageSummarizer for StalledSummarizer {
    async fn summarize(&self, _image: &ImageInput) -> Result<String, UpstreamError> {
        std::future::pending().await
    }
}

pub fn sample_image() -> ImageInput {
    ImageInput::new(vec![0x89, b'P', b'N', b'G'], "image/png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_does_not_change_vectors() {
        let embedder = BagOfWordsEmbedder::new();
        let a = "Quarterly revenue grew in every region".to_string();
        let b = "The chart shows a downward trend".to_string();

        let pair = embedder.embed(&[a.clone(), b]).await.unwrap();
        let single = embedder.embed(&[a]).await.unwrap();
        assert_eq!(pair[0], single[0]);
        assert_eq!(pair[0].len(), embedder.dimension());
    }

    #[tokio::test]
    async fn test_bag_of_words_rejects_blank() {
        let embedder = BagOfWordsEmbedder::new();
        let result = embedder
            .embed(&["fine".to_string(), " ".to_string()])
            .await;
        assert!(matches!(result, Err(EmbeddingError::EmptyInput { index: 1 })));
    }

    #[tokio::test]
    async fn test_counting_embedder_records_batches() {
        let embedder = CountingEmbedder::new(BagOfWordsEmbedder::new());
        embedder.embed(&["one".to_string()]).await.unwrap();
        embedder
            .embed(&["two".to_string(), "three".to_string()])
            .await
            .unwrap();
        assert_eq!(embedder.calls(), 2);
        assert_eq!(embedder.batches()[1].len(), 2);
    }
}
