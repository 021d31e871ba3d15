//! Ingest and query orchestration over one document/image pair.
//!
//! A [`Retriever`] moves `Empty → Ingesting → Ready`. Any ingest failure, or
//! dropping the ingest future before it finishes, leaves it `Empty`. Queries
//! never change state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use super::chunker::TextChunker;
use super::embedding::Embedder;
use super::vector_index::VectorIndex;
use crate::client::ImageSummarizer;
use crate::error::{ConfigError, EmbeddingError, RetrieverError, Stage, UpstreamError};
use crate::models::{
    Chunk, EmbeddedChunk, ImageFallback, ImageInput, IngestReport, QueryResult, RetrievalConfig,
};
use crate::utils::text::is_blank;

/// Everything a ready retriever holds.
#[derive(Debug)]
pub struct ReadyIndex {
    index: VectorIndex,
    image: Option<ImageInput>,
    report: IngestReport,
}

impl ReadyIndex {
    pub fn image(&self) -> Option<&ImageInput> {
        self.image.as_ref()
    }
}

#[derive(Debug, Default)]
pub enum RetrieverState {
    #[default]
    Empty,
    Ingesting,
    Ready(ReadyIndex),
}

impl RetrieverState {
    pub fn name(&self) -> &'static str {
        match self {
            RetrieverState::Empty => "empty",
            RetrieverState::Ingesting => "ingesting",
            RetrieverState::Ready(_) => "ready",
        }
    }
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    summarizer: Option<Arc<dyn ImageSummarizer>>,
    config: RetrievalConfig,
    state: RetrieverState,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Self {
        Self {
            embedder,
            summarizer: None,
            config,
            state: RetrieverState::Empty,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn ImageSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn state(&self) -> &RetrieverState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RetrieverState::Ready(_))
    }

    /// The original image of the ready session, if one was supplied.
    pub fn image(&self) -> Option<&ImageInput> {
        match &self.state {
            RetrieverState::Ready(ready) => ready.image(),
            _ => None,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Build a fresh index from `document` and an optional image.
    ///
    /// The previous index is discarded as soon as ingest starts. Exactly one
    /// embedding call is issued, or none when there is nothing to index.
    pub async fn ingest(
        &mut self,
        document: &str,
        image: Option<ImageInput>,
    ) -> Result<IngestReport, RetrieverError> {
        self.config.validate()?;
        let chunker = TextChunker::from_config(&self.config)?;

        let guard = IngestGuard::enter(&mut self.state);
        let ready = build_index(
            self.embedder.as_ref(),
            self.summarizer.as_deref(),
            &self.config,
            &chunker,
            document,
            image,
        )
        .await?;

        let report = ready.report.clone();
        guard.complete(ready);

        tracing::info!(
            document_chunks = report.document_chunks,
            image_indexed = report.image_indexed,
            duration_ms = report.duration_ms,
            "ingest complete"
        );
        Ok(report)
    }

    /// Return the `k` chunks most similar to `question`.
    pub async fn query(&self, question: &str, k: usize) -> Result<QueryResult, RetrieverError> {
        let ready = match &self.state {
            RetrieverState::Ready(ready) => ready,
            _ => return Err(RetrieverError::NotReady),
        };
        if k == 0 {
            return Err(ConfigError::ValidationError("k must be at least 1".to_string()).into());
        }

        let texts = vec![question.to_string()];
        let mut vectors =
            embed_bounded(self.embedder.as_ref(), &texts, self.config.embed_timeout()).await?;
        let query = vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            got: 0,
        })?;

        let result = ready.index.search(&query, k)?;
        tracing::debug!(k, hits = result.len(), "query complete");
        Ok(result)
    }
}

/// Holds the state at `Ingesting`; resets it to `Empty` unless completed.
struct IngestGuard<'a> {
    state: &'a mut RetrieverState,
    completed: bool,
}

impl<'a> IngestGuard<'a> {
    fn enter(state: &'a mut RetrieverState) -> Self {
        *state = RetrieverState::Ingesting;
        Self {
            state,
            completed: false,
        }
    }

    fn complete(mut self, ready: ReadyIndex) {
        *self.state = RetrieverState::Ready(ready);
        self.completed = true;
    }
}

impl Drop for IngestGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::debug!("ingest did not complete, resetting retriever");
            *self.state = RetrieverState::Empty;
        }
    }
}

async fn build_index(
    embedder: &dyn Embedder,
    summarizer: Option<&dyn ImageSummarizer>,
    config: &RetrievalConfig,
    chunker: &TextChunker,
    document: &str,
    image: Option<ImageInput>,
) -> Result<ReadyIndex, RetrieverError> {
    let started = Instant::now();

    let mut chunks = chunker.chunk(document);
    let document_chunks = chunks.len();
    tracing::debug!(document_chunks, "document chunked");

    let summary = match &image {
        Some(image) => summarize_image(summarizer, image, config).await?,
        None => None,
    };
    let image_indexed = summary.is_some();
    if let Some(summary) = summary {
        chunks.push(Chunk::image_summary(summary));
    }

    let before = chunks.len();
    chunks.retain(|c| !is_blank(&c.text));
    let skipped = before - chunks.len();
    if skipped > 0 {
        tracing::debug!(skipped, "dropped blank chunks");
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = if texts.is_empty() {
        Vec::new()
    } else {
        embed_bounded(embedder, &texts, config.embed_timeout()).await?
    };

    let entries: Vec<EmbeddedChunk> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| EmbeddedChunk::new(chunk, vector))
        .collect();

    let mut index = VectorIndex::new(config.metric);
    index.build(entries)?;

    let report = IngestReport {
        document_chunks,
        image_indexed,
        skipped,
        dimension: index.dimension(),
        duration_ms: started.elapsed().as_millis() as u64,
    };

    Ok(ReadyIndex {
        index,
        image,
        report,
    })
}

/// Summarize `image`, applying the configured fallback policy on failure.
async fn summarize_image(
    summarizer: Option<&dyn ImageSummarizer>,
    image: &ImageInput,
    config: &RetrievalConfig,
) -> Result<Option<String>, RetrieverError> {
    let error = match summarizer {
        None => RetrieverError::Upstream(UpstreamError::Unavailable(
            "no image summarizer configured".to_string(),
        )),
        Some(summarizer) => {
            let bound = config.summarize_timeout();
            match timeout(bound, summarizer.summarize(image)).await {
                Ok(Ok(summary)) if !is_blank(&summary) => {
                    tracing::debug!(chars = summary.len(), "image summarized");
                    return Ok(Some(summary.trim().to_string()));
                }
                Ok(Ok(_)) => RetrieverError::Upstream(UpstreamError::InvalidResponse(
                    "image summary is empty".to_string(),
                )),
                Ok(Err(e)) => e.into(),
                Err(_) => RetrieverError::Timeout {
                    stage: Stage::Summarize,
                    after: bound,
                },
            }
        }
    };

    match config.image_fallback {
        ImageFallback::Abort => Err(error),
        ImageFallback::DocumentOnly => {
            tracing::warn!(%error, "image skipped, indexing document text only");
            Ok(None)
        }
    }
}

async fn embed_bounded(
    embedder: &dyn Embedder,
    texts: &[String],
    bound: Duration,
) -> Result<Vec<Vec<f32>>, RetrieverError> {
    let vectors = timeout(bound, embedder.embed(texts))
        .await
        .map_err(|_| RetrieverError::Timeout {
            stage: Stage::Embed,
            after: bound,
        })??;

    if vectors.len() != texts.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: texts.len(),
            got: vectors.len(),
        }
        .into());
    }
    Ok(vectors)
}
