//! One user's conversation over one document/image pair.

use std::time::Instant;

use uuid::Uuid;

use crate::client::{AnswerRequest, AnswerSynthesizer};
use crate::error::{RetrieverError, SessionError};
use crate::models::{AnswerReport, ImageInput, IngestReport, SearchReport};
use crate::services::Retriever;
use crate::utils::calculate_checksum;

/// Owns exactly one [`Retriever`]; nothing is shared between sessions.
pub struct Session {
    retriever: Retriever,
    document_id: Option<Uuid>,
}

impl Session {
    pub fn new(retriever: Retriever) -> Self {
        Self {
            retriever,
            document_id: None,
        }
    }

    /// Content-derived id of the ingested document/image pair.
    pub fn document_id(&self) -> Option<Uuid> {
        self.document_id
    }

    pub async fn ingest(
        &mut self,
        document: &str,
        image: Option<ImageInput>,
    ) -> Result<IngestReport, RetrieverError> {
        self.document_id = None;
        let id = content_id(document, image.as_ref());
        let report = self.retriever.ingest(document, image).await?;
        self.document_id = Some(id);
        tracing::debug!(document_id = %id, "session ready");
        Ok(report)
    }

    pub async fn search(&self, question: &str, k: usize) -> Result<SearchReport, RetrieverError> {
        let started = Instant::now();
        let results = self.retriever.query(question, k).await?;
        Ok(SearchReport {
            query: question.to_string(),
            results,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Retrieve context for `question` and ask `synthesizer` to answer it.
    ///
    /// The original image of the session travels with the request.
    pub async fn ask(
        &self,
        question: &str,
        k: usize,
        synthesizer: &dyn AnswerSynthesizer,
    ) -> Result<AnswerReport, SessionError> {
        let started = Instant::now();
        let context = self.retriever.query(question, k).await?;

        let answer = synthesizer
            .answer(AnswerRequest {
                question,
                context: &context,
                image: self.retriever.image(),
            })
            .await
            .map_err(SessionError::Answer)?;

        Ok(AnswerReport {
            question: question.to_string(),
            answer: answer.trim().to_string(),
            context,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

fn content_id(document: &str, image: Option<&ImageInput>) -> Uuid {
    let mut key = calculate_checksum(document.as_bytes());
    if let Some(image) = image {
        key.push(':');
        key.push_str(&calculate_checksum(&image.bytes));
    }
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}
