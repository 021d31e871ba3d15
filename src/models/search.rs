//! Query-side models: retrieval results and answers.

use serde::{Deserialize, Serialize};

use super::chunk::Chunk;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// One retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    /// Insertion position in the index
    pub position: usize,
}

/// Top-K retrieval result, sorted by descending score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub hits: Vec<ScoredChunk>,
}

impl QueryResult {
    pub fn new(hits: Vec<ScoredChunk>) -> Self {
        Self { hits }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredChunk> {
        self.hits.iter()
    }

    pub fn top(&self) -> Option<&ScoredChunk> {
        self.hits.first()
    }

    /// Chunk texts in rank order.
    pub fn texts(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.chunk.text.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a ScoredChunk;
    type IntoIter = std::slice::Iter<'a, ScoredChunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

/// Retrieval result plus query metadata, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub query: String,
    pub results: QueryResult,
    pub duration_ms: u64,
}

/// Outcome of one successful ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_chunks: usize,
    pub image_indexed: bool,
    /// Texts skipped because they were blank
    pub skipped: usize,
    pub dimension: Option<usize>,
    pub duration_ms: u64,
}

impl IngestReport {
    pub fn total_chunks(&self) -> usize {
        self.document_chunks + usize::from(self.image_indexed)
    }
}

/// Generated answer with the context it was conditioned on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerReport {
    pub question: String,
    pub answer: String,
    pub context: QueryResult,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextSpan;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_query_result_accessors() {
        let hit = |text: &str, score: f32, position: usize| ScoredChunk {
            chunk: Chunk::document(
                text.to_string(),
                position as u32,
                TextSpan { start: 0, end: 1 },
                None,
            ),
            score,
            position,
        };
        let result = QueryResult::new(vec![hit("first", 0.9, 1), hit("second", 0.4, 0)]);

        assert_eq!(result.len(), 2);
        assert_eq!(result.texts(), vec!["first", "second"]);
        assert_eq!(result.top().map(|h| h.position), Some(1));
        assert!(QueryResult::default().is_empty());
    }
}
