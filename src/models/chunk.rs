//! Retrieval units: chunks of document text and image summaries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a chunk's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkOrigin {
    Document,
    Image,
}

impl fmt::Display for ChunkOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkOrigin::Document => write!(f, "document"),
            ChunkOrigin::Image => write!(f, "image"),
        }
    }
}

/// Stable identity of a chunk within one session.
///
/// Ordinals are scoped per origin, so `Document { ordinal: 0 }` and
/// `Image { ordinal: 0 }` never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "lowercase")]
pub enum ChunkKey {
    Document { ordinal: u32 },
    Image { ordinal: u32 },
}

impl ChunkKey {
    pub fn origin(&self) -> ChunkOrigin {
        match self {
            ChunkKey::Document { .. } => ChunkOrigin::Document,
            ChunkKey::Image { .. } => ChunkOrigin::Image,
        }
    }

    pub fn ordinal(&self) -> u32 {
        match self {
            ChunkKey::Document { ordinal } | ChunkKey::Image { ordinal } => *ordinal,
        }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.origin(), self.ordinal())
    }
}

/// Byte range of a chunk within its source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

/// A bounded span of document text, or one image-derived summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub key: ChunkKey,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub span: Option<TextSpan>,
    /// 1-based page the chunk starts on, when the text carries page breaks
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub page: Option<u32>,
}

impl Chunk {
    pub fn document(text: String, ordinal: u32, span: TextSpan, page: Option<u32>) -> Self {
        Self {
            text,
            key: ChunkKey::Document { ordinal },
            span: Some(span),
            page,
        }
    }

    pub fn image_summary(text: String) -> Self {
        Self {
            text,
            key: ChunkKey::Image { ordinal: 0 },
            span: None,
            page: None,
        }
    }

    pub fn origin(&self) -> ChunkOrigin {
        self.key.origin()
    }

    pub fn source_ordinal(&self) -> u32 {
        self.key.ordinal()
    }

    /// Human-readable location hint for output.
    pub fn location(&self) -> String {
        match (self.key, self.page) {
            (ChunkKey::Document { ordinal }, Some(page)) => {
                format!("document chunk {} (page {})", ordinal, page)
            }
            (ChunkKey::Document { ordinal }, None) => format!("document chunk {}", ordinal),
            (ChunkKey::Image { .. }, _) => "image summary".to_string(),
        }
    }
}

/// A chunk paired with its embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self { chunk, vector }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}
