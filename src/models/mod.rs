mod chunk;
mod config;
mod image;
mod search;

pub use chunk::{Chunk, ChunkKey, ChunkOrigin, EmbeddedChunk, TextSpan};
pub use config::{
    API_KEY_ENV_VARS, Config, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL, EmbeddingConfig, GeminiConfig, ImageFallback,
    OutputConfig, Pooling, RetrievalConfig, SimilarityMetric,
};
pub use image::ImageInput;
pub use search::{AnswerReport, IngestReport, OutputFormat, QueryResult, ScoredChunk, SearchReport};
