pub mod chunker;
pub mod embedding;
pub mod retriever;
pub mod vector_index;

#[cfg(test)]
pub(crate) mod testing;

pub use chunker::{TextChunker, count_words};
pub use embedding::{Embedder, OnnxEmbedder};
pub use retriever::{ReadyIndex, Retriever, RetrieverState};
pub use vector_index::VectorIndex;
