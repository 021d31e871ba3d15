//! Text embedding abstraction.
//!
//! The retriever only sees the [`Embedder`] trait, so the local ONNX model can
//! be swapped for any deterministic text → vector function.

mod onnx;

pub use onnx::OnnxEmbedder;

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Maps text to fixed-dimension vectors.
///
/// Implementations must return exactly one vector per input, in input order,
/// and must be deterministic for a fixed model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Fails with [`EmbeddingError::EmptyInput`] if any
    /// text is empty after trimming.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Output dimension of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Identifier of the underlying model.
    fn model_id(&self) -> &str;
}

/// Reject blank inputs before any inference happens.
pub fn validate_inputs(texts: &[String]) -> Result<(), EmbeddingError> {
    match texts.iter().position(|t| t.trim().is_empty()) {
        Some(index) => Err(EmbeddingError::EmptyInput { index }),
        None => Ok(()),
    }
}

/// Scale `v` to unit length; zero vectors are returned unchanged.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_inputs() {
        let ok = vec!["a".to_string(), " b ".to_string()];
        assert!(validate_inputs(&ok).is_ok());

        let bad = vec!["a".to_string(), "  \n".to_string()];
        assert!(matches!(
            validate_inputs(&bad),
            Err(EmbeddingError::EmptyInput { index: 1 })
        ));
    }

    #[test]
    fn test_normalize() {
        let v = normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
