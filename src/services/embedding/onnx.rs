use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ndarray::{ArrayViewD, Ix2, Ix3};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::{Encoding, Tokenizer};
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};

use super::{Embedder, normalize, validate_inputs};
use crate::error::{EmbeddingError, ModelError};
use crate::models::{EmbeddingConfig, Pooling};

/// Sentence embedder backed by a local ONNX model and HuggingFace tokenizer.
pub struct OnnxEmbedder {
    model: Arc<EmbeddingModel>,
    model_id: String,
    batch_size: usize,
}

impl OnnxEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, ModelError> {
        let model = EmbeddingModel::load(config, model_dir)?;
        tracing::debug!(
            model_id = %config.model_id,
            dimension = model.dimension,
            "embedding model loaded"
        );
        Ok(Self {
            model: Arc::new(model),
            model_id: config.model_id.clone(),
            batch_size: config.batch_size.max(1) as usize,
        })
    }

    /// Whether `model_dir` holds the files [`OnnxEmbedder::load`] needs.
    pub fn model_files_present(model_dir: &Path) -> bool {
        model_dir.join("model.onnx").exists() && model_dir.join("tokenizer.json").exists()
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        validate_inputs(texts)?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let batch_size = self.batch_size;

        let (embeddings, truncated) = tokio::task::spawn_blocking(move || {
            let mut all = Vec::with_capacity(texts.len());
            let mut truncated = 0;
            for batch in texts.chunks(batch_size) {
                let (vectors, cut) = model.embed(batch)?;
                all.extend(vectors);
                truncated += cut;
            }
            Ok::<_, ModelError>((all, truncated))
        })
        .await
        .map_err(|e| EmbeddingError::TaskFailed(e.to_string()))??;

        if truncated > 0 {
            tracing::warn!(
                truncated,
                max_tokens = self.model.max_tokens,
                "inputs exceeded the model token window and were truncated"
            );
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.model.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

struct EmbeddingModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
    max_tokens: usize,
    pooling: Pooling,
    wants_token_type_ids: bool,
}

impl EmbeddingModel {
    fn load(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, ModelError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let max_tokens = config.max_tokens as usize;

        if !model_path.exists() {
            return Err(ModelError::NotFound(model_path.display().to_string()));
        }
        if !tokenizer_path.exists() {
            return Err(ModelError::NotFound(tokenizer_path.display().to_string()));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?;

        let wants_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimension: config.dimension as usize,
            max_tokens,
            pooling: config.pooling,
            wants_token_type_ids,
        })
    }

    /// Embed one batch; also returns how many inputs were truncated.
    fn embed(&self, texts: &[String]) -> Result<(Vec<Vec<f32>>, usize), ModelError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        let truncated = encodings
            .iter()
            .filter(|e| !e.get_overflowing().is_empty())
            .count();

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            for (j, (&id, &m)) in ids.iter().zip(mask.iter()).enumerate() {
                input_ids[i * max_len + j] = id as i64;
                attention_mask[i * max_len + j] = m as i64;
            }
        }

        let shape = [batch_size, max_len];
        let input_ids_tensor = Tensor::from_array((shape, input_ids))
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = if self.wants_token_type_ids {
            let token_type_ids_tensor =
                Tensor::from_array((shape, vec![0i64; batch_size * max_len]))
                    .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
        }
        .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let embeddings = self.pool(output_array, &encodings)?;
        Ok((embeddings, truncated))
    }

    /// Reduce model output to one unit vector per input.
    fn pool(
        &self,
        output: ArrayViewD<'_, f32>,
        encodings: &[Encoding],
    ) -> Result<Vec<Vec<f32>>, ModelError> {
        let hidden = output.shape().last().copied().unwrap_or(0);
        if hidden != self.dimension {
            return Err(ModelError::InferenceError(format!(
                "model produced {}-dim vectors, config expects {}",
                hidden, self.dimension
            )));
        }

        match output.ndim() {
            3 => {
                let states = output
                    .into_dimensionality::<Ix3>()
                    .map_err(|e| ModelError::InferenceError(e.to_string()))?;
                Ok(encodings
                    .iter()
                    .enumerate()
                    .map(|(i, encoding)| {
                        let mask = encoding.get_attention_mask();
                        let pooled = match self.pooling {
                            Pooling::Mean => mean_pool(&states, i, mask, hidden),
                            Pooling::LastToken => {
                                let last = mask.iter().filter(|&&m| m == 1).count();
                                let idx = last.saturating_sub(1);
                                (0..hidden).map(|d| states[[i, idx, d]]).collect()
                            }
                        };
                        normalize(&pooled)
                    })
                    .collect())
            }
            2 => {
                let pooled = output
                    .into_dimensionality::<Ix2>()
                    .map_err(|e| ModelError::InferenceError(e.to_string()))?;
                Ok(pooled
                    .outer_iter()
                    .map(|row| normalize(&row.to_vec()))
                    .collect())
            }
            _ => Err(ModelError::InferenceError(format!(
                "unexpected output shape: {:?}",
                output.shape()
            ))),
        }
    }
}

fn mean_pool(
    states: &ndarray::ArrayView3<'_, f32>,
    row: usize,
    mask: &[u32],
    hidden: usize,
) -> Vec<f32> {
    let mut sum = vec![0f32; hidden];
    let mut count = 0f32;
    for (j, &m) in mask.iter().enumerate() {
        if m == 0 {
            continue;
        }
        count += 1.0;
        for (d, acc) in sum.iter_mut().enumerate() {
            *acc += states[[row, j, d]];
        }
    }
    if count > 0.0 {
        sum.iter_mut().for_each(|x| *x /= count);
    }
    sum
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
