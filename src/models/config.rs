use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::search::OutputFormat;

pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted for the Gemini API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mmrag").join("config.toml"))
    }

    pub fn models_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("mmrag").join("models"))
    }

    /// Load the config file if present, otherwise defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.retrieval.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory holding `model.onnx` and `tokenizer.json` for the configured model.
    pub fn embedding_model_dir(&self) -> Option<PathBuf> {
        self.embedding.model_path.clone().or_else(|| {
            Self::models_dir().map(|dir| dir.join(model_dir_name(&self.embedding.model_id)))
        })
    }

    /// API key from the config file, falling back to the environment.
    pub fn api_key(&self) -> Option<String> {
        self.gemini
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok())
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

fn model_dir_name(model_id: &str) -> String {
    model_id.replace('/', "--")
}

/// How token states are reduced to one sentence vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pooling {
    /// Average of the token states under the attention mask
    #[default]
    Mean,
    /// State of the last non-padding token
    LastToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default)]
    pub pooling: Pooling,

    /// ONNX Runtime shared library, or a directory containing it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ort_library: Option<PathBuf>,
}

fn default_model_id() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_max_tokens() -> u32 {
    256
}

fn default_batch_size() -> u32 {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            model_path: None,
            dimension: default_dimension(),
            max_tokens: default_max_tokens(),
            batch_size: default_batch_size(),
            pooling: Pooling::default(),
            ort_library: None,
        }
    }
}

/// Similarity used to rank stored vectors against a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Inner product of unit vectors, in [-1, 1]
    #[default]
    Cosine,
    /// `1 / (1 + distance)` between unit vectors, in (0, 1]
    Euclidean,
}

impl std::fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityMetric::Cosine => write!(f, "cosine"),
            SimilarityMetric::Euclidean => write!(f, "euclidean"),
        }
    }
}

/// What ingest does when the image cannot be summarized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFallback {
    /// Fail the whole ingest
    #[default]
    Abort,
    /// Index the document alone
    DocumentOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Window size in words
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Words shared by consecutive windows
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default)]
    pub metric: SimilarityMetric,

    #[serde(default)]
    pub image_fallback: ImageFallback,

    #[serde(default = "default_summarize_timeout")]
    pub summarize_timeout_secs: u64,

    #[serde(default = "default_embed_timeout")]
    pub embed_timeout_secs: u64,
}

fn default_chunk_size() -> u32 {
    500
}

fn default_chunk_overlap() -> u32 {
    50
}

fn default_top_k() -> u32 {
    4
}

fn default_summarize_timeout() -> u64 {
    60
}

fn default_embed_timeout() -> u64 {
    120
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            metric: SimilarityMetric::default(),
            image_fallback: ImageFallback::default(),
            summarize_timeout_secs: default_summarize_timeout(),
            embed_timeout_secs: default_embed_timeout(),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.summarize_timeout_secs == 0 || self.embed_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn summarize_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.summarize_timeout_secs)
    }

    pub fn embed_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.embed_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_url")]
    pub url: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_gemini_url() -> String {
    DEFAULT_GEMINI_URL.to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_gemini_timeout() -> u64 {
    90
}

fn default_max_retries() -> u32 {
    3
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            url: default_gemini_url(),
            model: default_gemini_model(),
            api_key: None,
            timeout_secs: default_gemini_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub default_format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.model_id, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.retrieval.chunk_size, 500);
        assert_eq!(config.retrieval.chunk_overlap, 50);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_retrieval_validate() {
        assert!(RetrievalConfig::default().validate().is_ok());

        let overlap_too_large = RetrievalConfig {
            chunk_size: 10,
            chunk_overlap: 10,
            ..Default::default()
        };
        assert!(matches!(
            overlap_too_large.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let zero_k = RetrievalConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(zero_k.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [retrieval]
            chunk_size = 120
            metric = "euclidean"
            image_fallback = "document_only"

            [embedding]
            pooling = "last_token"
            ort_library = "/opt/onnxruntime/lib"
            "#,
        )
        .unwrap();

        assert_eq!(config.retrieval.chunk_size, 120);
        assert_eq!(config.retrieval.chunk_overlap, 50);
        assert_eq!(config.retrieval.metric, SimilarityMetric::Euclidean);
        assert_eq!(config.retrieval.image_fallback, ImageFallback::DocumentOnly);
        assert_eq!(config.embedding.pooling, Pooling::LastToken);
        assert_eq!(config.embedding.batch_size, 32);
        assert_eq!(
            config.embedding.ort_library.as_deref(),
            Some(std::path::Path::new("/opt/onnxruntime/lib"))
        );
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.retrieval.top_k = 7;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 7);
    }

    #[test]
    fn test_load_rejects_invalid_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retrieval]\nchunk_size = 4\nchunk_overlap = 9\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_model_dir_from_explicit_path() {
        let mut config = Config::default();
        config.embedding.model_path = Some(PathBuf::from("/opt/models/minilm"));
        assert_eq!(
            config.embedding_model_dir(),
            Some(PathBuf::from("/opt/models/minilm"))
        );
        assert_eq!(
            model_dir_name(DEFAULT_EMBEDDING_MODEL),
            "sentence-transformers--all-MiniLM-L6-v2"
        );
    }
}
