use std::path::Path;

use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::OnnxEmbedder;
use crate::utils::locate_onnx_runtime;

/// Rough words-to-tokens ratio of English text for WordPiece tokenizers.
const TOKENS_PER_WORD: f32 = 1.3;

pub async fn handle_status(format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let config_path = Config::config_path();
    let model_dir = config.embedding_model_dir();
    let model_files_present = model_dir
        .as_deref()
        .is_some_and(OnnxEmbedder::model_files_present);
    let ort_library = locate_onnx_runtime(config.embedding.ort_library.as_deref())
        .map(|p| p.display().to_string());

    let estimated_tokens = config.retrieval.chunk_size as f32 * TOKENS_PER_WORD;
    let status = StatusInfo {
        config_exists: config_path.as_deref().is_some_and(Path::exists),
        config_path: config_path.map(|p| p.display().to_string()),
        embedding_model: config.embedding.model_id.clone(),
        model_dir: model_dir.map(|p| p.display().to_string()),
        model_files_present,
        ort_library,
        gemini_model: config.gemini.model.clone(),
        api_key_configured: config.api_key().is_some(),
        chunk_size: config.retrieval.chunk_size,
        chunk_overlap: config.retrieval.chunk_overlap,
        max_tokens: config.embedding.max_tokens,
        chunk_exceeds_window: estimated_tokens > config.embedding.max_tokens as f32,
    };

    print!("{}", formatter.format_status(&status));

    let mut hints = Vec::new();
    if !status.model_files_present {
        hints.push(
            "Hint: embedding model missing. Place model.onnx and tokenizer.json in the model dir."
                .to_string(),
        );
    }
    if status.ort_library.is_none() {
        hints.push(
            "Hint: ONNX Runtime library not found. Install onnxruntime, set ORT_DYLIB_PATH or embedding.ort_library."
                .to_string(),
        );
    }
    if !status.api_key_configured {
        hints.push("Hint: set GOOGLE_API_KEY to enable image summaries and answers.".to_string());
    }
    if status.chunk_exceeds_window {
        hints.push(format!(
            "Warning: chunks of {} words (~{} tokens) exceed the {}-token model window and will be truncated; lower retrieval.chunk_size for full coverage.",
            status.chunk_size, estimated_tokens as u32, status.max_tokens
        ));
    }

    if !hints.is_empty() {
        eprintln!();
        for hint in hints {
            eprintln!("{hint}");
        }
    }

    Ok(())
}
