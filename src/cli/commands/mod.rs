mod ask;
mod chat;
mod config;
mod search;
mod status;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::output::Formatter;
use crate::client::{GeminiClient, ImageSummarizer, RetryingSummarizer};
use crate::models::{Config, ImageInput};
use crate::services::{OnnxEmbedder, Retriever, count_words};
use crate::session::Session;
use crate::utils::{MAX_INPUT_SIZE, RetryConfig, read_document_text, read_image};

pub use ask::AskArgs;
pub use chat::ChatArgs;
pub use config::ConfigCommand;
pub use search::SearchArgs;

pub use ask::handle_ask;
pub use chat::handle_chat;
pub use config::handle_config;
pub use search::handle_search;
pub use status::handle_status;

/// Inputs shared by every command that opens a session.
#[derive(Debug, Args)]
pub struct SessionArgs {
    #[arg(long, short = 'd', help = "Pre-extracted document text file")]
    pub document: PathBuf,

    #[arg(long, short = 'i', help = "Image to summarize and index (png, jpeg, webp, ...)")]
    pub image: Option<PathBuf>,
}

struct SessionInputs {
    document: String,
    image: Option<ImageInput>,
}

fn read_inputs(args: &SessionArgs) -> Result<SessionInputs> {
    let document = read_document_text(&args.document, MAX_INPUT_SIZE)
        .with_context(|| format!("failed to read document: {}", args.document.display()))?;
    let image = args
        .image
        .as_deref()
        .map(|path| {
            read_image(path, MAX_INPUT_SIZE)
                .with_context(|| format!("failed to read image: {}", path.display()))
        })
        .transpose()?;
    Ok(SessionInputs { document, image })
}

fn load_embedder(config: &Config) -> Result<OnnxEmbedder> {
    let model_dir = config
        .embedding_model_dir()
        .ok_or_else(|| anyhow::anyhow!("could not determine model directory"))?;

    if !OnnxEmbedder::model_files_present(&model_dir) {
        anyhow::bail!(
            "embedding model not found in {}\nDownload model.onnx and tokenizer.json for {} there, or set embedding.model_path.",
            model_dir.display(),
            config.embedding.model_id
        );
    }

    OnnxEmbedder::load(&config.embedding, &model_dir)
        .with_context(|| format!("failed to load embedding model from {}", model_dir.display()))
}

/// Gemini client from config, or `None` when no API key is available.
fn gemini_client(config: &Config) -> Result<Option<GeminiClient>> {
    match config.api_key() {
        Some(key) => Ok(Some(
            GeminiClient::new(&config.gemini, Some(key)).context("failed to create Gemini client")?,
        )),
        None => Ok(None),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Read inputs, build a retriever and ingest, with a spinner on stderr.
async fn open_session(
    args: &SessionArgs,
    config: &Config,
    gemini: Option<&GeminiClient>,
    formatter: &dyn Formatter,
    verbose: bool,
) -> Result<Session> {
    config.retrieval.validate().context("invalid retrieval configuration")?;
    let inputs = read_inputs(args)?;
    let embedder = load_embedder(config)?;

    let mut retriever = Retriever::new(Arc::new(embedder), config.retrieval.clone());
    match gemini {
        Some(client) => {
            let summarizer: Arc<dyn ImageSummarizer> = Arc::new(RetryingSummarizer::new(
                client.clone(),
                RetryConfig::new(config.gemini.max_retries.max(1)),
            ));
            retriever = retriever.with_summarizer(summarizer);
        }
        None if inputs.image.is_some() => {
            eprintln!(
                "Warning: no Gemini API key found (set GOOGLE_API_KEY); the image cannot be summarized."
            );
        }
        None => {}
    }

    if verbose {
        eprintln!(
            "Document: {} ({} words)",
            args.document.display(),
            count_words(&inputs.document)
        );
        if let Some(ref image) = inputs.image {
            eprintln!("  Image: {} ({} bytes)", image.mime_type, image.len());
        }
        eprintln!(
            "  Chunking: {} words, {} overlap",
            config.retrieval.chunk_size, config.retrieval.chunk_overlap
        );
    }

    let mut session = Session::new(retriever);
    let pb = spinner("Indexing document...");
    let result = session.ingest(&inputs.document, inputs.image).await;
    pb.finish_and_clear();

    let report = result.context("failed to index document")?;
    if verbose {
        eprintln!("{}", formatter.format_ingest(&report));
    }

    Ok(session)
}

fn resolve_k(k: Option<u32>, config: &Config) -> Result<usize> {
    let k = k.unwrap_or(config.retrieval.top_k);
    if k == 0 {
        anyhow::bail!("k must be at least 1");
    }
    Ok(k as usize)
}
