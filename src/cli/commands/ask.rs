use anyhow::{Context, Result};
use clap::Args;

use super::{SessionArgs, gemini_client, open_session, resolve_k};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct AskArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[arg(required = true, help = "Question to answer from the document and image")]
    pub question: String,

    #[arg(long, short = 'k', help = "Number of context chunks")]
    pub k: Option<u32>,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);
    let k = resolve_k(args.k, &config)?;

    let gemini = gemini_client(&config)?.ok_or_else(|| {
        anyhow::anyhow!("answering needs a Gemini API key: set GOOGLE_API_KEY or gemini.api_key")
    })?;
    let session = open_session(
        &args.session,
        &config,
        Some(&gemini),
        formatter.as_ref(),
        verbose,
    )
    .await?;

    let pb = super::spinner("Thinking...");
    let result = session.ask(question, k, &gemini).await;
    pb.finish_and_clear();
    let report = result.context("failed to answer question")?;

    if verbose {
        eprintln!("Answered in {}ms", report.duration_ms);
        eprintln!();
    }

    print!("{}", formatter.format_answer(&report));
    Ok(())
}
