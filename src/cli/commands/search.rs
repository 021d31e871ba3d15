use anyhow::{Context, Result};
use clap::Args;

use super::{SessionArgs, gemini_client, open_session, resolve_k};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, short = 'k', help = "Number of chunks to return")]
    pub k: Option<u32>,
}

pub async fn handle_search(args: SearchArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);
    let k = resolve_k(args.k, &config)?;

    let gemini = if args.session.image.is_some() {
        gemini_client(&config)?
    } else {
        None
    };
    let session = open_session(
        &args.session,
        &config,
        gemini.as_ref(),
        formatter.as_ref(),
        verbose,
    )
    .await?;

    let report = session.search(query, k).await.context("search failed")?;

    if verbose {
        eprintln!("Query: \"{query}\" (k = {k})");
        eprintln!("  Search: {}ms", report.duration_ms);
        eprintln!();
    }

    print!("{}", formatter.format_search(&report));
    Ok(())
}
