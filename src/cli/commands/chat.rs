use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{SessionArgs, gemini_client, open_session, resolve_k};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[arg(long, short = 'k', help = "Number of context chunks per question")]
    pub k: Option<u32>,
}

pub async fn handle_chat(args: ChatArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let k = resolve_k(args.k, &config)?;

    let gemini = gemini_client(&config)?.ok_or_else(|| {
        anyhow::anyhow!("chat needs a Gemini API key: set GOOGLE_API_KEY or gemini.api_key")
    })?;
    let session = open_session(
        &args.session,
        &config,
        Some(&gemini),
        formatter.as_ref(),
        verbose,
    )
    .await?;

    let interactive = console::user_attended();
    if interactive {
        eprintln!(
            "{} Ask questions about {}. Type {} or press Ctrl-D to quit.",
            style("Ready.").green().bold(),
            args.session.document.display(),
            style("exit").cyan()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            eprint!("{} ", style(">").cyan().bold());
            std::io::stderr().flush().ok();
        }

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        let pb = super::spinner("Thinking...");
        let result = session.ask(question, k, &gemini).await;
        pb.finish_and_clear();

        match result {
            Ok(report) => print!("{}", formatter.format_answer(&report)),
            Err(e) => eprint!("{}", formatter.format_error(&e.to_string())),
        }
        println!();
    }

    Ok(())
}
