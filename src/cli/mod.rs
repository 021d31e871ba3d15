//! CLI module for the multimodal question-answering tool.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Ask questions about a document and an image, answered from local retrieval.
#[derive(Debug, Parser)]
#[command(name = "mmrag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Retrieve the chunks most relevant to a query
    Search(commands::SearchArgs),

    /// Answer one question about a document and image
    Ask(commands::AskArgs),

    /// Answer questions read from stdin against one indexed session
    Chat(commands::ChatArgs),

    /// Check model files, runtime library and API key
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
