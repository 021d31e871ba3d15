use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use mmrag::cli::commands::{handle_ask, handle_chat, handle_config, handle_search, handle_status};
use mmrag::cli::{Cli, Commands};
use mmrag::models::{Config, OutputFormat};
use mmrag::utils::{ORT_DYLIB_ENV, locate_onnx_runtime};

/// Point `ort` at the ONNX Runtime library before any session is created.
fn configure_onnx_runtime(config: &Config) {
    let Some(path) = locate_onnx_runtime(config.embedding.ort_library.as_deref()) else {
        return;
    };
    if std::env::var_os(ORT_DYLIB_ENV).is_some_and(|current| Path::new(&current) == path) {
        return;
    }
    // SAFETY: called from `main` before the tokio runtime starts its worker threads.
    unsafe {
        std::env::set_var(ORT_DYLIB_ENV, &path);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "mmrag=debug" } else { "mmrag=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load().unwrap_or_default();
    configure_onnx_runtime(&config);

    let format = cli.format.unwrap_or(config.output.default_format);
    let verbose = cli.verbose;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        tokio::select! {
            result = run_command(cli.command, format, verbose) => result,
            _ = shutdown_signal() => {
                eprintln!("\nReceived shutdown signal, cleaning up...");
                tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                Ok(())
            }
        }
    })
}

async fn run_command(command: Commands, format: OutputFormat, verbose: bool) -> Result<()> {
    match command {
        Commands::Search(args) => handle_search(args, format, verbose).await,
        Commands::Ask(args) => handle_ask(args, format, verbose).await,
        Commands::Chat(args) => handle_chat(args, format, verbose).await,
        Commands::Status => handle_status(format, verbose).await,
        Commands::Config(cmd) => handle_config(cmd, format, verbose).await,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
