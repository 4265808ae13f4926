use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use finrep_models::ReportContext;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "finrep", about = "Synthesize a structured financial-analysis report")]
struct Cli {
    /// Path to configuration file (defaults to config/finrep.toml when present)
    #[arg(short, long)]
    config: Option<String>,

    /// Read ReportContext JSON from a file instead of stdin
    #[arg(short, long)]
    input: Option<String>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,

    /// Print each stage log to stderr as it completes
    #[arg(long)]
    progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = finrep::load_config(cli.config.as_deref())?;

    let context_json = if let Some(input_path) = &cli.input {
        std::fs::read_to_string(input_path)
            .with_context(|| format!("Failed to read input: {input_path}"))?
    } else {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    };

    let ctx: ReportContext =
        serde_json::from_str(&context_json).context("Failed to parse ReportContext JSON")?;

    let mut pipeline = finrep::build_pipeline(&config);

    let printer = if cli.progress {
        let (tx, mut rx) = mpsc::unbounded_channel();
        pipeline = pipeline.with_progress(tx);
        Some(tokio::spawn(async move {
            while let Some(log) = rx.recv().await {
                if let Ok(line) = serde_json::to_string(&log) {
                    eprintln!("{line}");
                }
            }
        }))
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received interrupt, cancelling remaining stages");
        signal.cancel();
    });

    let result = finrep::generate_report(&pipeline, ctx, cancel).await;

    // Dropping the pipeline closes the progress channel.
    drop(pipeline);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    let output = if cli.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{output}");

    if !result.completed {
        anyhow::bail!(
            "Report not generated: {}",
            result
                .logs
                .first()
                .map(|l| l.message.as_str())
                .unwrap_or("invalid context")
        );
    }

    Ok(())
}
