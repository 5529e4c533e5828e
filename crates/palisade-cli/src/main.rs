//! Palisade CLI: run files through the upload acceptance gate.
//!
//! Configuration comes from the environment (UPLOAD_FOLDER, ALLOWED_EXTENSIONS,
//! MAX_UPLOAD_SIZE_MB, PIPELINE_TIMEOUT_SECS, ...), optionally via a `.env` file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use palisade_cli::{
    exit_code_for, init_tracing, verdict_exit_code, EXIT_ACCEPTED, EXIT_SETUP_ERROR,
};
use palisade_core::GateConfig;
use palisade_processing::{sanitize_filename, UploadGate, UploadRequest};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "palisade", about = "Upload acceptance gate")]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a file and store it under the upload folder if accepted
    Admit {
        /// Path to the file to admit
        file: PathBuf,
        /// Filename to claim instead of the file's own name
        #[arg(long)]
        name: Option<String>,
    },
    /// Run every content check without storing anything
    Inspect {
        /// Path to the file to inspect
        file: PathBuf,
        /// Filename to claim instead of the file's own name
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the storage name a filename would be sanitized to
    Sanitize {
        /// Untrusted filename
        name: String,
    },
}

#[derive(Serialize)]
struct SanitizeOutput<'a> {
    input: &'a str,
    sanitized: String,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn claimed_name(file: &Path, name: Option<String>) -> String {
    name.unwrap_or_else(|| {
        file.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}

async fn build_gate() -> anyhow::Result<UploadGate> {
    let config = GateConfig::from_env().context("Invalid configuration")?;
    let storage = palisade_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    Ok(UploadGate::with_default_sniffer(config, storage))
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    match cli.command {
        Commands::Admit { file, name } => {
            let gate = build_gate().await?;
            let claimed = claimed_name(&file, name);

            let handle = tokio::fs::File::open(&file)
                .await
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let length = handle
                .metadata()
                .await
                .with_context(|| format!("Failed to stat {}", file.display()))?
                .len();

            let request = UploadRequest::from_reader(claimed, Box::pin(handle), Some(length));
            let verdict = gate.admit(request).await;
            print_json(&verdict)?;
            Ok(verdict_exit_code(&verdict))
        }
        Commands::Inspect { file, name } => {
            let gate = build_gate().await?;
            let claimed = claimed_name(&file, name);

            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            match gate.inspect(&claimed, data).await {
                Ok(report) => {
                    print_json(&serde_json::json!({ "status": "passed", "report": report }))?;
                    Ok(EXIT_ACCEPTED)
                }
                Err(reason) => {
                    print_json(&serde_json::json!({ "status": "rejected", "reason": reason }))?;
                    Ok(exit_code_for(reason))
                }
            }
        }
        Commands::Sanitize { name } => {
            print_json(&SanitizeOutput {
                input: &name,
                sanitized: sanitize_filename(&name),
            })?;
            Ok(EXIT_ACCEPTED)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_SETUP_ERROR)
        }
    }
}
