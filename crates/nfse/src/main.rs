// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! NFSe batch issuer.
//!
//! Binary entry point: builds, signs and submits RPS batches to the
//! municipal ABRASF web service and follows them until the invoices exist.

mod check;
mod logging;
mod process;
mod query;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nfse_config::NfseConfig;
use nfse_core::Protocol;
use tracing::error;

/// Batch issuer for ABRASF municipal service invoices.
#[derive(Parser, Debug)]
#[command(name = "nfse", version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of the standard search path.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the issuance workflow once and print the result as JSON.
    Process,
    /// Query the processing status of a submitted batch.
    Status {
        /// Protocol returned when the batch was submitted.
        protocol: String,
    },
    /// Fetch the invoices generated for a processed batch.
    Results {
        protocol: String,
    },
    /// Check configuration and signing credentials without sending anything.
    Check {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => nfse_config::load_and_validate_path(path),
        None => nfse_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            nfse_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_tracing(&config.logging) {
        eprintln!("nfse: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli.command, &config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("nfse: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs a subcommand; `Ok(false)` means it ran but did not succeed.
async fn run(command: Commands, config: &NfseConfig) -> Result<bool, nfse_core::NfseError> {
    match command {
        Commands::Process => {
            let shutdown = nfse_workflow::install_signal_handler();
            let result = process::run_process(config, shutdown).await?;
            println!("{}", result.to_json_pretty().map_err(internal)?);
            Ok(result.success)
        }
        Commands::Status { protocol } => {
            let service = nfse_abaco::service_from_config(config)?;
            let (json, ok) = query::query_status(service.as_ref(), &Protocol(protocol)).await;
            print_json(&json)?;
            Ok(ok)
        }
        Commands::Results { protocol } => {
            let service = nfse_abaco::service_from_config(config)?;
            let (json, ok) = query::query_results(service, &Protocol(protocol)).await;
            print_json(&json)?;
            Ok(ok)
        }
        Commands::Check { plain } => Ok(check::run_check(config, plain).await),
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), nfse_core::NfseError> {
    let text = serde_json::to_string_pretty(value).map_err(internal)?;
    println!("{text}");
    Ok(())
}

fn internal(err: serde_json::Error) -> nfse_core::NfseError {
    nfse_core::NfseError::Internal(format!("JSON serialization failed: {err}"))
}
