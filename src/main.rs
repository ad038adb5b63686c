use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use geometric_control::api::{ErrorPayload, Response};
use geometric_control::{ControlError, ControlResult, Engine, EngineConfig};
use tracing::Level;

#[derive(Parser)]
#[command(name = "geocontrol")]
#[command(about = "Geometric control engine - V*, disturbance decoupling, relative degree and simulation", long_about = None)]
struct Cli {
    /// Path to a JSON engine configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one JSON request and print the JSON response
    Run {
        /// Request file (reads stdin when omitted)
        request: Option<PathBuf>,
    },
    /// Print the default configuration
    Defaults,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .init();

    let response = match cli.command {
        Commands::Defaults => match EngineConfig::default().to_json_pretty() {
            Ok(json) => {
                println!("{json}");
                return ExitCode::SUCCESS;
            }
            Err(e) => error_response(e),
        },
        Commands::Run { request } => cmd_run(cli.config.as_deref(), request.as_deref())
            .unwrap_or_else(error_response),
    };

    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("failed to encode response: {e}");
            return ExitCode::FAILURE;
        }
    }
    if response.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn error_response(e: ControlError) -> Response {
    Response::Error {
        error: ErrorPayload::from(e),
    }
}

fn read_to_string(path: Option<&Path>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn load_config(path: Option<&Path>) -> ControlResult<EngineConfig> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(|e| {
                ControlError::Config(format!("cannot read {}: {e}", path.display()))
            })?;
            EngineConfig::from_json(&json)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn cmd_run(config: Option<&Path>, request: Option<&Path>) -> ControlResult<Response> {
    let engine = Engine::new(load_config(config)?)?;
    let json = read_to_string(request)
        .map_err(|e| ControlError::InvalidInput(format!("cannot read request: {e}")))?;
    Ok(engine.handle_json(&json))
}
