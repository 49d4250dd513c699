mod cli;
mod commands;
mod config;
mod logging;

use clap::Parser;
use std::process::ExitCode;
use tracing::error;

use cli::Cli;
use config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config {}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    config.logging.init();

    match commands::run(&cli, &config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "command failed");
            if cli.json {
                println!("{}", serde_json::json!({ "status": "error", "message": format!("{:#}", e) }));
            } else {
                eprintln!("error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}
