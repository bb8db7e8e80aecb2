use std::process::ExitCode;

use clap::Parser;
use marketplace_deploy::cli::Cli;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let Cli { command } = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    match command.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
