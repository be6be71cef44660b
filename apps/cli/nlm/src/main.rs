use nlm::args::{Cli, Command};
use nlm::commands;
use nlm::commands::raw::describe_failure;
use nlm::error::NlmError;
use nlm::logger::initialize as LoggerInitialize;

use rpc_core::config::{ClientConfig, default_config_dir};
use rpc_core::notebook::NotebookClient;
use rpc_core::session::{EnvCredentials, PageTokenProvider, Session};
use rpc_core::{BatchClient, CoreError};

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

const APP_DIR_NAME: &str = "nlm";

#[tokio::main]
async fn main() -> ExitCode {
    let log_dir = log_dir();
    if let Err(e) = LoggerInitialize(&log_dir) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }
    info!("nlm starting, log directory: {}", log_dir.display());

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let NlmError::Core(CoreError::Rpc(rpc)) = &e {
                error!("Call failed: {}", describe_failure(rpc));
            }
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<String, NlmError> {
    let config_dir = default_config_dir().map_err(CoreError::from)?;
    let config = ClientConfig::load(&config_dir).map_err(CoreError::from)?;
    let credentials = EnvCredentials::load().map_err(CoreError::from)?;
    let provider = PageTokenProvider::from_config(&config)?;
    let session = Arc::new(Session::new(credentials, Arc::new(provider)));
    let client = BatchClient::new(&config, session)?;

    match command {
        Command::List => commands::list::run(&NotebookClient::new(client)).await,
        Command::Raw {
            rpc_id,
            args_json,
            scope,
        } => commands::raw::run(&client, &rpc_id, &args_json, scope.as_deref()).await,
    }
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
        .join("logs")
}
