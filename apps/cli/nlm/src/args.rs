//! Command line definition.

use clap::{Parser, Subcommand};

/// Command line client for the notebook batch-RPC service.
#[derive(Debug, Parser)]
#[command(name = "nlm", version)]
#[command(about = "Command line client for the notebook batch-RPC service", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List recently viewed notebooks.
    List,

    /// Execute one RPC and print its raw payload.
    Raw {
        /// RPC identifier, e.g. wXbhsf
        rpc_id: String,

        /// Positional arguments as a JSON array
        args_json: String,

        /// Notebook id sent as the request's source path
        #[arg(long, value_name = "KEY")]
        scope: Option<String>,
    },
}
