use clap::Parser;

use crate::cli::styles;

//-------------------------------------------------------------------------------------------------
// Types
//-------------------------------------------------------------------------------------------------

/// Anvyl service daemon - runs one of the three long-lived services
#[derive(Debug, Parser)]
#[command(name = "anvyld", author, about, version, styles=styles::styles())]
pub struct AnvyldArgs {
    /// The service to run
    #[command(subcommand)]
    pub subcommand: AnvyldSubcommand,
}

/// The service to run in the foreground of this process
#[derive(Debug, Parser)]
pub enum AnvyldSubcommand {
    /// Run the infrastructure service
    Infra,

    /// Run the MCP server
    Mcp {
        /// Serve over stdio instead of HTTP
        #[arg(long)]
        stdio: bool,
    },

    /// Run the agent service
    Agent,
}
