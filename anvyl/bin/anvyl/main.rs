#[path = "mod.rs"]
mod internal;

use std::process::ExitCode;

use anvyl::{
    cli::{AnvylArgs, AnvylSubcommand},
    config::AnvylConfig,
    supervisor::ServiceKind,
};
use clap::{CommandFactory, Parser};
use internal::handlers;

//--------------------------------------------------------------------------------------------------
// Functions: main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let args = AnvylArgs::parse();
    args.init_logging();

    let config = AnvylConfig::from_env();

    let result = match args.subcommand {
        Some(AnvylSubcommand::Up) => handlers::up_subcommand(&config).await,
        Some(AnvylSubcommand::Down) => handlers::down_subcommand(&config).await,
        Some(AnvylSubcommand::Restart) => handlers::restart_subcommand(&config).await,
        Some(AnvylSubcommand::Status) => handlers::status_subcommand(&config).await,
        Some(AnvylSubcommand::Infra { subcommand }) => {
            handlers::service_subcommand(&config, ServiceKind::Infra, subcommand).await
        }
        Some(AnvylSubcommand::Mcp { subcommand }) => {
            handlers::service_subcommand(&config, ServiceKind::Mcp, subcommand).await
        }
        Some(AnvylSubcommand::Agent { subcommand }) => {
            handlers::agent_subcommand(&config, subcommand).await
        }
        Some(AnvylSubcommand::Host { subcommand }) => {
            handlers::host_subcommand(&config, subcommand).await
        }
        Some(AnvylSubcommand::Container { subcommand }) => {
            handlers::container_subcommand(&config, subcommand).await
        }
        None => {
            let _ = AnvylArgs::command().print_help();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => handlers::report_error(&error),
    }
}
