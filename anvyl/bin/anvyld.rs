use anvyl::{
    agent,
    cli::{AnvyldArgs, AnvyldSubcommand},
    config::AnvylConfig,
    infra, mcp, AnvylResult,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

//--------------------------------------------------------------------------------------------------
// Functions: main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> AnvylResult<()> {
    let args = AnvyldArgs::parse();
    let config = AnvylConfig::from_env();

    let filter = EnvFilter::try_new(config.get_log_level())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.subcommand {
        AnvyldSubcommand::Infra => infra::serve(config).await,
        AnvyldSubcommand::Mcp { stdio } => {
            if stdio {
                mcp::serve_stdio(config).await
            } else {
                mcp::serve(config).await
            }
        }
        AnvyldSubcommand::Agent => agent::serve(config).await,
    }
}
