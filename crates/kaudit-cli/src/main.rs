//! kaudit CLI - inspect and exercise the request-auditing pipeline.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kaudit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => commands::simulate::run(&args),
        Commands::Validate(args) => commands::validate::run(&args),
        Commands::Schema(args) => commands::schema::run(&args),
        Commands::Version => {
            println!("kaudit {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
