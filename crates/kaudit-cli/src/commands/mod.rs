//! CLI commands and argument parsing.

pub mod schema;
pub mod simulate;
pub mod validate;

use clap::{Parser, Subcommand};

/// kaudit - request auditing for the control plane
#[derive(Parser)]
#[command(name = "kaudit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a synthetic request through the pipeline and print its event
    Simulate(simulate::SimulateArgs),

    /// Validate an audit policy file
    Validate(validate::ValidateArgs),

    /// Print the audit event schema
    Schema(schema::SchemaArgs),

    /// Print version information
    Version,
}
