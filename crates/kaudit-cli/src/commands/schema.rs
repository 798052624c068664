//! Schema command implementation.

use anyhow::Result;
use clap::Args;

use kaudit_core::AuditLevel;
use kaudit_event::audit_event_schema;

/// Arguments for the schema command.
#[derive(Args)]
pub struct SchemaArgs {
    /// Only list the fields populated at this level
    #[arg(long)]
    pub level: Option<AuditLevel>,
}

/// Runs the schema command.
pub fn run(args: &SchemaArgs) -> Result<()> {
    println!("{}", render(args)?);
    Ok(())
}

fn render(args: &SchemaArgs) -> Result<String> {
    let schema = audit_event_schema();
    let output = match args.level {
        Some(level) => serde_json::to_string_pretty(&schema.fields_at(level))?,
        None => serde_json::to_string_pretty(&schema)?,
    };
    Ok(output)
}
