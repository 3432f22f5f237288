//! # registry-inspect
//!
//! Prints the persisted registry document in a human-readable form for
//! operational recovery: scope, document timestamps and one line per
//! record, or the full pretty JSON with `--full`.

use std::fs;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use lib_pipeline::registry::model::Registry;

/// CLI arguments for registry-inspect.
#[derive(Parser)]
#[clap(
    name = "registry-inspect",
    version,
    about = "Inspects a persisted registry document.",
    long_about = "Reads a registry document from disk and prints its scope, timestamps and \
                  records. Use --full for the complete pretty-printed JSON."
)]
pub struct Cli {
    /// Path of the registry document.
    #[clap(value_parser)]
    pub path: PathBuf,

    /// Print the complete document as pretty JSON.
    #[clap(long, action = ArgAction::SetTrue)]
    pub full: bool,
}

fn main() {
    let args = Cli::parse();

    match inspect(&args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: Failed to inspect registry.");
            eprintln!("Details: {}", e);
            std::process::exit(1);
        }
    }
}

fn inspect(args: &Cli) -> anyhow::Result<String> {
    let raw = fs::read_to_string(&args.path)?;
    let registry: Registry = serde_json::from_str(&raw)?;

    if args.full {
        return Ok(serde_json::to_string_pretty(&registry)?);
    }

    let mut lines = Vec::new();
    lines.push(format!(
        "registry v{} | {} | created {} | updated {} | {} records",
        registry.version,
        registry.scope,
        registry.created_at.format("%Y-%m-%d %H:%M:%S"),
        registry.last_updated.format("%Y-%m-%d %H:%M:%S"),
        registry.len()
    ));
    for record in registry.records.values() {
        lines.push(format!(
            "  {:>8}  {:<28} {:<6} {}  goals={} apps={} synced {}",
            record.external_id,
            record.display_name,
            record.token_symbol,
            record.ledger_address,
            record.last_snapshot.goals,
            record.last_snapshot.appearances,
            record.last_synced_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    Ok(lines.join("\n"))
}
