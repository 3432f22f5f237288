//! # pitch-provision
//!
//! One-shot provisioning pass: discovers players for the configured scope
//! and allocates a ledger record for every player not yet in the registry.
//! Safe to re-run at any time; already-provisioned players are skipped.
//! Must not run concurrently with `server_sync` against the same registry.

use clap::Parser;
use colored::*;

use lib_pipeline::configs::config_pipeline::{layer_config, Config};
use lib_pipeline::sync::runner::PipelineContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = layer_config(Config::parse())?.resolve()?;
    let context = PipelineContext::initialize(config)?;

    match context.run_provision().await {
        Ok(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            println!(
                "{} {} provisioned, {} skipped, {} failed",
                "[provision]".green().bold(),
                summary.succeeded,
                summary.skipped,
                summary.failed
            );
        }
        Err(e) => {
            eprintln!("{} {}", "[provision]".red().bold(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
