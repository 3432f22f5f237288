//! # pitch-reconcile
//!
//! On-demand reconciliation pass: re-fetches statistics for every
//! provisioned player and writes to the ledger only where a material change
//! is detected. Identical semantics to the recurring pass scheduled by
//! `server_sync`; only the trigger differs. Must not run concurrently with
//! the daemon against the same registry.

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

    match context.run_reconcile().await {
        Ok(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            println!(
                "{} {} updated, {} unchanged, {} skipped, {} failed",
                "[reconcile]".green().bold(),
                summary.updated,
                summary.unchanged,
                summary.skipped,
                summary.failed
            );
        }
        Err(e) => {
            eprintln!("{} {}", "[reconcile]".red().bold(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
