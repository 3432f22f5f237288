//! # server_sync
//!
//! Long-running synchronization daemon: runs one provisioning pass at
//! startup to pick up newly discovered players, then keeps every
//! provisioned ledger record current with a cron-scheduled reconciliation
//! pass. Both passes share one registry and are serialized behind the
//! pipeline's single writer guard.

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio_cron_scheduler::{Job, JobScheduler};

use lib_pipeline::configs::config_pipeline::load_config;
use lib_pipeline::sync::runner::PipelineContext;

mod sync_logic;
use sync_logic::logger;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env files before anything else
    dotenvy::dotenv().ok();

    let config = load_config()?.resolve()?;
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    log::info!("server_sync starting for {}", config.scope);
    let reconcile_cron = config.reconcile_cron.clone();
    let context = Arc::new(PipelineContext::initialize(config)?);

    // Provisioning pass at startup: registers players discovered since the
    // last run. Safe to repeat; already-provisioned players are skipped.
    match context.run_provision().await {
        Ok(summary) => log::info!("{}", summary.headline()),
        Err(e) => {
            // Store failures are fatal: without durable state there is no
            // safe way to keep running.
            log::error!("Provisioning pass aborted: {}", e);
            return Err(e.into());
        }
    }

    // Recurring reconciliation on the configured cadence.
    let mut scheduler = JobScheduler::new().await?;
    let job_context = Arc::clone(&context);
    let job = Job::new_async(reconcile_cron.as_str(), move |_uuid, _lock| {
        let context = Arc::clone(&job_context);
        Box::pin(async move {
            match context.try_run_reconcile().await {
                Some(Ok(summary)) => log::info!("{}", summary.headline()),
                Some(Err(e)) => log::error!("Reconciliation pass aborted: {}", e),
                // A previous pass still holds the writer guard; skipped.
                None => {}
            }
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;
    log::info!("Reconciliation scheduled with cron '{}'", reconcile_cron);

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut term_signal = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();
                term_signal.recv().await;
                log::info!("SIGTERM received, initiating shutdown.");
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    scheduler.shutdown().await?;
    log::info!("Shutdown complete.");
    Ok(())
}
