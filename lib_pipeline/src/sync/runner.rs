//! Wires the resolved configuration to the concrete collaborators and
//! serializes passes behind a single writer guard.
//!
//! Both the daemon and the one-shot CLI binaries drive the pipeline through
//! this context, so the "one pass at a time against one registry" invariant
//! holds regardless of how a pass was triggered.

use tokio::sync::Mutex;

use crate::configs::config_pipeline::PipelineConfig;
use crate::ledger::gateway::LedgerGateway;
use crate::provider::football::FootballApi;
use crate::registry::store::RegistryStore;

use super::provision::Provisioner;
use super::reconcile::Reconciler;
use super::summary::SyncRunSummary;
use super::SyncError;

/// One initialized pipeline: provider, ledger gateway, registry store and
/// the writer guard that keeps passes sequential.
pub struct PipelineContext {
    config: PipelineConfig,
    provider: FootballApi,
    ledger: LedgerGateway,
    store: RegistryStore,
    run_guard: Mutex<()>,
}

impl PipelineContext {
    /// Builds the concrete collaborators from resolved settings.
    pub fn initialize(config: PipelineConfig) -> anyhow::Result<Self> {
        let provider = FootballApi::new(
            &config.api_base_url,
            &config.api_key,
            config.request_timeout,
            config.http_retries,
        )?;
        let ledger = LedgerGateway::new(
            &config.ledger_base_url,
            config.ledger_api_key.as_deref(),
            config.request_timeout,
            config.confirm_poll,
            config.confirm_attempts,
        )?;
        let store = RegistryStore::new(&config.registry_path);

        Ok(Self {
            config,
            provider,
            ledger,
            store,
            run_guard: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one provisioning pass, waiting for any in-flight pass first.
    pub async fn run_provision(&self) -> Result<SyncRunSummary, SyncError> {
        let _guard = self.run_guard.lock().await;
        self.provision_locked().await
    }

    /// Runs one reconciliation pass, waiting for any in-flight pass first.
    pub async fn run_reconcile(&self) -> Result<SyncRunSummary, SyncError> {
        let _guard = self.run_guard.lock().await;
        self.reconcile_locked().await
    }

    /// Scheduled variant: skips instead of queueing when another pass still
    /// holds the writer guard (a slow pass must not pile up cron firings).
    pub async fn try_run_reconcile(&self) -> Option<Result<SyncRunSummary, SyncError>> {
        let Ok(_guard) = self.run_guard.try_lock() else {
            log::warn!("Skipping scheduled reconciliation: a pass is still running");
            return None;
        };
        Some(self.reconcile_locked().await)
    }

    async fn provision_locked(&self) -> Result<SyncRunSummary, SyncError> {
        let mut registry = self.store.load_or_create(self.config.scope)?;
        Provisioner::new(&self.config, &self.provider, &self.ledger, &self.store)
            .provision_all(&mut registry)
            .await
    }

    async fn reconcile_locked(&self) -> Result<SyncRunSummary, SyncError> {
        let mut registry = self.store.load_or_create(self.config.scope)?;
        Reconciler::new(&self.config, &self.provider, &self.ledger, &self.store)
            .reconcile_all(&mut registry)
            .await
    }
}
