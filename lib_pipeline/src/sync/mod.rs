//! # Synchronization Module
//!
//! The two passes that keep the ledger aligned with the external dataset:
//!
//! - **`provision`**: the idempotent onboarding pass that discovers players
//!   and allocates one ledger record per player exactly once.
//!
//! - **`reconcile`**: the recurring pass that re-fetches statistics, diffs
//!   them against the stored snapshot, and writes to the ledger only when a
//!   material change is detected.
//!
//! The passes never talk to each other; they share only the registry. Both
//! are driven through **`runner`**, which owns the single-writer guard, and
//! report through **`summary`**. Token identities come from **`naming`**.

#![forbid(unsafe_code)]

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::provider::ProviderError;
use crate::registry::store::StoreError;

/// Token name/symbol derivation.
pub mod naming;
/// The idempotent onboarding pass.
pub mod provision;
/// The recurring diff-before-write pass.
pub mod reconcile;
/// Pipeline wiring and the single-writer guard.
pub mod runner;
/// Run reports.
pub mod summary;

/// Pipeline-level error. Per-entity provider and ledger failures are
/// normally downgraded into summary entries; only store failures abort a
/// run, because without durable state there is no safe way to continue.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::configs::config_pipeline::PipelineConfig;
    use crate::ledger::{Ledger, LedgerAddress, LedgerError, TxReceipt};
    use crate::provider::model::{PlayerRecord, TeamRecord};
    use crate::provider::{ProviderError, StatProvider};
    use crate::registry::model::{DatasetScope, StatSnapshot};
    use crate::registry::store::RegistryStore;

    use super::provision::Provisioner;
    use super::reconcile::Reconciler;
    use super::summary::EntityOutcome;

    /// Provider serving canned teams, rosters and statistics.
    #[derive(Default)]
    struct ScriptedProvider {
        teams: Vec<TeamRecord>,
        rosters: HashMap<u64, Vec<PlayerRecord>>,
        stats: Mutex<HashMap<u64, StatSnapshot>>,
        fail_stats: HashSet<u64>,
        stats_calls: AtomicUsize,
    }

    fn unavailable(endpoint: &str, scope: &DatasetScope) -> ProviderError {
        ProviderError::Unavailable {
            endpoint: endpoint.to_string(),
            scope: *scope,
            reason: "scripted outage".to_string(),
        }
    }

    #[async_trait]
    impl StatProvider for ScriptedProvider {
        async fn fetch_teams(
            &self,
            _scope: &DatasetScope,
        ) -> Result<Vec<TeamRecord>, ProviderError> {
            Ok(self.teams.clone())
        }

        async fn fetch_players(
            &self,
            team_id: u64,
            _scope: &DatasetScope,
        ) -> Result<Vec<PlayerRecord>, ProviderError> {
            Ok(self.rosters.get(&team_id).cloned().unwrap_or_default())
        }

        async fn fetch_player_stats(
            &self,
            player_id: u64,
            scope: &DatasetScope,
        ) -> Result<Option<StatSnapshot>, ProviderError> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_stats.contains(&player_id) {
                return Err(unavailable("players", scope));
            }
            Ok(self.stats.lock().unwrap().get(&player_id).cloned())
        }

        // Tests never wait.
        async fn pace(&self, _delay: Duration) {}

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Ledger counting every write so tests can assert the no-write rules.
    #[derive(Default)]
    struct CountingLedger {
        provision_calls: AtomicUsize,
        init_calls: AtomicUsize,
        update_calls: AtomicUsize,
        fail_provision_names: HashSet<String>,
        fail_updates: AtomicBool,
    }

    fn receipt(tx_id: &str) -> TxReceipt {
        TxReceipt {
            tx_id: tx_id.to_string(),
            confirmed_at: Utc::now(),
        }
    }

    #[async_trait]
    impl Ledger for CountingLedger {
        async fn provision_record(
            &self,
            name: &str,
            _symbol: &str,
        ) -> Result<LedgerAddress, LedgerError> {
            if self.fail_provision_names.contains(name) {
                return Err(LedgerError::Transport {
                    endpoint: "records".to_string(),
                    reason: "scripted outage".to_string(),
                });
            }
            let n = self.provision_calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(LedgerAddress(format!("0xrec{:04}", n)))
        }

        async fn write_initial(
            &self,
            _address: &str,
            _snapshot: &StatSnapshot,
        ) -> Result<TxReceipt, LedgerError> {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            Ok(receipt("tx-init"))
        }

        async fn write_update(
            &self,
            _address: &str,
            _snapshot: &StatSnapshot,
        ) -> Result<TxReceipt, LedgerError> {
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(LedgerError::Transport {
                    endpoint: "records".to_string(),
                    reason: "scripted outage".to_string(),
                });
            }
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            Ok(receipt("tx-update"))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn test_config(registry_path: &Path) -> PipelineConfig {
        PipelineConfig {
            api_base_url: "http://127.0.0.1:1/".to_string(),
            api_key: "test-key".to_string(),
            ledger_base_url: "http://127.0.0.1:1/".to_string(),
            ledger_api_key: None,
            scope: DatasetScope::new(39, 2023),
            registry_path: registry_path.to_path_buf(),
            pace: Duration::from_millis(0),
            checkpoint_every: 2,
            request_timeout: Duration::from_secs(1),
            http_retries: 0,
            confirm_poll: Duration::from_millis(1),
            confirm_attempts: 1,
            reconcile_cron: "0 0 * * * *".to_string(),
            log_dir: registry_path.parent().unwrap().to_path_buf(),
            log_level: "info".to_string(),
        }
    }

    fn player(id: u64, name: &str) -> PlayerRecord {
        PlayerRecord {
            external_id: id,
            display_name: name.to_string(),
            first_name: None,
            last_name: None,
            position: Some("Attacker".to_string()),
            nationality: None,
            age: Some(25),
            photo_url: None,
        }
    }

    fn snapshot(goals: u32) -> StatSnapshot {
        StatSnapshot {
            goals,
            assists: 2,
            penalties_scored: 0,
            shots_total: 30,
            shots_on_target: 14,
            duels_total: 80,
            duels_won: 44,
            tackles: 9,
            appearances: 15,
            cards_yellow: 1,
            cards_red: 0,
            updated_at: Utc::now(),
            provisional: false,
        }
    }

    /// One team (id 50) with the given players and their stats.
    fn roster_provider(entries: &[(u64, &str, u32)]) -> ScriptedProvider {
        let mut roster = Vec::new();
        let mut stats = HashMap::new();
        for (id, name, goals) in entries {
            roster.push(player(*id, name));
            stats.insert(*id, snapshot(*goals));
        }
        let mut rosters = HashMap::new();
        rosters.insert(50, roster);

        ScriptedProvider {
            teams: vec![TeamRecord {
                external_id: 50,
                name: "Test FC".to_string(),
                logo_url: None,
                venue_name: Some("Test Park".to_string()),
            }],
            rosters,
            stats: Mutex::new(stats),
            ..ScriptedProvider::default()
        }
    }

    #[tokio::test]
    async fn provisioning_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("registry.json"));
        let store = RegistryStore::new(&config.registry_path);
        let provider = roster_provider(&[
            (10, "Player Ten", 5),
            (11, "Player Eleven", 5),
            (12, "Player Twelve", 5),
        ]);
        let ledger = CountingLedger::default();
        let mut registry = store.load_or_create(config.scope).unwrap();

        let provisioner = Provisioner::new(&config, &provider, &ledger, &store);
        let first = provisioner.provision_all(&mut registry).await.unwrap();
        let second = provisioner.provision_all(&mut registry).await.unwrap();

        assert_eq!(first.succeeded, 3);
        assert_eq!(second.succeeded, 0);
        assert_eq!(second.skipped, 3);
        // No duplicate ledger allocations on the second run.
        assert_eq!(ledger.provision_calls.load(Ordering::SeqCst), 3);
        assert_eq!(registry.len(), 3);

        // The persisted registry equals the in-memory one.
        let reloaded = store.load_or_create(config.scope).unwrap();
        assert_eq!(
            serde_json::to_value(&registry).unwrap(),
            serde_json::to_value(&reloaded).unwrap()
        );
    }

    #[tokio::test]
    async fn one_failing_entity_does_not_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("registry.json"));
        let store = RegistryStore::new(&config.registry_path);
        let provider = roster_provider(&[
            (1, "Player One", 1),
            (2, "Player Two", 2),
            (3, "Player Three", 3),
            (4, "Player Four", 4),
            (5, "Player Five", 5),
        ]);
        let mut ledger = CountingLedger::default();
        ledger
            .fail_provision_names
            .insert("Player Three".to_string());
        let mut registry = store.load_or_create(config.scope).unwrap();

        let summary = Provisioner::new(&config, &provider, &ledger, &store)
            .provision_all(&mut registry)
            .await
            .unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(registry.len(), 4);
        assert!(registry.get(3).is_none());
        // The straggler stays eligible for the next run.
        assert!(registry.get(4).is_some());
    }

    #[tokio::test]
    async fn missing_stats_seed_a_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("registry.json"));
        let store = RegistryStore::new(&config.registry_path);
        let mut provider = roster_provider(&[(7, "Player Seven", 0)]);
        provider.fail_stats.insert(7);
        let ledger = CountingLedger::default();
        let mut registry = store.load_or_create(config.scope).unwrap();

        let summary = Provisioner::new(&config, &provider, &ledger, &store)
            .provision_all(&mut registry)
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        match &summary.entries[0].outcome {
            EntityOutcome::Provisioned {
                placeholder_stats, ..
            } => assert!(*placeholder_stats),
            other => panic!("expected provisioned outcome, got {:?}", other),
        }
        // The record is never left without a snapshot.
        let record = registry.get(7).unwrap();
        assert!(record.last_snapshot.provisional);
        assert_eq!(record.last_snapshot.goals, 0);
        assert_eq!(ledger.init_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unchanged_records_never_touch_the_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("registry.json"));
        let store = RegistryStore::new(&config.registry_path);
        let provider = roster_provider(&[(10, "Player Ten", 5)]);
        let ledger = CountingLedger::default();
        let mut registry = store.load_or_create(config.scope).unwrap();

        Provisioner::new(&config, &provider, &ledger, &store)
            .provision_all(&mut registry)
            .await
            .unwrap();

        // Same counters, newer provider timestamp: still "unchanged".
        let mut fresher = snapshot(5);
        fresher.updated_at = Utc::now();
        provider.stats.lock().unwrap().insert(10, fresher);

        let summary = Reconciler::new(&config, &provider, &ledger, &store)
            .reconcile_all(&mut registry)
            .await
            .unwrap();

        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(ledger.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reconcile_fetch_failure_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("registry.json"));
        let store = RegistryStore::new(&config.registry_path);
        let provider = roster_provider(&[(10, "Player Ten", 5), (11, "Player Eleven", 5)]);
        let ledger = CountingLedger::default();
        let mut registry = store.load_or_create(config.scope).unwrap();

        Provisioner::new(&config, &provider, &ledger, &store)
            .provision_all(&mut registry)
            .await
            .unwrap();

        let mut flaky = roster_provider(&[(10, "Player Ten", 9), (11, "Player Eleven", 5)]);
        flaky.fail_stats.insert(10);

        let summary = Reconciler::new(&config, &flaky, &ledger, &store)
            .reconcile_all(&mut registry)
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.unchanged, 1);
        // The failed fetch never mutates the stored snapshot.
        assert_eq!(registry.get(10).unwrap().last_snapshot.goals, 5);
    }

    #[tokio::test]
    async fn failed_ledger_write_retries_next_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("registry.json"));
        let store = RegistryStore::new(&config.registry_path);
        let provider = roster_provider(&[(10, "Player Ten", 5)]);
        let ledger = CountingLedger::default();
        let mut registry = store.load_or_create(config.scope).unwrap();

        Provisioner::new(&config, &provider, &ledger, &store)
            .provision_all(&mut registry)
            .await
            .unwrap();

        let changed = roster_provider(&[(10, "Player Ten", 6)]);
        ledger.fail_updates.store(true, Ordering::SeqCst);

        let failed = Reconciler::new(&config, &changed, &ledger, &store)
            .reconcile_all(&mut registry)
            .await
            .unwrap();
        assert_eq!(failed.failed, 1);
        // Snapshot not advanced: the same diff is recomputed next cycle.
        assert_eq!(registry.get(10).unwrap().last_snapshot.goals, 5);

        ledger.fail_updates.store(false, Ordering::SeqCst);
        let retried = Reconciler::new(&config, &changed, &ledger, &store)
            .reconcile_all(&mut registry)
            .await
            .unwrap();
        assert_eq!(retried.updated, 1);
        assert_eq!(registry.get(10).unwrap().last_snapshot.goals, 6);
        assert_eq!(ledger.update_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn end_to_end_provision_then_reconcile() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("registry.json"));
        let store = RegistryStore::new(&config.registry_path);
        let provider = roster_provider(&[
            (10, "Player Ten", 5),
            (11, "Player Eleven", 5),
            (12, "Player Twelve", 5),
        ]);
        let ledger = CountingLedger::default();
        let mut registry = store.load_or_create(config.scope).unwrap();

        Provisioner::new(&config, &provider, &ledger, &store)
            .provision_all(&mut registry)
            .await
            .unwrap();

        assert_eq!(registry.len(), 3);
        for id in [10, 11, 12] {
            assert_eq!(registry.get(id).unwrap().last_snapshot.goals, 5);
        }

        // Only player 11 moved since provisioning.
        let moved = roster_provider(&[
            (10, "Player Ten", 5),
            (11, "Player Eleven", 6),
            (12, "Player Twelve", 5),
        ]);

        let summary = Reconciler::new(&config, &moved, &ledger, &store)
            .reconcile_all(&mut registry)
            .await
            .unwrap();

        assert_eq!(summary.unchanged, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(ledger.update_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.get(11).unwrap().last_snapshot.goals, 6);

        let entry = summary
            .entries
            .iter()
            .find(|e| e.external_id == 11)
            .unwrap();
        match &entry.outcome {
            EntityOutcome::Updated { changes } => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].field, "goals");
                assert_eq!(changes[0].previous, 5);
                assert_eq!(changes[0].current, 6);
            }
            other => panic!("expected updated outcome, got {:?}", other),
        }
    }
}
