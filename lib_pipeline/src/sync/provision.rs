//! Provisioning orchestrator: discovers players from the external provider
//! and allocates one ledger record per player exactly once.
//!
//! Repeated runs are safe by construction: every player already present in
//! the registry is skipped before any external call is made, so a crashed
//! or partially failed run is resumed by simply running the pass again.

use chrono::Utc;

use crate::configs::config_pipeline::PipelineConfig;
use crate::ledger::Ledger;
use crate::provider::model::{PlayerRecord, TeamRecord};
use crate::provider::StatProvider;
use crate::registry::model::{Registry, RegistryRecord, StatSnapshot};
use crate::registry::store::RegistryStore;

use super::naming;
use super::summary::{EntityOutcome, RunKind, SyncRunSummary};
use super::SyncError;

/// Walks discovered entities and provisions the missing ones.
pub struct Provisioner<'a> {
    config: &'a PipelineConfig,
    provider: &'a dyn StatProvider,
    ledger: &'a dyn Ledger,
    store: &'a RegistryStore,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        provider: &'a dyn StatProvider,
        ledger: &'a dyn Ledger,
        store: &'a RegistryStore,
    ) -> Self {
        Self {
            config,
            provider,
            ledger,
            store,
        }
    }

    /// Runs one full provisioning pass over the scope.
    ///
    /// Per-entity failures are downgraded to summary entries; the only
    /// errors that abort the run are failures of the registry store itself.
    /// The registry is checkpointed every `checkpoint_every` provisioned
    /// players and once more at the end of the run.
    pub async fn provision_all(&self, registry: &mut Registry) -> Result<SyncRunSummary, SyncError> {
        let scope = self.config.scope;
        let mut summary = SyncRunSummary::start(RunKind::Provision, scope);
        log::info!("Provisioning pass starting for {}", scope);

        let teams = match self.provider.fetch_teams(&scope).await {
            Ok(teams) => teams,
            Err(e) => {
                // Nothing to walk; report an empty run rather than aborting.
                log::error!("Could not discover teams for {}: {}", scope, e);
                summary.note(format!("team discovery failed: {}", e));
                summary.finish();
                return Ok(summary);
            }
        };

        let mut since_checkpoint = 0usize;

        for team in &teams {
            let players = match self.provider.fetch_players(team.external_id, &scope).await {
                Ok(players) => players,
                Err(e) => {
                    log::warn!("Skipping roster of {} ({}): {}", team.name, team.external_id, e);
                    summary.note(format!(
                        "roster fetch failed for team {}: {}",
                        team.external_id, e
                    ));
                    self.provider.pace(self.config.pace).await;
                    continue;
                }
            };

            for player in &players {
                // Idempotency guard: a provisioned player is never touched again.
                if registry.get(player.external_id).is_some() {
                    summary.record(
                        player.external_id,
                        &player.display_name,
                        EntityOutcome::Skipped {
                            reason: "already provisioned".to_string(),
                        },
                    );
                    continue;
                }

                match self.provision_one(team, player, registry).await {
                    Ok(outcome) => {
                        summary.record(player.external_id, &player.display_name, outcome);
                        since_checkpoint += 1;
                        if since_checkpoint >= self.config.checkpoint_every {
                            self.store.save(registry)?;
                            since_checkpoint = 0;
                        }
                    }
                    Err(e) => {
                        log::warn!(
                            "Provisioning failed for {} ({}): {}",
                            player.display_name,
                            player.external_id,
                            e
                        );
                        summary.record(
                            player.external_id,
                            &player.display_name,
                            EntityOutcome::Failed {
                                reason: e.to_string(),
                            },
                        );
                    }
                }

                self.provider.pace(self.config.pace).await;
            }
        }

        self.store.save(registry)?;
        summary.finish();
        log::info!("{}", summary.headline());
        Ok(summary)
    }

    /// Provisions a single player: derive the token identity, allocate the
    /// ledger record, seed it with a snapshot, persist the registry record.
    async fn provision_one(
        &self,
        team: &TeamRecord,
        player: &PlayerRecord,
        registry: &mut Registry,
    ) -> Result<EntityOutcome, SyncError> {
        let scope = self.config.scope;
        let full_name = player.full_name();
        let token_name = naming::token_name(&full_name);
        let token_symbol = naming::token_symbol(&full_name);

        let address = self
            .ledger
            .provision_record(&token_name, &token_symbol)
            .await?;

        // The record must never be left without a snapshot: a missing or
        // failing stats lookup seeds a placeholder, and the next
        // reconciliation cycle replaces it with authoritative data.
        let (snapshot, placeholder) = match self
            .provider
            .fetch_player_stats(player.external_id, &scope)
            .await
        {
            Ok(Some(snapshot)) => (snapshot, false),
            Ok(None) => {
                log::debug!(
                    "No statistics yet for {} ({})",
                    player.display_name,
                    player.external_id
                );
                (StatSnapshot::placeholder(), true)
            }
            Err(e) => {
                log::warn!(
                    "Stats fetch failed for {} ({}); seeding placeholder: {}",
                    player.display_name,
                    player.external_id,
                    e
                );
                (StatSnapshot::placeholder(), true)
            }
        };

        self.ledger.write_initial(&address.0, &snapshot).await?;

        let now = Utc::now();
        registry.upsert(RegistryRecord {
            external_id: player.external_id,
            display_name: player.display_name.clone(),
            ledger_address: address.0.clone(),
            team_external_id: team.external_id,
            team_name: team.name.clone(),
            team_logo_url: team.logo_url.clone(),
            venue_name: team.venue_name.clone(),
            token_name,
            token_symbol,
            provisioned_at: now,
            last_synced_at: now,
            last_snapshot: snapshot,
        });

        Ok(EntityOutcome::Provisioned {
            address: address.0,
            placeholder_stats: placeholder,
        })
    }
}
