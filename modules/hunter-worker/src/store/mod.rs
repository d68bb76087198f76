// Prospect persistence and campaign handoff on top of a RecordStore.

mod postgres;
mod postgrest;

pub use postgres::PgStore;
pub use postgrest::PostgrestStore;

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use hunter_common::schema::{self, campaign as col};
use hunter_common::{Campaign, CampaignState, Prospect, RawPlaceRecord};

use crate::traits::{Filter, InsertError, RecordStore};

/// Per-record result of a persist call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    /// Already known under the store's unique key.
    Duplicate,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedInsert {
    pub label: String,
    pub reason: String,
}

/// Counts from one persist call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: Vec<FailedInsert>,
}

impl fmt::Display for PersistReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inserted={} duplicates={} failed={}",
            self.inserted,
            self.duplicates,
            self.failed.len()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Advanced,
    /// The campaign was no longer in the expected state; nothing changed.
    NotInState,
}

pub struct ProspectStore {
    store: Arc<dyn RecordStore>,
}

impl ProspectStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// First campaign currently in `state`. No ordering guarantee.
    pub async fn find_campaign(&self, state: &CampaignState) -> Result<Option<Campaign>> {
        let filter = Filter::new().eq(col::STATE, state.as_str());
        let row = self
            .store
            .select_one(schema::CAMPAIGNS_TABLE, &filter)
            .await
            .context("Failed to query campaigns")?;

        match row {
            Some(row) => Ok(Some(Campaign::from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Insert every record as a hunted prospect, one row at a time. Duplicates
    /// and failed rows are skipped, so replaying the same batch is safe.
    pub async fn persist(&self, records: Vec<RawPlaceRecord>, campaign_id: i64) -> PersistReport {
        info!(campaign_id, records = records.len(), "Saving prospects");
        let mut report = PersistReport::default();

        for record in records {
            let prospect = Prospect::from_place(record, campaign_id);
            match self.insert(&prospect).await {
                RecordOutcome::Inserted => {
                    debug!(name = prospect.label(), "Prospect saved");
                    report.inserted += 1;
                }
                RecordOutcome::Duplicate => {
                    debug!(name = prospect.label(), "Prospect already known, skipped");
                    report.duplicates += 1;
                }
                RecordOutcome::Failed(reason) => {
                    warn!(name = prospect.label(), error = %reason, "Failed to save prospect");
                    report.failed.push(FailedInsert {
                        label: prospect.label().to_string(),
                        reason,
                    });
                }
            }
        }

        info!(campaign_id, "Prospects saved. {report}");
        report
    }

    async fn insert(&self, prospect: &Prospect) -> RecordOutcome {
        let row = match serde_json::to_value(prospect) {
            Ok(row) => row,
            Err(e) => return RecordOutcome::Failed(e.to_string()),
        };
        match self.store.insert_row(schema::PROSPECTS_TABLE, &row).await {
            Ok(()) => RecordOutcome::Inserted,
            Err(InsertError::Duplicate(_)) => RecordOutcome::Duplicate,
            Err(InsertError::Other(e)) => RecordOutcome::Failed(e.to_string()),
        }
    }

    /// Move a campaign from `from` to `to` with a single conditional update.
    pub async fn advance(
        &self,
        campaign_id: i64,
        from: &CampaignState,
        to: &CampaignState,
    ) -> Result<AdvanceOutcome> {
        let guard = Filter::new().eq(col::STATE, from.as_str());
        let mut patch = serde_json::Map::new();
        patch.insert(col::STATE.to_string(), to.as_str().into());
        let fields = serde_json::Value::Object(patch);

        let updated = self
            .store
            .update_by_id(schema::CAMPAIGNS_TABLE, campaign_id, &guard, &fields)
            .await
            .with_context(|| format!("Failed to move campaign {campaign_id} to {to}"))?;

        if updated == 0 {
            warn!(campaign_id, %from, %to, "Campaign not in expected state, not advanced");
            return Ok(AdvanceOutcome::NotInState);
        }
        info!(campaign_id, %from, %to, "Campaign advanced");
        Ok(AdvanceOutcome::Advanced)
    }
}
