use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info};

use hunter_common::CampaignState;

use crate::harvester::{HarvestReport, Harvester};
use crate::planner::{PlanOutcome, SearchPlanner};
use crate::store::{AdvanceOutcome, PersistReport, ProspectStore};
use crate::traits::{PlaceCrawler, RecordStore, TextCompleter};

/// Places requested per term: `desired / terms + 1`, so the total slightly
/// over-fetches rather than under-fetches. Always at least 1.
pub fn per_term_limit(desired_leads: u32, term_count: usize) -> u32 {
    let terms = u32::try_from(term_count.max(1)).unwrap_or(u32::MAX);
    (desired_leads / terms).saturating_add(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Selection,
    Handoff,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selection => write!(f, "selection"),
            Self::Handoff => write!(f, "handoff"),
        }
    }
}

/// How a harvest cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// No campaign is waiting in the searching state.
    NoCampaign,
    /// Every term failed or returned nothing; the campaign stays in searching.
    NothingHarvested {
        campaign_id: i64,
        plan: PlanOutcome,
        harvest: HarvestReport,
    },
    /// Prospects saved and the campaign moved on to analysis.
    HandedOff {
        campaign_id: i64,
        plan: PlanOutcome,
        harvest: HarvestReport,
        persist: PersistReport,
    },
    /// Prospects saved, but the campaign had already left the searching state.
    AdvanceSkipped {
        campaign_id: i64,
        persist: PersistReport,
    },
    /// The cycle was cut short. `stage` is `None` for a panic.
    Failed {
        stage: Option<CycleStage>,
        error: String,
    },
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCampaign => write!(f, "no campaign in searching state"),
            Self::NothingHarvested { campaign_id, harvest, .. } => {
                write!(f, "campaign {campaign_id}: nothing harvested ({harvest})")
            }
            Self::HandedOff { campaign_id, persist, .. } => {
                write!(f, "campaign {campaign_id}: handed off to analysis ({persist})")
            }
            Self::AdvanceSkipped { campaign_id, persist } => {
                write!(f, "campaign {campaign_id}: saved but not advanced ({persist})")
            }
            Self::Failed { stage: Some(stage), error } => write!(f, "failed at {stage}: {error}"),
            Self::Failed { stage: None, error } => write!(f, "failed: {error}"),
        }
    }
}

/// Sequences one harvest cycle: select → plan → harvest → persist → hand off.
pub struct Orchestrator {
    planner: SearchPlanner,
    harvester: Harvester,
    store: ProspectStore,
}

impl Orchestrator {
    pub fn new(
        ai: Arc<dyn TextCompleter>,
        crawler: Arc<dyn PlaceCrawler>,
        records: Arc<dyn RecordStore>,
        language: &str,
    ) -> Self {
        Self {
            planner: SearchPlanner::new(ai, language),
            harvester: Harvester::new(crawler, language),
            store: ProspectStore::new(records),
        }
    }

    /// Run one cycle. Never returns an error and never unwinds; whatever goes
    /// wrong is reported as `CycleOutcome::Failed`.
    pub async fn run_cycle(&self) -> CycleOutcome {
        match AssertUnwindSafe(self.run_cycle_inner()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let error = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(error = %error, "Harvest cycle panicked");
                CycleOutcome::Failed { stage: None, error }
            }
        }
    }

    async fn run_cycle_inner(&self) -> CycleOutcome {
        // Selection
        let campaign = match self.store.find_campaign(&CampaignState::Searching).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                info!("No campaign waiting to be searched");
                return CycleOutcome::NoCampaign;
            }
            Err(e) => return fail(CycleStage::Selection, e),
        };
        let criteria = &campaign.criteria;
        info!(
            campaign_id = campaign.id,
            ideal_customer = %criteria.ideal_customer,
            location = %criteria.location,
            desired_leads = criteria.desired_leads,
            "Campaign selected"
        );

        // Planning
        let plan = self
            .planner
            .plan(&criteria.what_is_sold, &criteria.ideal_customer, &criteria.location)
            .await;
        let limit = per_term_limit(criteria.desired_leads, plan.terms().len());

        // Harvesting
        let harvest = self.harvester.harvest(plan.terms(), limit).await;
        if harvest.records.is_empty() {
            info!(campaign_id = campaign.id, "Nothing harvested, campaign stays in searching");
            return CycleOutcome::NothingHarvested {
                campaign_id: campaign.id,
                plan,
                harvest,
            };
        }

        // Persisting
        let persist = self.store.persist(harvest.records.clone(), campaign.id).await;

        // Handoff
        match self
            .store
            .advance(campaign.id, &CampaignState::Searching, &CampaignState::Analyzing)
            .await
        {
            Ok(AdvanceOutcome::Advanced) => {
                info!(campaign_id = campaign.id, new_prospects = persist.inserted, "Campaign handed off to analysis");
                CycleOutcome::HandedOff {
                    campaign_id: campaign.id,
                    plan,
                    harvest,
                    persist,
                }
            }
            Ok(AdvanceOutcome::NotInState) => CycleOutcome::AdvanceSkipped {
                campaign_id: campaign.id,
                persist,
            },
            Err(e) => fail(CycleStage::Handoff, e),
        }
    }
}

fn fail(stage: CycleStage, e: anyhow::Error) -> CycleOutcome {
    error!(%stage, error = %format!("{e:#}"), "Harvest cycle failed");
    CycleOutcome::Failed {
        stage: Some(stage),
        error: format!("{e:#}"),
    }
}
