pub mod harvester;
pub mod orchestrator;
pub mod planner;
pub mod scheduler;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use harvester::{HarvestReport, Harvester, TermOutcome};
pub use orchestrator::{per_term_limit, CycleOutcome, CycleStage, Orchestrator};
pub use planner::{PlanOutcome, SearchPlanner};
pub use scheduler::Scheduler;
pub use store::{AdvanceOutcome, PersistReport, ProspectStore};
pub use traits::{CrawlRequest, Filter, InsertError, PlaceCrawler, RecordStore, StoreError, TextCompleter};
