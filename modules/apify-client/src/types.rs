use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input for the compass/crawler-google-places actor.
#[derive(Debug, Clone, Serialize)]
pub struct GooglePlacesInput {
    #[serde(rename = "searchStringsArray")]
    pub search_strings: Vec<String>,
    #[serde(rename = "maxCrawledPlacesPerSearch")]
    pub max_crawled_places_per_search: u32,
    pub language: String,
}

impl GooglePlacesInput {
    pub fn single(query: impl Into<String>, max_places: u32, language: impl Into<String>) -> Self {
        Self {
            search_strings: vec![query.into()],
            max_crawled_places_per_search: max_places,
            language: language.into(),
        }
    }
}

/// A single place from the crawler dataset. Only the contact fields are kept;
/// the actor emits many more which serde ignores.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Place {
    pub title: Option<String>,
    /// Google Maps URL of the place.
    pub url: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunData {
    /// Wall-clock run time, once both timestamps are known.
    pub fn duration_secs(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

/// Terminal and non-terminal states of an actor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "SUCCEEDED" => RunStatus::Succeeded,
            "FAILED" | "ABORTED" | "TIMED-OUT" | "TIMED_OUT" => RunStatus::Failed,
            // READY, RUNNING, TIMING-OUT, ABORTING
            _ => RunStatus::Running,
        }
    }
}
