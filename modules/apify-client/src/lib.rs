pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{GooglePlacesInput, Place, RunData, RunStatus};

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for compass/crawler-google-places. The API path form uses `~`.
pub const GOOGLE_PLACES_CRAWLER: &str = "compass~crawler-google-places";

/// Seconds the API holds a run-status request open waiting for completion.
const WAIT_FOR_FINISH_SECS: u64 = 60;

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
    actor_id: String,
    max_wait: Option<Duration>,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
            actor_id: GOOGLE_PLACES_CRAWLER.to_string(),
            max_wait: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Use a different places actor (e.g. a fork with the same input schema).
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = actor_id.into().replace('/', "~");
        self
    }

    /// Give up polling a run after `max_wait`. Unbounded by default.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_run<I: Serialize>(&self, actor_id: &str, input: &I) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish` for efficient long-polling.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        let started = Instant::now();
        loop {
            let url = format!(
                "{}/actor-runs/{}?waitForFinish={}",
                self.base_url, run_id, WAIT_FOR_FINISH_SECS
            );
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApifyError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match RunStatus::parse(&api_resp.data.status) {
                RunStatus::Succeeded => return Ok(api_resp.data),
                RunStatus::Failed => {
                    return Err(ApifyError::RunFailed {
                        run_id: api_resp.data.id,
                        status: api_resp.data.status,
                    });
                }
                RunStatus::Running => {
                    if let Some(max_wait) = self.max_wait {
                        if started.elapsed() >= max_wait {
                            return Err(ApifyError::WaitExceeded {
                                run_id: run_id.to_string(),
                                waited_secs: started.elapsed().as_secs(),
                            });
                        }
                    }
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                    // A server that answers immediately would otherwise spin.
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", self.base_url, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let items: Vec<T> = serde_json::from_str(&body)?;
        Ok(items)
    }

    /// Crawl Google Maps for one search string end-to-end: start run, poll, fetch results.
    pub async fn crawl_places(&self, input: &GooglePlacesInput) -> Result<Vec<Place>> {
        tracing::info!(
            queries = ?input.search_strings,
            max_places = input.max_crawled_places_per_search,
            "Starting Google Places crawl"
        );

        let run = self.start_run(&self.actor_id, input).await?;
        tracing::info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            duration_secs = ?completed.duration_secs(),
            "Run completed, fetching results"
        );

        let places: Vec<Place> = self
            .get_dataset_items(&completed.default_dataset_id)
            .await?;
        tracing::info!(count = places.len(), "Fetched places");

        Ok(places)
    }
}
