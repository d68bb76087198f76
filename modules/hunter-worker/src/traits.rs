// Backend seams for the harvest pipeline.
//
// TextCompleter wraps the planning model, PlaceCrawler the maps crawler and
// RecordStore the campaign/prospect store. The pipeline only sees these
// traits; `testing` provides in-memory versions of all three.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use hunter_common::RawPlaceRecord;

// ---------------------------------------------------------------------------
// TextCompleter
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TextCompleter: Send + Sync {
    /// Send a free-text instruction, get the model's free-text answer.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl TextCompleter for ai_client::Gemini {
    async fn complete(&self, prompt: &str) -> Result<String> {
        ai_client::Gemini::complete(self, prompt).await
    }
}

// ---------------------------------------------------------------------------
// PlaceCrawler
// ---------------------------------------------------------------------------

/// One crawl job: a single search string against the maps crawler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub query: String,
    pub max_results: u32,
    pub language: String,
}

#[async_trait]
pub trait PlaceCrawler: Send + Sync {
    /// Run one crawl job to completion and return its places.
    async fn crawl(&self, request: &CrawlRequest) -> Result<Vec<RawPlaceRecord>>;
}

#[async_trait]
impl PlaceCrawler for apify_client::ApifyClient {
    async fn crawl(&self, request: &CrawlRequest) -> Result<Vec<RawPlaceRecord>> {
        let input = apify_client::GooglePlacesInput::single(
            request.query.as_str(),
            request.max_results,
            request.language.as_str(),
        );
        let places = self.crawl_places(&input).await?;
        Ok(places
            .into_iter()
            .map(|p| RawPlaceRecord {
                name: p.title,
                map_url: p.url,
                website: p.website,
                phone: p.phone,
                email: p.email,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Conjunction of `column = value` conditions. Values compare as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<(String, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.conditions.push((column.into(), value.to_string()));
        self
    }

    pub fn conditions(&self) -> &[(String, String)] {
        &self.conditions
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Row must be a JSON object")]
    NotAnObject,
}

/// Insert failures, split so callers can treat duplicates as "already known".
#[derive(Debug, Error)]
pub enum InsertError {
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Other(#[from] StoreError),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// First row of `table` matching `filter`, as a JSON object.
    async fn select_one(&self, table: &str, filter: &Filter) -> Result<Option<Value>, StoreError>;

    /// Insert a single row. A unique-constraint rejection is `InsertError::Duplicate`.
    async fn insert_row(&self, table: &str, row: &Value) -> Result<(), InsertError>;

    /// Set `fields` on the row with this `id`, provided it also matches `guard`.
    /// Returns the number of rows updated (0 or 1).
    async fn update_by_id(
        &self,
        table: &str,
        id: i64,
        guard: &Filter,
        fields: &Value,
    ) -> Result<u64, StoreError>;
}
