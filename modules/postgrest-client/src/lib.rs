pub mod error;

pub use error::{PostgrestError, Result, UNIQUE_VIOLATION};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Equality filters, rendered as `column=eq.value` query parameters.
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

    fn query_pairs(&self) -> Vec<(String, String)> {
        self.conditions
            .iter()
            .map(|(col, val)| (col.clone(), format!("eq.{val}")))
            .collect()
    }
}

pub struct PostgrestClient {
    client: reqwest::Client,
    rest_url: String,
    api_key: String,
}

impl PostgrestClient {
    /// `base_url` is the project URL (e.g. `https://xyz.supabase.co`); the
    /// REST endpoint lives under `/rest/v1`.
    pub fn new(base_url: &str, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            api_key,
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| PostgrestError::Parse(format!("invalid api key header: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| PostgrestError::Parse(format!("invalid api key header: {e}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(PostgrestError::from_response(status.as_u16(), &body))
    }

    /// `GET /{table}?filters&limit=n`
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.rest_url, table);
        let mut query = filter.query_pairs();
        query.push(("select".to_string(), "*".to_string()));
        if let Some(limit) = limit {
            query.push(("limit".to_string(), limit.to_string()));
        }

        tracing::debug!(table, ?query, "PostgREST select");

        let resp = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&query)
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `POST /{table}` with a single row.
    pub async fn insert<R: Serialize + ?Sized>(&self, table: &str, row: &R) -> Result<()> {
        let url = format!("{}/{}", self.rest_url, table);

        tracing::debug!(table, "PostgREST insert");

        let resp = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// `PATCH /{table}?filters`. Returns the number of rows updated.
    pub async fn update<P: Serialize + ?Sized>(
        &self,
        table: &str,
        filter: &Filter,
        patch: &P,
    ) -> Result<u64> {
        let url = format!("{}/{}", self.rest_url, table);

        tracing::debug!(table, filter = ?filter.conditions(), "PostgREST update");

        let resp = self
            .client
            .patch(&url)
            .headers(self.headers()?)
            .header("Prefer", "return=representation")
            .query(&filter.query_pairs())
            .json(patch)
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let body = resp.text().await?;
        let rows: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        Ok(rows.len() as u64)
    }
}
