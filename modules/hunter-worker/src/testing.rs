// Test doubles for the three backend seams.
//
// - ScriptedCompleter (TextCompleter): fixed reply or fixed error
// - MockCrawler (PlaceCrawler): term → places or term → error
// - MemoryStore (RecordStore): in-memory tables with unique keys
//
// Plus builders for places and campaign rows.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use hunter_common::schema::{self, prospect};
use hunter_common::RawPlaceRecord;

use crate::traits::{CrawlRequest, Filter, InsertError, PlaceCrawler, RecordStore, StoreError, TextCompleter};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A place whose map URL is derived from its name.
pub fn place(name: &str) -> RawPlaceRecord {
    place_at(name, &format!("https://maps.google.com/?q={}", name.replace(' ', "+")))
}

/// A place with an explicit map URL.
pub fn place_at(name: &str, map_url: &str) -> RawPlaceRecord {
    RawPlaceRecord {
        name: Some(name.to_string()),
        map_url: Some(map_url.to_string()),
        website: Some(format!("https://{}.example", name.replace(' ', "-"))),
        phone: Some("+1 305 555 0100".to_string()),
        email: None,
    }
}

/// A `campanas` row.
pub fn campaign_row(
    id: i64,
    what_is_sold: &str,
    ideal_customer: &str,
    location: &str,
    desired_leads: u32,
    state: &str,
) -> Value {
    json!({
        "id": id,
        "que_vendes": what_is_sold,
        "cliente_ideal": ideal_customer,
        "ubicacion": location,
        "cantidad": desired_leads,
        "estado": state,
    })
}

// ---------------------------------------------------------------------------
// ScriptedCompleter
// ---------------------------------------------------------------------------

pub struct ScriptedCompleter {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompleter {
    pub fn reply(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            reply: Err(error.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A reply carrying `terms` under the plan key, fenced like real model output.
    pub fn plan(terms: &[&str]) -> Self {
        let body = json!({ "plan_de_busqueda": terms });
        Self::reply(&format!("```json\n{body}\n```"))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextCompleter for ScriptedCompleter {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(|e| anyhow!(e))
    }
}

// ---------------------------------------------------------------------------
// MockCrawler
// ---------------------------------------------------------------------------

/// Term-keyed crawler. Returns `Err` for unregistered terms.
pub struct MockCrawler {
    results: HashMap<String, std::result::Result<Vec<RawPlaceRecord>, String>>,
    requests: Mutex<Vec<CrawlRequest>>,
}

impl MockCrawler {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn on_term(mut self, term: &str, places: Vec<RawPlaceRecord>) -> Self {
        self.results.insert(term.to_string(), Ok(places));
        self
    }

    pub fn on_failure(mut self, term: &str, error: &str) -> Self {
        self.results.insert(term.to_string(), Err(error.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<CrawlRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockCrawler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaceCrawler for MockCrawler {
    async fn crawl(&self, request: &CrawlRequest) -> Result<Vec<RawPlaceRecord>> {
        self.requests.lock().unwrap().push(request.clone());
        match self.results.get(&request.query) {
            Some(Ok(places)) => Ok(places.iter().take(request.max_results as usize).cloned().collect()),
            Some(Err(e)) => Err(anyhow!("{e}")),
            None => Err(anyhow!("MockCrawler: no places registered for {:?}", request.query)),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory tables of JSON rows. Unique keys follow SQL semantics: a key
/// containing a null never conflicts.
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    unique_keys: HashMap<String, Vec<String>>,
    failing_names: Mutex<HashSet<String>>,
    fail_selects: Mutex<Option<String>>,
    fail_updates: Mutex<Option<String>>,
    next_id: AtomicU64,
    select_calls: AtomicU64,
    update_calls: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            unique_keys: HashMap::new(),
            failing_names: Mutex::new(HashSet::new()),
            fail_selects: Mutex::new(None),
            fail_updates: Mutex::new(None),
            next_id: AtomicU64::new(1000),
            select_calls: AtomicU64::new(0),
            update_calls: AtomicU64::new(0),
        }
    }

    /// Store with the prospect uniqueness constraint of the real schema.
    pub fn with_lead_schema() -> Self {
        Self::new().unique(
            schema::PROSPECTS_TABLE,
            &[prospect::CAMPAIGN_ID, prospect::MAP_URL],
        )
    }

    pub fn unique(mut self, table: &str, columns: &[&str]) -> Self {
        self.unique_keys.insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub fn seed(&self, table: &str, row: Value) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Make inserts of prospects with this business name fail with a non-duplicate error.
    pub fn fail_inserts_named(&self, name: &str) {
        self.failing_names.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_selects(&self, error: &str) {
        *self.fail_selects.lock().unwrap() = Some(error.to_string());
    }

    pub fn fail_updates(&self, error: &str) {
        *self.fail_updates.lock().unwrap() = Some(error.to_string());
    }

    pub fn select_calls(&self) -> u64 {
        self.select_calls.load(Ordering::Relaxed)
    }

    pub fn update_calls(&self) -> u64 {
        self.update_calls.load(Ordering::Relaxed)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Text form used for filter comparison, like `col::text` in SQL.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    filter
        .conditions()
        .iter()
        .all(|(col, val)| row.get(col).and_then(as_text).as_deref() == Some(val.as_str()))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select_one(&self, table: &str, filter: &Filter) -> std::result::Result<Option<Value>, StoreError> {
        self.select_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(e) = self.fail_selects.lock().unwrap().clone() {
            return Err(StoreError::Backend(e));
        }
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|r| matches(r, filter)).cloned()))
    }

    async fn insert_row(&self, table: &str, row: &Value) -> std::result::Result<(), InsertError> {
        let obj = row.as_object().ok_or(StoreError::NotAnObject)?;

        if let Some(name) = obj.get(prospect::BUSINESS_NAME).and_then(Value::as_str) {
            if self.failing_names.lock().unwrap().contains(name) {
                return Err(StoreError::Backend(format!("simulated failure for {name}")).into());
            }
        }

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();

        if let Some(key) = self.unique_keys.get(table) {
            let new_key: Option<Vec<String>> = key.iter().map(|c| obj.get(c).and_then(as_text)).collect();
            if let Some(new_key) = new_key {
                let conflict = rows.iter().any(|existing| {
                    let existing_key: Option<Vec<String>> =
                        key.iter().map(|c| existing.get(c).and_then(as_text)).collect();
                    existing_key.as_ref() == Some(&new_key)
                });
                if conflict {
                    return Err(InsertError::Duplicate(format!(
                        "duplicate key value violates unique constraint on {table} ({})",
                        key.join(", ")
                    )));
                }
            }
        }

        let mut stored = obj.clone();
        stored
            .entry("id".to_string())
            .or_insert_with(|| json!(self.next_id.fetch_add(1, Ordering::Relaxed)));
        rows.push(Value::Object(stored));
        Ok(())
    }

    async fn update_by_id(
        &self,
        table: &str,
        id: i64,
        guard: &Filter,
        fields: &Value,
    ) -> std::result::Result<u64, StoreError> {
        self.update_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(e) = self.fail_updates.lock().unwrap().clone() {
            return Err(StoreError::Backend(e));
        }
        let patch = fields.as_object().ok_or(StoreError::NotAnObject)?;

        let mut tables = self.tables.lock().unwrap();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };

        let mut updated = 0;
        for row in rows.iter_mut() {
            let id_matches = row.get("id").and_then(Value::as_i64) == Some(id);
            if id_matches && matches(row, guard) {
                if let Some(obj) = row.as_object_mut() {
                    for (k, v) in patch {
                        obj.insert(k.clone(), v.clone());
                    }
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }
}
