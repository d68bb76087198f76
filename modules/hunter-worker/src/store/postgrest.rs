use async_trait::async_trait;
use serde_json::Value;

use postgrest_client::{PostgrestClient, PostgrestError};

use crate::traits::{Filter, InsertError, RecordStore, StoreError};

/// RecordStore over Supabase's PostgREST endpoint.
pub struct PostgrestStore {
    client: PostgrestClient,
}

impl PostgrestStore {
    pub fn new(url: &str, key: String) -> Self {
        Self {
            client: PostgrestClient::new(url, key),
        }
    }
}

fn to_rest_filter(filter: &Filter) -> postgrest_client::Filter {
    filter
        .conditions()
        .iter()
        .fold(postgrest_client::Filter::new(), |f, (col, val)| f.eq(col.as_str(), val))
}

fn backend(e: PostgrestError) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn select_one(&self, table: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let rows: Vec<Value> = self
            .client
            .select(table, &to_rest_filter(filter), Some(1))
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().next())
    }

    async fn insert_row(&self, table: &str, row: &Value) -> Result<(), InsertError> {
        if !row.is_object() {
            return Err(StoreError::NotAnObject.into());
        }
        match self.client.insert(table, row).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unique_violation() => Err(InsertError::Duplicate(e.to_string())),
            Err(e) => Err(backend(e).into()),
        }
    }

    async fn update_by_id(
        &self,
        table: &str,
        id: i64,
        guard: &Filter,
        fields: &Value,
    ) -> Result<u64, StoreError> {
        if !fields.is_object() {
            return Err(StoreError::NotAnObject);
        }
        let filter = to_rest_filter(guard).eq("id", id);
        self.client.update(table, &filter, fields).await.map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn duplicate_insert_maps_to_duplicate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/prospectos"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint \"prospectos_campana_id_url_google_maps_key\""
            })))
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "k".into());
        let err = store
            .insert_row("prospectos", &serde_json::json!({"nombre_negocio": "A"}))
            .await
            .unwrap_err();
        assert!(matches!(err, InsertError::Duplicate(_)));
    }

    #[tokio::test]
    async fn server_error_on_insert_is_other() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "k".into());
        let err = store
            .insert_row("prospectos", &serde_json::json!({"nombre_negocio": "A"}))
            .await
            .unwrap_err();
        assert!(matches!(err, InsertError::Other(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn update_filters_by_id_and_guard() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/campanas"))
            .and(query_param("id", "eq.4"))
            .and(query_param("estado", "eq.buscando"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"id": 4, "estado": "analizando"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "k".into());
        let updated = store
            .update_by_id(
                "campanas",
                4,
                &Filter::new().eq("estado", "buscando"),
                &serde_json::json!({"estado": "analizando"}),
            )
            .await
            .unwrap();
        assert_eq!(updated, 1);
    }

    #[tokio::test]
    async fn select_one_returns_first_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/campanas"))
            .and(query_param("limit", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": 1}])),
            )
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "k".into());
        let row = store
            .select_one("campanas", &Filter::new().eq("estado", "buscando"))
            .await
            .unwrap();
        assert_eq!(row, Some(serde_json::json!({"id": 1})));
    }
}
