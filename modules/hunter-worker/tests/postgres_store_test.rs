//! Integration tests for PgStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use serde_json::json;

use hunter_common::{schema, CampaignState};
use hunter_worker::store::PgStore;
use hunter_worker::{AdvanceOutcome, Filter, InsertError, ProspectStore, RecordStore};

/// Connect and migrate, or skip if no test DB is available.
async fn test_store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let store = PgStore::connect(&url).await.ok()?;
    store.migrate().await.ok()?;
    Some(store)
}

/// Insert a fresh campaign and return its id. Tests share the database, so
/// each one works on its own campaign.
async fn new_campaign(store: &PgStore, state: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO campanas (que_vendes, cliente_ideal, ubicacion, cantidad, estado) \
         VALUES ('X', 'Y', 'Miami', 20, $1) RETURNING id",
    )
    .bind(state)
    .fetch_one(store.pool())
    .await
    .unwrap()
}

#[tokio::test]
async fn select_one_reads_row_as_json() {
    let Some(store) = test_store().await else {
        return;
    };
    let id = new_campaign(&store, "buscando").await;

    let row = store
        .select_one(schema::CAMPAIGNS_TABLE, &Filter::new().eq("id", id))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(row["id"], id);
    assert_eq!(row["ubicacion"], "Miami");
    assert_eq!(row["cantidad"], 20);
    assert_eq!(row["estado"], "buscando");
}

#[tokio::test]
async fn select_one_none_when_no_match() {
    let Some(store) = test_store().await else {
        return;
    };
    let row = store
        .select_one(schema::CAMPAIGNS_TABLE, &Filter::new().eq("id", -1))
        .await
        .unwrap();
    assert!(row.is_none());
}

#[tokio::test]
async fn second_insert_with_same_map_url_is_duplicate() {
    let Some(store) = test_store().await else {
        return;
    };
    let id = new_campaign(&store, "buscando").await;
    let row = json!({
        "campana_id": id,
        "nombre_negocio": "Studio A",
        "url_google_maps": "https://maps.google.com/?cid=1",
        "estado_prospecto": "cazado",
    });

    store.insert_row(schema::PROSPECTS_TABLE, &row).await.unwrap();
    let second = store.insert_row(schema::PROSPECTS_TABLE, &row).await;

    assert!(matches!(second, Err(InsertError::Duplicate(_))));
}

#[tokio::test]
async fn null_map_urls_never_conflict() {
    let Some(store) = test_store().await else {
        return;
    };
    let id = new_campaign(&store, "buscando").await;
    let row = json!({ "campana_id": id, "nombre_negocio": "No URL", "url_google_maps": null });

    store.insert_row(schema::PROSPECTS_TABLE, &row).await.unwrap();
    store.insert_row(schema::PROSPECTS_TABLE, &row).await.unwrap();
}

#[tokio::test]
async fn unknown_column_is_not_a_duplicate() {
    let Some(store) = test_store().await else {
        return;
    };
    let result = store
        .insert_row(schema::PROSPECTS_TABLE, &json!({ "no_such_column": 1 }))
        .await;
    assert!(matches!(result, Err(InsertError::Other(_))));
}

#[tokio::test]
async fn advance_only_moves_campaign_once() {
    let Some(store) = test_store().await else {
        return;
    };
    let id = new_campaign(&store, "buscando").await;
    let pool = store.pool().clone();
    let prospects = ProspectStore::new(std::sync::Arc::new(store));

    let first = prospects
        .advance(id, &CampaignState::Searching, &CampaignState::Analyzing)
        .await
        .unwrap();
    let second = prospects
        .advance(id, &CampaignState::Searching, &CampaignState::Analyzing)
        .await
        .unwrap();

    assert_eq!(first, AdvanceOutcome::Advanced);
    assert_eq!(second, AdvanceOutcome::NotInState);

    let state: String = sqlx::query_scalar("SELECT estado FROM campanas WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(state, "analizando");
}

#[tokio::test]
async fn persist_twice_inserts_once() {
    let Some(store) = test_store().await else {
        return;
    };
    let id = new_campaign(&store, "buscando").await;
    let pool = store.pool().clone();
    let prospects = ProspectStore::new(std::sync::Arc::new(store));
    let batch = vec![
        hunter_common::RawPlaceRecord {
            name: Some("a".into()),
            map_url: Some(format!("https://maps.google.com/?cid={id}-a")),
            ..Default::default()
        },
        hunter_common::RawPlaceRecord {
            name: Some("b".into()),
            map_url: Some(format!("https://maps.google.com/?cid={id}-b")),
            ..Default::default()
        },
    ];

    let first = prospects.persist(batch.clone(), id).await;
    let second = prospects.persist(batch, id).await;

    assert_eq!(first.inserted, 2);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 2);

    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM prospectos WHERE campana_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
}
