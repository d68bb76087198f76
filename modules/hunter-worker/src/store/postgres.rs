// RecordStore over a direct Postgres connection.
//
// Rows travel as JSON: reads use `to_jsonb`, writes go through
// `jsonb_populate_record` so column types come from the table itself.
// Table and column names are interpolated into SQL and must pass `ident`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::traits::{Filter, InsertError, RecordStore, StoreError};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the campaign and prospect tables if missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Accept only plain lowercase SQL identifiers.
fn ident(name: &str) -> Result<&str, StoreError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// `t.col::text = $n AND ...`, numbering placeholders from `first`.
fn where_clause(filter: &Filter, first: usize) -> Result<String, StoreError> {
    if filter.conditions().is_empty() {
        return Ok("TRUE".to_string());
    }
    let parts = filter
        .conditions()
        .iter()
        .enumerate()
        .map(|(i, (col, _))| -> Result<String, StoreError> {
            Ok(format!("t.{}::text = ${}", ident(col)?, first + i))
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(parts.join(" AND "))
}

/// Validated, comma-separated column list from the keys of a JSON object.
fn column_list(row: &Value) -> Result<String, StoreError> {
    let obj = row.as_object().ok_or(StoreError::NotAnObject)?;
    if obj.is_empty() {
        return Err(StoreError::NotAnObject);
    }
    let cols = obj
        .keys()
        .map(|k| ident(k).map(str::to_string))
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(cols.join(", "))
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl RecordStore for PgStore {
    async fn select_one(&self, table: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let sql = format!(
            "SELECT to_jsonb(t) FROM {} t WHERE {} LIMIT 1",
            ident(table)?,
            where_clause(filter, 1)?
        );

        let mut query = sqlx::query_scalar::<_, Value>(&sql);
        for (_, value) in filter.conditions() {
            query = query.bind(value);
        }
        query.fetch_optional(&self.pool).await.map_err(backend)
    }

    async fn insert_row(&self, table: &str, row: &Value) -> Result<(), InsertError> {
        let table = ident(table)?;
        let cols = column_list(row)?;
        let sql = format!(
            "INSERT INTO {table} ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1)"
        );

        match sqlx::query(&sql).bind(row).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(InsertError::Duplicate(db.message().to_string()))
            }
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
        let table = ident(table)?;
        let cols = column_list(fields)?;
        let sql = format!(
            "UPDATE {table} t SET ({cols}) = (SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1)) \
             WHERE t.id = $2 AND {}",
            where_clause(guard, 3)?
        );

        let mut query = sqlx::query(&sql).bind(fields).bind(id);
        for (_, value) in guard.conditions() {
            query = query.bind(value);
        }
        let result = query.execute(&self.pool).await.map_err(backend)?;
        Ok(result.rows_affected())
    }
}
