use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::any::{Any, AnyArguments};
use sqlx::query::Query;
use tracing::{debug, info};

use crate::database_ops::db::Db;
use crate::database_ops::schema::TableSchema;
use crate::normalization::{normalize_entity, Entity};

type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// Insert every entity, skipping rows whose primary key already exists.
///
/// Returns the number of entities processed, duplicates included. The first
/// failing row aborts the batch; earlier rows stay committed.
pub async fn upsert_entities(db: &mut Db, schema: &TableSchema, entities: &[Entity]) -> Result<usize> {
    let sql = schema.insert_sql(db.dialect());
    let mut processed = 0usize;
    let mut inserted = 0u64;

    for (idx, entity) in entities.iter().enumerate() {
        let record = normalize_entity(entity, schema.whole_floats);
        let key = record
            .get(schema.primary_key)
            .map(Value::to_string)
            .unwrap_or_else(|| "null".to_string());

        let mut query = sqlx::query(&sql);
        for column in schema.column_names() {
            query = bind_json(query, record.get(column));
        }
        let result = query.execute(db.conn()).await.with_context(|| {
            format!(
                "insert into `{}` failed at entity #{idx} ({}={key})",
                schema.name, schema.primary_key
            )
        })?;

        debug!(
            table = schema.name,
            key = %key,
            inserted = result.rows_affected() > 0,
            "row processed"
        );
        inserted += result.rows_affected();
        processed += 1;
    }

    info!(
        table = schema.name,
        processed,
        inserted,
        skipped = processed as u64 - inserted.min(processed as u64),
        "upsert finished"
    );
    Ok(processed)
}

/// Bind one record value; absent keys and JSON null both become SQL NULL.
fn bind_json<'q>(query: AnyQuery<'q>, value: Option<&Value>) -> AnyQuery<'q> {
    match value {
        None | Some(Value::Null) => query.bind(None::<String>),
        Some(Value::Bool(b)) => query.bind(*b),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Some(Value::String(s)) => query.bind(s.clone()),
        Some(other) => query.bind(other.to_string()),
    }
}
