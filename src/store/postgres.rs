use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{project, Collection, StoreError};
use crate::query::ast::is_valid_field;
use crate::query::{CompareOp, Condition, DocQuery};

/// Collections this deployment knows about; one JSONB table each.
pub const COLLECTIONS: &[&str] = &["articles", "users"];

/// Postgres-backed document store. Each collection is a table of
/// `(id uuid primary key, doc jsonb)`; the query AST is translated to SQL
/// with every user value going through a bind parameter.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Self { pool })
    }

    /// Create collection tables when missing. Idempotent, run at startup.
    pub async fn ensure_collections(&self) -> Result<(), StoreError> {
        for table in COLLECTIONS {
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (id uuid PRIMARY KEY, doc jsonb NOT NULL)",
                table
            );
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn collection(&self, table: &str) -> Result<PgCollection, StoreError> {
        if !is_valid_field(table) {
            return Err(StoreError::Query(format!("invalid collection name: {}", table)));
        }
        Ok(PgCollection { pool: self.pool.clone(), table: table.to_string() })
    }
}

pub struct PgCollection {
    pool: PgPool,
    table: String,
}

/// A document path expression, validated before interpolation.
fn field_expr(field: &str) -> Result<String, StoreError> {
    if !is_valid_field(field) {
        return Err(StoreError::Query(format!("invalid field name: {}", field)));
    }
    Ok(format!("doc->'{}'", field))
}

/// Translate one condition into SQL, pushing its value onto the bind list.
/// All params are bound as JSONB so comparisons use jsonb ordering, which
/// ranks numbers numerically and strings lexicographically (RFC 3339
/// timestamps therefore order chronologically).
fn condition_sql(condition: &Condition, params: &mut Vec<Value>) -> Result<String, StoreError> {
    let expr = field_expr(&condition.field)?;
    params.push(condition.value.clone());
    let n = params.len();
    let sql = match condition.op {
        CompareOp::Eq => format!(
            "({expr} = ${n} OR (jsonb_typeof({expr}) = 'array' AND {expr} @> jsonb_build_array(${n})))"
        ),
        CompareOp::Gt => format!("{expr} > ${n}"),
        CompareOp::Gte => format!("{expr} >= ${n}"),
        CompareOp::Lt => format!("{expr} < ${n}"),
        CompareOp::Lte => format!("{expr} <= ${n}"),
        CompareOp::In => format!(
            "({expr} IN (SELECT value FROM jsonb_array_elements(${n})) \
             OR (jsonb_typeof({expr}) = 'array' AND EXISTS (\
                 SELECT 1 FROM jsonb_array_elements({expr}) e \
                 WHERE e IN (SELECT value FROM jsonb_array_elements(${n})))))"
        ),
    };
    Ok(sql)
}

fn where_clause(conditions: &[Condition], params: &mut Vec<Value>) -> Result<String, StoreError> {
    if conditions.is_empty() {
        return Ok(String::new());
    }
    let parts = conditions
        .iter()
        .map(|c| condition_sql(c, params))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("WHERE {}", parts.join(" AND ")))
}

fn order_clause(query: &DocQuery) -> Result<String, StoreError> {
    if query.sort.is_empty() {
        return Ok(String::new());
    }
    let parts = query
        .sort
        .iter()
        .map(|key| {
            let expr = field_expr(&key.field)?;
            Ok(format!("{} {}", expr, if key.descending { "DESC" } else { "ASC" }))
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(format!("ORDER BY {}", parts.join(", ")))
}

fn bind_params<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    for p in params {
        q = q.bind(p);
    }
    q
}

#[async_trait]
impl Collection for PgCollection {
    async fn find(&self, query: &DocQuery) -> Result<Vec<Value>, StoreError> {
        let mut params: Vec<Value> = Vec::new();
        let where_sql = where_clause(&query.conditions, &mut params)?;
        let order_sql = order_clause(query)?;
        let limit_sql = match query.limit {
            Some(limit) => format!("LIMIT {} OFFSET {}", limit, query.skip),
            None if query.skip > 0 => format!("OFFSET {}", query.skip),
            None => String::new(),
        };

        let sql = [
            format!("SELECT doc FROM \"{}\"", self.table),
            where_sql,
            order_sql,
            limit_sql,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        let rows: Vec<PgRow> = bind_params(sqlx::query(&sql), &params)
            .fetch_all(&self.pool)
            .await?;
        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let doc: Value = row.try_get("doc")?;
            docs.push(match &query.projection {
                Some(fields) => project(doc, fields),
                None => doc,
            });
        }
        Ok(docs)
    }

    async fn count(&self, conditions: &[Condition]) -> Result<u64, StoreError> {
        let mut params: Vec<Value> = Vec::new();
        let where_sql = where_clause(conditions, &mut params)?;
        let sql = format!("SELECT COUNT(*) AS count FROM \"{}\" {}", self.table, where_sql);
        let row = bind_params(sqlx::query(&sql), &params).fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as u64)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Value>, StoreError> {
        let sql = format!("SELECT doc FROM \"{}\" WHERE id = $1", self.table);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| r.try_get::<Value, _>("doc")).transpose().map_err(Into::into)
    }

    async fn insert(&self, mut doc: Value) -> Result<Value, StoreError> {
        let id = doc
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);
        doc["id"] = json!(id);
        let sql = format!("INSERT INTO \"{}\" (id, doc) VALUES ($1, $2)", self.table);
        sqlx::query(&sql).bind(id).bind(&doc).execute(&self.pool).await?;
        Ok(doc)
    }

    async fn update(
        &self,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let patch = Value::Object(fields);
        let sql = format!(
            "UPDATE \"{}\" SET doc = doc || $2 WHERE id = $1 RETURNING doc",
            self.table
        );
        let row = sqlx::query(&sql).bind(id).bind(&patch).fetch_optional(&self.pool).await?;
        row.map(|r| r.try_get::<Value, _>("doc")).transpose().map_err(Into::into)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = $1", self.table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn push_unique(&self, id: Uuid, field: &str, value: Value) -> Result<bool, StoreError> {
        if !is_valid_field(field) {
            return Err(StoreError::Query(format!("invalid field name: {}", field)));
        }
        // Single-statement append keeps the operation atomic per document.
        let sql = format!(
            "UPDATE \"{table}\" \
             SET doc = jsonb_set(doc, '{{{field}}}', coalesce(doc->'{field}', '[]'::jsonb) || $2) \
             WHERE id = $1 AND NOT coalesce(doc->'{field}', '[]'::jsonb) @> $2",
            table = self.table,
            field = field,
        );
        let wrapped = Value::Array(vec![value]);
        let result = sqlx::query(&sql).bind(id).bind(&wrapped).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn pull(&self, id: Uuid, field: &str, value: Value) -> Result<bool, StoreError> {
        if !is_valid_field(field) {
            return Err(StoreError::Query(format!("invalid field name: {}", field)));
        }
        let sql = format!(
            "UPDATE \"{table}\" \
             SET doc = jsonb_set(doc, '{{{field}}}', (\
                 SELECT coalesce(jsonb_agg(e), '[]'::jsonb) \
                 FROM jsonb_array_elements(coalesce(doc->'{field}', '[]'::jsonb)) e \
                 WHERE e <> $2)) \
             WHERE id = $1",
            table = self.table,
            field = field,
        );
        let result = sqlx::query(&sql).bind(id).bind(&value).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
