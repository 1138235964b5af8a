//! SQLite storage backend for TruthLens

use super::traits::{
    check_field_name, Document, DocumentQuery, DocumentStore, IndexSpec, OpenStore, StorageError,
    StorageResult, StoredDocument, CREATED_AT,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

struct Inner {
    conn: Connection,
    /// Last `createdAt` handed out; new timestamps never go below it.
    last_created_at: Option<DateTime<Utc>>,
    /// Declared composite indexes as (collection, index key).
    declared: HashSet<(String, String)>,
}

impl Inner {
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.last_created_at {
            Some(last) if last > now => last,
            _ => now,
        }
    }
}

/// SQLite-backed document store
///
/// All collections share one `documents` table; bodies are stored as JSON
/// and filtered with `json_extract`. Thread-safe via internal mutex on the
/// connection.
///
/// Queries that combine an equality filter with an ordering are refused
/// with [`StorageError::IndexRequired`] until the matching composite index
/// has been declared through [`DocumentStore::ensure_index`].
pub struct SqliteStore {
    inner: Mutex<Inner>,
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    // Fixed width, so text order is chronological order.
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::DateParse(e.to_string()))
}

fn field_expr(field: &str) -> String {
    if field == CREATED_AT {
        "created_at".to_string()
    } else {
        format!("json_extract(data_json, '$.{}')", field)
    }
}

fn check_order_field(field: &str) -> StorageResult<()> {
    if field == CREATED_AT {
        Ok(())
    } else {
        check_field_name(field)
    }
}

fn row_to_document(id: String, created_at: String, data_json: String) -> StorageResult<StoredDocument> {
    Ok(StoredDocument {
        id,
        created_at: parse_ts(&created_at)?,
        data: serde_json::from_str(&data_json)?,
    })
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                data_json TEXT NOT NULL,
                UNIQUE (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_documents_created
                ON documents(collection, created_at);

            -- Composite indexes declared through ensure_index
            CREATE TABLE IF NOT EXISTS composite_indexes (
                collection TEXT NOT NULL,
                index_key TEXT NOT NULL,
                spec_json TEXT NOT NULL,
                PRIMARY KEY (collection, index_key)
            );

            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::init_schema(&conn)?;

        let last_created_at = conn
            .query_row("SELECT MAX(created_at) FROM documents", [], |row| {
                row.get::<_, Option<String>>(0)
            })?
            .map(|raw| parse_ts(&raw))
            .transpose()?;

        let declared = {
            let mut stmt = conn.prepare("SELECT collection, index_key FROM composite_indexes")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            rows.collect::<Result<HashSet<_>, _>>()?
        };

        Ok(Self {
            inner: Mutex::new(Inner {
                conn,
                last_created_at,
                declared,
            }),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StorageError::Poisoned)
    }

    fn insert(
        inner: &mut Inner,
        collection: &str,
        id: &str,
        data: &Document,
    ) -> StorageResult<StoredDocument> {
        let created_at = inner.next_timestamp();
        inner.conn.execute(
            "INSERT INTO documents (collection, id, created_at, data_json) VALUES (?1, ?2, ?3, ?4)",
            params![collection, id, format_ts(&created_at), serde_json::to_string(data)?],
        )?;
        inner.last_created_at = Some(created_at);

        Ok(StoredDocument {
            id: id.to_string(),
            created_at,
            data: data.clone(),
        })
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> StorageResult<usize> {
        let inner = self.lock()?;
        let n: i64 = inner.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

impl DocumentStore for SqliteStore {
    fn create(&self, collection: &str, data: &Document) -> StorageResult<StoredDocument> {
        let mut inner = self.lock()?;
        let id = Uuid::new_v4().simple().to_string();
        Self::insert(&mut inner, collection, &id, data)
    }

    fn get(&self, collection: &str, id: &str) -> StorageResult<Option<StoredDocument>> {
        let inner = self.lock()?;
        let row: Option<(String, String, String)> = inner
            .conn
            .query_row(
                "SELECT id, created_at, data_json FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(id, created_at, data)| row_to_document(id, created_at, data))
            .transpose()
    }

    fn merge(&self, collection: &str, id: &str, fields: &Document) -> StorageResult<StoredDocument> {
        let mut inner = self.lock()?;
        let existing: Option<(String, String)> = inner
            .conn
            .query_row(
                "SELECT created_at, data_json FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((created_at, data_json)) = existing else {
            return Self::insert(&mut inner, collection, id, fields);
        };

        let mut data: Document = serde_json::from_str(&data_json)?;
        for (key, value) in fields {
            data.insert(key.clone(), value.clone());
        }
        inner.conn.execute(
            "UPDATE documents SET data_json = ?3 WHERE collection = ?1 AND id = ?2",
            params![collection, id, serde_json::to_string(&data)?],
        )?;

        Ok(StoredDocument {
            id: id.to_string(),
            created_at: parse_ts(&created_at)?,
            data,
        })
    }

    fn query(&self, collection: &str, query: &DocumentQuery) -> StorageResult<Vec<StoredDocument>> {
        for (field, _) in &query.filters {
            check_field_name(field)?;
        }
        if let Some(order) = &query.order {
            check_order_field(&order.field)?;
        }

        let inner = self.lock()?;

        if let Some(spec) = query.required_index(collection) {
            if !inner.declared.contains(&(collection.to_string(), spec.key())) {
                return Err(StorageError::IndexRequired(spec));
            }
        }

        let mut sql =
            String::from("SELECT id, created_at, data_json FROM documents WHERE collection = ?1");
        let mut values: Vec<SqlValue> = vec![SqlValue::Text(collection.to_string())];

        for (field, value) in &query.filters {
            let bound = match value {
                serde_json::Value::Null => {
                    sql.push_str(&format!(" AND {} IS NULL", field_expr(field)));
                    continue;
                }
                serde_json::Value::String(s) => SqlValue::Text(s.clone()),
                serde_json::Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => SqlValue::Integer(i),
                    None => SqlValue::Real(n.as_f64().unwrap_or_default()),
                },
                other => {
                    return Err(StorageError::InvalidDocument(format!(
                        "cannot filter '{}' on non-scalar value {}",
                        field, other
                    )))
                }
            };
            values.push(bound);
            sql.push_str(&format!(" AND {} = ?{}", field_expr(field), values.len()));
        }

        match &query.order {
            Some(order) => {
                let dir = order.direction.as_sql();
                sql.push_str(&format!(" ORDER BY {} {}, seq {}", field_expr(&order.field), dir, dir));
            }
            None => sql.push_str(" ORDER BY seq ASC"),
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = inner.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, created_at, data) = row?;
            documents.push(row_to_document(id, created_at, data)?);
        }
        Ok(documents)
    }

    fn ensure_index(&self, index: &IndexSpec) -> StorageResult<bool> {
        check_field_name(&index.collection)?;
        for field in &index.equality_fields {
            check_field_name(field)?;
        }
        check_order_field(&index.order_field)?;

        let mut inner = self.lock()?;
        let key = (index.collection.clone(), index.key());
        if inner.declared.contains(&key) {
            return Ok(false);
        }

        let dir = index.direction.as_sql();
        let name = format!(
            "cidx_{}_{}_{}_{}",
            index.collection,
            index.equality_fields.join("_"),
            index.order_field,
            dir.to_lowercase()
        );
        let mut columns = vec!["collection".to_string()];
        columns.extend(index.equality_fields.iter().map(|f| field_expr(f)));
        columns.push(format!("{} {}", field_expr(&index.order_field), dir));
        columns.push(format!("seq {}", dir));

        inner.conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS {} ON documents({})",
                name,
                columns.join(", ")
            ),
            [],
        )?;
        inner.conn.execute(
            "INSERT OR IGNORE INTO composite_indexes (collection, index_key, spec_json) VALUES (?1, ?2, ?3)",
            params![index.collection, key.1, serde_json::to_string(index)?],
        )?;
        inner.declared.insert(key);

        Ok(true)
    }

    fn probe(&self) -> StorageResult<()> {
        let inner = self.lock()?;
        inner
            .conn
            .query_row("SELECT COUNT(*) FROM (SELECT 1 FROM documents LIMIT 1)", [], |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(())
    }
}
