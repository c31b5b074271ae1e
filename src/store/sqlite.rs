use super::row::MarkupRow;
use super::EntryStore;
use crate::errors::{JournalError, JournalResult};
use crate::markup::MarkupEntry;
use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value as JsonValue;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub type DbPool = Arc<Mutex<Connection>>;

/// Column order shared by every statement. Names match `MarkupRow` fields.
const COLUMNS: [&str; 19] = [
    "id",
    "datetime_local",
    "symbol",
    "timeframe",
    "strategy",
    "characteristics",
    "trade_result",
    "pips",
    "pips_tp1",
    "result_tp1",
    "pips_tp2",
    "result_tp2",
    "pips_tp3",
    "result_tp3",
    "pips_sl",
    "capital_pct",
    "notes",
    "screenshots",
    "screenshot_data_url",
];

/// Columns holding a JSON document rather than a scalar.
const JSON_COLUMNS: [&str; 2] = ["characteristics", "screenshots"];

pub fn init_db(data_dir: &Path) -> JournalResult<DbPool> {
    std::fs::create_dir_all(data_dir).map_err(|e| JournalError::Database(format!("create dir: {e}")))?;
    let db_path = data_dir.join("carnilek.db");
    let conn = Connection::open(&db_path)?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
    apply_schema(&conn)?;

    tracing::info!("database initialized at {}", db_path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

fn apply_schema(conn: &Connection) -> JournalResult<()> {
    let schema = include_str!("../../migrations/001_init.sql");
    conn.execute_batch(schema)?;
    Ok(())
}

/// Entry store on the embedded SQLite database.
#[derive(Clone)]
pub struct SqliteEntryStore {
    db: DbPool,
}

impl SqliteEntryStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn open_in_memory() -> JournalResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    fn lock(&self) -> JournalResult<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| JournalError::Database(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn list(&self) -> JournalResult<Vec<MarkupEntry>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM markups ORDER BY datetime_local DESC", COLUMNS.join(", "));
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            (0..COLUMNS.len())
                .map(|i| row.get::<_, SqlValue>(i))
                .collect::<rusqlite::Result<Vec<SqlValue>>>()
        })?;

        let mut entries = Vec::new();
        for values in rows {
            match row_from_values(values?) {
                Ok(row) => entries.push(MarkupEntry::from(row)),
                Err(e) => tracing::warn!(error = %e, "skipping undecodable markup row"),
            }
        }
        Ok(entries)
    }

    async fn create(&self, entry: &MarkupEntry) -> JournalResult<()> {
        let conn = self.lock()?;
        let exists = conn
            .query_row("SELECT 1 FROM markups WHERE id = ?1", [&entry.id], |_| Ok(()))
            .optional()?;
        if exists.is_some() {
            return Err(JournalError::Conflict(entry.id.clone()));
        }

        let placeholders: Vec<String> = (1..=COLUMNS.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO markups ({}) VALUES ({})",
            COLUMNS.join(", "),
            placeholders.join(", ")
        );
        conn.execute(&sql, rusqlite::params_from_iter(values_from_entry(entry)?))?;
        Ok(())
    }

    async fn update(&self, entry: &MarkupEntry) -> JournalResult<()> {
        let conn = self.lock()?;
        // ?1 is the id; the remaining columns follow in order
        let assignments: Vec<String> = COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, c)| format!("{c} = ?{}", i + 1))
            .collect();
        let sql = format!(
            "UPDATE markups SET {}, updated_at = datetime('now') WHERE id = ?1",
            assignments.join(", ")
        );
        let changed = conn.execute(&sql, rusqlite::params_from_iter(values_from_entry(entry)?))?;
        if changed == 0 {
            return Err(JournalError::NotFound(entry.id.clone()));
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> JournalResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM markups WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(JournalError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn values_from_entry(entry: &MarkupEntry) -> JournalResult<Vec<SqlValue>> {
    let json = serde_json::to_value(MarkupRow::from(entry))?;
    Ok(COLUMNS.iter().map(|c| to_sql(&json[*c])).collect())
}

fn to_sql(value: &JsonValue) -> SqlValue {
    match value {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        JsonValue::Number(n) => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        JsonValue::String(s) => SqlValue::Text(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => SqlValue::Text(value.to_string()),
    }
}

fn row_from_values(values: Vec<SqlValue>) -> JournalResult<MarkupRow> {
    let mut object = serde_json::Map::with_capacity(COLUMNS.len());
    for (column, value) in COLUMNS.iter().zip(values) {
        let json = match value {
            SqlValue::Null | SqlValue::Blob(_) => JsonValue::Null,
            SqlValue::Integer(i) => JsonValue::from(i),
            SqlValue::Real(f) => serde_json::Number::from_f64(f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Text(s) if JSON_COLUMNS.contains(column) => serde_json::from_str(&s)?,
            SqlValue::Text(s) => JsonValue::String(s),
        };
        object.insert((*column).to_string(), json);
    }
    Ok(serde_json::from_value(JsonValue::Object(object))?)
}
