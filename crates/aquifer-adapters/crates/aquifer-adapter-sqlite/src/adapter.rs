//! SQLite implementation of the data adapter contract

use crate::schema;
use aquifer_core::{
    AdapterConfig, DataAdapter, Error, FieldType, IdentitySource, Migration, MigrationOutcome,
    QueryResult, Result, Row, StatementResult, TransactionWork, Value, ViewSource,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};

const MIGRATIONS_DDL: &str = "CREATE TABLE IF NOT EXISTS \"migrations\" (\
    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \
    \"applies_to\" TEXT NOT NULL, \
    \"model\" TEXT NULL, \
    \"description\" TEXT NULL, \
    \"version\" TEXT NOT NULL)";

const INCREMENT_DDL: &str = "CREATE TABLE IF NOT EXISTS \"increment_id\" (\
    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \
    \"entity\" TEXT NOT NULL, \
    \"attribute\" TEXT NOT NULL, \
    \"value\" INTEGER NOT NULL)";

/// A single SQLite connection exposed through the adapter contract
///
/// rusqlite is synchronous; the connection sits behind a `parking_lot`
/// mutex and operations run inline on the calling task, which is fine for
/// SQLite's in-process latencies. The connection opens lazily on
/// [`DataAdapter::open`] and can be reopened after a close.
#[derive(Debug)]
pub struct SqliteAdapter {
    path: String,
    conn: Mutex<Option<Connection>>,
}

impl SqliteAdapter {
    /// Create an adapter for the database at `path` (`:memory:` works)
    ///
    /// No connection is made until `open`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            conn: Mutex::new(None),
        }
    }

    /// Create an adapter from a configuration
    ///
    /// Requires a `database` (or legacy `path`) parameter naming the file.
    pub fn from_config(config: &AdapterConfig) -> Result<Self> {
        let path = config
            .get_string("database")
            .or_else(|| config.get_string("path"))
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "sqlite adapter '{}' requires a 'database' parameter",
                    config.name
                ))
            })?;
        Ok(Self::new(path))
    }

    fn connect(path: &str) -> Result<Connection> {
        tracing::debug!(path = %path, "opening sqlite database");
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            Connection::open_with_flags(path, flags)
        }
        .map_err(|e| {
            Error::Configuration(format!("failed to open sqlite database at '{path}': {e}"))
        })?;

        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(query_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(query_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(query_err)?;
        Ok(conn)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(Error::Query("sqlite connection is not open".into())),
        }
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let result = self
            .query(
                "SELECT COUNT(*) AS cnt FROM sqlite_master WHERE type = 'table' AND name = ?",
                &[Value::from(table)],
            )
            .await?;
        Ok(result.value(0, "cnt").and_then(Value::as_i64).unwrap_or(0) > 0)
    }

    async fn existing_columns(&self, table: &str) -> Result<Vec<String>> {
        let result = self
            .query(&format!("PRAGMA table_info('{table}')"), &[])
            .await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.get(1).and_then(Value::as_str).map(str::to_string))
            .collect())
    }
}

#[async_trait]
impl DataAdapter for SqliteAdapter {
    fn adapter_name(&self) -> &str {
        "sqlite"
    }

    async fn open(&self) -> Result<()> {
        let mut guard = self.conn.lock();
        if guard.is_none() {
            *guard = Some(Self::connect(&self.path)?);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let conn = self.conn.lock().take();
        if conn.is_some() {
            tracing::debug!(path = %self.path, "closing sqlite connection");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(80).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.with_conn(|conn| {
            let bound = bind_params(params);
            let affected = conn
                .execute(sql, params_from_iter(bound.iter()))
                .map_err(query_err)?;
            tracing::trace!(affected_rows = affected, "statement executed");
            Ok(StatementResult::new(affected as u64))
        })
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(80).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.with_conn(|conn| {
            let bound = bind_params(params);
            let mut stmt = conn.prepare(sql).map_err(query_err)?;
            let columns: Vec<String> = stmt
                .column_names()
                .iter()
                .map(|name| name.to_string())
                .collect();

            let mut rows = Vec::new();
            let mut raw = stmt
                .query(params_from_iter(bound.iter()))
                .map_err(query_err)?;
            while let Some(raw_row) = raw.next().map_err(query_err)? {
                let mut values = Vec::with_capacity(columns.len());
                for idx in 0..columns.len() {
                    values.push(column_value(raw_row, idx)?);
                }
                rows.push(Row::new(values));
            }
            tracing::trace!(row_count = rows.len(), "query executed");
            Ok(QueryResult::new(columns, rows))
        })
    }

    async fn execute_in_transaction(&self, work: TransactionWork) -> Result<()> {
        // DEFERRED takes the write lock on first write, matching the
        // default transaction behavior callers expect.
        self.with_conn(|conn| conn.execute_batch("BEGIN DEFERRED").map_err(query_err))?;
        match work(self).await {
            Ok(()) => self.with_conn(|conn| conn.execute_batch("COMMIT").map_err(query_err)),
            Err(error) => {
                if let Err(rollback_error) =
                    self.with_conn(|conn| conn.execute_batch("ROLLBACK").map_err(query_err))
                {
                    tracing::error!(%rollback_error, "rollback failed after transaction error");
                }
                Err(error)
            }
        }
    }

    /// Apply a migration at most once per (`applies_to`, `version`)
    ///
    /// Applied versions are tracked in a `migrations` bookkeeping table.
    /// A missing target table is created from the `add` column list;
    /// an existing table gains whichever `add` columns it lacks. SQLite
    /// cannot alter or drop columns in place, so `change` and `remove`
    /// entries are logged and skipped.
    #[tracing::instrument(skip(self, migration), fields(applies_to = %migration.applies_to, version = %migration.version))]
    async fn migrate(&self, migration: &Migration) -> Result<MigrationOutcome> {
        self.execute(MIGRATIONS_DDL, &[]).await?;

        let applied = self
            .query(
                "SELECT COUNT(*) AS cnt FROM \"migrations\" WHERE \"applies_to\" = ? AND \"version\" = ?",
                &[
                    Value::from(migration.applies_to.as_str()),
                    Value::from(migration.version.as_str()),
                ],
            )
            .await?;
        if applied.value(0, "cnt").and_then(Value::as_i64).unwrap_or(0) > 0 {
            tracing::debug!("migration already applied");
            return Ok(MigrationOutcome::AlreadyApplied);
        }

        if self.table_exists(&migration.applies_to).await? {
            let existing = self.existing_columns(&migration.applies_to).await?;
            for field in &migration.add {
                if existing.iter().any(|name| name == &field.name) {
                    continue;
                }
                if field.field_type == FieldType::Counter {
                    return Err(Error::Migration(format!(
                        "cannot add autoincrement column '{}' to existing table '{}'",
                        field.name, migration.applies_to
                    )));
                }
                self.execute(
                    &format!(
                        "ALTER TABLE \"{}\" ADD COLUMN {}",
                        migration.applies_to,
                        schema::column_def(field)
                    ),
                    &[],
                )
                .await?;
            }
            if !migration.change.is_empty() || !migration.remove.is_empty() {
                tracing::warn!(
                    change = migration.change.len(),
                    remove = migration.remove.len(),
                    "sqlite cannot alter or drop columns in place; skipped"
                );
            }
        } else {
            self.execute(
                &schema::create_table_sql(&migration.applies_to, &migration.add),
                &[],
            )
            .await?;
        }

        self.execute(
            "INSERT INTO \"migrations\" (\"applies_to\", \"model\", \"description\", \"version\") VALUES (?, ?, ?, ?)",
            &[
                Value::from(migration.applies_to.as_str()),
                Value::from(migration.model.as_str()),
                migration
                    .description
                    .as_deref()
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                Value::from(migration.version.as_str()),
            ],
        )
        .await?;
        tracing::info!("migration applied");
        Ok(MigrationOutcome::Applied)
    }

    fn as_identity_source(&self) -> Option<&dyn IdentitySource> {
        Some(self)
    }

    fn as_view_source(&self) -> Option<&dyn ViewSource> {
        Some(self)
    }
}

#[async_trait]
impl IdentitySource for SqliteAdapter {
    async fn last_identity(&self) -> Result<Value> {
        self.with_conn(|conn| Ok(Value::Int(conn.last_insert_rowid())))
    }

    /// Bump the persistent counter for `entity.attribute`
    ///
    /// The whole read-modify-write runs under the connection mutex, so
    /// concurrent producers on this adapter never repeat a value.
    async fn select_identity(&self, entity: &str, attribute: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute_batch(INCREMENT_DDL).map_err(query_err)?;
            let current: Option<i64> = conn
                .query_row(
                    "SELECT \"value\" FROM \"increment_id\" WHERE \"entity\" = ?1 AND \"attribute\" = ?2",
                    params![entity, attribute],
                    |row| row.get(0),
                )
                .optional()
                .map_err(query_err)?;
            match current {
                Some(value) => {
                    let next = value + 1;
                    conn.execute(
                        "UPDATE \"increment_id\" SET \"value\" = ?1 WHERE \"entity\" = ?2 AND \"attribute\" = ?3",
                        params![next, entity, attribute],
                    )
                    .map_err(query_err)?;
                    Ok(next)
                }
                None => {
                    conn.execute(
                        "INSERT INTO \"increment_id\" (\"entity\", \"attribute\", \"value\") VALUES (?1, ?2, 1)",
                        params![entity, attribute],
                    )
                    .map_err(query_err)?;
                    Ok(1)
                }
            }
        })
    }
}

#[async_trait]
impl ViewSource for SqliteAdapter {
    async fn create_view(&self, name: &str, query: &str) -> Result<()> {
        tracing::debug!(view = %name, "creating view");
        self.with_conn(|conn| {
            conn.execute_batch(&format!(
                "DROP VIEW IF EXISTS \"{name}\"; CREATE VIEW \"{name}\" AS {query}"
            ))
            .map_err(query_err)
        })
    }
}

fn query_err(e: rusqlite::Error) -> Error {
    Error::Query(e.to_string())
}

fn bind_params(params: &[Value]) -> Vec<rusqlite::types::Value> {
    params
        .iter()
        .map(|value| match value {
            Value::Null => rusqlite::types::Value::Null,
            Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
            Value::Int(i) => rusqlite::types::Value::Integer(*i),
            Value::Float(f) => rusqlite::types::Value::Real(*f),
            Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
            Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
        })
        .collect()
}

fn column_value(row: &rusqlite::Row<'_>, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value = match row.get_ref(idx).map_err(query_err)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    };
    Ok(value)
}
