// SQLite persistence layer for the statistics warehouse.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::types::{Null, ToSql, ToSqlOutput};
use rusqlite::{params, Connection};

use crate::config::TeamEntry;
use crate::mapper::{Record, TeamResolver, Value};
use crate::schema::{FieldType, TableSchema, ALL_TABLES};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Int(n) => ToSqlOutput::from(*n),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Null => ToSqlOutput::from(Null),
        })
    }
}

/// SQLite-backed warehouse: one table per statistical category, each with a
/// UNIQUE constraint over its natural key. All writes go through
/// `INSERT OR IGNORE` (or an explicit upsert for the teams dimension), so
/// every import step is safely re-runnable.
pub struct Warehouse {
    conn: Mutex<Connection>,
}

impl Warehouse {
    /// Open (or create) the warehouse at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral database (useful for
    /// tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        for schema in ALL_TABLES {
            conn.execute_batch(&ddl(schema))
                .with_context(|| format!("failed to create table {}", schema.table))?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Build the existing-key index for one table: a single projection
    /// query over the natural-key columns, canonicalized with the same
    /// rules the mapper uses. Never queried row-by-row; tables may hold
    /// millions of rows and this runs once per import step.
    pub fn existing_keys(&self, schema: &TableSchema) -> Result<HashSet<Vec<String>>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {} FROM {}",
            schema.natural_key.join(", "),
            schema.table
        );
        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("failed to prepare key query for {}", schema.table))?;

        let key_types: Vec<FieldType> = schema
            .key_indices()
            .into_iter()
            .map(|i| schema.fields[i].ty)
            .collect();

        let mut keys = HashSet::new();
        let mut rows = stmt
            .query([])
            .with_context(|| format!("failed to query keys from {}", schema.table))?;
        while let Some(row) = rows
            .next()
            .with_context(|| format!("failed to read key row from {}", schema.table))?
        {
            let mut key = Vec::with_capacity(key_types.len());
            for (i, ty) in key_types.iter().enumerate() {
                let value = match ty {
                    FieldType::Int | FieldType::Bool => Value::Int(row.get(i)?),
                    FieldType::Float => Value::Float(row.get(i)?),
                    FieldType::Text => Value::Text(row.get(i)?),
                };
                key.push(value.canonical());
            }
            keys.insert(key);
        }
        Ok(keys)
    }

    /// Flush one batch inside a transaction using a prepared
    /// `INSERT OR IGNORE`. Returns the number of rows actually created;
    /// the difference from `records.len()` is natural-key conflicts, which
    /// are silent no-ops by design.
    pub fn insert_batch(&self, schema: &TableSchema, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .with_context(|| format!("failed to begin batch transaction for {}", schema.table))?;

        let created = {
            let columns: Vec<&str> = schema.fields.iter().map(|f| f.name).collect();
            let placeholders: Vec<String> =
                (1..=columns.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
                schema.table,
                columns.join(", "),
                placeholders.join(", ")
            );
            let mut stmt = tx
                .prepare(&sql)
                .with_context(|| format!("failed to prepare insert for {}", schema.table))?;

            let mut created = 0usize;
            for record in records {
                created += stmt
                    .execute(rusqlite::params_from_iter(record.values()))
                    .with_context(|| format!("failed to insert into {}", schema.table))?;
            }
            created
        };

        tx.commit()
            .with_context(|| format!("failed to commit batch for {}", schema.table))?;
        Ok(created)
    }

    /// Insert a team or update its metadata if the `team_id` row already
    /// exists, in a single atomic statement.
    pub fn upsert_team(&self, team: &TeamEntry) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO teams (team_id, team_name, team_abb, team_conference, team_division)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(team_id) DO UPDATE SET
                team_name       = excluded.team_name,
                team_abb        = excluded.team_abb,
                team_conference = excluded.team_conference,
                team_division   = excluded.team_division",
            params![
                team.team_id,
                team.name,
                team.abb,
                team.conference,
                team.division,
            ],
        )
        .with_context(|| format!("failed to upsert team {}", team.abb))?;
        Ok(())
    }

    /// Build the relation-resolution lookup from the persisted teams.
    pub fn team_resolver(&self) -> Result<TeamResolver> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT team_id, team_abb, team_name FROM teams")
            .context("failed to prepare team lookup query")?;
        let teams = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get(1)?, row.get(2)?))
            })
            .context("failed to query teams")?
            .collect::<std::result::Result<Vec<(i64, String, String)>, _>>()
            .context("failed to map team rows")?;
        Ok(TeamResolver::new(teams))
    }

    /// Number of persisted rows in a table.
    pub fn count(&self, table: &str) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .with_context(|| format!("failed to count rows in {table}"))?;
        Ok(count as usize)
    }

    /// Delete all imported data, fact tables before reference tables (the
    /// exact reverse of import order, respecting foreign keys), in one
    /// transaction. Returns per-table deleted counts in deletion order.
    pub fn wipe_all(&self) -> Result<Vec<(&'static str, usize)>> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin wipe transaction")?;

        let mut deleted = Vec::with_capacity(ALL_TABLES.len());
        for schema in ALL_TABLES.iter().rev() {
            let count = tx
                .execute(&format!("DELETE FROM {}", schema.table), [])
                .with_context(|| format!("failed to delete from {}", schema.table))?;
            deleted.push((schema.table, count));
        }

        tx.commit().context("failed to commit wipe")?;
        Ok(deleted)
    }
}

/// Generate `CREATE TABLE` DDL for a schema descriptor: surrogate id,
/// declared columns, ingestion timestamp, UNIQUE over the natural key.
fn ddl(schema: &TableSchema) -> String {
    let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    for spec in schema.fields {
        let mut column = format!("{} {}", spec.name, spec.ty.sql_type());
        if !spec.nullable {
            column.push_str(" NOT NULL");
        }
        // The players dimension carries a best-effort link to teams.
        if schema.table == "players" && spec.name == "team_id" {
            column.push_str(" REFERENCES teams(team_id)");
        }
        columns.push(column);
    }
    columns.push(
        "created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))".to_string(),
    );
    columns.push(format!("UNIQUE({})", schema.natural_key.join(", ")));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        schema.table,
        columns.join(",\n    ")
    )
}
