//! SQLite-backed SQL execution service.
//!
//! Tables are loaded in a single transaction that covers the `CREATE TABLE`,
//! every row insert, and the mapping entries recorded for the table in
//! [`MAPPING_TABLE`]. A failure anywhere leaves neither the table nor its
//! mappings behind. Entries left over from an earlier table of the same name
//! are replaced, never merged. File-backed stores keep those mapping entries for later
//! sessions; in-memory stores lose them with the process.

use anyhow::{Context, Result, anyhow};
use log::debug;
use rusqlite::{Connection, Params, Statement, params, params_from_iter, types::ValueRef};

use crate::{error::LoadError, ingest::TablePlan};

pub const MEMORY_LOCATION: &str = ":memory:";
pub const MAPPING_TABLE: &str = "_csvsql_header_mappings";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Rows(ResultSet),
    Affected(usize),
}

pub struct Database {
    conn: Connection,
    location: String,
}

impl Database {
    pub fn open(location: &str) -> Result<Self> {
        let conn = if location == MEMORY_LOCATION {
            Connection::open_in_memory()
        } else {
            Connection::open(location)
        }
        .with_context(|| format!("Opening database at {location}"))?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {MAPPING_TABLE} (
                table_name TEXT NOT NULL,
                original TEXT NOT NULL,
                identifier TEXT NOT NULL,
                PRIMARY KEY (table_name, original)
            );"
        ))
        .with_context(|| format!("Preparing mapping table in {location}"))?;
        Ok(Self {
            conn,
            location: location.to_string(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(MEMORY_LOCATION)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn is_persistent(&self) -> bool {
        self.location != MEMORY_LOCATION
    }

    pub fn load_table(&mut self, plan: &TablePlan, rows: &[Vec<String>]) -> Result<(), LoadError> {
        let expected = plan.columns.len();
        let tx = self.conn.transaction()?;
        let ddl = plan.create_table_sql();
        debug!("{ddl}");
        tx.execute(&ddl, []).map_err(|source| LoadError::Schema {
            table: plan.table.clone(),
            source,
        })?;
        {
            let mut insert = tx.prepare(&plan.insert_sql())?;
            for (idx, row) in rows.iter().enumerate() {
                let line = idx + 2;
                if row.len() != expected {
                    return Err(LoadError::ColumnCount {
                        table: plan.table.clone(),
                        row: line,
                        expected,
                        found: row.len(),
                    });
                }
                insert
                    .execute(params_from_iter(row.iter()))
                    .map_err(|source| LoadError::Row {
                        table: plan.table.clone(),
                        row: line,
                        source,
                    })?;
            }
            let stale = tx.execute(
                &format!("DELETE FROM {MAPPING_TABLE} WHERE table_name = ?1"),
                [&plan.table],
            )?;
            if stale > 0 {
                debug!("Replacing {stale} stored mapping(s) for {}", plan.table);
            }
            let mut record = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {MAPPING_TABLE} (table_name, original, identifier) \
                 VALUES (?1, ?2, ?3)"
            ))?;
            for (original, identifier) in plan.mapped_columns() {
                record.execute(params![plan.table, original, identifier])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Runs one statement. Statements that produce columns return their rows;
    /// anything else reports the affected row count.
    pub fn run(&self, sql: &str) -> rusqlite::Result<QueryOutcome> {
        let mut stmt = self.conn.prepare(sql)?;
        if stmt.column_count() == 0 {
            let affected = stmt.execute([])?;
            return Ok(QueryOutcome::Affected(affected));
        }
        collect_rows(&mut stmt, []).map(QueryOutcome::Rows)
    }

    pub fn tables(&self) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name <> ?1 AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([MAPPING_TABLE], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    pub fn table_info(&self, table: &str) -> Result<ResultSet> {
        let mut stmt = self.conn.prepare(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1)",
        )?;
        let info = collect_rows(&mut stmt, [table])?;
        if info.is_empty() {
            return Err(anyhow!("no such table: {table}"));
        }
        Ok(info)
    }

    pub fn stored_mappings(&self) -> rusqlite::Result<Vec<(String, String, String)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT table_name, original, identifier FROM {MAPPING_TABLE} \
             ORDER BY table_name, original"
        ))?;
        let entries = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn collect_rows<P: Params>(stmt: &mut Statement<'_>, params: P) -> rusqlite::Result<ResultSet> {
    let headers = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    let width = headers.len();
    let mut rows = stmt.query(params)?;
    let mut data = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(render_value(row.get_ref(idx)?));
        }
        data.push(values);
    }
    Ok(ResultSet {
        headers,
        rows: data,
    })
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => v.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(bytes) => format!("<blob {} bytes>", bytes.len()),
    }
}
