//! Schema planning and bulk loading of grids into the store.
//!
//! Column identifiers are chosen left to right:
//!
//! 1. A header containing Han characters becomes `_<position>` (1-based) and
//!    gets a mapping entry so queries and result headers can use the label.
//! 2. Any other header is sanitized. Repeats of a sanitized form within the
//!    same header row get `_<n>`, n counting the prior occurrences, so
//!    `a,a,a` becomes `a,a_1,a_2`.
//! 3. A header that sanitizes to nothing falls back to `_<position>` with no
//!    mapping entry.
//!
//! Mapping entries reach the [`HeaderMappings`] only after the load commits.

use std::{collections::HashMap, fs, iter, path::Path};

use anyhow::Context;
use encoding_rs::{Encoding, UTF_8};
use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    error::LoadError,
    io_utils::{self, SourceKind},
    mapping::{Ambiguity, HeaderMappings},
    sanitize::{contains_protected_script, sanitize_column_name, table_name_for_path},
    store::Database,
};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedColumn {
    pub header: String,
    pub identifier: String,
    pub mapped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePlan {
    pub table: String,
    pub columns: Vec<PlannedColumn>,
}

impl TablePlan {
    pub fn identifiers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.identifier.as_str()).collect()
    }

    pub fn mapped_columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .filter(|c| c.mapped)
            .map(|c| (c.header.as_str(), c.identifier.as_str()))
    }

    pub fn create_table_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("\"{}\" TEXT", c.identifier))
            .join(", ");
        format!("CREATE TABLE {} ({columns})", self.table)
    }

    pub fn insert_sql(&self) -> String {
        let placeholders = iter::repeat_n("?", self.columns.len()).join(", ");
        format!("INSERT INTO {} VALUES ({placeholders})", self.table)
    }
}

pub fn plan_table(table: &str, headers: &[String]) -> TablePlan {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let position = idx + 1;
            if contains_protected_script(header) {
                return PlannedColumn {
                    header: header.clone(),
                    identifier: format!("_{position}"),
                    mapped: true,
                };
            }
            let base = sanitize_column_name(header);
            let identifier = if base.is_empty() {
                format!("_{position}")
            } else {
                let count = seen.entry(base.clone()).or_insert(0);
                let identifier = if *count == 0 {
                    base
                } else {
                    format!("{base}_{count}")
                };
                *count += 1;
                identifier
            };
            PlannedColumn {
                header: header.clone(),
                identifier,
                mapped: false,
            }
        })
        .collect();
    TablePlan {
        table: table.to_string(),
        columns,
    }
}

/// Creates `table` from `grid` and returns the number of data rows loaded.
pub fn load_grid(
    db: &mut Database,
    mappings: &mut HeaderMappings,
    table: &str,
    grid: &[Vec<String>],
) -> Result<usize, LoadError> {
    load_planned(db, mappings, table, grid).map(|summary| summary.rows)
}

/// Mappings already held for `table` belong to a table that no longer
/// exists once `CREATE TABLE` succeeds, so they are replaced wholesale.
fn load_planned(
    db: &mut Database,
    mappings: &mut HeaderMappings,
    table: &str,
    grid: &[Vec<String>],
) -> Result<LoadSummary, LoadError> {
    let (headers, rows) = grid
        .split_first()
        .ok_or_else(|| LoadError::EmptyGrid(format!("table {table}")))?;
    let plan = plan_table(table, headers);
    debug!("Planned columns for {table}: {:?}", plan.identifiers());
    db.load_table(&plan, rows)?;
    if let Some(stale) = mappings.remove_table(table) {
        debug!("Dropped {} stale mapping(s) for {table}", stale.len());
    }
    for (original, identifier) in plan.mapped_columns() {
        mappings.add_mapping(table, original, identifier);
    }
    for ambiguity in mappings.ambiguities() {
        if involves(&ambiguity, table) {
            warn!("Ambiguous header mapping: {ambiguity}");
        }
    }
    Ok(LoadSummary {
        table: table.to_string(),
        rows: rows.len(),
        mapped_columns: plan.mapped_columns().count(),
    })
}

fn involves(ambiguity: &Ambiguity, table: &str) -> bool {
    match ambiguity {
        Ambiguity::Nested { shorter, longer } => shorter.table == table || longer.table == table,
        Ambiguity::SharedLabel { tables, .. } => tables.iter().any(|t| t == table),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub max_file_size: u64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub table: String,
    pub rows: usize,
    pub mapped_columns: usize,
}

pub fn load_file(
    db: &mut Database,
    mappings: &mut HeaderMappings,
    path: &Path,
    options: &LoaderOptions,
) -> Result<LoadSummary, LoadError> {
    let kind =
        SourceKind::from_path(path).ok_or_else(|| LoadError::UnsupportedFile(path.to_path_buf()))?;
    let size = fs::metadata(path)
        .with_context(|| format!("Reading metadata for {path:?}"))?
        .len();
    if size > options.max_file_size {
        return Err(LoadError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: options.max_file_size,
        });
    }
    let grid = io_utils::read_grid(path, kind, options.delimiter, options.encoding)?;
    if grid.is_empty() {
        return Err(LoadError::EmptyGrid(format!("{path:?}")));
    }
    let table = table_name_for_path(path);
    let summary = load_planned(db, mappings, &table, &grid)?;
    info!(
        "Loaded table '{table}' from {path:?} ({} row(s))",
        summary.rows
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn duplicate_headers_get_counting_suffixes() {
        let plan = plan_table("t", &headers(&["a", "a", "a"]));
        assert_eq!(plan.identifiers(), vec!["a", "a_1", "a_2"]);
    }

    #[test]
    fn duplicates_count_by_sanitized_form() {
        let plan = plan_table("t", &headers(&["Order ID", "Order_ID", "Order-ID"]));
        assert_eq!(plan.identifiers(), vec!["Order_ID", "Order_ID_1", "OrderID"]);
    }

    #[test]
    fn protected_headers_use_their_position() {
        let plan = plan_table("t", &headers(&["id", "name", "资源状态", "备注 note"]));
        assert_eq!(plan.identifiers(), vec!["id", "name", "_3", "_4"]);
        assert_eq!(
            plan.mapped_columns().collect::<Vec<_>>(),
            vec![("资源状态", "_3"), ("备注 note", "_4")]
        );
    }

    #[test]
    fn empty_sanitized_header_falls_back_to_position() {
        let plan = plan_table("t", &headers(&["", "%%", "ok"]));
        assert_eq!(plan.identifiers(), vec!["_1", "_2", "ok"]);
        assert_eq!(plan.mapped_columns().count(), 0);
    }

    #[test]
    fn literal_synthetic_header_is_not_deduplicated() {
        let plan = plan_table("t", &headers(&["_3", "x", "名称"]));
        assert_eq!(plan.identifiers(), vec!["_3", "x", "_3"]);
    }

    #[test]
    fn generated_sql_quotes_columns() {
        let plan = plan_table("people", &headers(&["1st", "姓名"]));
        assert_eq!(
            plan.create_table_sql(),
            "CREATE TABLE people (\"1st\" TEXT, \"_2\" TEXT)"
        );
        assert_eq!(plan.insert_sql(), "INSERT INTO people VALUES (?, ?)");
    }
}
