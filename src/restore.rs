//! Restores original header labels on result set columns.
//!
//! A column with a table context is looked up in that table first. Without
//! one, or on a miss, tables are scanned in name order and the first table
//! holding the identifier wins. Two tables that both stored `_2` therefore
//! restore to the alphabetically first table's label unless the statement
//! names exactly one table.

use std::sync::LazyLock;

use regex::Regex;

use crate::mapping::HeaderMappings;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_]+").expect("word pattern compiles"));

pub fn restore(
    mappings: &HeaderMappings,
    table_context: Option<&str>,
    columns: &[String],
) -> Vec<String> {
    columns
        .iter()
        .map(|column| {
            table_context
                .and_then(|table| mappings.reverse(table, column))
                .or_else(|| {
                    mappings
                        .tables()
                        .find_map(|table| mappings.reverse(table, column))
                })
                .unwrap_or(column.as_str())
                .to_string()
        })
        .collect()
}

/// The single known table referenced by `sql`, matched as a whole word
/// ignoring ASCII case. `None` when no table or several tables appear.
pub fn table_context<'a, I>(sql: &str, tables: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let words = WORD
        .find_iter(sql)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect::<Vec<_>>();
    let mut referenced = tables
        .into_iter()
        .filter(|table| !table.is_empty())
        .filter(|table| words.iter().any(|word| word == &table.to_ascii_lowercase()));
    let first = referenced.next()?;
    match referenced.next() {
        Some(_) => None,
        None => Some(first.to_string()),
    }
}
