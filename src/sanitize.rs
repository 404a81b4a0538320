//! Identifier sanitization for table and column names.
//!
//! SQLite accepts only `[A-Za-z0-9_]` in bare identifiers here, so every label
//! read from a file passes through one of two paths:
//!
//! - **Sanitize**: strip or replace disallowed characters
//!   (`sanitize_table_name`, `sanitize_column_name`).
//! - **Map**: labels containing Han ideographs are replaced by a positional
//!   synthetic identifier instead; `contains_protected_script` is the gate.
//!
//! Table and column sanitization are deliberately asymmetric: only table
//! names receive a leading-digit guard.

use std::{path::Path, sync::LazyLock};

use regex::Regex;

static LEADING_INVALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^A-Za-z0-9_]+").expect("leading pattern compiles"));
static INVALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("identifier pattern compiles"));
static PROTECTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Han}").expect("script pattern compiles"));

pub fn sanitize_table_name(raw: &str) -> String {
    let trimmed = LEADING_INVALID.replace(raw, "");
    let mut sanitized = INVALID.replace_all(&trimmed, "").into_owned();
    if sanitized.starts_with(|ch: char| ch.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

pub fn sanitize_column_name(raw: &str) -> String {
    let spaced = raw.replace(' ', "_");
    INVALID.replace_all(&spaced, "").into_owned()
}

/// True when `value` holds any character that cannot appear in a bare SQL
/// identifier and must be mapped to a synthetic name instead.
pub fn contains_protected_script(value: &str) -> bool {
    PROTECTED.is_match(value)
}

/// Table name for a source file: the sanitized file stem.
pub fn table_name_for_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    sanitize_table_name(&stem)
}
