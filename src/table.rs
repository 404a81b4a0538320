//! Plain-text result tables for the terminal.
//!
//! Columns are padded by display width, so Han text and other wide glyphs
//! take two cells and combining marks take none. Cells are flattened to one
//! line and ANSI color sequences do not count toward the width.

use std::{borrow::Cow, fmt::Write as _};

use unicode_width::UnicodeWidthStr;

const GAP: &str = "  ";

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths = column_widths(headers, rows);
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();

    let mut output = String::new();
    for line in [headers, separator.as_slice()]
        .into_iter()
        .chain(rows.iter().map(Vec::as_slice))
    {
        let _ = writeln!(output, "{}", layout_line(line, &widths));
    }
    output
}

/// Table plus a row-count footer; zero-row results get a single status line.
pub fn render_result(headers: &[String], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return "Query OK, 0 rows returned.\n".to_string();
    }
    let mut output = render_table(headers, rows);
    let _ = writeln!(output, "\n({} rows)", rows.len());
    output
}

fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths = headers
        .iter()
        .map(|h| display_width(&flatten(h)))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(&flatten(cell)));
        }
    }
    widths.iter().map(|w| (*w).max(1)).collect()
}

/// Cells past the header count are dropped; trailing padding is trimmed.
fn layout_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str(GAP);
        }
        let text = flatten(cell);
        let padding = width.saturating_sub(display_width(&text));
        line.push_str(&text);
        line.extend(std::iter::repeat_n(' ', padding));
    }
    line.truncate(line.trim_end_matches(' ').len());
    line
}

pub(crate) fn display_width(value: &str) -> usize {
    if !value.contains('\u{1b}') {
        return value.width();
    }
    let mut visible = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // e.g. \x1b[31m
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            visible.push(ch);
        }
    }
    visible.width()
}

fn flatten(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
