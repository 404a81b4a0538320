//! Rewrites SQL text so mapped header labels resolve to stored identifiers.
//!
//! Substitution is literal and works on the raw statement text. It will
//! rewrite inside string literals and rewrite a mapped label where it is the
//! prefix of a longer token (`资源ID号` becomes `_1号` when only `资源ID` is
//! mapped). Candidates are applied longest label first so a longer mapped
//! label is never pre-empted by a shorter one it contains;
//! [`HeaderMappings::ambiguities`] lists the pairs where this matters.
//!
//! Table namespaces stay apart when the statement names exactly one mapped
//! table: that table's entries are applied ahead of any other table's entry
//! for the same label. Statements naming several tables fall back to table
//! name order for shared labels.

use itertools::Itertools;
use log::debug;

use crate::{mapping::HeaderMappings, restore::table_context};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubstitutionOrder {
    /// Descending label length, then the queried table, then table and label.
    #[default]
    LongestFirst,
    /// The queried table, then table and label lexically. Shorter prefixes win
    /// over longer labels.
    StoreOrder,
}

pub fn translate(mappings: &HeaderMappings, sql: &str) -> String {
    translate_with_order(mappings, sql, SubstitutionOrder::LongestFirst)
}

pub fn translate_with_order(
    mappings: &HeaderMappings,
    sql: &str,
    order: SubstitutionOrder,
) -> String {
    let context = table_context(sql, mappings.tables());
    let outside_context = |table: &str| context.as_deref() != Some(table);
    let candidates = mappings
        .entries()
        .filter(|(_, label, _)| !label.is_empty())
        .enumerate();
    let candidates: Vec<(&str, &str)> = match order {
        SubstitutionOrder::LongestFirst => candidates
            .sorted_by_key(|(pos, (table, label, _))| {
                (
                    std::cmp::Reverse(label.chars().count()),
                    outside_context(*table),
                    *pos,
                )
            })
            .map(|(_, (_, label, identifier))| (label, identifier))
            .collect(),
        SubstitutionOrder::StoreOrder => candidates
            .sorted_by_key(|(pos, (table, _, _))| (outside_context(*table), *pos))
            .map(|(_, (_, label, identifier))| (label, identifier))
            .collect(),
    };

    let mut translated = sql.to_string();
    for (label, identifier) in candidates {
        if !translated.contains(label) {
            continue;
        }
        for form in surface_forms(label) {
            translated = translated.replace(&form, identifier);
        }
    }
    if translated != sql {
        debug!("Translated query: {translated}");
    }
    translated
}

/// Quoted forms first so the quotes are consumed with the label.
fn surface_forms(label: &str) -> [String; 4] {
    [
        format!("`{label}`"),
        format!("\"{label}\""),
        format!("'{label}'"),
        label.to_string(),
    ]
}
