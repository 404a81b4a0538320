//! Per-table association between original header labels and the column
//! identifiers they were stored under.
//!
//! Each table keeps a forward map (label → identifier) and an inverse index
//! (identifier → label) that is updated in the same call, so both directions
//! stay a bijection within the table. Tables never share entries.

use std::{collections::BTreeMap, fmt};

use itertools::Itertools;

pub type TableMappings = BTreeMap<String, String>;
pub type MappingSnapshot = BTreeMap<String, TableMappings>;

#[derive(Debug, Clone, Default)]
struct TableEntry {
    forward: TableMappings,
    inverse: TableMappings,
}

#[derive(Debug, Clone, Default)]
pub struct HeaderMappings {
    tables: BTreeMap<String, TableEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedLabel {
    pub table: String,
    pub label: String,
}

/// Label pairs that plain substring substitution cannot tell apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ambiguity {
    /// `shorter` occurs inside `longer`.
    Nested {
        shorter: MappedLabel,
        longer: MappedLabel,
    },
    /// One label is mapped to different identifiers in several tables.
    SharedLabel { label: String, tables: Vec<String> },
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ambiguity::Nested { shorter, longer } => write!(
                f,
                "label '{}' ({}) is contained in label '{}' ({})",
                shorter.label, shorter.table, longer.label, longer.table
            ),
            Ambiguity::SharedLabel { label, tables } => write!(
                f,
                "label '{}' is mapped differently in tables {}",
                label,
                tables.join(", ")
            ),
        }
    }
}

impl HeaderMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mapping(&mut self, table: &str, original: &str, identifier: &str) {
        let entry = self.tables.entry(table.to_string()).or_default();
        if let Some(previous) = entry
            .forward
            .insert(original.to_string(), identifier.to_string())
            && previous != identifier
            && entry.inverse.get(&previous).map(String::as_str) == Some(original)
        {
            entry.inverse.remove(&previous);
        }
        if let Some(displaced) = entry
            .inverse
            .insert(identifier.to_string(), original.to_string())
            && displaced != original
        {
            entry.forward.remove(&displaced);
        }
    }

    /// Drops every entry of `table`, returning its label map.
    pub fn remove_table(&mut self, table: &str) -> Option<TableMappings> {
        self.tables.remove(table).map(|entry| entry.forward)
    }

    pub fn resolve(&self, table: &str, original: &str) -> Option<&str> {
        self.tables
            .get(table)
            .and_then(|entry| entry.forward.get(original))
            .map(String::as_str)
    }

    pub fn reverse(&self, table: &str, identifier: &str) -> Option<&str> {
        self.tables
            .get(table)
            .and_then(|entry| entry.inverse.get(identifier))
            .map(String::as_str)
    }

    pub fn all_mappings(&self) -> MappingSnapshot {
        self.tables
            .iter()
            .map(|(table, entry)| (table.clone(), entry.forward.clone()))
            .collect()
    }

    pub fn table_mappings(&self, table: &str) -> Option<TableMappings> {
        self.tables.get(table).map(|entry| entry.forward.clone())
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Every `(table, label, identifier)` triple, ordered by table then label.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.tables.iter().flat_map(|(table, entry)| {
            entry
                .forward
                .iter()
                .map(move |(label, ident)| (table.as_str(), label.as_str(), ident.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(|entry| entry.forward.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn extend<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String, String)>,
    {
        for (table, original, identifier) in entries {
            self.add_mapping(&table, &original, &identifier);
        }
    }

    pub fn ambiguities(&self) -> Vec<Ambiguity> {
        let mut found = Vec::new();

        let by_label = self
            .entries()
            .into_group_map_by(|(_, label, _)| label.to_string());
        for (label, owners) in by_label.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
            let distinct_identifiers = owners.iter().map(|(_, _, ident)| *ident).unique().count();
            if owners.len() > 1 && distinct_identifiers > 1 {
                found.push(Ambiguity::SharedLabel {
                    label: label.clone(),
                    tables: owners.iter().map(|(table, _, _)| table.to_string()).collect(),
                });
            }
        }

        let labels = self
            .entries()
            .filter(|(_, label, _)| !label.is_empty())
            .map(|(table, label, _)| (table, label))
            .collect::<Vec<_>>();
        for &(short_table, shorter) in &labels {
            for &(long_table, longer) in &labels {
                if shorter.len() < longer.len() && longer.contains(shorter) {
                    found.push(Ambiguity::Nested {
                        shorter: MappedLabel {
                            table: short_table.to_string(),
                            label: shorter.to_string(),
                        },
                        longer: MappedLabel {
                            table: long_table.to_string(),
                            label: longer.to_string(),
                        },
                    });
                }
            }
        }
        found
    }
}
