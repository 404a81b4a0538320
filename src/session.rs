//! The query session: owns the store and the header mappings and runs one
//! command at a time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};

use crate::{
    error::LoadError,
    ingest::{self, LoadSummary, LoaderOptions},
    io_utils,
    mapping::{Ambiguity, HeaderMappings, MappingSnapshot},
    repl::Command,
    restore::{restore, table_context},
    store::{Database, QueryOutcome, ResultSet},
    translate::translate,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Exit,
    Help,
    Nothing,
    Tables(Vec<String>),
    Schema(ResultSet),
    Mappings {
        snapshot: MappingSnapshot,
        ambiguities: Vec<Ambiguity>,
    },
    Rows(ResultSet),
    Affected(usize),
    Exported {
        path: PathBuf,
        rows: usize,
    },
}

pub struct Session {
    db: Database,
    mappings: HeaderMappings,
    options: LoaderOptions,
    last_result: Option<ResultSet>,
}

impl Session {
    pub fn new(db: Database, options: LoaderOptions) -> Result<Self> {
        let stored = db
            .stored_mappings()
            .with_context(|| format!("Reading stored header mappings from {}", db.location()))?;
        if !stored.is_empty() {
            info!(
                "Restored {} header mapping(s) from {}",
                stored.len(),
                db.location()
            );
        }
        let mut mappings = HeaderMappings::new();
        mappings.extend(stored);
        Ok(Self {
            db,
            mappings,
            options,
            last_result: None,
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(Database::open_in_memory()?, LoaderOptions::default())
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn mappings(&self) -> &HeaderMappings {
        &self.mappings
    }

    pub fn last_result(&self) -> Option<&ResultSet> {
        self.last_result.as_ref()
    }

    pub fn load_file(&mut self, path: &Path) -> Result<LoadSummary, LoadError> {
        ingest::load_file(&mut self.db, &mut self.mappings, path, &self.options)
    }

    pub fn load_grid(&mut self, table: &str, grid: &[Vec<String>]) -> Result<usize, LoadError> {
        ingest::load_grid(&mut self.db, &mut self.mappings, table, grid)
    }

    /// Loads every path independently and returns how many succeeded.
    pub fn load_files(&mut self, paths: &[PathBuf]) -> usize {
        let mut loaded = 0;
        for path in paths {
            match self.load_file(path) {
                Ok(_) => loaded += 1,
                Err(err) => warn!("Failed to load file {path:?}: {err}"),
            }
        }
        loaded
    }

    pub fn execute(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Exit => Ok(Reply::Exit),
            Command::Help => Ok(Reply::Help),
            Command::Empty => Ok(Reply::Nothing),
            Command::Tables => Ok(Reply::Tables(self.db.tables()?)),
            Command::Schema(table) => self.schema(&table).map(Reply::Schema),
            Command::Mappings => Ok(Reply::Mappings {
                snapshot: self.mappings.all_mappings(),
                ambiguities: self.mappings.ambiguities(),
            }),
            Command::Export(path) => self.export(&path),
            Command::Sql(sql) => match self.query(&sql)? {
                QueryOutcome::Rows(result) => Ok(Reply::Rows(result)),
                QueryOutcome::Affected(count) => Ok(Reply::Affected(count)),
            },
        }
    }

    /// Translate, run, restore. Result sets become the export candidate.
    pub fn query(&mut self, sql: &str) -> Result<QueryOutcome> {
        let translated = translate(&self.mappings, sql);
        match self.db.run(&translated)? {
            QueryOutcome::Rows(mut result) => {
                let context = table_context(sql, self.mappings.tables());
                debug!("Restoring result headers with table context {context:?}");
                result.headers = restore(&self.mappings, context.as_deref(), &result.headers);
                self.last_result = Some(result.clone());
                Ok(QueryOutcome::Rows(result))
            }
            affected => Ok(affected),
        }
    }

    fn schema(&self, table: &str) -> Result<ResultSet> {
        let mut info = self.db.table_info(table)?;
        info.headers.push("original".to_string());
        for row in &mut info.rows {
            let original = row
                .get(1)
                .and_then(|name| self.mappings.reverse(table, name))
                .unwrap_or_default()
                .to_string();
            row.push(original);
        }
        Ok(info)
    }

    fn export(&self, path: &Path) -> Result<Reply> {
        let result = self
            .last_result
            .as_ref()
            .filter(|result| !result.is_empty())
            .ok_or_else(|| anyhow!("No results to export. Run a SELECT query first."))?;
        io_utils::write_csv(path, &result.headers, &result.rows)?;
        info!("Exported {} row(s) to {path:?}", result.row_count());
        Ok(Reply::Exported {
            path: path.to_path_buf(),
            rows: result.row_count(),
        })
    }
}
