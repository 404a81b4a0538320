//! Startup configuration from the process environment.
//!
//! | Variable                | Meaning                         | Default      |
//! |-------------------------|---------------------------------|--------------|
//! | `CSVSQL_DB_PATH`        | SQLite database location        | `:memory:`   |
//! | `CSVSQL_MAX_FILE_SIZE`  | largest accepted input, bytes   | 100 MiB      |
//! | `CSVSQL_VERBOSE`        | `true`/`1` enables debug logs   | off          |
//!
//! Command-line flags override these values.

use std::env;

use crate::{cli::Cli, ingest::DEFAULT_MAX_FILE_SIZE, store::MEMORY_LOCATION};

pub const DB_PATH_VAR: &str = "CSVSQL_DB_PATH";
pub const MAX_FILE_SIZE_VAR: &str = "CSVSQL_MAX_FILE_SIZE";
pub const VERBOSE_VAR: &str = "CSVSQL_VERBOSE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: String,
    pub max_file_size: u64,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: MEMORY_LOCATION.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            verbose: false,
        }
    }
}

impl Config {
    /// Reads the environment. The second value lists settings that were
    /// present but ignored, for logging once the logger is up.
    pub fn from_env() -> (Self, Vec<String>) {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> (Self, Vec<String>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let mut ignored = Vec::new();

        if let Some(path) = lookup(DB_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            config.database_path = path;
        }
        if let Some(raw) = lookup(MAX_FILE_SIZE_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(size) => config.max_file_size = size,
                Err(_) => ignored.push(format!(
                    "Ignoring {MAX_FILE_SIZE_VAR}='{raw}': expected a byte count"
                )),
            }
        }
        if let Some(raw) = lookup(VERBOSE_VAR) {
            config.verbose = matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1");
        }

        (config, ignored)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.database {
            self.database_path = path.clone();
        }
        if let Some(size) = cli.max_file_size {
            self.max_file_size = size;
        }
        if cli.verbose {
            self.verbose = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use clap::Parser;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let (config, ignored) = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.database_path, ":memory:");
        assert_eq!(config.max_file_size, 100 * 1024 * 1024);
        assert!(ignored.is_empty());
    }

    #[test]
    fn environment_overrides_defaults() {
        let (config, _) = Config::from_lookup(lookup_from(&[
            (DB_PATH_VAR, "/tmp/session.db"),
            (MAX_FILE_SIZE_VAR, "2048"),
            (VERBOSE_VAR, "true"),
        ]));
        assert_eq!(config.database_path, "/tmp/session.db");
        assert_eq!(config.max_file_size, 2048);
        assert!(config.verbose);
    }

    #[test]
    fn invalid_size_is_reported_and_ignored() {
        let (config, ignored) = Config::from_lookup(lookup_from(&[(MAX_FILE_SIZE_VAR, "lots")]));
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(ignored.len(), 1);
        assert!(ignored[0].contains("lots"));
    }

    #[test]
    fn cli_flags_take_precedence() {
        let (mut config, _) = Config::from_lookup(lookup_from(&[(DB_PATH_VAR, "env.db")]));
        let cli = Cli::parse_from(["csvsql", "--db", "flag.db", "--max-file-size", "10", "-v", "a.csv"]);
        config.apply_cli(&cli);
        assert_eq!(config.database_path, "flag.db");
        assert_eq!(config.max_file_size, 10);
        assert!(config.verbose);
    }
}
