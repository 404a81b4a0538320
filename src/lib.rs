pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod io_utils;
pub mod mapping;
pub mod repl;
pub mod restore;
pub mod sanitize;
pub mod session;
pub mod store;
pub mod table;
pub mod translate;

use std::{env, io, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::{
    cli::Cli,
    config::Config,
    ingest::LoaderOptions,
    session::Session,
    store::Database,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging(verbose: bool) {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            let level = if verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            };
            builder.filter_module("csvsql", level);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, ignored) = Config::from_env();
    config.apply_cli(&cli);
    init_logging(config.verbose);
    for message in ignored {
        warn!("{message}");
    }

    let options = LoaderOptions {
        delimiter: cli.delimiter,
        encoding: io_utils::resolve_encoding(cli.input_encoding.as_deref())?,
        max_file_size: config.max_file_size,
    };
    let db = Database::open(&config.database_path)
        .with_context(|| format!("Opening store {}", config.database_path))?;
    let mut session = Session::new(db, options)?;

    let loaded = session.load_files(&cli.files);
    info!("Loaded {loaded} of {} file(s)", cli.files.len());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    repl::run(&mut session, stdin.lock(), &mut stdout)
}
