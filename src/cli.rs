use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load CSV and spreadsheet files into SQLite and query them with SQL",
    long_about = None
)]
pub struct Cli {
    /// Files to load, one table per file (.csv, .tsv, .txt, .xlsx, .xlsm, .xls, .ods)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// SQLite database file (defaults to CSVSQL_DB_PATH, then in-memory)
    #[arg(long = "db")]
    pub database: Option<String>,
    /// Reject input files larger than this many bytes
    #[arg(long = "max-file-size")]
    pub max_file_size: Option<u64>,
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
    /// Delimiter for delimited inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of delimited inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
