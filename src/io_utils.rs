//! File readers and the export writer.
//!
//! Every source file becomes a [`Grid`]: rows of strings, header first.
//!
//! - **Delimited text**: delimiter auto-detected from the extension (`.tsv` →
//!   tab, otherwise comma) unless overridden; fields decoded with
//!   `encoding_rs`, defaulting to UTF-8 (a leading BOM is dropped). Records
//!   may be ragged; row width is checked at load time, not here.
//! - **Spreadsheets**: the first worksheet of an `.xlsx`/`.xlsm`/`.xls`/`.ods`
//!   workbook via `calamine`, cells rendered with their display form.
//! - **Export**: CSV with `QuoteStyle::Always` for round-trip safety.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use calamine::{Reader, open_workbook_auto};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

pub type Grid = Vec<Vec<String>>;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Delimited,
    Spreadsheet,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(SourceKind::Delimited),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(SourceKind::Spreadsheet),
            _ => None,
        }
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn read_delimited(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Grid> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let mut reader = open_csv_reader(BufReader::new(file), delimiter);
    let mut grid = Grid::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record =
            record.with_context(|| format!("Reading row {} in {:?}", row_idx + 1, path))?;
        let decoded = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {} in {:?}", row_idx + 1, path))?;
        grid.push(decoded);
    }
    Ok(grid)
}

pub fn read_spreadsheet(path: &Path) -> Result<Grid> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| anyhow!("Opening workbook {path:?}: {err}"))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("No sheets found in workbook {path:?}"))?;
    let range = workbook
        .worksheet_range(&first)
        .map_err(|err| anyhow!("Reading sheet '{first}' in {path:?}: {err}"))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}

pub fn read_grid(
    path: &Path,
    kind: SourceKind,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Grid> {
    match kind {
        SourceKind::Delimited => {
            let delimiter = resolve_input_delimiter(path, delimiter);
            read_delimited(path, delimiter, encoding)
        }
        SourceKind::Spreadsheet => read_spreadsheet(path),
    }
}

pub fn write_csv(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    let mut writer = csv::WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(BufWriter::new(file));
    writer
        .write_record(headers)
        .with_context(|| "Writing output headers")?;
    for (idx, row) in rows.iter().enumerate() {
        writer
            .write_record(row)
            .with_context(|| format!("Writing row {} to {path:?}", idx + 2))?;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing output file {path:?}"))?;
    Ok(())
}
