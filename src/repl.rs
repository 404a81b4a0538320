//! Line-oriented front end.
//!
//! Each input line is parsed into a [`Command`], executed by the
//! [`Session`], and rendered. Errors are printed and the loop keeps going;
//! only an exit directive or end of input stops it.

use std::{
    fmt::Write as _,
    io::{BufRead, Write},
    path::PathBuf,
};

use anyhow::{Result, anyhow};

use crate::{
    mapping::{Ambiguity, MappingSnapshot},
    session::{Reply, Session},
    table,
};

pub const PROMPT: &str = "sql> ";

pub const HELP_TEXT: &str = "\
Commands:
  .help              Show this help message.
  .tables            List available tables.
  .schema <table>    Show the columns of a table and their original headers.
  .mappings          Show header to column name mappings.
  exit, quit         Exit the application (.exit and .quit also work).
  EXPORT <file.csv>  Export the last query result to a CSV file.
  Any other text is run as SQL. Chinese column headers may be used as written.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    Empty,
    Tables,
    Schema(String),
    Mappings,
    Export(PathBuf),
    Sql(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let input = line.trim();
        if input.is_empty() {
            return Ok(Command::Empty);
        }
        let mut words = input.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_ascii_lowercase();
        let rest = words.collect::<Vec<_>>();
        match keyword.as_str() {
            "exit" | "quit" | ".exit" | ".quit" if rest.is_empty() => Ok(Command::Exit),
            ".help" => Ok(Command::Help),
            ".tables" => Ok(Command::Tables),
            ".mappings" => Ok(Command::Mappings),
            ".schema" => match rest.as_slice() {
                [table] => Ok(Command::Schema(table.to_string())),
                _ => Err(anyhow!("Usage: .schema <table>")),
            },
            "export" => match rest.as_slice() {
                [file] => Ok(Command::Export(PathBuf::from(file))),
                _ => Err(anyhow!("Invalid EXPORT command. Usage: EXPORT <file.csv>")),
            },
            _ => Ok(Command::Sql(input.to_string())),
        }
    }
}

pub fn run<R, W>(session: &mut Session, input: R, output: &mut W) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "\nEnter SQL commands or type .help for help.")?;
    write!(output, "{PROMPT}")?;
    output.flush()?;
    for line in input.lines() {
        let line = line?;
        let rendered = match Command::parse(&line).and_then(|command| session.execute(command)) {
            Ok(Reply::Exit) => return Ok(()),
            Ok(reply) => render(&reply),
            Err(err) => format!("Error: {err:#}\n"),
        };
        write!(output, "{rendered}{PROMPT}")?;
        output.flush()?;
    }
    writeln!(output)?;
    Ok(())
}

pub fn render(reply: &Reply) -> String {
    match reply {
        Reply::Exit | Reply::Nothing => String::new(),
        Reply::Help => format!("{HELP_TEXT}\n"),
        Reply::Tables(names) => {
            let rows = names.iter().map(|name| vec![name.clone()]).collect::<Vec<_>>();
            table::render_result(&["name".to_string()], &rows)
        }
        Reply::Schema(result) | Reply::Rows(result) => {
            table::render_result(&result.headers, &result.rows)
        }
        Reply::Mappings {
            snapshot,
            ambiguities,
        } => render_mappings(snapshot, ambiguities),
        Reply::Affected(count) => format!("Query OK, {count} rows affected.\n"),
        Reply::Exported { path, rows } => format!("Exported {rows} rows to {}.\n", path.display()),
    }
}

fn render_mappings(snapshot: &MappingSnapshot, ambiguities: &[Ambiguity]) -> String {
    if snapshot.values().all(|m| m.is_empty()) {
        return "No header mappings found.\n".to_string();
    }
    let mut output = String::from("Header Mappings:\n================\n");
    for (table, entries) in snapshot.iter().filter(|(_, m)| !m.is_empty()) {
        let _ = writeln!(output, "Table: {table}\n-------------------");
        for (original, identifier) in entries {
            let _ = writeln!(output, "  {original} -> {identifier}");
        }
    }
    if !ambiguities.is_empty() {
        output.push_str("Warnings:\n");
        for ambiguity in ambiguities {
            let _ = writeln!(output, "  {ambiguity}");
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn directives_are_case_insensitive() {
        assert_eq!(Command::parse("  EXIT ").unwrap(), Command::Exit);
        assert_eq!(Command::parse(".Quit").unwrap(), Command::Exit);
        assert_eq!(Command::parse(".TABLES").unwrap(), Command::Tables);
        assert_eq!(
            Command::parse("export out.csv").unwrap(),
            Command::Export(PathBuf::from("out.csv"))
        );
        assert_eq!(
            Command::parse(".schema resources").unwrap(),
            Command::Schema("resources".to_string())
        );
        assert_eq!(Command::parse("   ").unwrap(), Command::Empty);
    }

    #[test]
    fn malformed_directives_are_errors() {
        let err = Command::parse("EXPORT").unwrap_err();
        assert!(err.to_string().contains("Usage: EXPORT <file.csv>"));
        assert!(Command::parse("EXPORT a.csv b.csv").is_err());
        assert!(Command::parse(".schema").is_err());
    }

    #[test]
    fn other_text_is_sql() {
        assert_eq!(
            Command::parse("select 资源ID from resources;").unwrap(),
            Command::Sql("select 资源ID from resources;".to_string())
        );
        assert_eq!(
            Command::parse("quit_flag = 1").unwrap(),
            Command::Sql("quit_flag = 1".to_string())
        );
    }

    #[test]
    fn render_mappings_groups_by_table() {
        let mut snapshot = MappingSnapshot::new();
        snapshot.insert(
            "resources".to_string(),
            BTreeMap::from([("资源ID".to_string(), "_1".to_string())]),
        );
        let rendered = render(&Reply::Mappings {
            snapshot,
            ambiguities: Vec::new(),
        });
        assert!(rendered.contains("Table: resources"));
        assert!(rendered.contains("  资源ID -> _1"));
        assert!(!rendered.contains("Warnings"));
    }

    #[test]
    fn render_empty_mappings() {
        let rendered = render(&Reply::Mappings {
            snapshot: MappingSnapshot::new(),
            ambiguities: Vec::new(),
        });
        assert_eq!(rendered, "No header mappings found.\n");
    }

    #[test]
    fn render_affected_rows() {
        assert_eq!(render(&Reply::Affected(3)), "Query OK, 3 rows affected.\n");
    }

    #[test]
    fn help_lists_every_exit_form() {
        let help = render(&Reply::Help);
        for word in ["exit", "quit", ".exit", ".quit"] {
            assert!(help.contains(word), "help is missing {word}");
            assert_eq!(Command::parse(word).unwrap(), Command::Exit);
        }
    }
}
