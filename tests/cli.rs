mod common;

use std::fs;

use assert_cmd::Command;
use common::{RESOURCES_CSV, TestWorkspace};
use predicates::prelude::*;
use predicates::str::contains;

fn csvsql() -> Command {
    let mut cmd = Command::cargo_bin("csvsql").expect("binary exists");
    cmd.env_remove("CSVSQL_DB_PATH")
        .env_remove("CSVSQL_MAX_FILE_SIZE")
        .env_remove("CSVSQL_VERBOSE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn missing_file_arguments_fail() {
    csvsql().assert().failure();
}

#[test]
fn chinese_query_through_the_repl() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("resources.csv", RESOURCES_CSV);
    csvsql()
        .arg(&path)
        .write_stdin("select 资源ID, 资源状态 from resources where 资源状态 = '离线';\nexit\n")
        .assert()
        .success()
        .stdout(contains("资源ID  资源状态"))
        .stdout(contains("(1 rows)"))
        .stderr(contains("Loaded table 'resources'"));
}

#[test]
fn directives_help_tables_and_mappings() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("resources.csv", RESOURCES_CSV);
    csvsql()
        .arg(&path)
        .write_stdin(".help\n.tables\n.mappings\n.quit\n")
        .assert()
        .success()
        .stdout(contains("EXPORT <file.csv>"))
        .stdout(contains("resources"))
        .stdout(contains("资源状态 -> _4"));
}

#[test]
fn errors_are_printed_and_the_loop_continues() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("resources.csv", RESOURCES_CSV);
    csvsql()
        .arg(&path)
        .write_stdin("select nope from resources;\nEXPORT\nselect count(*) from resources;\n")
        .assert()
        .success()
        .stdout(contains("Error: no such column: nope"))
        .stdout(contains("Error: Invalid EXPORT command"))
        .stdout(contains("(1 rows)"));
}

#[test]
fn bad_files_are_skipped_with_a_warning() {
    let workspace = TestWorkspace::new();
    let good = workspace.write("good.csv", "a,b\n1,2\n");
    let bad = workspace.write("bad.xml", "<a/>");
    csvsql()
        .arg(&bad)
        .arg(&good)
        .write_stdin(".tables\n")
        .assert()
        .success()
        .stdout(contains("good"))
        .stdout(contains("bad").not())
        .stderr(contains("Failed to load file"));
}

#[test]
fn export_writes_restored_headers() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("resources.csv", RESOURCES_CSV);
    let out = workspace.path().join("export.csv");
    csvsql()
        .arg(&path)
        .write_stdin(format!(
            "select 资源ID, owner from resources order by 资源ID;\nEXPORT {}\nexit\n",
            out.display()
        ))
        .assert()
        .success()
        .stdout(contains("Exported 3 rows"));
    let contents = fs::read_to_string(&out).expect("read export");
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("\"资源ID\",\"owner\""));
    assert_eq!(lines.next(), Some("\"1\",\"alice\""));
    assert_eq!(contents.lines().count(), 4);
}

#[test]
fn environment_limits_file_size() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("resources.csv", RESOURCES_CSV);
    csvsql()
        .env("CSVSQL_MAX_FILE_SIZE", "10")
        .arg(&path)
        .write_stdin(".tables\n")
        .assert()
        .success()
        .stdout(contains("Query OK, 0 rows returned."))
        .stderr(contains("byte limit"));
}

#[test]
fn file_backed_store_keeps_mappings_between_runs() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("resources.csv", RESOURCES_CSV);
    let other = workspace.write("other.csv", "x\n1\n");
    let db = workspace.path().join("store.db");

    csvsql()
        .arg("--db")
        .arg(&db)
        .arg(&path)
        .write_stdin("exit\n")
        .assert()
        .success();

    csvsql()
        .env("CSVSQL_DB_PATH", &db)
        .arg(&other)
        .write_stdin("select 访问地址 from resources where 资源ID = '3';\n")
        .assert()
        .success()
        .stdout(contains("访问地址"))
        .stdout(contains("http://c.example"));
}
