//! CLI end-to-end tests.
//!
//! These spawn the `tugblock` binary against temp files and validate
//! stdout JSON and exit codes.
//!
//! Exit code expectations:
//! - 0: Success
//! - 2: Invalid arguments (unreadable input, bad flags)
//! - 3: Input rejected (syntax error)

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;
use tempfile::TempDir;

/// Run tugblock with given arguments and return (stdout, stderr, exit_code).
fn run_tugblock(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_tugblock"))
        .args(args)
        .env_remove("TUGBLOCK_FLAGS")
        .env_remove("TUGBLOCK_COMPACT")
        .output()
        .expect("failed to execute tugblock");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn write_source(dir: &TempDir, name: &str, source: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, source).expect("failed to write source");
    path.to_string_lossy().to_string()
}

fn parse_json(stdout: &str) -> Value {
    serde_json::from_str(stdout).expect("stdout should be valid JSON")
}

// ============================================================================
// Success paths
// ============================================================================

#[test]
fn statements_lists_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "mod.py", "# head\nimport os\nx = 1\n");

    let (stdout, _stderr, exit_code) = run_tugblock(&["statements", &file]);
    assert_eq!(exit_code, 0);

    let json = parse_json(&stdout);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["schema_version"], "1");
    assert_eq!(json["file"], file.as_str());
    let statements = json["statements"].as_array().unwrap();
    assert_eq!(statements.len(), 3);
    assert_eq!(statements[0]["kind"], "comment");
    assert_eq!(statements[0]["node"], Value::Null);
    assert_eq!(statements[1]["kind"], "import");
    assert_eq!(statements[2]["node"], "Assign");
    assert_eq!(statements[2]["start"]["line"], 3);
}

#[test]
fn strings_report_recovered_positions() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "doc.py", "x = 1\n'''foo\nbar'''\n");

    let (stdout, _stderr, exit_code) = run_tugblock(&["strings", &file]);
    assert_eq!(exit_code, 0);

    let json = parse_json(&stdout);
    let strings = json["strings"].as_array().unwrap();
    assert_eq!(strings.len(), 1);
    assert_eq!(strings[0]["value"], "foo\nbar");
    assert_eq!(strings[0]["start"]["line"], 2);
    assert_eq!(strings[0]["start"]["col"], 1);
    assert_eq!(strings[0]["end"]["line"], 3);
}

#[test]
fn assignments_render_python_reprs() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(
        &dir,
        "setup.py",
        "version = '1.0'\nfoo = {1: {2: 3}}\nbar = compute()\n",
    );

    let (stdout, _stderr, exit_code) = run_tugblock(&["--compact", "assignments", &file]);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout.lines().count(), 1);

    let json = parse_json(&stdout);
    let assignments = json["assignments"].as_array().unwrap();
    assert_eq!(assignments[0]["name"], "version");
    assert_eq!(assignments[0]["value"], "'1.0'");
    assert_eq!(assignments[1]["value"], "{1: {2: 3}}");
    assert_eq!(assignments[2]["name"], "bar");
    assert!(assignments[2]["error"]
        .as_str()
        .unwrap()
        .starts_with("malformed node or string"));
}

#[test]
fn groups_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tugblock"))
        .args(["groups", "-"])
        .env_remove("TUGBLOCK_FLAGS")
        .env_remove("TUGBLOCK_COMPACT")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn tugblock");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"import a\nimport b\nx = 1\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let json = parse_json(&String::from_utf8_lossy(&output.stdout));
    assert!(json.get("file").is_none());
    let groups = json["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["kind"], "import");
    assert_eq!(groups[0]["statement_count"], 2);
    assert_eq!(groups[1]["text"], "x = 1\n");
}

#[test]
fn flags_option_changes_the_dialect() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "p.py", "print 2\n");

    let (_stdout, _stderr, exit_code) = run_tugblock(&["statements", &file]);
    assert_eq!(exit_code, 0);

    let (stdout, _stderr, exit_code) =
        run_tugblock(&["--flags", "print_function", "statements", &file]);
    assert_eq!(exit_code, 3);
    assert_eq!(parse_json(&stdout)["status"], "error");
}

// ============================================================================
// Error paths
// ============================================================================

#[test]
fn syntax_error_exits_3_with_location() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "bad.py", "x = 1\ny = (\n");

    let (stdout, _stderr, exit_code) = run_tugblock(&["statements", &file]);
    assert_eq!(exit_code, 3);

    let json = parse_json(&stdout);
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], 3);
    assert_eq!(json["error"]["file"], file.as_str());
    assert!(json["error"]["location"]["line"].as_u64().is_some());
}

#[test]
fn missing_file_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.py");
    assert!(!Path::new(&missing).exists());

    let (stdout, _stderr, exit_code) = run_tugblock(&["strings", &missing.to_string_lossy()]);
    assert_eq!(exit_code, 2);
    assert_eq!(parse_json(&stdout)["error"]["code"], 2);
}

#[test]
fn env_var_selects_compact_output() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "c.py", "x = 1\n");

    let output = Command::new(env!("CARGO_BIN_EXE_tugblock"))
        .args(["statements", &file])
        .env_remove("TUGBLOCK_FLAGS")
        .env("TUGBLOCK_COMPACT", "1")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 1);
}
