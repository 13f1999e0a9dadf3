#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_stuadmd");
    let mut child = Command::new(exe)
        .env_remove("STUADMD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn stuadmd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn send_line(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, line: &str) -> serde_json::Value {
    writeln!(stdin, "{}", line).expect("write request");
    stdin.flush().expect("flush request");

    let mut out = String::new();
    reader.read_line(&mut out).expect("read response line");
    assert!(!out.trim().is_empty(), "empty response for {}", line);
    serde_json::from_str(out.trim()).expect("parse response json")
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    let value = send_line(stdin, reader, &payload.to_string());
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Returns `(code, message)` of a request that must fail.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> (String, String) {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    let error = value.get("error").expect("error object");
    (
        error.get("code").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        error.get("message").and_then(|v| v.as_str()).unwrap_or("").to_string(),
    )
}

pub fn db_path(workspace: &Path) -> PathBuf {
    workspace.join("stuadm.sqlite3")
}

pub fn seed(workspace: &Path, sql: &str) {
    let conn = rusqlite::Connection::open(db_path(workspace)).expect("open workspace db");
    conn.execute_batch(sql).expect("seed workspace db");
}

/// Term FA26 (active) and student 111 Pat Doe, registered in M 117.
pub const BASE_SEED: &str = "
    INSERT INTO term(term_key, start_dt, end_dt, active) VALUES('FA26', '2026-08-24', '2026-12-18', 1);
    INSERT INTO student(stu_id, last_name, first_name, pref_name, licensed) VALUES('111', 'Doe', 'Patricia', 'Pat', 'N');
    INSERT INTO stterm(stu_id, term_key, pace, pace_track) VALUES('111', 'FA26', 1, 'A');
    INSERT INTO csection(course, sect, term_key, instructor) VALUES('M 117', '001', 'FA26', 'Smith');
    INSERT INTO stcourse(stu_id, course, sect, term_key, pace_order, open_status, completed)
        VALUES('111', 'M 117', '001', 'FA26', 1, 'Y', 'N');
";
