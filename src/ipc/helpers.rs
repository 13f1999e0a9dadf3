//! Parameter readers and error plumbing shared by every handler family.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;

use crate::dates;
use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::records::RecordError;
use crate::student_data::StudentData;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }

    /// Maps a record error; database failures get `db_code`.
    pub fn record(e: RecordError, db_code: &'static str) -> Self {
        Self::new(e.code_or(db_code), e.to_string())
    }
}

impl From<RecordError> for HandlerErr {
    fn from(e: RecordError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

/// Form text: strings as given, numbers rendered, anything else absent.
pub fn get_text(params: &serde_json::Value, key: &str) -> Option<String> {
    match params.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn get_flag(params: &serde_json::Value, key: &str) -> bool {
    match params.get(key) {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => matches!(s.trim(), "Y" | "y" | "true"),
        _ => false,
    }
}

pub fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    let value = params
        .get(key)
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))?;
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| HandlerErr::new("bad_params", format!("{} must be an integer", key)))
}

/// `asOf` param, defaulting to the local date.
pub fn as_of(params: &serde_json::Value) -> Result<NaiveDate, HandlerErr> {
    match params.get("asOf").and_then(|v| v.as_str()) {
        None => Ok(dates::today()),
        Some(text) => dates::parse_iso(text).ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: "asOf must be YYYY-MM-DD".to_string(),
            details: Some(json!({ "asOf": text })),
        }),
    }
}

pub fn require_conn(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

/// Workspace connection plus the selected student's records.
pub fn session(state: &mut AppState) -> Result<(&Connection, &mut StudentData), HandlerErr> {
    let conn = state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))?;
    let data = state
        .selected
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_student", "select a student first"))?;
    Ok((conn, data))
}

pub fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, HandlerErr> {
    serde_json::to_value(value).map_err(|e| HandlerErr::new("internal", e.to_string()))
}
