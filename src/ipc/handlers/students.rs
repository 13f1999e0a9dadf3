use crate::ipc::error::ok;
use crate::ipc::helpers::{as_of, get_required_str, require_conn, session, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::lookup::{self, LookupOutcome};
use crate::records::hold;
use crate::student_data::StudentData;
use crate::summary;
use serde_json::json;
use tracing::debug;

fn selected_json(data: &StudentData) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({
        "outcome": "selected",
        "student": to_json(data.student())?,
        "displayName": data.student().display_name(),
    }))
}

fn students_lookup(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let query = get_required_str(params, "query")?;
    let conn = require_conn(state)?;
    match lookup::lookup(conn, &query)? {
        LookupOutcome::Selected(student) => {
            let data = StudentData::new(student);
            let result = selected_json(&data)?;
            state.select(data);
            Ok(result)
        }
        LookupOutcome::NotFound => Ok(json!({ "outcome": "notFound" })),
        LookupOutcome::Choices(choices) => {
            debug!(count = choices.len(), "lookup matched several students");
            Ok(json!({ "outcome": "choices", "choices": to_json(&choices)? }))
        }
    }
}

fn students_select(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let stu_id = get_required_str(params, "stuId")?;
    let conn = require_conn(state)?;
    let data = StudentData::load(conn, stu_id.trim())?
        .ok_or_else(|| HandlerErr::new("not_found", format!("student {} not found", stu_id.trim())))?;
    let result = selected_json(&data)?;
    state.select(data);
    Ok(result)
}

fn students_summary(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let as_of = as_of(params)?;
    let (conn, data) = session(state)?;
    data.require(conn, summary::PARTS)?;
    let types = hold::hold_types(conn)?;
    to_json(&summary::summarize(data, &types, as_of))
}

fn handle_students_lookup(state: &mut AppState, req: &Request) -> serde_json::Value {
    match students_lookup(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    match students_select(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_history(state: &mut AppState, req: &Request) -> serde_json::Value {
    match to_json(&state.history) {
        Ok(history) => ok(&req.id, json!({ "history": history })),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.clear_selection();
    ok(&req.id, json!({ "cleared": true }))
}

fn handle_students_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    match students_summary(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.lookup" => Some(handle_students_lookup(state, req)),
        "students.select" => Some(handle_students_select(state, req)),
        "students.history" => Some(handle_students_history(state, req)),
        "students.clear" => Some(handle_students_clear(state, req)),
        "students.summary" => Some(handle_students_summary(state, req)),
        _ => None,
    }
}
