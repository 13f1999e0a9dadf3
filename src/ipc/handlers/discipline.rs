use crate::discipline::{self, IncidentForm};
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, get_text, session, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::student_data::Part;
use serde_json::json;

fn discipline_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (conn, data) = session(state)?;
    data.require(conn, &[Part::Discipline])?;
    Ok(json!({ "incidents": to_json(&discipline::incident_views(data.discipline()))? }))
}

fn discipline_add(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let form = IncidentForm {
        incident_date: get_text(params, "incidentDate"),
        incident_type: get_text(params, "incidentType"),
        course: get_text(params, "course"),
        unit: get_text(params, "unit"),
        description: get_text(params, "description"),
        action_type: get_text(params, "actionType"),
        action_comment: get_text(params, "actionComment"),
        interviewer: get_text(params, "interviewer"),
        proctor: get_text(params, "proctor"),
    };
    let (conn, data) = session(state)?;
    let saved = discipline::add_incident(conn, data.stu_id(), &form)
        .map_err(|e| HandlerErr::record(e, "db_insert_failed"))?;
    data.invalidate(Part::Discipline);
    Ok(json!({ "incident": to_json(&saved)? }))
}

fn discipline_delete(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let (conn, data) = session(state)?;
    discipline::delete_incident(conn, data.stu_id(), &id)
        .map_err(|e| HandlerErr::record(e, "db_delete_failed"))?;
    data.invalidate(Part::Discipline);
    Ok(json!({ "deleted": id }))
}

fn handle_discipline_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match discipline_list(state) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_discipline_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    match discipline_add(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_discipline_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    match discipline_delete(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "discipline.list" => Some(handle_discipline_list(state, req)),
        "discipline.add" => Some(handle_discipline_add(state, req)),
        "discipline.delete" => Some(handle_discipline_delete(state, req)),
        _ => None,
    }
}
