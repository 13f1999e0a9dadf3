use crate::appeals::{self, AppealEdit, AppealForm, AppealOwner};
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_flag, get_required_str, get_text, session, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::student_data::Part;
use serde_json::json;

fn appeals_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (conn, data) = session(state)?;
    data.require(conn, &[Part::Appeals])?;
    Ok(json!({ "appeals": to_json(&data.appeals())? }))
}

fn appeals_add(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let form = AppealForm {
        appeal_date: get_text(params, "appealDate"),
        relief_given: get_flag(params, "reliefGiven"),
        pace: get_text(params, "pace"),
        pace_track: get_text(params, "paceTrack"),
        course_order: get_text(params, "courseOrder"),
        unit: get_text(params, "unit"),
        ms_type: get_text(params, "msType"),
        orig_date: get_text(params, "origDate"),
        new_date: get_text(params, "newDate"),
        attempts: get_text(params, "attempts"),
        appeal_type: get_text(params, "appealType"),
        circumstances: get_text(params, "circumstances"),
        comment: get_text(params, "comment"),
        interviewer: get_text(params, "interviewer"),
    };

    let (conn, data) = session(state)?;
    data.require(conn, &[Part::Term, Part::StudentTerm])?;
    let term_key = data
        .active_term()
        .map(|t| t.term_key.clone())
        .ok_or_else(|| HandlerErr::new("validation_failed", "No active term."))?;
    let track = data.student_term().and_then(|st| st.pace_track.clone());
    let owner = AppealOwner {
        stu_id: data.stu_id(),
        term_key: &term_key,
        pace_track: track.as_deref(),
    };

    let appeal = appeals::validate_appeal(&owner, &form)?;
    let saved = appeals::add_appeal(conn, appeal).map_err(|e| HandlerErr::record(e, "db_insert_failed"))?;

    data.invalidate(Part::Appeals);
    data.invalidate(Part::StudentMilestones);
    Ok(json!({ "appeal": to_json(&saved)? }))
}

fn appeals_update(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let edit = AppealEdit {
        appeal_date: get_text(params, "appealDate"),
        relief_given: get_flag(params, "reliefGiven"),
        new_date: get_text(params, "newDate"),
        attempts: get_text(params, "attempts"),
        appeal_type: get_text(params, "appealType"),
        circumstances: get_text(params, "circumstances"),
        comment: get_text(params, "comment"),
        interviewer: get_text(params, "interviewer"),
    };

    let (conn, data) = session(state)?;
    let saved = appeals::update_appeal(conn, data.stu_id(), &id, &edit)
        .map_err(|e| HandlerErr::record(e, "db_update_failed"))?;

    data.invalidate(Part::Appeals);
    data.invalidate(Part::StudentMilestones);
    Ok(json!({ "appeal": to_json(&saved)? }))
}

fn appeals_delete(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let (conn, data) = session(state)?;
    appeals::delete_appeal(conn, data.stu_id(), &id).map_err(|e| HandlerErr::record(e, "db_delete_failed"))?;
    data.invalidate(Part::Appeals);
    Ok(json!({ "deleted": id }))
}

fn handle_appeals_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match appeals_list(state) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_appeals_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    match appeals_add(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_appeals_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    match appeals_update(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_appeals_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    match appeals_delete(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "appeals.list" => Some(handle_appeals_list(state, req)),
        "appeals.add" => Some(handle_appeals_add(state, req)),
        "appeals.update" => Some(handle_appeals_update(state, req)),
        "appeals.delete" => Some(handle_appeals_delete(state, req)),
        _ => None,
    }
}
