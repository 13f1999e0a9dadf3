use crate::holds::{self, HoldForm};
use crate::ipc::error::ok;
use crate::ipc::helpers::{as_of, get_required_str, get_text, require_conn, session, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::records::hold;
use crate::student_data::Part;
use serde_json::json;

fn form_from(params: &serde_json::Value) -> HoldForm {
    HoldForm {
        stu_id: get_text(params, "stuId"),
        hold_id: get_text(params, "holdId"),
        severity: get_text(params, "severity"),
        times_display: get_text(params, "timesDisplay"),
        create_date: get_text(params, "createDate"),
    }
}

fn holds_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (conn, data) = session(state)?;
    data.require(conn, &[Part::Holds])?;
    let types = hold::hold_types(conn)?;
    Ok(json!({ "holds": to_json(&holds::hold_views(data.holds(), &types))? }))
}

fn holds_types(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_conn(state)?;
    Ok(json!({ "types": to_json(&hold::hold_types(conn)?)? }))
}

fn holds_query(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_conn(state)?;
    let filter = holds::filter_from(&form_from(params))?;
    let found = hold::query_holds(conn, &filter)?;
    let types = hold::hold_types(conn)?;
    Ok(json!({ "holds": to_json(&holds::hold_views(&found, &types))? }))
}

fn holds_add(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let as_of = as_of(params)?;
    let form = form_from(params);
    let (conn, data) = session(state)?;
    let added = holds::add_hold(conn, data.stu_id(), &form, as_of)
        .map_err(|e| HandlerErr::record(e, "db_insert_failed"))?;
    data.invalidate(Part::Holds);
    data.invalidate(Part::Student);
    Ok(json!({ "hold": to_json(&added)? }))
}

fn holds_delete(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let hold_id = get_required_str(params, "holdId")?;
    let (conn, data) = session(state)?;
    holds::delete_hold(conn, data.stu_id(), hold_id.trim())
        .map_err(|e| HandlerErr::record(e, "db_delete_failed"))?;
    data.invalidate(Part::Holds);
    data.invalidate(Part::Student);
    Ok(json!({ "deleted": hold_id.trim() }))
}

fn handle_holds_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match holds_list(state) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_holds_types(state: &mut AppState, req: &Request) -> serde_json::Value {
    match holds_types(state) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_holds_query(state: &mut AppState, req: &Request) -> serde_json::Value {
    match holds_query(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_holds_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    match holds_add(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_holds_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    match holds_delete(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "holds.list" => Some(handle_holds_list(state, req)),
        "holds.types" => Some(handle_holds_types(state, req)),
        "holds.query" => Some(handle_holds_query(state, req)),
        "holds.add" => Some(handle_holds_add(state, req)),
        "holds.delete" => Some(handle_holds_delete(state, req)),
        _ => None,
    }
}
