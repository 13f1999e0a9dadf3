use crate::ipc::error::ok;
use crate::ipc::helpers::{as_of, get_required_str, get_text, session, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::student_data::Part;
use crate::transfer;
use serde_json::json;

fn transfer_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (conn, data) = session(state)?;
    data.require(conn, &[Part::Transfers])?;
    Ok(json!({
        "credits": to_json(&data.transfers())?,
        "courses": transfer::TRANSFER_COURSES,
    }))
}

fn transfer_add(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let course = get_required_str(params, "course")?;
    let exam_date = get_text(params, "examDate");
    let source = get_text(params, "source");
    let as_of = as_of(params)?;
    let (conn, data) = session(state)?;
    let credit = transfer::add_transfer(
        conn,
        data.stu_id(),
        &course,
        exam_date.as_deref(),
        source.as_deref(),
        as_of,
    )
    .map_err(|e| HandlerErr::record(e, "db_insert_failed"))?;
    data.invalidate(Part::Transfers);
    Ok(json!({ "credit": to_json(&credit)? }))
}

fn transfer_delete(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let course = get_required_str(params, "course")?;
    let (conn, data) = session(state)?;
    transfer::delete_transfer(conn, data.stu_id(), &course)
        .map_err(|e| HandlerErr::record(e, "db_delete_failed"))?;
    data.invalidate(Part::Transfers);
    Ok(json!({ "deleted": course }))
}

fn handle_transfer_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match transfer_list(state) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_transfer_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    match transfer_add(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_transfer_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    match transfer_delete(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "transfer.list" => Some(handle_transfer_list(state, req)),
        "transfer.add" => Some(handle_transfer_add(state, req)),
        "transfer.delete" => Some(handle_transfer_delete(state, req)),
        _ => None,
    }
}
