use crate::exams;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_i64, session, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::student_data::Part;
use serde_json::json;

fn exams_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (conn, data) = session(state)?;
    data.require(conn, &[Part::Exams])?;
    Ok(json!({ "exams": to_json(&exams::exam_rows(data.exams()))? }))
}

fn exams_get(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let serial_nbr = get_required_i64(params, "serialNbr")?;
    let (conn, data) = session(state)?;
    to_json(&exams::exam_detail(conn, data.stu_id(), serial_nbr)?)
}

fn exams_toggle_answer(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let serial_nbr = get_required_i64(params, "serialNbr")?;
    let question_nbr = u32::try_from(get_required_i64(params, "questionNbr")?)
        .map_err(|_| HandlerErr::new("bad_params", "questionNbr must be a non-negative integer"))?;
    let (conn, data) = session(state)?;
    let outcome = exams::toggle_answer(conn, data.stu_id(), serial_nbr, question_nbr)
        .map_err(|e| HandlerErr::record(e, "db_update_failed"))?;

    data.invalidate(Part::Exams);
    if outcome.course_completed.is_some() {
        data.invalidate(Part::Registrations);
    }
    if outcome.credit_granted.is_some() {
        data.invalidate(Part::PlacementCredit);
    }
    if outcome.licensed.is_some() {
        data.invalidate(Part::Student);
    }
    to_json(&outcome)
}

fn handle_exams_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match exams_list(state) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_exams_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    match exams_get(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_exams_toggle_answer(state: &mut AppState, req: &Request) -> serde_json::Value {
    match exams_toggle_answer(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exams.list" => Some(handle_exams_list(state, req)),
        "exams.get" => Some(handle_exams_get(state, req)),
        "exams.toggleAnswer" => Some(handle_exams_toggle_answer(state, req)),
        _ => None,
    }
}
