use crate::appeals::{self, AppealOwner, ExtensionForm};
use crate::deadlines;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_flag, get_required_i64, get_required_str, get_text, session, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::student_data::Part;
use serde_json::json;

fn deadlines_get(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (conn, data) = session(state)?;
    data.require(conn, deadlines::PARTS)?;
    to_json(&deadlines::deadline_report(data))
}

fn deadlines_extend(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let ms_nbr = get_required_i64(params, "msNbr")?;
    let ms_type = get_required_str(params, "msType")?;
    let form = ExtensionForm {
        interviewer: get_text(params, "interviewer"),
        appeal_date: get_text(params, "appealDate"),
        relief_given: get_flag(params, "reliefGiven"),
        new_deadline: get_text(params, "newDeadline"),
        attempts: get_text(params, "attempts"),
        appeal_type: get_text(params, "appealType"),
        circumstances: get_text(params, "circumstances"),
        comment: get_text(params, "comment"),
    };

    let (conn, data) = session(state)?;
    data.require(conn, &[Part::Term, Part::StudentTerm, Part::Milestones])?;
    let term_key = data
        .active_term()
        .map(|t| t.term_key.clone())
        .ok_or_else(|| HandlerErr::new("validation_failed", "No active term."))?;
    let (pace, track) = data
        .student_term()
        .and_then(|st| Some((st.pace?, st.pace_track.clone()?)))
        .ok_or_else(|| HandlerErr::new("validation_failed", "Student has no pace and track this term."))?;
    let target = data
        .milestones()
        .iter()
        .find(|m| {
            m.pace == pace
                && m.pace_track == track
                && i64::from(m.ms_nbr) == ms_nbr
                && m.ms_type == ms_type.trim()
        })
        .cloned()
        .ok_or_else(|| {
            HandlerErr::new("not_found", format!("milestone {} {} not found", ms_nbr, ms_type.trim()))
        })?;

    let owner = AppealOwner {
        stu_id: data.stu_id(),
        term_key: &term_key,
        pace_track: Some(&track),
    };
    let appeal = appeals::quick_extension(conn, &owner, pace, &target, &form)
        .map_err(|e| HandlerErr::record(e, "db_insert_failed"))?;

    data.invalidate(Part::Appeals);
    data.invalidate(Part::StudentMilestones);
    Ok(json!({ "appeal": to_json(&appeal)? }))
}

fn handle_deadlines_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    match deadlines_get(state) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_deadlines_extend(state: &mut AppState, req: &Request) -> serde_json::Value {
    match deadlines_extend(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "deadlines.get" => Some(handle_deadlines_get(state, req)),
        "deadlines.extend" => Some(handle_deadlines_extend(state, req)),
        _ => None,
    }
}
