use crate::deadlines;
use crate::ipc::error::ok;
use crate::ipc::helpers::{session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::student_data::Part;
use serde_json::json;

fn courses_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (conn, data) = session(state)?;
    data.require(conn, &[Part::Term, Part::Registrations])?;

    let organized = data
        .active_term()
        .map(|t| deadlines::organize_registrations(data.registrations(), &t.term_key))
        .unwrap_or_default();

    let rows: Vec<serde_json::Value> = data
        .registrations()
        .iter()
        .map(|r| {
            let assigned = organized
                .iter()
                .find(|o| o.term_key == r.term_key && o.course == r.course && o.sect == r.sect)
                .and_then(|o| o.pace_order);
            json!({
                "course": r.course,
                "courseLabel": deadlines::course_label(&r.course),
                "sect": r.sect,
                "termKey": r.term_key,
                "paceOrder": r.pace_order,
                "assignedPaceOrder": assigned,
                "openStatus": r.open_status,
                "completed": r.completed,
                "statusText": r.status_text(),
                "incomplete": r.i_in_progress,
                "incompleteFrom": r.i_term_key,
                "countsTowardPace": assigned.is_some(),
            })
        })
        .collect();

    Ok(json!({
        "activeTerm": data.active_term().map(|t| t.term_key.clone()),
        "registrations": rows,
    }))
}

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match courses_list(state) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_courses_list(state, req)),
        _ => None,
    }
}
