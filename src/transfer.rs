use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::info;

use crate::dates::interpret_date;
use crate::records::placement::{self, TransferCredit};
use crate::records::{RecordError, RecordResult};

pub const TRANSFER_COURSES: &[&str] = &["M 100C", "M 117", "M 118", "M 124", "M 125", "M 126"];

/// Accepts `M 117`, `MATH 117` or a bare `117` and returns the catalogue code.
pub fn normalize_course(text: &str) -> Option<&'static str> {
    let t = text.trim().to_uppercase();
    let number = t
        .strip_prefix("MATH")
        .or_else(|| t.strip_prefix('M'))
        .unwrap_or(&t)
        .trim();
    TRANSFER_COURSES
        .iter()
        .copied()
        .find(|c| c.strip_prefix("M ") == Some(number))
}

pub fn add_transfer(
    conn: &Connection,
    stu_id: &str,
    course: &str,
    exam_date: Option<&str>,
    source: Option<&str>,
    as_of: NaiveDate,
) -> RecordResult<TransferCredit> {
    let course = normalize_course(course)
        .ok_or_else(|| RecordError::invalid(format!("Invalid transfer course: {}", course.trim())))?;
    let exam_dt = match exam_date.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => {
            interpret_date(text).ok_or_else(|| RecordError::invalid("Unable to interpret credit date."))?
        }
        None => as_of,
    };

    let existing = placement::transfers_for_student(conn, stu_id)?;
    if existing.iter().any(|t| t.course == course) {
        return Err(RecordError::invalid(format!(
            "Student already has transfer credit for {course}."
        )));
    }

    let credit = TransferCredit {
        stu_id: stu_id.to_string(),
        course: course.to_string(),
        exam_dt,
        source: source.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
    };
    placement::insert_transfer(conn, &credit)?;
    info!(stu_id, course, "transfer credit added");
    Ok(credit)
}

pub fn delete_transfer(conn: &Connection, stu_id: &str, course: &str) -> RecordResult<()> {
    let course = normalize_course(course).unwrap_or(course);
    if placement::delete_transfer(conn, stu_id, course)? == 0 {
        return Err(RecordError::NotFound(format!(
            "no transfer credit for {course}"
        )));
    }
    info!(stu_id, course, "transfer credit deleted");
    Ok(())
}
