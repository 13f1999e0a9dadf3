use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{is_yes, yn, RecordResult};

const REG_COLUMNS: &str = "stu_id, course, sect, term_key, pace_order, open_status, completed, \
                           i_in_progress, i_counted, i_term_key";

/// One `stcourse` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub stu_id: String,
    pub course: String,
    pub sect: String,
    pub term_key: String,
    pub pace_order: Option<u32>,
    pub open_status: Option<String>,
    pub completed: bool,
    pub i_in_progress: bool,
    pub i_counted: Option<bool>,
    pub i_term_key: Option<String>,
}

impl Registration {
    pub fn is_dropped(&self) -> bool {
        self.open_status.as_deref() == Some("D")
    }

    /// Incomplete carried into this term that does not count toward pace.
    pub fn is_uncounted_incomplete(&self) -> bool {
        self.i_in_progress && self.i_counted == Some(false)
    }

    pub fn status_text(&self) -> &'static str {
        match self.open_status.as_deref() {
            None => "Not yet started",
            Some("G") => "Forfeit",
            Some("D") => "Dropped",
            Some("Y") if self.completed => "Completed, Still Open",
            Some("Y") => "In Progress",
            Some("N") if self.completed => "Completed, Closed",
            Some("N") => "Not Completed, Closed",
            Some(_) => "Unknown status",
        }
    }

    pub fn incomplete_marker(&self) -> Option<String> {
        if !self.i_in_progress {
            return None;
        }
        let from = self.i_term_key.as_deref().unwrap_or("?");
        Some(format!(" ** Incomplete from {from} ** "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTerm {
    pub stu_id: String,
    pub term_key: String,
    pub pace: Option<u32>,
    pub pace_track: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSection {
    pub course: String,
    pub sect: String,
    pub term_key: String,
    pub instructor: Option<String>,
}

fn registration_from_row(row: &Row<'_>) -> rusqlite::Result<Registration> {
    let i_counted: Option<String> = row.get(8)?;
    Ok(Registration {
        stu_id: row.get(0)?,
        course: row.get(1)?,
        sect: row.get(2)?,
        term_key: row.get(3)?,
        pace_order: row.get(4)?,
        open_status: row.get(5)?,
        completed: is_yes(row.get(6)?),
        i_in_progress: is_yes(row.get(7)?),
        i_counted: i_counted.map(|v| v == "Y"),
        i_term_key: row.get(9)?,
    })
}

/// Every registration of the student, most recent term first.
pub fn registrations_for_student(conn: &Connection, stu_id: &str) -> RecordResult<Vec<Registration>> {
    let sql = format!(
        "SELECT {REG_COLUMNS} FROM stcourse WHERE stu_id = ? ORDER BY term_key DESC, course, sect"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([stu_id], registration_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Courses of the student's non-dropped registrations in a term.
pub fn registered_courses(conn: &Connection, stu_id: &str, term_key: &str) -> RecordResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT course FROM stcourse
         WHERE stu_id = ? AND term_key = ? AND (open_status IS NULL OR open_status <> 'D')
         ORDER BY course",
    )?;
    let rows = stmt
        .query_map([stu_id, term_key], |r| r.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn set_completed(
    conn: &Connection,
    stu_id: &str,
    course: &str,
    term_key: &str,
    completed: bool,
) -> RecordResult<usize> {
    Ok(conn.execute(
        "UPDATE stcourse SET completed = ? WHERE stu_id = ? AND course = ? AND term_key = ?",
        (yn(completed), stu_id, course, term_key),
    )?)
}

pub fn student_term(conn: &Connection, stu_id: &str, term_key: &str) -> RecordResult<Option<StudentTerm>> {
    Ok(conn
        .query_row(
            "SELECT stu_id, term_key, pace, pace_track FROM stterm WHERE stu_id = ? AND term_key = ?",
            [stu_id, term_key],
            |r| {
                Ok(StudentTerm {
                    stu_id: r.get(0)?,
                    term_key: r.get(1)?,
                    pace: r.get(2)?,
                    pace_track: r.get(3)?,
                })
            },
        )
        .optional()?)
}

pub fn sections_for_term(conn: &Connection, term_key: &str) -> RecordResult<Vec<CourseSection>> {
    let mut stmt = conn.prepare(
        "SELECT course, sect, term_key, instructor FROM csection WHERE term_key = ? ORDER BY course, sect",
    )?;
    let rows = stmt
        .query_map([term_key], |r| {
            Ok(CourseSection {
                course: r.get(0)?,
                sect: r.get(1)?,
                term_key: r.get(2)?,
                instructor: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// `(re_mastery_score, ue_mastery_score)` for one course unit of a section.
pub fn unit_mastery(
    conn: &Connection,
    course: &str,
    sect: &str,
    unit: u32,
    term_key: &str,
) -> RecordResult<Option<(Option<u32>, Option<u32>)>> {
    Ok(conn
        .query_row(
            "SELECT re_mastery_score, ue_mastery_score FROM cusection
             WHERE course = ? AND sect = ? AND unit = ? AND term_key = ?",
            (course, sect, unit, term_key),
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?)
}

/// Lowest-numbered section of a course in a term.
pub fn first_section(conn: &Connection, course: &str, term_key: &str) -> RecordResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT sect FROM csection WHERE course = ? AND term_key = ? ORDER BY sect LIMIT 1",
            [course, term_key],
            |r| r.get(0),
        )
        .optional()?)
}
