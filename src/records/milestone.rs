use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{is_yes, yn, RecordResult};

/// Scheduled deadline shared by every student on a pace and track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub term_key: String,
    pub pace: u32,
    pub pace_track: String,
    pub ms_nbr: u32,
    pub ms_type: String,
    pub ms_date: NaiveDate,
    pub nbr_atmpts_allow: Option<u32>,
}

impl Milestone {
    pub fn pace_order(&self) -> u32 {
        order_of(self.ms_nbr)
    }

    pub fn unit(&self) -> u32 {
        unit_of(self.ms_nbr)
    }
}

/// Per-student override of a milestone's date or attempt count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMilestone {
    pub id: String,
    pub term_key: String,
    pub stu_id: String,
    pub pace_track: String,
    pub ms_nbr: u32,
    pub ms_type: String,
    pub ms_date: NaiveDate,
    pub nbr_atmpts_allow: Option<u32>,
    pub ext_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaceAppeal {
    pub id: String,
    pub term_key: String,
    pub stu_id: String,
    pub appeal_dt: NaiveDate,
    pub relief_given: bool,
    pub appeal_type: Option<String>,
    pub pace: u32,
    pub pace_track: String,
    pub ms_nbr: u32,
    pub ms_type: String,
    pub ms_date: NaiveDate,
    pub new_deadline_dt: Option<NaiveDate>,
    pub nbr_atmpts_allow: Option<u32>,
    pub circumstances: String,
    pub comment: Option<String>,
    pub interviewer: String,
}

/// `None` when the number does not fit in a `u32`.
pub fn ms_number(pace: u32, pace_order: u32, unit: u32) -> Option<u32> {
    pace.checked_mul(100)?
        .checked_add(pace_order.checked_mul(10)?)?
        .checked_add(unit)
}

pub fn order_of(ms_nbr: u32) -> u32 {
    (ms_nbr / 10) % 10
}

pub fn unit_of(ms_nbr: u32) -> u32 {
    ms_nbr % 10
}

pub fn type_label(ms_type: &str) -> String {
    match ms_type {
        "RE" => "Review Exam".to_string(),
        "UE" => "Unit Exam".to_string(),
        "FE" => "Final Exam".to_string(),
        "F1" => "Final +1".to_string(),
        "SR" => "Skills Review".to_string(),
        "H1" | "H2" | "H3" | "H4" | "H5" => format!("Homework {}", &ms_type[1..]),
        other => other.to_string(),
    }
}

pub const EXTENSION_TYPES: &[&str] = &["ACC", "EXC", "FIN", "MED", "FAM", "REQ", "AUT", "OTH"];

pub fn extension_label(ext_type: Option<&str>) -> String {
    let label = match ext_type {
        None => "No type",
        Some("ACC") => "Accommodation",
        Some("EXC") => "Excused absence",
        Some("FIN") => "Close to finishing",
        Some("MED") => "Medical",
        Some("FAM") => "Family emergency",
        Some("REQ") => "Requested time",
        Some("AUT") => "Auto-applied",
        Some("OTH") => "Other",
        Some(other) => other,
    };
    label.to_string()
}

pub fn milestones_for_term(conn: &Connection, term_key: &str) -> RecordResult<Vec<Milestone>> {
    let mut stmt = conn.prepare(
        "SELECT term_key, pace, pace_track, ms_nbr, ms_type, ms_date, nbr_atmpts_allow
         FROM milestone WHERE term_key = ? ORDER BY ms_nbr, ms_type",
    )?;
    let rows = stmt
        .query_map([term_key], |r| {
            Ok(Milestone {
                term_key: r.get(0)?,
                pace: r.get(1)?,
                pace_track: r.get(2)?,
                ms_nbr: r.get(3)?,
                ms_type: r.get(4)?,
                ms_date: r.get(5)?,
                nbr_atmpts_allow: r.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

const STMS_COLUMNS: &str =
    "id, term_key, stu_id, pace_track, ms_nbr, ms_type, ms_date, nbr_atmpts_allow, ext_type";

fn student_milestone_from_row(r: &Row<'_>) -> rusqlite::Result<StudentMilestone> {
    Ok(StudentMilestone {
        id: r.get(0)?,
        term_key: r.get(1)?,
        stu_id: r.get(2)?,
        pace_track: r.get(3)?,
        ms_nbr: r.get(4)?,
        ms_type: r.get(5)?,
        ms_date: r.get(6)?,
        nbr_atmpts_allow: r.get(7)?,
        ext_type: r.get(8)?,
    })
}

/// Overrides for one term, oldest date first.
pub fn student_milestones(
    conn: &Connection,
    stu_id: &str,
    term_key: &str,
) -> RecordResult<Vec<StudentMilestone>> {
    let sql = format!(
        "SELECT {STMS_COLUMNS} FROM stmilestone WHERE stu_id = ? AND term_key = ? ORDER BY ms_date, ms_nbr"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([stu_id, term_key], student_milestone_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find_student_milestone(
    conn: &Connection,
    stu_id: &str,
    term_key: &str,
    pace_track: &str,
    ms_nbr: u32,
    ms_type: &str,
) -> RecordResult<Option<StudentMilestone>> {
    let sql = format!(
        "SELECT {STMS_COLUMNS} FROM stmilestone
         WHERE stu_id = ? AND term_key = ? AND pace_track = ? AND ms_nbr = ? AND ms_type = ?
         ORDER BY ms_date DESC LIMIT 1"
    );
    Ok(conn
        .query_row(
            &sql,
            (stu_id, term_key, pace_track, ms_nbr, ms_type),
            student_milestone_from_row,
        )
        .optional()?)
}

pub fn insert_student_milestone(conn: &Connection, stms: &StudentMilestone) -> RecordResult<()> {
    conn.execute(
        "INSERT INTO stmilestone(id, term_key, stu_id, pace_track, ms_nbr, ms_type, ms_date, nbr_atmpts_allow, ext_type)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            stms.id,
            stms.term_key,
            stms.stu_id,
            stms.pace_track,
            stms.ms_nbr,
            stms.ms_type,
            stms.ms_date,
            stms.nbr_atmpts_allow,
            stms.ext_type,
        ],
    )?;
    Ok(())
}

pub fn update_student_milestone(
    conn: &Connection,
    id: &str,
    ms_date: NaiveDate,
    nbr_atmpts_allow: Option<u32>,
    ext_type: Option<&str>,
) -> RecordResult<usize> {
    Ok(conn.execute(
        "UPDATE stmilestone SET ms_date = ?, nbr_atmpts_allow = ?, ext_type = ? WHERE id = ?",
        (ms_date, nbr_atmpts_allow, ext_type, id),
    )?)
}

const APPEAL_COLUMNS: &str = "id, term_key, stu_id, appeal_dt, relief_given, appeal_type, pace, \
                              pace_track, ms_nbr, ms_type, ms_date, new_deadline_dt, \
                              nbr_atmpts_allow, circumstances, comment, interviewer";

fn appeal_from_row(r: &Row<'_>) -> rusqlite::Result<PaceAppeal> {
    Ok(PaceAppeal {
        id: r.get(0)?,
        term_key: r.get(1)?,
        stu_id: r.get(2)?,
        appeal_dt: r.get(3)?,
        relief_given: is_yes(r.get(4)?),
        appeal_type: r.get(5)?,
        pace: r.get(6)?,
        pace_track: r.get(7)?,
        ms_nbr: r.get(8)?,
        ms_type: r.get(9)?,
        ms_date: r.get(10)?,
        new_deadline_dt: r.get(11)?,
        nbr_atmpts_allow: r.get(12)?,
        circumstances: r.get(13)?,
        comment: r.get(14)?,
        interviewer: r.get(15)?,
    })
}

/// All appeals of the student, newest first.
pub fn pace_appeals(conn: &Connection, stu_id: &str) -> RecordResult<Vec<PaceAppeal>> {
    let sql = format!(
        "SELECT {APPEAL_COLUMNS} FROM pace_appeals WHERE stu_id = ? ORDER BY appeal_dt DESC, ms_nbr"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([stu_id], appeal_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_pace_appeal(conn: &Connection, id: &str) -> RecordResult<Option<PaceAppeal>> {
    let sql = format!("SELECT {APPEAL_COLUMNS} FROM pace_appeals WHERE id = ?");
    Ok(conn.query_row(&sql, [id], appeal_from_row).optional()?)
}

pub fn insert_pace_appeal(conn: &Connection, appeal: &PaceAppeal) -> RecordResult<()> {
    conn.execute(
        "INSERT INTO pace_appeals(id, term_key, stu_id, appeal_dt, relief_given, appeal_type, pace,
                                  pace_track, ms_nbr, ms_type, ms_date, new_deadline_dt,
                                  nbr_atmpts_allow, circumstances, comment, interviewer)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            appeal.id,
            appeal.term_key,
            appeal.stu_id,
            appeal.appeal_dt,
            yn(appeal.relief_given),
            appeal.appeal_type,
            appeal.pace,
            appeal.pace_track,
            appeal.ms_nbr,
            appeal.ms_type,
            appeal.ms_date,
            appeal.new_deadline_dt,
            appeal.nbr_atmpts_allow,
            appeal.circumstances,
            appeal.comment,
            appeal.interviewer,
        ],
    )?;
    Ok(())
}

/// Rewrites the editable fields of an appeal; the milestone it targets is fixed.
pub fn update_pace_appeal(conn: &Connection, appeal: &PaceAppeal) -> RecordResult<usize> {
    Ok(conn.execute(
        "UPDATE pace_appeals
         SET appeal_dt = ?, relief_given = ?, appeal_type = ?, new_deadline_dt = ?,
             nbr_atmpts_allow = ?, circumstances = ?, comment = ?, interviewer = ?
         WHERE id = ?",
        rusqlite::params![
            appeal.appeal_dt,
            yn(appeal.relief_given),
            appeal.appeal_type,
            appeal.new_deadline_dt,
            appeal.nbr_atmpts_allow,
            appeal.circumstances,
            appeal.comment,
            appeal.interviewer,
            appeal.id,
        ],
    )?)
}

pub fn delete_pace_appeal(conn: &Connection, id: &str) -> RecordResult<usize> {
    Ok(conn.execute("DELETE FROM pace_appeals WHERE id = ?", [id])?)
}
