use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use super::RecordResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discipline {
    pub id: String,
    pub stu_id: String,
    pub dt_incident: NaiveDate,
    pub incident_type: String,
    pub course: Option<String>,
    pub unit: Option<u32>,
    pub cheat_desc: Option<String>,
    pub action_type: Option<String>,
    pub action_comment: Option<String>,
    pub interviewer: Option<String>,
    pub proctor: Option<String>,
}

pub fn incidents_for_student(conn: &Connection, stu_id: &str) -> RecordResult<Vec<Discipline>> {
    let mut stmt = conn.prepare(
        "SELECT id, stu_id, dt_incident, incident_type, course, unit, cheat_desc, action_type,
                action_comment, interviewer, proctor
         FROM discipline WHERE stu_id = ? ORDER BY dt_incident DESC",
    )?;
    let rows = stmt
        .query_map([stu_id], |r| {
            Ok(Discipline {
                id: r.get(0)?,
                stu_id: r.get(1)?,
                dt_incident: r.get(2)?,
                incident_type: r.get(3)?,
                course: r.get(4)?,
                unit: r.get(5)?,
                cheat_desc: r.get(6)?,
                action_type: r.get(7)?,
                action_comment: r.get(8)?,
                interviewer: r.get(9)?,
                proctor: r.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_incident(conn: &Connection, d: &Discipline) -> RecordResult<()> {
    conn.execute(
        "INSERT INTO discipline(id, stu_id, dt_incident, incident_type, course, unit, cheat_desc,
                                action_type, action_comment, interviewer, proctor)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            d.id,
            d.stu_id,
            d.dt_incident,
            d.incident_type,
            d.course,
            d.unit,
            d.cheat_desc,
            d.action_type,
            d.action_comment,
            d.interviewer,
            d.proctor,
        ],
    )?;
    Ok(())
}

pub fn delete_incident(conn: &Connection, stu_id: &str, id: &str) -> RecordResult<usize> {
    Ok(conn.execute(
        "DELETE FROM discipline WHERE stu_id = ? AND id = ?",
        [stu_id, id],
    )?)
}
