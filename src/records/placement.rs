use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use super::{is_yes, RecordResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementCredit {
    pub stu_id: String,
    pub course: String,
    /// `P` placed out, `C` credit earned.
    pub exam_placed: String,
    pub exam_dt: NaiveDate,
    pub exam_source: Option<String>,
}

impl PlacementCredit {
    pub fn counts(&self) -> bool {
        self.exam_placed == "P" || self.exam_placed == "C"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementAttempt {
    pub stu_id: String,
    pub exam_dt: NaiveDate,
    pub proctored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCredit {
    pub stu_id: String,
    pub course: String,
    pub exam_dt: NaiveDate,
    pub source: Option<String>,
}

pub fn credits_for_student(conn: &Connection, stu_id: &str) -> RecordResult<Vec<PlacementCredit>> {
    let mut stmt = conn.prepare(
        "SELECT stu_id, course, exam_placed, exam_dt, exam_source
         FROM mpe_credit WHERE stu_id = ? ORDER BY course",
    )?;
    let rows = stmt
        .query_map([stu_id], |r| {
            Ok(PlacementCredit {
                stu_id: r.get(0)?,
                course: r.get(1)?,
                exam_placed: r.get(2)?,
                exam_dt: r.get(3)?,
                exam_source: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_credit(conn: &Connection, credit: &PlacementCredit) -> RecordResult<()> {
    conn.execute(
        "INSERT INTO mpe_credit(stu_id, course, exam_placed, exam_dt, exam_source) VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(stu_id, course) DO UPDATE SET
           exam_placed = excluded.exam_placed,
           exam_dt = excluded.exam_dt,
           exam_source = excluded.exam_source",
        (
            &credit.stu_id,
            &credit.course,
            &credit.exam_placed,
            credit.exam_dt,
            &credit.exam_source,
        ),
    )?;
    Ok(())
}

pub fn attempts_for_student(conn: &Connection, stu_id: &str) -> RecordResult<Vec<PlacementAttempt>> {
    let mut stmt = conn.prepare(
        "SELECT stu_id, exam_dt, proctored FROM mpe_attempt WHERE stu_id = ? ORDER BY exam_dt",
    )?;
    let rows = stmt
        .query_map([stu_id], |r| {
            Ok(PlacementAttempt {
                stu_id: r.get(0)?,
                exam_dt: r.get(1)?,
                proctored: is_yes(r.get(2)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn transfers_for_student(conn: &Connection, stu_id: &str) -> RecordResult<Vec<TransferCredit>> {
    let mut stmt = conn.prepare(
        "SELECT stu_id, course, exam_dt, source FROM transfer_credit WHERE stu_id = ? ORDER BY course",
    )?;
    let rows = stmt
        .query_map([stu_id], |r| {
            Ok(TransferCredit {
                stu_id: r.get(0)?,
                course: r.get(1)?,
                exam_dt: r.get(2)?,
                source: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_transfer(conn: &Connection, credit: &TransferCredit) -> RecordResult<()> {
    conn.execute(
        "INSERT INTO transfer_credit(stu_id, course, exam_dt, source) VALUES(?, ?, ?, ?)",
        (&credit.stu_id, &credit.course, credit.exam_dt, &credit.source),
    )?;
    Ok(())
}

pub fn delete_transfer(conn: &Connection, stu_id: &str, course: &str) -> RecordResult<usize> {
    Ok(conn.execute(
        "DELETE FROM transfer_credit WHERE stu_id = ? AND course = ?",
        [stu_id, course],
    )?)
}
