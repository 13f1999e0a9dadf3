use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{is_yes, yn, RecordResult};

/// One `stexam` row. Times are minutes past midnight on `exam_dt`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentExam {
    pub serial_nbr: i64,
    pub stu_id: String,
    pub course: String,
    pub unit: u32,
    pub exam_type: String,
    pub version: Option<String>,
    pub exam_dt: NaiveDate,
    pub start_time: Option<u32>,
    pub finish_time: u32,
    pub exam_score: Option<u32>,
    pub mastery_score: Option<u32>,
    pub passed: String,
    pub is_first_passed: bool,
}

impl StudentExam {
    pub fn is_passed(&self) -> bool {
        self.passed == "Y"
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.start_time.and_then(|m| at_minute(self.exam_dt, m))
    }

    pub fn finish(&self) -> Option<NaiveDateTime> {
        at_minute(self.exam_dt, self.finish_time)
    }
}

fn at_minute(date: NaiveDate, minute: u32) -> Option<NaiveDateTime> {
    NaiveTime::from_hms_opt(minute / 60, minute % 60, 0).map(|t| date.and_time(t))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAnswer {
    pub serial_nbr: i64,
    pub question_nbr: u32,
    pub objective: Option<String>,
    pub stu_answer: Option<String>,
    pub ans_correct: bool,
}

const COLUMNS: &str = "serial_nbr, stu_id, course, unit, exam_type, version, exam_dt, start_time, \
                       finish_time, exam_score, mastery_score, passed, is_first_passed";

fn exam_from_row(r: &Row<'_>) -> rusqlite::Result<StudentExam> {
    Ok(StudentExam {
        serial_nbr: r.get(0)?,
        stu_id: r.get(1)?,
        course: r.get(2)?,
        unit: r.get(3)?,
        exam_type: r.get(4)?,
        version: r.get(5)?,
        exam_dt: r.get(6)?,
        start_time: r.get(7)?,
        finish_time: r.get(8)?,
        exam_score: r.get(9)?,
        mastery_score: r.get(10)?,
        passed: r.get(11)?,
        is_first_passed: is_yes(r.get(12)?),
    })
}

/// Exam history, newest first.
pub fn exams_for_student(conn: &Connection, stu_id: &str) -> RecordResult<Vec<StudentExam>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM stexam WHERE stu_id = ? ORDER BY exam_dt DESC, finish_time DESC, serial_nbr DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([stu_id], exam_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_exam(conn: &Connection, serial_nbr: i64) -> RecordResult<Option<StudentExam>> {
    let sql = format!("SELECT {COLUMNS} FROM stexam WHERE serial_nbr = ?");
    Ok(conn.query_row(&sql, [serial_nbr], exam_from_row).optional()?)
}

pub fn answers_for_exam(conn: &Connection, serial_nbr: i64) -> RecordResult<Vec<ExamAnswer>> {
    let mut stmt = conn.prepare(
        "SELECT serial_nbr, question_nbr, objective, stu_answer, ans_correct
         FROM stqa WHERE serial_nbr = ? ORDER BY question_nbr",
    )?;
    let rows = stmt
        .query_map([serial_nbr], |r| {
            Ok(ExamAnswer {
                serial_nbr: r.get(0)?,
                question_nbr: r.get(1)?,
                objective: r.get(2)?,
                stu_answer: r.get(3)?,
                ans_correct: is_yes(r.get(4)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn set_answer_correct(
    conn: &Connection,
    serial_nbr: i64,
    question_nbr: u32,
    correct: bool,
) -> RecordResult<usize> {
    Ok(conn.execute(
        "UPDATE stqa SET ans_correct = ? WHERE serial_nbr = ? AND question_nbr = ?",
        (yn(correct), serial_nbr, question_nbr),
    )?)
}

pub fn set_mastery_score(conn: &Connection, serial_nbr: i64, mastery: u32) -> RecordResult<usize> {
    Ok(conn.execute(
        "UPDATE stexam SET mastery_score = ? WHERE serial_nbr = ?",
        (mastery, serial_nbr),
    )?)
}

pub fn set_score_and_passed(
    conn: &Connection,
    serial_nbr: i64,
    score: u32,
    passed: bool,
) -> RecordResult<usize> {
    Ok(conn.execute(
        "UPDATE stexam SET exam_score = ?, passed = ? WHERE serial_nbr = ?",
        (score, yn(passed), serial_nbr),
    )?)
}
