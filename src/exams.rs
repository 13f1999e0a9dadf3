//! Exam history and detail, and regrading by flipping one answer's correctness.
//!
//! A regrade recomputes the raw score against the exam's mastery score. When the
//! pass/fail result flips, the records that depend on it follow in the same
//! transaction: the registration's completed flag for course exams, placement
//! credit for tutorial exams and the user's-exam license.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::deadlines::{final_passed, PRECALC_COURSES};
use crate::records::course;
use crate::records::exam::{self, ExamAnswer, StudentExam};
use crate::records::placement::{self, PlacementCredit};
use crate::records::student;
use crate::records::term;
use crate::records::{RecordError, RecordResult};

const USERS_EXAM_COURSE: &str = "M 100U";

/// Tutorial course and the course its passed unit exam grants credit in.
const TUTORIAL_CREDIT: &[(&str, &str)] = &[
    ("M 100T", "M 100C"),
    ("M 1170", "M 117"),
    ("M 1180", "M 118"),
    ("M 1240", "M 124"),
    ("M 1250", "M 125"),
    ("M 1260", "M 126"),
];

pub fn exam_type_label(exam_type: &str, unit: u32) -> String {
    match exam_type {
        "Q" => "User's Exam".to_string(),
        "R" if unit == 0 => "Skills Rev.".to_string(),
        "R" => "Unit Rev.".to_string(),
        "U" => "Unit Exam".to_string(),
        "F" => "Final Exam".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRow {
    #[serde(flatten)]
    pub exam: StudentExam,
    pub type_label: String,
}

pub fn exam_rows(exams: &[StudentExam]) -> Vec<ExamRow> {
    exams
        .iter()
        .map(|e| ExamRow {
            exam: e.clone(),
            type_label: exam_type_label(&e.exam_type, e.unit),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDetail {
    #[serde(flatten)]
    pub exam: StudentExam,
    pub type_label: String,
    pub start: Option<NaiveDateTime>,
    pub finish: Option<NaiveDateTime>,
    pub duration: Option<String>,
    pub passed_text: String,
    pub answers: Vec<ExamAnswer>,
}

/// `N min` for whole minutes, otherwise `M:SS`.
pub fn duration_text(seconds: i64) -> String {
    if seconds % 60 == 0 {
        format!("{} min", seconds / 60)
    } else {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    }
}

pub fn passed_text(exam: &StudentExam) -> String {
    match exam.passed.as_str() {
        "Y" if exam.is_first_passed => "Yes (First)".to_string(),
        "Y" => "Yes".to_string(),
        "N" => "No".to_string(),
        other => other.to_string(),
    }
}

fn owned_exam(conn: &Connection, stu_id: &str, serial_nbr: i64) -> RecordResult<StudentExam> {
    exam::get_exam(conn, serial_nbr)?
        .filter(|e| e.stu_id == stu_id)
        .ok_or_else(|| RecordError::NotFound(format!("exam {serial_nbr} not found")))
}

pub fn exam_detail(conn: &Connection, stu_id: &str, serial_nbr: i64) -> RecordResult<ExamDetail> {
    let e = owned_exam(conn, stu_id, serial_nbr)?;
    let start = e.start();
    let finish = e.finish();
    let duration = match (start, finish) {
        (Some(s), Some(f)) => Some(duration_text((f - s).num_seconds())),
        _ => None,
    };
    Ok(ExamDetail {
        type_label: exam_type_label(&e.exam_type, e.unit),
        start,
        finish,
        duration,
        passed_text: passed_text(&e),
        answers: exam::answers_for_exam(conn, serial_nbr)?,
        exam: e,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegradeOutcome {
    pub exam: StudentExam,
    pub answer: ExamAnswer,
    pub passed_changed: bool,
    /// New completed flag of the registration, when it was updated.
    pub course_completed: Option<bool>,
    /// Course credit was granted in, when a tutorial exam was passed.
    pub credit_granted: Option<String>,
    /// New license flag, when a user's exam result changed.
    pub licensed: Option<bool>,
}

/// Mastery score used when neither the exam nor its section has one.
fn guessed_mastery(course: &str, unit: u32) -> u32 {
    if PRECALC_COURSES.contains(&course) {
        if unit < 5 {
            8
        } else {
            16
        }
    } else if TUTORIAL_CREDIT.iter().any(|(t, _)| *t == course) {
        match unit {
            1 => 7,
            2 => 11,
            _ => 14,
        }
    } else if course == USERS_EXAM_COURSE {
        16
    } else {
        0
    }
}

fn section_mastery(conn: &Connection, e: &StudentExam) -> RecordResult<Option<u32>> {
    let Some(active) = term::active(conn)? else {
        return Ok(None);
    };
    let sections = course::sections_for_term(conn, &active.term_key)?;
    let registered = course::registrations_for_student(conn, &e.stu_id)?
        .into_iter()
        .find(|r| r.course == e.course && r.term_key == active.term_key)
        .map(|r| r.sect)
        .filter(|sect| sections.iter().any(|s| s.course == e.course && &s.sect == sect));
    let sect = match registered {
        Some(sect) => sect,
        None => match course::first_section(conn, &e.course, &active.term_key)? {
            Some(sect) => sect,
            None => return Ok(None),
        },
    };

    let scores = course::unit_mastery(conn, &e.course, &sect, e.unit, &active.term_key)?;
    Ok(scores.and_then(|(review, unit_exam)| match e.exam_type.as_str() {
        "R" | "Q" => review,
        "U" | "F" => unit_exam,
        _ => None,
    }))
}

/// Flips one answer and regrades the exam.
pub fn toggle_answer(
    conn: &Connection,
    stu_id: &str,
    serial_nbr: i64,
    question_nbr: u32,
) -> RecordResult<RegradeOutcome> {
    let before = owned_exam(conn, stu_id, serial_nbr)?;
    let answers = exam::answers_for_exam(conn, serial_nbr)?;
    let target = answers
        .iter()
        .find(|a| a.question_nbr == question_nbr)
        .ok_or_else(|| {
            RecordError::NotFound(format!("question {question_nbr} not found on exam {serial_nbr}"))
        })?;
    let flipped = !target.ans_correct;

    let tx = conn.unchecked_transaction()?;
    exam::set_answer_correct(&tx, serial_nbr, question_nbr, flipped)?;

    let raw_score = answers
        .iter()
        .filter(|a| {
            if a.question_nbr == question_nbr {
                flipped
            } else {
                a.ans_correct
            }
        })
        .count() as u32;

    let mastery = match before.mastery_score {
        Some(m) => m,
        None => {
            let m = match section_mastery(&tx, &before)? {
                Some(m) => m,
                None => guessed_mastery(&before.course, before.unit),
            };
            exam::set_mastery_score(&tx, serial_nbr, m)?;
            m
        }
    };

    let passed = raw_score >= mastery;
    let passed_changed = passed != before.is_passed();
    if Some(raw_score) != before.exam_score || passed_changed {
        exam::set_score_and_passed(&tx, serial_nbr, raw_score, passed)?;
    }

    let mut outcome = RegradeOutcome {
        exam: before.clone(),
        answer: ExamAnswer {
            ans_correct: flipped,
            ..target.clone()
        },
        passed_changed,
        course_completed: None,
        credit_granted: None,
        licensed: None,
    };

    if passed_changed {
        apply_result_change(&tx, &before, &mut outcome)?;
    }

    tx.commit()?;
    outcome.exam = owned_exam(conn, stu_id, serial_nbr)?;

    info!(stu_id, serial_nbr, question_nbr, score = raw_score, mastery, passed, "exam regraded");
    Ok(outcome)
}

fn apply_result_change(
    conn: &Connection,
    regraded: &StudentExam,
    outcome: &mut RegradeOutcome,
) -> RecordResult<()> {
    let stu_id = regraded.stu_id.as_str();
    let exams = exam::exams_for_student(conn, stu_id)?;

    if PRECALC_COURSES.contains(&regraded.course.as_str()) {
        let active = term::active(conn)?;
        let registered = match &active {
            Some(t) => course::registrations_for_student(conn, stu_id)?
                .into_iter()
                .any(|r| r.course == regraded.course && r.term_key == t.term_key),
            None => false,
        };
        match active {
            Some(t) if registered => {
                let completed = final_passed(&exams, &regraded.course);
                course::set_completed(conn, stu_id, &regraded.course, &t.term_key, completed)?;
                outcome.course_completed = Some(completed);
            }
            _ => warn!(stu_id, course = %regraded.course,
                       "exam result changed but no registration was found to update"),
        }
    } else if let Some((_, credit_course)) = TUTORIAL_CREDIT
        .iter()
        .find(|(t, _)| *t == regraded.course)
        .filter(|_| regraded.exam_type == "U")
    {
        let unit_passed = exams.iter().any(|e| {
            e.course == regraded.course && e.unit == regraded.unit && e.exam_type == "U" && e.is_passed()
        });
        let has_credit = placement::credits_for_student(conn, stu_id)?
            .iter()
            .any(|c| c.course == *credit_course);
        if unit_passed {
            if !has_credit {
                placement::insert_credit(
                    conn,
                    &PlacementCredit {
                        stu_id: stu_id.to_string(),
                        course: (*credit_course).to_string(),
                        exam_placed: "P".to_string(),
                        exam_dt: regraded.exam_dt,
                        exam_source: Some("TC".to_string()),
                    },
                )?;
                outcome.credit_granted = Some((*credit_course).to_string());
            }
        } else if has_credit {
            warn!(stu_id, course = %credit_course,
                  "tutorial exam no longer passed but placement credit remains");
        }
    } else if regraded.course == USERS_EXAM_COURSE {
        let licensed = exams
            .iter()
            .any(|e| e.course == USERS_EXAM_COURSE && e.is_passed());
        student::set_licensed(conn, stu_id, licensed)?;
        outcome.licensed = Some(licensed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn seeded(seed: &str) -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        db::init_schema(&conn).expect("schema");
        conn.execute_batch(
            "INSERT INTO term(term_key, start_dt, end_dt, active) VALUES('FA26', '2026-08-24', '2026-12-18', 1);
             INSERT INTO student(stu_id, last_name, first_name, licensed) VALUES('111', 'Doe', 'Pat', 'N');",
        )
        .expect("base");
        conn.execute_batch(seed).expect("seed");
        conn
    }

    /// Exam `serial` with `n` answers, the first `correct` of them right.
    fn exam_sql(serial: i64, course: &str, unit: u32, kind: &str, n: u32, correct: u32, mastery: &str) -> String {
        let passed = if mastery != "NULL" && correct >= mastery.parse::<u32>().unwrap_or(0) {
            "Y"
        } else {
            "N"
        };
        let mut sql = format!(
            "INSERT INTO stexam(serial_nbr, stu_id, course, unit, exam_type, exam_dt, start_time, finish_time,
                                exam_score, mastery_score, passed, is_first_passed)
             VALUES({serial}, '111', '{course}', {unit}, '{kind}', '2026-10-01', 540, 575, {correct}, {mastery}, '{passed}', 'N');"
        );
        for q in 1..=n {
            let ok = if q <= correct { "Y" } else { "N" };
            sql.push_str(&format!(
                "INSERT INTO stqa(serial_nbr, question_nbr, ans_correct) VALUES({serial}, {q}, '{ok}');"
            ));
        }
        sql
    }

    #[test]
    fn labels_and_detail_text() {
        assert_eq!(exam_type_label("R", 0), "Skills Rev.");
        assert_eq!(exam_type_label("R", 2), "Unit Rev.");
        assert_eq!(exam_type_label("Q", 1), "User's Exam");
        assert_eq!(duration_text(35 * 60), "35 min");
        assert_eq!(duration_text(125), "2:05");

        let conn = seeded(&exam_sql(5, "M 117", 1, "U", 10, 9, "8"));
        let detail = exam_detail(&conn, "111", 5).expect("detail");
        assert_eq!(detail.duration.as_deref(), Some("35 min"));
        assert_eq!(detail.passed_text, "Yes");
        assert_eq!(detail.answers.len(), 10);
        assert_eq!(
            exam_detail(&conn, "222", 5).expect_err("other student").code(),
            "not_found"
        );
    }

    #[test]
    fn regrade_marks_course_completed_when_final_passes() {
        let mut seed = String::from(
            "INSERT INTO stcourse(stu_id, course, sect, term_key, pace_order, open_status, completed)
                 VALUES('111', 'M 117', '001', 'FA26', 1, 'Y', 'N');
             INSERT INTO csection(course, sect, term_key) VALUES('M 117', '001', 'FA26');
             INSERT INTO cusection(course, sect, unit, term_key, re_mastery_score, ue_mastery_score)
                 VALUES('M 117', '001', 5, 'FA26', NULL, 15);",
        );
        seed.push_str(&exam_sql(7, "M 117", 5, "F", 20, 14, "NULL"));
        let conn = seeded(&seed);

        let outcome = toggle_answer(&conn, "111", 7, 20).expect("toggle");
        assert!(outcome.answer.ans_correct);
        assert_eq!(outcome.exam.exam_score, Some(15));
        assert_eq!(outcome.exam.mastery_score, Some(15));
        assert!(outcome.exam.is_passed());
        assert!(outcome.passed_changed);
        assert_eq!(outcome.course_completed, Some(true));

        let regs = course::registrations_for_student(&conn, "111").expect("regs");
        assert!(regs[0].completed);

        let back = toggle_answer(&conn, "111", 7, 20).expect("toggle back");
        assert!(!back.exam.is_passed());
        assert_eq!(back.course_completed, Some(false));
    }

    #[test]
    fn tutorial_unit_exam_grants_placement_credit() {
        let conn = seeded(&exam_sql(8, "M 100T", 4, "U", 16, 13, "NULL"));
        let outcome = toggle_answer(&conn, "111", 8, 16).expect("toggle");
        assert_eq!(outcome.exam.mastery_score, Some(14));
        assert!(outcome.exam.is_passed());
        assert_eq!(outcome.credit_granted.as_deref(), Some("M 100C"));

        let credit = placement::credits_for_student(&conn, "111").expect("credit");
        assert_eq!(credit.len(), 1);
        assert_eq!(credit[0].exam_source.as_deref(), Some("TC"));
    }

    #[test]
    fn users_exam_result_drives_license() {
        let conn = seeded(&exam_sql(9, USERS_EXAM_COURSE, 1, "Q", 20, 15, "16"));
        let outcome = toggle_answer(&conn, "111", 9, 20).expect("toggle");
        assert_eq!(outcome.licensed, Some(true));
        assert!(student::get(&conn, "111").expect("get").expect("student").licensed);
    }

    #[test]
    fn unknown_question_is_not_found() {
        let conn = seeded(&exam_sql(3, "M 118", 1, "U", 5, 5, "4"));
        assert_eq!(
            toggle_answer(&conn, "111", 3, 99).expect_err("missing").code(),
            "not_found"
        );
    }
}
