//! Pace deadlines: registration ordering, the per-course deadline grid, final-exam
//! blocking and exam step status.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::fmt_mdy;
use crate::records::course::Registration;
use crate::records::exam::StudentExam;
use crate::records::milestone::{self, Milestone, PaceAppeal, StudentMilestone};
use crate::student_data::{Part, StudentData};

/// Parts a deadline computation reads.
pub const PARTS: &[Part] = &[
    Part::Term,
    Part::StudentTerm,
    Part::Registrations,
    Part::Exams,
    Part::Milestones,
    Part::StudentMilestones,
    Part::Appeals,
];

/// Active-term registrations that count toward pace, each with a pace order in
/// `1..=n`, sorted by that order.
pub fn organize_registrations(regs: &[Registration], term_key: &str) -> Vec<Registration> {
    let mut current: Vec<Registration> = regs
        .iter()
        .filter(|r| r.term_key == term_key && !r.is_dropped() && !r.is_uncounted_incomplete())
        .cloned()
        .collect();
    let n = current.len() as u32;

    let mut used = BTreeSet::new();
    let mut to_assign = Vec::new();
    for (idx, reg) in current.iter_mut().enumerate() {
        match reg.pace_order {
            Some(order) if (1..=n).contains(&order) && used.insert(order) => {}
            _ => {
                reg.pace_order = None;
                to_assign.push(idx);
            }
        }
    }

    to_assign.sort_by(|&a, &b| {
        (&current[a].course, &current[a].sect).cmp(&(&current[b].course, &current[b].sect))
    });
    let mut free = (1..=n).filter(|o| !used.contains(o));
    for idx in to_assign {
        current[idx].pace_order = free.next();
    }

    current.sort_by_key(|r| r.pace_order);
    current
}

pub fn course_label(course: &str) -> String {
    match course.strip_prefix("M ") {
        Some(rest) => format!("MATH {rest}"),
        None => course.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppealNote {
    pub id: String,
    pub appeal_date: NaiveDate,
    pub relief_given: bool,
    pub circumstances: String,
    pub comment: Option<String>,
    pub interviewer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub id: String,
    pub date: NaiveDate,
    pub ext_type: Option<String>,
    pub label: String,
    pub nbr_atmpts_allow: Option<u32>,
    /// `None` when no pace appeal documents this override.
    pub appeal: Option<AppealNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineRow {
    pub ms_nbr: u32,
    pub unit: u32,
    pub ms_type: String,
    pub type_label: String,
    pub original_date: NaiveDate,
    pub extensions: Vec<Extension>,
    pub effective_date: NaiveDate,
    pub completed: Option<NaiveDate>,
    pub on_time: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDeadlines {
    pub course: String,
    pub course_label: String,
    pub sect: String,
    pub pace_order: u32,
    pub heading: String,
    pub rows: Vec<DeadlineRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineReport {
    pub pace: Option<u32>,
    pub pace_track: Option<String>,
    pub courses: Vec<CourseDeadlines>,
}

/// Deadline grid for every paced registration. Requires [`PARTS`].
pub fn deadline_report(data: &StudentData) -> DeadlineReport {
    let pace = data.student_term().and_then(|t| t.pace);
    let track = data.student_term().and_then(|t| t.pace_track.clone());
    let mut report = DeadlineReport {
        pace,
        pace_track: track.clone(),
        courses: Vec::new(),
    };
    let (Some(pace), Some(track), Some(term)) = (pace, track, data.active_term()) else {
        return report;
    };

    // Each appeal documents at most one override across the whole report.
    let mut unclaimed: Vec<&PaceAppeal> = data.appeals().iter().collect();

    for reg in organize_registrations(data.registrations(), &term.term_key) {
        let Some(order) = reg.pace_order else {
            continue;
        };
        let rows = data
            .milestones()
            .iter()
            .filter(|ms| ms.pace == pace && ms.pace_track == track && ms.pace_order() == order)
            .map(|ms| {
                deadline_row(
                    ms,
                    &reg.course,
                    data.student_milestones(),
                    &mut unclaimed,
                    data.exams(),
                )
            })
            .collect();

        report.courses.push(CourseDeadlines {
            course_label: course_label(&reg.course),
            heading: format!("(Course {order} of {pace})"),
            course: reg.course,
            sect: reg.sect,
            pace_order: order,
            rows,
        });
    }
    report
}

fn deadline_row(
    ms: &Milestone,
    course: &str,
    overrides: &[StudentMilestone],
    unclaimed: &mut Vec<&PaceAppeal>,
    exams: &[StudentExam],
) -> DeadlineRow {
    let mut effective = ms.ms_date;
    let mut extensions = Vec::new();

    for stms in overrides.iter().filter(|s| {
        s.pace_track == ms.pace_track && s.ms_nbr == ms.ms_nbr && s.ms_type == ms.ms_type
    }) {
        let pos = unclaimed.iter().position(|a| {
            a.term_key == stms.term_key
                && a.pace_track == stms.pace_track
                && a.ms_nbr == stms.ms_nbr
                && a.new_deadline_dt == Some(stms.ms_date)
                && a.nbr_atmpts_allow == stms.nbr_atmpts_allow
        });
        let appeal = pos.map(|i| unclaimed.remove(i)).map(|a| AppealNote {
            id: a.id.clone(),
            appeal_date: a.appeal_dt,
            relief_given: a.relief_given,
            circumstances: a.circumstances.clone(),
            comment: a.comment.clone(),
            interviewer: a.interviewer.clone(),
        });

        effective = effective.max(stms.ms_date);
        extensions.push(Extension {
            id: stms.id.clone(),
            date: stms.ms_date,
            ext_type: stms.ext_type.clone(),
            label: format!(
                "{} ({})",
                fmt_mdy(stms.ms_date),
                milestone::extension_label(stms.ext_type.as_deref())
            ),
            nbr_atmpts_allow: stms.nbr_atmpts_allow,
            appeal,
        });
    }

    let exam_type = if ms.ms_type == "FE" || ms.ms_type == "F1" {
        "F"
    } else {
        "R"
    };
    let completed = exams
        .iter()
        .filter(|e| e.course == course && e.unit == ms.unit() && e.exam_type == exam_type && e.is_passed())
        .map(|e| e.exam_dt)
        .min();
    let on_time = completed.map(|done| exam_type == "F" || done <= effective);

    DeadlineRow {
        ms_nbr: ms.ms_nbr,
        unit: ms.unit(),
        ms_type: ms.ms_type.clone(),
        type_label: milestone::type_label(&ms.ms_type),
        original_date: ms.ms_date,
        extensions,
        effective_date: effective,
        completed,
        on_time,
    }
}

/// Identifies one milestone of a paced course for a given unit.
struct PacedSlot<'a> {
    track: &'a str,
    ms_nbr: u32,
}

fn slot<'a>(data: &'a StudentData, pace_order: Option<u32>, unit: u32) -> Option<PacedSlot<'a>> {
    let st = data.student_term()?;
    let pace = st.pace?;
    let track = st.pace_track.as_deref()?;
    Some(PacedSlot {
        track,
        ms_nbr: milestone::ms_number(pace, pace_order?, unit)?,
    })
}

fn milestone_dates<'a>(
    data: &'a StudentData,
    s: &'a PacedSlot<'_>,
    ms_type: &'a str,
) -> impl Iterator<Item = NaiveDate> + 'a {
    data.milestones()
        .iter()
        .filter(move |m| m.pace_track == s.track && m.ms_type == ms_type && m.ms_nbr == s.ms_nbr)
        .map(|m| m.ms_date)
}

fn override_dates<'a>(
    data: &'a StudentData,
    s: &'a PacedSlot<'_>,
    ms_type: &'a str,
) -> impl Iterator<Item = NaiveDate> + 'a {
    data.student_milestones()
        .iter()
        .filter(move |m| m.pace_track == s.track && m.ms_type == ms_type && m.ms_nbr == s.ms_nbr)
        .map(|m| m.ms_date)
}

/// Date after which an unpassed final blocks the course.
pub fn final_due_date(data: &StudentData, pace_order: Option<u32>) -> Option<NaiveDate> {
    let s = slot(data, pace_order, 5)?;

    let mut due = milestone_dates(data, &s, "FE").last();
    for d in milestone_dates(data, &s, "F1") {
        if due.map_or(true, |cur| cur < d) {
            due = Some(d);
        }
    }
    let mut due = due?;

    if let Some(d) = override_dates(data, &s, "FE").last() {
        due = d;
    }
    for d in override_dates(data, &s, "F1") {
        if due < d {
            due = d;
        }
    }
    Some(due)
}

pub fn final_passed(exams: &[StudentExam], course: &str) -> bool {
    exams
        .iter()
        .any(|e| e.course == course && e.unit == 5 && e.exam_type == "F" && e.is_passed())
}

pub fn is_blocked(data: &StudentData, course: &str, pace_order: Option<u32>, as_of: NaiveDate) -> bool {
    if final_passed(data.exams(), course) {
        return false;
    }
    final_due_date(data, pace_order).is_some_and(|due| due < as_of)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepState {
    NotAttemptedOnTime,
    NotAttemptedLate,
    NotYetPassedOnTime,
    NotYetPassedLate,
    PassedOnTime,
    PassedLate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStatus {
    pub label: String,
    pub unit: u32,
    pub exam_type: String,
    pub state: StepState,
    pub due_date: Option<NaiveDate>,
    pub first_passed: Option<NaiveDate>,
    pub max_score: Option<u32>,
}

/// Status of one exam step (`R`, `U` or `F`) of a course unit.
pub fn exam_status(
    data: &StudentData,
    course: &str,
    pace_order: Option<u32>,
    unit: u32,
    exam_type: &str,
    as_of: NaiveDate,
) -> StepStatus {
    let ms_type = match exam_type {
        "F" => Some("FE"),
        "R" => Some("RE"),
        _ => None,
    };
    let due_date = match (ms_type, slot(data, pace_order, unit)) {
        (Some(t), Some(s)) => {
            let scheduled = milestone_dates(data, &s, t).last();
            override_dates(data, &s, t).last().or(scheduled)
        }
        _ => None,
    };

    let mut attempted = false;
    let mut first_passed: Option<NaiveDate> = None;
    let mut max_score: Option<u32> = None;
    for e in data
        .exams()
        .iter()
        .filter(|e| e.course == course && e.unit == unit && e.exam_type == exam_type)
    {
        attempted = true;
        if e.is_passed() {
            first_passed = Some(first_passed.map_or(e.exam_dt, |d| d.min(e.exam_dt)));
        }
        if let Some(score) = e.exam_score {
            max_score = Some(max_score.map_or(score, |m| m.max(score)));
        }
    }

    let late = match due_date {
        Some(due) if due < as_of => first_passed.map_or(true, |passed| due < passed),
        _ => false,
    };
    let state = match (first_passed.is_some(), attempted, late) {
        (true, _, false) => StepState::PassedOnTime,
        (true, _, true) => StepState::PassedLate,
        (false, true, false) => StepState::NotYetPassedOnTime,
        (false, true, true) => StepState::NotYetPassedLate,
        (false, false, false) => StepState::NotAttemptedOnTime,
        (false, false, true) => StepState::NotAttemptedLate,
    };

    StepStatus {
        label: String::new(),
        unit,
        exam_type: exam_type.to_string(),
        state,
        due_date,
        first_passed,
        max_score,
    }
}

pub const PRECALC_COURSES: &[&str] = &["M 117", "M 118", "M 124", "M 125", "M 126"];

/// `(label, unit, exam type)` for each step of a precalculus course.
const PRECALC_STEPS: &[(&str, u32, &str)] = &[
    ("SR", 0, "R"),
    ("Rev. 1", 1, "R"),
    ("Unit 1", 1, "U"),
    ("Rev. 2", 2, "R"),
    ("Unit 2", 2, "U"),
    ("Rev. 3", 3, "R"),
    ("Unit 3", 3, "U"),
    ("Rev. 4", 4, "R"),
    ("Unit 4", 4, "U"),
    ("Final", 5, "F"),
];

const ELM_STEPS: &[(&str, u32, &str)] = &[
    ("Rev. 1", 1, "R"),
    ("Rev. 2", 2, "R"),
    ("Rev. 3", 3, "R"),
    ("Rev. 4", 4, "R"),
    ("ELM Exam", 4, "U"),
];

/// Step statuses for the course's status bar; empty for courses without one.
pub fn course_steps(
    data: &StudentData,
    course: &str,
    pace_order: Option<u32>,
    as_of: NaiveDate,
) -> Vec<StepStatus> {
    let steps = if PRECALC_COURSES.contains(&course) {
        PRECALC_STEPS
    } else if course == "M 100T" {
        ELM_STEPS
    } else {
        return Vec::new();
    };
    steps
        .iter()
        .map(|(label, unit, exam_type)| StepStatus {
            label: (*label).to_string(),
            ..exam_status(data, course, pace_order, *unit, exam_type, as_of)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use rusqlite::Connection;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn reg(course: &str, sect: &str, order: Option<u32>) -> Registration {
        Registration {
            stu_id: "111".into(),
            course: course.into(),
            sect: sect.into(),
            term_key: "FA26".into(),
            pace_order: order,
            open_status: Some("Y".into()),
            completed: false,
            i_in_progress: false,
            i_counted: None,
            i_term_key: None,
        }
    }

    #[test]
    fn organize_keeps_valid_orders_and_fills_gaps() {
        let mut dropped = reg("M 126", "001", Some(1));
        dropped.open_status = Some("D".into());
        let mut uncounted = reg("M 100T", "1", None);
        uncounted.i_in_progress = true;
        uncounted.i_counted = Some(false);
        let mut other_term = reg("M 117", "001", None);
        other_term.term_key = "SP26".into();

        let regs = vec![
            reg("M 125", "001", Some(2)),
            reg("M 118", "002", Some(2)),
            reg("M 117", "001", Some(7)),
            dropped,
            uncounted,
            other_term,
        ];
        let organized = organize_registrations(&regs, "FA26");
        let got: Vec<(&str, Option<u32>)> = organized
            .iter()
            .map(|r| (r.course.as_str(), r.pace_order))
            .collect();
        assert_eq!(
            got,
            vec![("M 117", Some(1)), ("M 125", Some(2)), ("M 118", Some(3))]
        );
    }

    #[test]
    fn course_label_expands_prefix() {
        assert_eq!(course_label("M 117"), "MATH 117");
        assert_eq!(course_label("MATH 160"), "MATH 160");
    }

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        db::init_schema(&conn).expect("schema");
        conn.execute_batch(
            "INSERT INTO term(term_key, start_dt, end_dt, active) VALUES('FA26', '2026-08-24', '2026-12-18', 1);
             INSERT INTO student(stu_id, last_name, first_name) VALUES('111', 'Doe', 'Pat');
             INSERT INTO stterm(stu_id, term_key, pace, pace_track) VALUES('111', 'FA26', 2, 'A');
             INSERT INTO stcourse(stu_id, course, sect, term_key, pace_order, open_status) VALUES('111', 'M 117', '001', 'FA26', 1, 'Y');
             INSERT INTO stcourse(stu_id, course, sect, term_key, pace_order, open_status) VALUES('111', 'M 118', '001', 'FA26', 2, 'Y');
             INSERT INTO milestone VALUES('FA26', 2, 'A', 211, 'RE', '2026-09-10', NULL);
             INSERT INTO milestone VALUES('FA26', 2, 'A', 215, 'FE', '2026-10-01', NULL);
             INSERT INTO milestone VALUES('FA26', 2, 'A', 215, 'F1', '2026-10-03', 1);
             INSERT INTO milestone VALUES('FA26', 2, 'A', 225, 'FE', '2026-12-01', NULL);
             INSERT INTO milestone VALUES('FA26', 3, 'A', 311, 'RE', '2026-09-05', NULL);
             INSERT INTO stmilestone(id, term_key, stu_id, pace_track, ms_nbr, ms_type, ms_date, nbr_atmpts_allow, ext_type)
                 VALUES('x1', 'FA26', '111', 'A', 211, 'RE', '2026-09-14', NULL, 'MED');
             INSERT INTO stmilestone(id, term_key, stu_id, pace_track, ms_nbr, ms_type, ms_date, nbr_atmpts_allow, ext_type)
                 VALUES('x2', 'FA26', '111', 'A', 211, 'RE', '2026-09-12', NULL, NULL);
             INSERT INTO pace_appeals(id, term_key, stu_id, appeal_dt, relief_given, pace, pace_track, ms_nbr, ms_type,
                                      ms_date, new_deadline_dt, nbr_atmpts_allow, circumstances, comment, interviewer)
                 VALUES('p1', 'FA26', '111', '2026-09-08', 'Y', 2, 'A', 211, 'RE', '2026-09-10', '2026-09-14', NULL,
                        'Hospitalized', NULL, 'staff');
             INSERT INTO stexam(serial_nbr, stu_id, course, unit, exam_type, exam_dt, finish_time, exam_score, passed)
                 VALUES(1, '111', 'M 117', 1, 'R', '2026-09-11', 600, 7, 'N');
             INSERT INTO stexam(serial_nbr, stu_id, course, unit, exam_type, exam_dt, finish_time, exam_score, passed)
                 VALUES(2, '111', 'M 117', 1, 'R', '2026-09-13', 600, 9, 'Y');",
        )
        .expect("seed");
        conn
    }

    fn loaded(conn: &Connection) -> StudentData {
        let mut data = StudentData::load(conn, "111").expect("load").expect("student");
        data.require(conn, PARTS).expect("require");
        data
    }

    #[test]
    fn grid_applies_latest_extension_and_pairs_appeals() {
        let conn = seeded();
        let data = loaded(&conn);
        let report = deadline_report(&data);

        assert_eq!(report.pace, Some(2));
        assert_eq!(report.courses.len(), 2);
        let first = &report.courses[0];
        assert_eq!(first.course_label, "MATH 117");
        assert_eq!(first.heading, "(Course 1 of 2)");
        assert_eq!(first.rows.len(), 3);

        let review = &first.rows[0];
        assert_eq!(review.type_label, "Review Exam");
        assert_eq!(review.effective_date, ymd(2026, 9, 14));
        assert_eq!(review.extensions.len(), 2);
        assert_eq!(review.extensions[0].label, "09/12/2026 (No type)");
        assert!(review.extensions[0].appeal.is_none());
        assert_eq!(review.extensions[1].label, "09/14/2026 (Medical)");
        assert_eq!(
            review.extensions[1].appeal.as_ref().map(|a| a.id.as_str()),
            Some("p1")
        );
        assert_eq!(review.completed, Some(ymd(2026, 9, 13)));
        assert_eq!(review.on_time, Some(true));

        assert_eq!(first.rows[1].type_label, "Final +1");
        let final_row = &first.rows[2];
        assert_eq!(final_row.ms_type, "FE");
        assert_eq!(final_row.completed, None);
        assert_eq!(final_row.on_time, None);
    }

    #[test]
    fn unpassed_final_past_due_blocks_course() {
        let conn = seeded();
        let data = loaded(&conn);
        // FE 10/01 pushed to 10/03 by F1.
        assert_eq!(final_due_date(&data, Some(1)), Some(ymd(2026, 10, 3)));
        assert!(!is_blocked(&data, "M 117", Some(1), ymd(2026, 10, 3)));
        assert!(is_blocked(&data, "M 117", Some(1), ymd(2026, 10, 4)));
        assert!(!is_blocked(&data, "M 118", Some(2), ymd(2026, 10, 4)));
        assert!(!is_blocked(&data, "M 117", None, ymd(2027, 1, 1)));
    }

    #[test]
    fn final_overrides_replace_then_extend_the_due_date() {
        let conn = seeded();
        conn.execute_batch(
            "INSERT INTO stmilestone(id, term_key, stu_id, pace_track, ms_nbr, ms_type, ms_date, nbr_atmpts_allow, ext_type)
                 VALUES('fe1', 'FA26', '111', 'A', 215, 'FE', '2026-09-25', NULL, 'ACC');",
        )
        .expect("fe override");
        let data = loaded(&conn);
        // An FE override replaces the scheduled FE/F1 date, even when earlier.
        assert_eq!(final_due_date(&data, Some(1)), Some(ymd(2026, 9, 25)));
        assert!(!is_blocked(&data, "M 117", Some(1), ymd(2026, 9, 25)));
        assert!(is_blocked(&data, "M 117", Some(1), ymd(2026, 9, 26)));

        conn.execute_batch(
            "INSERT INTO stmilestone(id, term_key, stu_id, pace_track, ms_nbr, ms_type, ms_date, nbr_atmpts_allow, ext_type)
                 VALUES('f11', 'FA26', '111', 'A', 215, 'F1', '2026-10-09', 1, 'MED');",
        )
        .expect("f1 override");
        let data = loaded(&conn);
        assert_eq!(final_due_date(&data, Some(1)), Some(ymd(2026, 10, 9)));
        assert!(!is_blocked(&data, "M 117", Some(1), ymd(2026, 10, 9)));
        assert!(is_blocked(&data, "M 117", Some(1), ymd(2026, 10, 10)));
    }

    #[test]
    fn review_step_uses_latest_override_for_lateness() {
        let conn = seeded();
        let data = loaded(&conn);
        let step = exam_status(&data, "M 117", Some(1), 1, "R", ymd(2026, 9, 20));
        assert_eq!(step.due_date, Some(ymd(2026, 9, 14)));
        assert_eq!(step.first_passed, Some(ymd(2026, 9, 13)));
        assert_eq!(step.max_score, Some(9));
        assert_eq!(step.state, StepState::PassedOnTime);

        let unit = exam_status(&data, "M 117", Some(1), 2, "R", ymd(2026, 9, 20));
        assert_eq!(unit.state, StepState::NotAttemptedOnTime);

        let steps = course_steps(&data, "M 117", Some(1), ymd(2026, 10, 20));
        assert_eq!(steps.len(), 10);
        assert_eq!(steps[0].label, "SR");
        assert_eq!(steps[9].label, "Final");
        assert_eq!(steps[9].state, StepState::NotAttemptedLate);
        assert!(course_steps(&data, "M 160", Some(1), ymd(2026, 10, 20)).is_empty());
    }
}
