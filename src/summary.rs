//! One-page overview of the selected student: placement, current courses with
//! exam progress, holds and accommodations.

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::fmt_mdy;
use crate::deadlines::{self, StepStatus};
use crate::records::course::Registration;
use crate::records::hold::HoldType;
use crate::student_data::{Part, StudentData};

pub const PARTS: &[Part] = &[
    Part::Student,
    Part::Term,
    Part::StudentTerm,
    Part::Registrations,
    Part::Sections,
    Part::Exams,
    Part::Milestones,
    Part::StudentMilestones,
    Part::Appeals,
    Part::Holds,
    Part::PlacementCredit,
    Part::PlacementAttempts,
    Part::Transfers,
];

const MAX_PLACEMENT_ATTEMPTS: usize = 2;

/// Courses listed in "eligible for", with the courses any one of which
/// satisfies each prerequisite group.
const PREREQUISITES: &[(&str, &[&[&str]])] = &[
    ("M 117", &[&["M 100C"]]),
    ("M 118", &[&["M 117"]]),
    ("M 124", &[&["M 118"]]),
    ("M 125", &[&["M 117"]]),
    ("M 126", &[&["M 125"]]),
    ("M 127", &[&["M 118"], &["M 125"]]),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub placed_out_of: String,
    pub eligible_for: String,
    pub attempts_remaining: String,
    /// ELM Tutorial progress, present once the student has a tutorial exam.
    pub tutorials: Vec<CourseRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRow {
    pub course: String,
    pub sect: String,
    pub pace_order: Option<u32>,
    pub label: String,
    pub blocked: bool,
    pub steps: Vec<StepStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Courses {
    /// `None` when there are no registrations this term.
    pub header: Option<String>,
    pub message: Option<String>,
    pub rows: Vec<CourseRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub stu_id: String,
    pub display_name: String,
    pub placement: Placement,
    pub courses: Courses,
    pub holds: Vec<String>,
    pub accommodations: Vec<String>,
}

/// Builds the summary. Requires [`PARTS`].
pub fn summarize(data: &StudentData, hold_types: &[HoldType], as_of: NaiveDate) -> Summary {
    Summary {
        stu_id: data.stu_id().to_string(),
        display_name: data.student().display_name(),
        placement: placement(data, as_of),
        courses: courses(data, as_of),
        holds: hold_lines(data, hold_types),
        accommodations: accommodation_lines(data),
    }
}

/// Display name for the catalogue courses; `None` for anything else.
pub fn name_for_course(course: &str) -> Option<&'static str> {
    match course {
        "M 117" | "MATH 117" => Some("MATH 117"),
        "M 118" | "MATH 118" => Some("MATH 118"),
        "M 124" | "MATH 124" => Some("MATH 124"),
        "M 125" | "MATH 125" => Some("MATH 125"),
        "M 126" | "MATH 126" => Some("MATH 126"),
        "M 127" => Some("MATH 127"),
        "M 100T" => Some("ELM Tutorial"),
        _ => None,
    }
}

fn join_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

fn has_credit_for(data: &StudentData, course: &str) -> bool {
    data.placement_credit().iter().any(|c| c.course == course && c.counts())
        || data.transfers().iter().any(|t| t.course == course)
        || data.registrations().iter().any(|r| r.course == course && r.completed)
}

fn placement(data: &StudentData, as_of: NaiveDate) -> Placement {
    let mut placed: Vec<String> = Vec::new();
    let credited = data
        .placement_credit()
        .iter()
        .map(|c| c.course.as_str())
        .chain(data.transfers().iter().map(|t| t.course.as_str()));
    for course in credited {
        if let Some(name) = name_for_course(course) {
            if !placed.iter().any(|p| p == name) {
                placed.push(name.to_string());
            }
        }
    }

    let eligible: Vec<String> = PREREQUISITES
        .iter()
        .filter(|(_, groups)| {
            groups
                .iter()
                .all(|any_of| any_of.iter().any(|c| has_credit_for(data, c)))
        })
        .map(|(course, _)| deadlines::course_label(course))
        .collect();
    let eligible_for = if eligible.is_empty() {
        match data.placement_attempts().len() {
            0 => "Math Placement Tool".to_string(),
            1 => "Math Placement Tool, ELM Tutorial".to_string(),
            _ => "ELM Tutorial".to_string(),
        }
    } else {
        eligible.join(", ")
    };

    let attempts = data.placement_attempts();
    let left = MAX_PLACEMENT_ATTEMPTS.saturating_sub(attempts.len());
    let attempts_remaining = if left == 0 {
        "All attempts used.".to_string()
    } else if attempts.iter().any(|a| !a.proctored) {
        left.to_string()
    } else {
        format!("{left} (unproctored attempt available)")
    };

    let mut tutorials = Vec::new();
    if data.exams().iter().any(|e| e.course == "M 100T") {
        let elm = Registration {
            stu_id: data.stu_id().to_string(),
            course: "M 100T".to_string(),
            sect: "1".to_string(),
            term_key: data
                .active_term()
                .map(|t| t.term_key.clone())
                .unwrap_or_default(),
            pace_order: Some(1),
            open_status: None,
            completed: false,
            i_in_progress: false,
            i_counted: None,
            i_term_key: None,
        };
        tutorials.push(course_row(data, &elm, as_of));
    }

    Placement {
        placed_out_of: join_or(&placed, "(None)"),
        eligible_for,
        attempts_remaining,
        tutorials,
    }
}

fn courses(data: &StudentData, as_of: NaiveDate) -> Courses {
    let current: Vec<&Registration> = data
        .active_registrations()
        .into_iter()
        .filter(|r| !r.is_dropped())
        .collect();
    if current.is_empty() {
        return Courses {
            header: None,
            message: Some("No registrations this term.".to_string()),
            rows: Vec::new(),
        };
    }

    let mut header = if current.iter().all(|r| r.i_in_progress) {
        "Finishing Only Incompletes".to_string()
    } else {
        match data.student_term() {
            None => "(No STTERM record)".to_string(),
            Some(st) => format!(
                "{} course pace, track {}",
                st.pace.map_or_else(|| "?".to_string(), |p| p.to_string()),
                st.pace_track.as_deref().unwrap_or("?")
            ),
        }
    };
    header.push_str(if data.student().licensed {
        " [Passed User's Exam]"
    } else {
        " [Still needs to pass User's Exam]"
    });

    // Paced registrations carry their organised order; the rest keep whatever is stored.
    let organized = data
        .active_term()
        .map(|t| deadlines::organize_registrations(data.registrations(), &t.term_key))
        .unwrap_or_default();
    let rows = current
        .into_iter()
        .map(|reg| {
            let order = organized
                .iter()
                .find(|o| o.course == reg.course && o.sect == reg.sect)
                .and_then(|o| o.pace_order)
                .or(reg.pace_order);
            let reg = Registration {
                pace_order: order,
                ..reg.clone()
            };
            course_row(data, &reg, as_of)
        })
        .collect();

    Courses {
        header: Some(header),
        message: None,
        rows,
    }
}

fn course_row(data: &StudentData, reg: &Registration, as_of: NaiveDate) -> CourseRow {
    let blocked = deadlines::is_blocked(data, &reg.course, reg.pace_order, as_of);

    let mut label = name_for_course(&reg.course)
        .map(str::to_string)
        .unwrap_or_else(|| reg.course.clone());
    if reg.course != "M 100T" {
        label.push_str(", Section ");
        label.push_str(&reg.sect);

        match data
            .sections()
            .iter()
            .find(|s| s.course == reg.course && s.sect == reg.sect)
        {
            None => label.push_str(" (CSECTION row not found!)"),
            Some(section) => {
                if let Some(instructor) = &section.instructor {
                    label.push_str(&format!(" ({instructor})"));
                }
            }
        }

        if let Some(marker) = reg.incomplete_marker() {
            label.push_str(&marker);
        }

        if blocked {
            label.push_str(" [ *** BLOCKED *** - student must change registration to continue ]");
        } else if reg.open_status.as_deref() != Some("D") && reg.status_text() != "Unknown status" {
            label.push_str(&format!(" [{}]", reg.status_text()));
        }
    }

    CourseRow {
        course: reg.course.clone(),
        sect: reg.sect.clone(),
        pace_order: reg.pace_order,
        label,
        blocked,
        steps: deadlines::course_steps(data, &reg.course, reg.pace_order, as_of),
    }
}

fn hold_lines(data: &StudentData, hold_types: &[HoldType]) -> Vec<String> {
    if data.holds().is_empty() {
        return vec!["No holds active.".to_string()];
    }
    data.holds()
        .iter()
        .map(|hold| {
            let message = hold_types
                .iter()
                .find(|t| t.hold_id == hold.hold_id)
                .map_or("", |t| t.staff_message.as_str());
            let cannot_test = if hold.is_fatal() { " (Cannot Test)" } else { "" };
            format!("HOLD {}{cannot_test}:  {message}", hold.hold_id)
        })
        .collect()
}

fn format_factor(factor: f64) -> String {
    if factor.fract() == 0.0 {
        format!("{factor:.1}")
    } else {
        factor.to_string()
    }
}

fn accommodation_lines(data: &StudentData) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(factor) = data.student().timelimit_factor.filter(|f| *f > 1.0) {
        lines.push(format!("Exam time limit factor: {}", format_factor(factor)));
    }
    for appeal in data.appeals().iter().filter(|a| !a.relief_given) {
        let mut line = format!("{}: {}", fmt_mdy(appeal.appeal_dt), appeal.circumstances);
        if let Some(comment) = &appeal.comment {
            line.push(' ');
            line.push_str(comment);
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push("No accommodations.".to_string());
    }
    lines
}
