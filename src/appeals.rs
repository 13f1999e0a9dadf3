//! Pace appeals: the full appeal form, edits, deletion and the quick deadline
//! extension form. Granting relief writes the matching student milestone in the
//! same transaction.

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dates::interpret_date;
use crate::records::milestone::{
    self, Milestone, PaceAppeal, StudentMilestone, EXTENSION_TYPES,
};
use crate::records::{RecordError, RecordResult};

pub const DEFAULT_APPEAL_TYPE: &str = "OTH";

/// Milestone types an appeal may target.
const APPEAL_MS_TYPES: &[&str] = &["RE", "FE", "F1"];

/// Raw text of the full appeal form.
#[derive(Debug, Clone, Default)]
pub struct AppealForm {
    pub appeal_date: Option<String>,
    pub relief_given: bool,
    pub pace: Option<String>,
    pub pace_track: Option<String>,
    pub course_order: Option<String>,
    pub unit: Option<String>,
    pub ms_type: Option<String>,
    pub orig_date: Option<String>,
    pub new_date: Option<String>,
    pub attempts: Option<String>,
    pub appeal_type: Option<String>,
    pub circumstances: Option<String>,
    pub comment: Option<String>,
    pub interviewer: Option<String>,
}

/// Raw text of the appeal edit form; the targeted milestone cannot change.
#[derive(Debug, Clone, Default)]
pub struct AppealEdit {
    pub appeal_date: Option<String>,
    pub relief_given: bool,
    pub new_date: Option<String>,
    pub attempts: Option<String>,
    pub appeal_type: Option<String>,
    pub circumstances: Option<String>,
    pub comment: Option<String>,
    pub interviewer: Option<String>,
}

/// Raw text of the quick extension form on the deadline grid.
#[derive(Debug, Clone, Default)]
pub struct ExtensionForm {
    pub interviewer: Option<String>,
    pub appeal_date: Option<String>,
    pub relief_given: bool,
    pub new_deadline: Option<String>,
    pub attempts: Option<String>,
    pub appeal_type: Option<String>,
    pub circumstances: Option<String>,
    pub comment: Option<String>,
}

/// Whose appeal is being written and in which term.
#[derive(Debug, Clone)]
pub struct AppealOwner<'a> {
    pub stu_id: &'a str,
    pub term_key: &'a str,
    /// Student's track, used when the form leaves it blank.
    pub pace_track: Option<&'a str>,
}

fn blank(v: &Option<String>) -> bool {
    v.as_deref().map_or(true, |s| s.trim().is_empty())
}

fn trimmed(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_int(v: &Option<String>) -> Option<i64> {
    v.as_deref().and_then(|s| s.trim().parse::<i64>().ok())
}

fn parse_attempts(v: &Option<String>, message: &str) -> RecordResult<Option<u32>> {
    if blank(v) {
        return Ok(None);
    }
    v.as_deref()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .map(Some)
        .ok_or_else(|| RecordError::invalid(message))
}

fn parse_appeal_type(v: &Option<String>) -> RecordResult<String> {
    match trimmed(v) {
        None => Ok(DEFAULT_APPEAL_TYPE.to_string()),
        Some(t) if EXTENSION_TYPES.contains(&t.to_uppercase().as_str()) => Ok(t.to_uppercase()),
        Some(_) => Err(RecordError::invalid("Invalid appeal type.")),
    }
}

fn date_field(v: &Option<String>) -> Option<NaiveDate> {
    v.as_deref().and_then(interpret_date)
}

/// Validates the full appeal form into an unsaved appeal (empty id).
pub fn validate_appeal(owner: &AppealOwner<'_>, form: &AppealForm) -> RecordResult<PaceAppeal> {
    let appeal_dt =
        date_field(&form.appeal_date).ok_or_else(|| RecordError::invalid("Appeal date must be set."))?;
    let pace = parse_int(&form.pace)
        .and_then(|p| u32::try_from(p).ok())
        .ok_or_else(|| RecordError::invalid("Invalid Pace."))?;
    let order = parse_int(&form.course_order)
        .ok_or_else(|| RecordError::invalid("Invalid Course number."))?;
    let order = u32::try_from(order)
        .ok()
        .filter(|o| *o <= pace)
        .ok_or_else(|| RecordError::invalid("Course number must fall within pace."))?;
    let unit = parse_int(&form.unit)
        .and_then(|u| u32::try_from(u).ok())
        .filter(|u| *u <= 5)
        .ok_or_else(|| RecordError::invalid("Unit number not in valid range."))?;
    let ms_nbr =
        milestone::ms_number(pace, order, unit).ok_or_else(|| RecordError::invalid("Invalid Pace."))?;
    let ms_type = trimmed(&form.ms_type)
        .map(|t| t.to_uppercase())
        .filter(|t| APPEAL_MS_TYPES.contains(&t.as_str()))
        .ok_or_else(|| RecordError::invalid("A milestone type must be selected."))?;
    let ms_date = date_field(&form.orig_date)
        .ok_or_else(|| RecordError::invalid("Original deadline date may not be null."))?;
    let interviewer =
        trimmed(&form.interviewer).ok_or_else(|| RecordError::invalid("Interviewer may not be blank."))?;
    let circumstances = trimmed(&form.circumstances)
        .ok_or_else(|| RecordError::invalid("Circumstances field may not be blank."))?;
    let attempts = parse_attempts(&form.attempts, "Invalid number of attempts.")?;
    let new_deadline_dt = date_field(&form.new_date);
    if form.relief_given && new_deadline_dt.is_none() {
        return Err(RecordError::invalid("New deadline date must be set."));
    }
    let appeal_type = parse_appeal_type(&form.appeal_type)?;
    let pace_track = trimmed(&form.pace_track)
        .or_else(|| owner.pace_track.map(str::to_string))
        .ok_or_else(|| RecordError::invalid("A pace track must be provided."))?;

    Ok(PaceAppeal {
        id: String::new(),
        term_key: owner.term_key.to_string(),
        stu_id: owner.stu_id.to_string(),
        appeal_dt,
        relief_given: form.relief_given,
        appeal_type: Some(appeal_type),
        pace,
        pace_track,
        ms_nbr,
        ms_type,
        ms_date,
        new_deadline_dt,
        nbr_atmpts_allow: attempts,
        circumstances,
        comment: trimmed(&form.comment),
        interviewer,
    })
}

/// Inserts a validated appeal; with relief the student milestone is inserted, or
/// updated when its date or attempts differ.
pub fn add_appeal(conn: &Connection, mut appeal: PaceAppeal) -> RecordResult<PaceAppeal> {
    appeal.id = Uuid::new_v4().to_string();

    let tx = conn.unchecked_transaction()?;
    milestone::insert_pace_appeal(&tx, &appeal)?;
    if let (true, Some(new_date)) = (appeal.relief_given, appeal.new_deadline_dt) {
        let existing = milestone::find_student_milestone(
            &tx,
            &appeal.stu_id,
            &appeal.term_key,
            &appeal.pace_track,
            appeal.ms_nbr,
            &appeal.ms_type,
        )?;
        match existing {
            Some(stms) => {
                if stms.ms_date != new_date || stms.nbr_atmpts_allow != appeal.nbr_atmpts_allow {
                    milestone::update_student_milestone(
                        &tx,
                        &stms.id,
                        new_date,
                        appeal.nbr_atmpts_allow,
                        appeal.appeal_type.as_deref(),
                    )?;
                }
            }
            None => {
                milestone::insert_student_milestone(&tx, &override_for(&appeal, new_date))?;
            }
        }
    }
    tx.commit()?;

    info!(stu_id = %appeal.stu_id, ms_nbr = appeal.ms_nbr, ms_type = %appeal.ms_type,
          relief = appeal.relief_given, "pace appeal recorded");
    Ok(appeal)
}

fn override_for(appeal: &PaceAppeal, new_date: NaiveDate) -> StudentMilestone {
    StudentMilestone {
        id: Uuid::new_v4().to_string(),
        term_key: appeal.term_key.clone(),
        stu_id: appeal.stu_id.clone(),
        pace_track: appeal.pace_track.clone(),
        ms_nbr: appeal.ms_nbr,
        ms_type: appeal.ms_type.clone(),
        ms_date: new_date,
        nbr_atmpts_allow: appeal.nbr_atmpts_allow,
        ext_type: appeal.appeal_type.clone(),
    }
}

fn load_owned(conn: &Connection, stu_id: &str, id: &str) -> RecordResult<PaceAppeal> {
    milestone::get_pace_appeal(conn, id)?
        .filter(|a| a.stu_id == stu_id)
        .ok_or_else(|| RecordError::NotFound(format!("pace appeal {id} not found")))
}

/// Applies an edit; with relief the paired student milestone follows the appeal.
pub fn update_appeal(
    conn: &Connection,
    stu_id: &str,
    id: &str,
    edit: &AppealEdit,
) -> RecordResult<PaceAppeal> {
    let before = load_owned(conn, stu_id, id)?;

    let appeal_dt = match &edit.appeal_date {
        None => before.appeal_dt,
        Some(_) => date_field(&edit.appeal_date)
            .ok_or_else(|| RecordError::invalid("Appeal date must be set."))?,
    };
    let interviewer =
        trimmed(&edit.interviewer).ok_or_else(|| RecordError::invalid("Interviewer may not be blank."))?;
    let circumstances = trimmed(&edit.circumstances)
        .ok_or_else(|| RecordError::invalid("Circumstances field may not be blank."))?;
    let attempts = parse_attempts(&edit.attempts, "Invalid number of attempts.")?;
    let new_deadline_dt = date_field(&edit.new_date);
    if edit.relief_given && new_deadline_dt.is_none() {
        return Err(RecordError::invalid("New deadline date must be set."));
    }
    let appeal_type = match &edit.appeal_type {
        None => before
            .appeal_type
            .clone()
            .unwrap_or_else(|| DEFAULT_APPEAL_TYPE.to_string()),
        Some(_) => parse_appeal_type(&edit.appeal_type)?,
    };

    let after = PaceAppeal {
        appeal_dt,
        relief_given: edit.relief_given,
        appeal_type: Some(appeal_type),
        new_deadline_dt,
        nbr_atmpts_allow: attempts,
        circumstances,
        comment: trimmed(&edit.comment),
        interviewer,
        ..before.clone()
    };

    let tx = conn.unchecked_transaction()?;
    milestone::update_pace_appeal(&tx, &after)?;
    if let (true, Some(new_date)) = (after.relief_given, after.new_deadline_dt) {
        match paired_override(&tx, &before)? {
            Some(stms) => {
                if Some(stms.ms_date) != before.new_deadline_dt {
                    warn!(appeal = %before.id, override_id = %stms.id,
                          "date in appeal record does not match date in student milestone");
                }
                milestone::update_student_milestone(
                    &tx,
                    &stms.id,
                    new_date,
                    after.nbr_atmpts_allow,
                    after.appeal_type.as_deref(),
                )?;
            }
            None => milestone::insert_student_milestone(&tx, &override_for(&after, new_date))?,
        }
    }
    tx.commit()?;

    info!(stu_id, appeal = %id, "pace appeal updated");
    Ok(after)
}

/// Override documented by the appeal: the one carrying its date and attempts,
/// else the latest override of the same milestone.
fn paired_override(conn: &Connection, appeal: &PaceAppeal) -> RecordResult<Option<StudentMilestone>> {
    let overrides = milestone::student_milestones(conn, &appeal.stu_id, &appeal.term_key)?;
    let mut same_milestone = overrides.into_iter().filter(|s| {
        s.pace_track == appeal.pace_track && s.ms_nbr == appeal.ms_nbr && s.ms_type == appeal.ms_type
    });
    let mut latest = None;
    for stms in same_milestone.by_ref() {
        if Some(stms.ms_date) == appeal.new_deadline_dt && stms.nbr_atmpts_allow == appeal.nbr_atmpts_allow {
            return Ok(Some(stms));
        }
        latest = Some(stms);
    }
    Ok(latest)
}

pub fn delete_appeal(conn: &Connection, stu_id: &str, id: &str) -> RecordResult<()> {
    load_owned(conn, stu_id, id)?;
    milestone::delete_pace_appeal(conn, id)?;
    info!(stu_id, appeal = %id, "pace appeal deleted");
    Ok(())
}

/// Records a quick extension against a scheduled milestone. With relief a new
/// student milestone is written alongside the appeal; without relief only the
/// documenting appeal is stored.
pub fn quick_extension(
    conn: &Connection,
    owner: &AppealOwner<'_>,
    pace: u32,
    target: &Milestone,
    form: &ExtensionForm,
) -> RecordResult<PaceAppeal> {
    let interviewer = trimmed(&form.interviewer)
        .ok_or_else(|| RecordError::invalid("Interviewer field may not be empty."))?;
    if blank(&form.appeal_date) {
        return Err(RecordError::invalid("Appeal date field may not be empty."));
    }
    if form.relief_given && blank(&form.new_deadline) {
        return Err(RecordError::invalid(
            "If relief was given, new deadline date field may not be empty.",
        ));
    }
    let new_deadline_dt = match trimmed(&form.new_deadline) {
        None => None,
        Some(text) => Some(
            interpret_date(&text)
                .ok_or_else(|| RecordError::invalid("Unable to interpret new deadline date"))?,
        ),
    };
    let appeal_dt = date_field(&form.appeal_date)
        .ok_or_else(|| RecordError::invalid("Unable to interpret appeal date"))?;
    let attempts = parse_attempts(&form.attempts, "Unable to interpret number of attempts")?;
    let appeal_type = parse_appeal_type(&form.appeal_type)?;

    let appeal = PaceAppeal {
        id: Uuid::new_v4().to_string(),
        term_key: owner.term_key.to_string(),
        stu_id: owner.stu_id.to_string(),
        appeal_dt,
        relief_given: form.relief_given,
        appeal_type: Some(appeal_type),
        pace,
        pace_track: target.pace_track.clone(),
        ms_nbr: target.ms_nbr,
        ms_type: target.ms_type.clone(),
        ms_date: target.ms_date,
        new_deadline_dt,
        nbr_atmpts_allow: attempts,
        circumstances: trimmed(&form.circumstances).unwrap_or_default(),
        comment: trimmed(&form.comment),
        interviewer,
    };

    let tx = conn.unchecked_transaction()?;
    milestone::insert_pace_appeal(&tx, &appeal)?;
    if let (true, Some(new_date)) = (appeal.relief_given, appeal.new_deadline_dt) {
        milestone::insert_student_milestone(&tx, &override_for(&appeal, new_date))?;
    }
    tx.commit()?;

    info!(stu_id = %appeal.stu_id, ms_nbr = appeal.ms_nbr, ms_type = %appeal.ms_type,
          relief = appeal.relief_given, "deadline extension recorded");
    Ok(appeal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        db::init_schema(&conn).expect("schema");
        conn.execute(
            "INSERT INTO student(stu_id, last_name, first_name) VALUES('111', 'Doe', 'Pat')",
            [],
        )
        .expect("student");
        conn
    }

    fn owner() -> AppealOwner<'static> {
        AppealOwner {
            stu_id: "111",
            term_key: "FA26",
            pace_track: Some("A"),
        }
    }

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn form() -> AppealForm {
        AppealForm {
            appeal_date: s("09/08/2026"),
            relief_given: true,
            pace: s("3"),
            pace_track: None,
            course_order: s("2"),
            unit: s("5"),
            ms_type: s("FE"),
            orig_date: s("10/01/2026"),
            new_date: s("10/06/2026"),
            attempts: None,
            appeal_type: s("med"),
            circumstances: s("Hospitalized"),
            comment: None,
            interviewer: s("staff"),
        }
    }

    fn message(result: RecordResult<PaceAppeal>) -> String {
        result.expect_err("should fail").to_string()
    }

    #[test]
    fn validation_reports_first_failure() {
        let o = owner();
        let mut f = form();
        f.appeal_date = None;
        f.pace = s("x");
        assert_eq!(message(validate_appeal(&o, &f)), "Appeal date must be set.");

        let mut f = form();
        f.pace = s("x");
        assert_eq!(message(validate_appeal(&o, &f)), "Invalid Pace.");

        let mut f = form();
        f.course_order = s("4");
        assert_eq!(message(validate_appeal(&o, &f)), "Course number must fall within pace.");

        let mut f = form();
        f.unit = s("6");
        assert_eq!(message(validate_appeal(&o, &f)), "Unit number not in valid range.");

        let mut f = form();
        f.ms_type = s("UE");
        assert_eq!(message(validate_appeal(&o, &f)), "A milestone type must be selected.");

        let mut f = form();
        f.circumstances = s("  ");
        assert_eq!(message(validate_appeal(&o, &f)), "Circumstances field may not be blank.");

        let mut f = form();
        f.attempts = s("two");
        assert_eq!(message(validate_appeal(&o, &f)), "Invalid number of attempts.");

        let mut f = form();
        f.new_date = None;
        assert_eq!(message(validate_appeal(&o, &f)), "New deadline date must be set.");
    }

    #[test]
    fn out_of_range_pace_is_rejected_before_later_fields() {
        let o = owner();
        for pace in ["50000000", "4294967295", "4294967296", "-1"] {
            let mut f = form();
            f.pace = s(pace);
            f.course_order = s("1");
            f.unit = s("0");
            f.ms_type = s("RE");
            f.interviewer = None;
            assert_eq!(message(validate_appeal(&o, &f)), "Invalid Pace.", "pace {pace}");
        }

        let mut f = form();
        f.course_order = s("-1");
        assert_eq!(message(validate_appeal(&o, &f)), "Course number must fall within pace.");
    }

    #[test]
    fn relief_writes_and_then_updates_the_override() {
        let conn = seeded();
        let appeal = validate_appeal(&owner(), &form()).expect("valid");
        assert_eq!(appeal.ms_nbr, 325);
        assert_eq!(appeal.appeal_type.as_deref(), Some("MED"));
        assert_eq!(appeal.pace_track, "A");
        add_appeal(&conn, appeal).expect("add");

        let overrides = milestone::student_milestones(&conn, "111", "FA26").expect("stms");
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].ms_date.to_string(), "2026-10-06");
        assert_eq!(overrides[0].ext_type.as_deref(), Some("MED"));

        let mut f = form();
        f.new_date = s("10/09/2026");
        add_appeal(&conn, validate_appeal(&owner(), &f).expect("valid")).expect("second");
        let overrides = milestone::student_milestones(&conn, "111", "FA26").expect("stms");
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].ms_date.to_string(), "2026-10-09");
        assert_eq!(milestone::pace_appeals(&conn, "111").expect("appeals").len(), 2);
    }

    #[test]
    fn edit_moves_paired_override_and_delete_checks_owner() {
        let conn = seeded();
        let added = add_appeal(&conn, validate_appeal(&owner(), &form()).expect("valid")).expect("add");

        let edit = AppealEdit {
            appeal_date: None,
            relief_given: true,
            new_date: s("2026-10-12"),
            attempts: s("2"),
            appeal_type: None,
            circumstances: s("Still hospitalized"),
            comment: s("extended again"),
            interviewer: s("lead"),
        };
        let updated = update_appeal(&conn, "111", &added.id, &edit).expect("update");
        assert_eq!(updated.appeal_type.as_deref(), Some("MED"));
        assert_eq!(updated.ms_nbr, added.ms_nbr);

        let overrides = milestone::student_milestones(&conn, "111", "FA26").expect("stms");
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].ms_date.to_string(), "2026-10-12");
        assert_eq!(overrides[0].nbr_atmpts_allow, Some(2));

        let err = delete_appeal(&conn, "222", &added.id).expect_err("other student");
        assert_eq!(err.code(), "not_found");
        delete_appeal(&conn, "111", &added.id).expect("delete");
        assert!(milestone::pace_appeals(&conn, "111").expect("appeals").is_empty());
    }

    fn target() -> Milestone {
        Milestone {
            term_key: "FA26".into(),
            pace: 3,
            pace_track: "A".into(),
            ms_nbr: 311,
            ms_type: "RE".into(),
            ms_date: NaiveDate::from_ymd_opt(2026, 9, 10).expect("date"),
            nbr_atmpts_allow: None,
        }
    }

    #[test]
    fn quick_extension_messages_follow_form_order() {
        let conn = seeded();
        let o = owner();
        let mut f = ExtensionForm {
            relief_given: true,
            ..ExtensionForm::default()
        };
        let err = |f: &ExtensionForm| {
            quick_extension(&conn, &o, 3, &target(), f)
                .expect_err("invalid")
                .to_string()
        };
        assert_eq!(err(&f), "Interviewer field may not be empty.");
        f.interviewer = s("staff");
        assert_eq!(err(&f), "Appeal date field may not be empty.");
        f.appeal_date = s("bogus");
        assert_eq!(err(&f), "If relief was given, new deadline date field may not be empty.");
        f.new_deadline = s("13/45/26");
        assert_eq!(err(&f), "Unable to interpret new deadline date");
        f.new_deadline = s("091526");
        assert_eq!(err(&f), "Unable to interpret appeal date");
        f.appeal_date = s("9/8/26");
        f.attempts = s("lots");
        assert_eq!(err(&f), "Unable to interpret number of attempts");
    }

    #[test]
    fn quick_extension_with_and_without_relief() {
        let conn = seeded();
        let o = owner();
        let granted = ExtensionForm {
            interviewer: s("staff"),
            appeal_date: s("9/8/26"),
            relief_given: true,
            new_deadline: s("091526"),
            ..ExtensionForm::default()
        };
        let appeal = quick_extension(&conn, &o, 3, &target(), &granted).expect("granted");
        assert_eq!(appeal.appeal_type.as_deref(), Some(DEFAULT_APPEAL_TYPE));
        assert_eq!(appeal.ms_date.to_string(), "2026-09-10");

        let denied = ExtensionForm {
            relief_given: false,
            new_deadline: None,
            circumstances: s("asked for more time"),
            ..granted.clone()
        };
        quick_extension(&conn, &o, 3, &target(), &denied).expect("documented");

        let overrides = milestone::student_milestones(&conn, "111", "FA26").expect("stms");
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].ms_date.to_string(), "2026-09-15");
        assert_eq!(milestone::pace_appeals(&conn, "111").expect("appeals").len(), 2);
    }
}
