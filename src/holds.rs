//! Administrative holds: listing with staff messages, query by example, and
//! add/delete with the student's summary severity kept in step.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::dates::interpret_date;
use crate::records::hold::{self, AdminHold, HoldFilter, HoldType};
use crate::records::student;
use crate::records::{RecordError, RecordResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldView {
    #[serde(flatten)]
    pub hold: AdminHold,
    pub staff_message: Option<String>,
    pub cannot_test: bool,
}

pub fn hold_views(holds: &[AdminHold], types: &[HoldType]) -> Vec<HoldView> {
    holds
        .iter()
        .map(|h| HoldView {
            hold: h.clone(),
            staff_message: types
                .iter()
                .find(|t| t.hold_id == h.hold_id)
                .map(|t| t.staff_message.clone()),
            cannot_test: h.is_fatal(),
        })
        .collect()
}

/// Raw hold form text; also used as the query-by-example input.
#[derive(Debug, Clone, Default)]
pub struct HoldForm {
    pub stu_id: Option<String>,
    pub hold_id: Option<String>,
    pub severity: Option<String>,
    pub times_display: Option<String>,
    pub create_date: Option<String>,
}

fn field(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn hold_id(text: &str) -> RecordResult<String> {
    if text.len() == 2 && text.chars().all(|c| c.is_ascii_digit()) {
        Ok(text.to_string())
    } else {
        Err(RecordError::invalid("Hold ID must be exactly two digits."))
    }
}

fn severity(text: &str) -> RecordResult<String> {
    match text.to_uppercase().as_str() {
        s @ ("F" | "N") => Ok(s.to_string()),
        _ => Err(RecordError::invalid("Severity must be F (fatal) or N (non-fatal).")),
    }
}

fn times_display(text: &str) -> RecordResult<u32> {
    text.parse::<u32>()
        .ok()
        .filter(|n| *n <= 99)
        .ok_or_else(|| RecordError::invalid("Times displayed must be a number from 0 to 99."))
}

fn create_date(text: &str) -> RecordResult<NaiveDate> {
    interpret_date(text).ok_or_else(|| RecordError::invalid("Unable to interpret create date."))
}

/// Validates whichever fields are supplied into a query-by-example filter.
pub fn filter_from(form: &HoldForm) -> RecordResult<HoldFilter> {
    Ok(HoldFilter {
        stu_id: field(&form.stu_id).map(str::to_string),
        hold_id: field(&form.hold_id).map(hold_id).transpose()?,
        sev_admin_hold: field(&form.severity).map(severity).transpose()?,
        times_display: field(&form.times_display).map(times_display).transpose()?,
        create_dt: field(&form.create_date).map(create_date).transpose()?,
    })
}

/// Adds a hold to the student and recomputes the student's hold severity.
pub fn add_hold(
    conn: &Connection,
    stu_id: &str,
    form: &HoldForm,
    as_of: NaiveDate,
) -> RecordResult<AdminHold> {
    let id = field(&form.hold_id)
        .ok_or_else(|| RecordError::invalid("Hold ID must be exactly two digits."))
        .and_then(hold_id)?;
    let catalogue = hold::hold_types(conn)?;
    let sev = match field(&form.severity) {
        Some(text) => severity(text)?,
        None => catalogue
            .iter()
            .find(|t| t.hold_id == id)
            .map_or_else(|| "N".to_string(), |t| t.sev_admin_hold.clone()),
    };
    let times = field(&form.times_display).map(times_display).transpose()?;
    let created = match field(&form.create_date) {
        Some(text) => create_date(text)?,
        None => as_of,
    };

    if hold::get_hold(conn, stu_id, &id)?.is_some() {
        return Err(RecordError::invalid(format!("Student already has hold {id}.")));
    }

    let new_hold = AdminHold {
        stu_id: stu_id.to_string(),
        hold_id: id,
        sev_admin_hold: sev,
        times_display: Some(times.unwrap_or(0)),
        create_dt: Some(created),
    };

    let tx = conn.unchecked_transaction()?;
    hold::insert_hold(&tx, &new_hold)?;
    let summary = recompute_severity(&tx, stu_id)?;
    tx.commit()?;

    info!(stu_id, hold_id = %new_hold.hold_id, severity = ?summary, "hold added");
    Ok(new_hold)
}

pub fn delete_hold(conn: &Connection, stu_id: &str, hold_id: &str) -> RecordResult<()> {
    let tx = conn.unchecked_transaction()?;
    if hold::delete_hold(&tx, stu_id, hold_id)? == 0 {
        return Err(RecordError::NotFound(format!(
            "student {stu_id} has no hold {hold_id}"
        )));
    }
    let summary = recompute_severity(&tx, stu_id)?;
    tx.commit()?;

    info!(stu_id, hold_id, severity = ?summary, "hold deleted");
    Ok(())
}

/// `F` if any hold is fatal, `N` if any hold exists, otherwise none.
pub fn summary_severity(holds: &[AdminHold]) -> Option<&'static str> {
    if holds.iter().any(AdminHold::is_fatal) {
        Some("F")
    } else if holds.is_empty() {
        None
    } else {
        Some("N")
    }
}

fn recompute_severity(conn: &Connection, stu_id: &str) -> RecordResult<Option<&'static str>> {
    let severity = summary_severity(&hold::holds_for_student(conn, stu_id)?);
    student::set_hold_severity(conn, stu_id, severity)?;
    Ok(severity)
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

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).expect("date")
    }

    fn severity_of(conn: &Connection) -> Option<String> {
        student::get(conn, "111")
            .expect("get")
            .expect("student")
            .sev_admin_hold
    }

    fn form(id: &str) -> HoldForm {
        HoldForm {
            hold_id: Some(id.to_string()),
            ..HoldForm::default()
        }
    }

    #[test]
    fn add_defaults_from_catalogue_and_updates_student_severity() {
        let conn = seeded();
        let added = add_hold(&conn, "111", &form("30"), today()).expect("add");
        assert_eq!(added.sev_admin_hold, "N");
        assert_eq!(added.create_dt, Some(today()));
        assert_eq!(severity_of(&conn).as_deref(), Some("N"));

        add_hold(&conn, "111", &form("06"), today()).expect("add fatal");
        assert_eq!(severity_of(&conn).as_deref(), Some("F"));

        delete_hold(&conn, "111", "06").expect("delete");
        assert_eq!(severity_of(&conn).as_deref(), Some("N"));
        delete_hold(&conn, "111", "30").expect("delete");
        assert_eq!(severity_of(&conn), None);
    }

    #[test]
    fn add_rejects_bad_fields_and_duplicates() {
        let conn = seeded();
        let err = add_hold(&conn, "111", &form("6"), today()).expect_err("short id");
        assert_eq!(err.code(), "validation_failed");

        let mut f = form("06");
        f.times_display = Some("100".into());
        let err = add_hold(&conn, "111", &f, today()).expect_err("times");
        assert_eq!(err.to_string(), "Times displayed must be a number from 0 to 99.");

        add_hold(&conn, "111", &form("06"), today()).expect("first");
        let err = add_hold(&conn, "111", &form("06"), today()).expect_err("dup");
        assert_eq!(err.to_string(), "Student already has hold 06.");

        let err = delete_hold(&conn, "111", "99").expect_err("missing");
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn views_carry_staff_message_and_fatal_flag() {
        let conn = seeded();
        add_hold(&conn, "111", &form("06"), today()).expect("add");
        let views = hold_views(
            &hold::holds_for_student(&conn, "111").expect("holds"),
            &hold::hold_types(&conn).expect("types"),
        );
        assert!(views[0].cannot_test);
        assert_eq!(
            views[0].staff_message.as_deref(),
            Some("Academic misconduct under review; testing suspended.")
        );
    }

    #[test]
    fn filter_accepts_partial_forms() {
        let f = filter_from(&HoldForm {
            severity: Some("f".into()),
            create_date: Some("9/1/26".into()),
            ..HoldForm::default()
        })
        .expect("filter");
        assert_eq!(f.sev_admin_hold.as_deref(), Some("F"));
        assert_eq!(f.create_dt, NaiveDate::from_ymd_opt(2026, 9, 1));
        assert!(f.hold_id.is_none());
        assert!(filter_from(&HoldForm {
            hold_id: Some("abc".into()),
            ..HoldForm::default()
        })
        .is_err());
    }
}
