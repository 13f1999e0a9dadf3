use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::dates::interpret_date;
use crate::records::discipline::{self, Discipline};
use crate::records::{RecordError, RecordResult};

pub const INCIDENT_TYPES: &[(&str, &str)] = &[
    ("RB", "Rule break"),
    ("CH", "Cheating"),
    ("DB", "Disruptive behavior"),
    ("OT", "Other"),
];

pub const ACTION_TYPES: &[(&str, &str)] = &[
    ("W", "Warning"),
    ("RT", "Removed from testing"),
    ("RC", "Referred to conduct office"),
    ("NA", "No action"),
];

fn label_for(table: &[(&str, &'static str)], code: &str) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, label)| *label)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentView {
    #[serde(flatten)]
    pub incident: Discipline,
    pub incident_label: String,
    pub action_label: Option<String>,
}

pub fn incident_views(incidents: &[Discipline]) -> Vec<IncidentView> {
    incidents
        .iter()
        .map(|d| IncidentView {
            incident: d.clone(),
            incident_label: label_for(INCIDENT_TYPES, &d.incident_type)
                .map_or_else(|| d.incident_type.clone(), str::to_string),
            action_label: d.action_type.as_deref().map(|a| {
                label_for(ACTION_TYPES, a).map_or_else(|| a.to_string(), str::to_string)
            }),
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct IncidentForm {
    pub incident_date: Option<String>,
    pub incident_type: Option<String>,
    pub course: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub action_type: Option<String>,
    pub action_comment: Option<String>,
    pub interviewer: Option<String>,
    pub proctor: Option<String>,
}

fn text(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn add_incident(conn: &Connection, stu_id: &str, form: &IncidentForm) -> RecordResult<Discipline> {
    let dt_incident: NaiveDate = text(&form.incident_date)
        .and_then(|t| interpret_date(&t))
        .ok_or_else(|| RecordError::invalid("Incident date must be set."))?;
    let incident_type = text(&form.incident_type)
        .map(|t| t.to_uppercase())
        .filter(|t| label_for(INCIDENT_TYPES, t).is_some())
        .ok_or_else(|| RecordError::invalid("Invalid incident type."))?;
    let action_type = match text(&form.action_type).map(|t| t.to_uppercase()) {
        Some(a) if label_for(ACTION_TYPES, &a).is_none() => {
            return Err(RecordError::invalid("Invalid action type."));
        }
        other => other,
    };
    let unit = match text(&form.unit) {
        None => None,
        Some(u) => Some(
            u.parse::<u32>()
                .map_err(|_| RecordError::invalid("Invalid unit number."))?,
        ),
    };
    let cheat_desc = text(&form.description);
    if incident_type == "CH" && cheat_desc.is_none() {
        return Err(RecordError::invalid(
            "A description is required for cheating incidents.",
        ));
    }

    let incident = Discipline {
        id: Uuid::new_v4().to_string(),
        stu_id: stu_id.to_string(),
        dt_incident,
        incident_type,
        course: text(&form.course),
        unit,
        cheat_desc,
        action_type,
        action_comment: text(&form.action_comment),
        interviewer: text(&form.interviewer),
        proctor: text(&form.proctor),
    };
    discipline::insert_incident(conn, &incident)?;
    info!(stu_id, id = %incident.id, kind = %incident.incident_type, "discipline incident recorded");
    Ok(incident)
}

pub fn delete_incident(conn: &Connection, stu_id: &str, id: &str) -> RecordResult<()> {
    if discipline::delete_incident(conn, stu_id, id)? == 0 {
        return Err(RecordError::NotFound(format!("incident {id} not found")));
    }
    info!(stu_id, id, "discipline incident deleted");
    Ok(())
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

    fn form(kind: &str) -> IncidentForm {
        IncidentForm {
            incident_date: Some("10/02/2026".into()),
            incident_type: Some(kind.into()),
            ..IncidentForm::default()
        }
    }

    #[test]
    fn codes_are_checked_and_cheating_needs_description() {
        let conn = seeded();
        let err = add_incident(&conn, "111", &form("XX")).expect_err("bad type");
        assert_eq!(err.to_string(), "Invalid incident type.");

        let mut f = form("rb");
        f.action_type = Some("ZZ".into());
        assert_eq!(
            add_incident(&conn, "111", &f).expect_err("bad action").to_string(),
            "Invalid action type."
        );

        let err = add_incident(&conn, "111", &form("CH")).expect_err("no description");
        assert_eq!(err.code(), "validation_failed");

        let mut f = form("CH");
        f.description = Some("Phone out during exam".into());
        f.action_type = Some("rt".into());
        f.unit = Some("3".into());
        let saved = add_incident(&conn, "111", &f).expect("add");
        assert_eq!(saved.action_type.as_deref(), Some("RT"));
        assert_eq!(saved.unit, Some(3));

        let views = incident_views(&discipline::incidents_for_student(&conn, "111").expect("list"));
        assert_eq!(views[0].incident_label, "Cheating");
        assert_eq!(views[0].action_label.as_deref(), Some("Removed from testing"));
    }

    #[test]
    fn delete_is_scoped_to_student() {
        let conn = seeded();
        let saved = add_incident(&conn, "111", &form("OT")).expect("add");
        assert_eq!(
            delete_incident(&conn, "222", &saved.id).expect_err("other").code(),
            "not_found"
        );
        delete_incident(&conn, "111", &saved.id).expect("delete");
        assert!(discipline::incidents_for_student(&conn, "111").expect("list").is_empty());
    }
}
