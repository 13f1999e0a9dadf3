use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{is_yes, RecordResult};

const COLUMNS: &str = "stu_id, last_name, first_name, pref_name, middle_initial, apln_term, \
                       licensed, sev_admin_hold, timelimit_factor";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub stu_id: String,
    pub last_name: String,
    pub first_name: String,
    pub pref_name: Option<String>,
    pub middle_initial: Option<String>,
    pub apln_term: Option<String>,
    pub licensed: bool,
    pub sev_admin_hold: Option<String>,
    pub timelimit_factor: Option<f64>,
}

impl Student {
    /// Name used in pick lists and history: `Last, Preferred` (falls back to first name).
    pub fn screen_name(&self) -> String {
        let first = self
            .pref_name
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&self.first_name);
        format!("{}, {}", self.last_name, first)
    }

    /// Full name for the detail header: `First M. Last (Pref)`.
    pub fn display_name(&self) -> String {
        let mut name = self.first_name.clone();
        if let Some(mi) = self.middle_initial.as_deref().filter(|m| !m.is_empty()) {
            name.push(' ');
            name.push_str(mi);
            name.push('.');
        }
        name.push(' ');
        name.push_str(&self.last_name);
        if let Some(pref) = self.pref_name.as_deref() {
            if !pref.is_empty() && pref != self.first_name {
                name.push_str(" (");
                name.push_str(pref);
                name.push(')');
            }
        }
        name
    }
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        stu_id: row.get(0)?,
        last_name: row.get(1)?,
        first_name: row.get(2)?,
        pref_name: row.get(3)?,
        middle_initial: row.get(4)?,
        apln_term: row.get(5)?,
        licensed: is_yes(row.get(6)?),
        sev_admin_hold: row.get(7)?,
        timelimit_factor: row.get(8)?,
    })
}

pub fn get(conn: &Connection, stu_id: &str) -> RecordResult<Option<Student>> {
    let sql = format!("SELECT {COLUMNS} FROM student WHERE stu_id = ?");
    Ok(conn.query_row(&sql, [stu_id], from_row).optional()?)
}

/// `pattern` is matched with SQL `LIKE` against the lower-cased last name.
pub fn find_by_last_name(conn: &Connection, pattern: &str) -> RecordResult<Vec<Student>> {
    let sql = format!("SELECT {COLUMNS} FROM student WHERE lower(last_name) LIKE ?");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([pattern.to_lowercase()], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// `first_pattern` is matched against either the first or the preferred name.
pub fn find_by_last_and_first(
    conn: &Connection,
    last_pattern: &str,
    first_pattern: &str,
) -> RecordResult<Vec<Student>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM student
         WHERE lower(last_name) LIKE ?1
           AND (lower(first_name) LIKE ?2 OR lower(pref_name) LIKE ?2)"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            (last_pattern.to_lowercase(), first_pattern.to_lowercase()),
            from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn set_hold_severity(
    conn: &Connection,
    stu_id: &str,
    severity: Option<&str>,
) -> RecordResult<()> {
    conn.execute(
        "UPDATE student SET sev_admin_hold = ? WHERE stu_id = ?",
        (severity, stu_id),
    )?;
    Ok(())
}

pub fn set_licensed(conn: &Connection, stu_id: &str, licensed: bool) -> RecordResult<usize> {
    Ok(conn.execute(
        "UPDATE student SET licensed = ? WHERE stu_id = ?",
        (super::yn(licensed), stu_id),
    )?)
}
