use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::RecordResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminHold {
    pub stu_id: String,
    pub hold_id: String,
    pub sev_admin_hold: String,
    pub times_display: Option<u32>,
    pub create_dt: Option<NaiveDate>,
}

impl AdminHold {
    pub fn is_fatal(&self) -> bool {
        self.sev_admin_hold == "F"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldType {
    pub hold_id: String,
    pub sev_admin_hold: String,
    pub staff_message: String,
}

/// Query-by-example filter; `None` fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct HoldFilter {
    pub stu_id: Option<String>,
    pub hold_id: Option<String>,
    pub sev_admin_hold: Option<String>,
    pub times_display: Option<u32>,
    pub create_dt: Option<NaiveDate>,
}

const COLUMNS: &str = "stu_id, hold_id, sev_admin_hold, times_display, create_dt";

fn hold_from_row(r: &Row<'_>) -> rusqlite::Result<AdminHold> {
    Ok(AdminHold {
        stu_id: r.get(0)?,
        hold_id: r.get(1)?,
        sev_admin_hold: r.get(2)?,
        times_display: r.get(3)?,
        create_dt: r.get(4)?,
    })
}

pub fn holds_for_student(conn: &Connection, stu_id: &str) -> RecordResult<Vec<AdminHold>> {
    query_holds(
        conn,
        &HoldFilter {
            stu_id: Some(stu_id.to_string()),
            ..HoldFilter::default()
        },
    )
}

pub fn query_holds(conn: &Connection, filter: &HoldFilter) -> RecordResult<Vec<AdminHold>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(v) = &filter.stu_id {
        clauses.push("stu_id = ?");
        values.push(Value::Text(v.clone()));
    }
    if let Some(v) = &filter.hold_id {
        clauses.push("hold_id = ?");
        values.push(Value::Text(v.clone()));
    }
    if let Some(v) = &filter.sev_admin_hold {
        clauses.push("sev_admin_hold = ?");
        values.push(Value::Text(v.clone()));
    }
    if let Some(v) = filter.times_display {
        clauses.push("times_display = ?");
        values.push(Value::Integer(i64::from(v)));
    }
    if let Some(v) = filter.create_dt {
        clauses.push("create_dt = ?");
        values.push(Value::Text(v.format("%Y-%m-%d").to_string()));
    }

    let mut sql = format!("SELECT {COLUMNS} FROM admin_hold");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY stu_id, hold_id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), hold_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_hold(conn: &Connection, stu_id: &str, hold_id: &str) -> RecordResult<Option<AdminHold>> {
    let sql = format!("SELECT {COLUMNS} FROM admin_hold WHERE stu_id = ? AND hold_id = ?");
    Ok(conn.query_row(&sql, [stu_id, hold_id], hold_from_row).optional()?)
}

pub fn insert_hold(conn: &Connection, hold: &AdminHold) -> RecordResult<()> {
    conn.execute(
        "INSERT INTO admin_hold(stu_id, hold_id, sev_admin_hold, times_display, create_dt)
         VALUES(?, ?, ?, ?, ?)",
        (
            &hold.stu_id,
            &hold.hold_id,
            &hold.sev_admin_hold,
            hold.times_display,
            hold.create_dt,
        ),
    )?;
    Ok(())
}

pub fn delete_hold(conn: &Connection, stu_id: &str, hold_id: &str) -> RecordResult<usize> {
    Ok(conn.execute(
        "DELETE FROM admin_hold WHERE stu_id = ? AND hold_id = ?",
        [stu_id, hold_id],
    )?)
}

pub fn hold_types(conn: &Connection) -> RecordResult<Vec<HoldType>> {
    let mut stmt =
        conn.prepare("SELECT hold_id, sev_admin_hold, staff_message FROM hold_type ORDER BY hold_id")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(HoldType {
                hold_id: r.get(0)?,
                sev_admin_hold: r.get(1)?,
                staff_message: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
