use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use super::RecordResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub term_key: String,
    pub start_dt: NaiveDate,
    pub end_dt: NaiveDate,
}

pub fn active(conn: &Connection) -> RecordResult<Option<Term>> {
    Ok(conn
        .query_row(
            "SELECT term_key, start_dt, end_dt FROM term WHERE active = 1 ORDER BY start_dt DESC LIMIT 1",
            [],
            |r| {
                Ok(Term {
                    term_key: r.get(0)?,
                    start_dt: r.get(1)?,
                    end_dt: r.get(2)?,
                })
            },
        )
        .optional()?)
}
