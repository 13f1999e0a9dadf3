//! Student lookup by ID or by free-form name text.

use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::records::course;
use crate::records::student::{self, Student};
use crate::records::term;
use crate::records::{RecordError, RecordResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub stu_id: String,
    pub label: String,
    pub registered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Selected(Student),
    NotFound,
    Choices(Vec<Choice>),
}

pub fn lookup(conn: &Connection, query: &str) -> RecordResult<LookupOutcome> {
    let text = query.trim();
    let Some(first) = text.chars().next() else {
        return Err(RecordError::invalid("Enter student ID or name to search"));
    };

    let found = if first.is_ascii_digit() {
        let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
        debug!(stu_id = %digits, "lookup by id");
        student::get(conn, &digits)?.into_iter().collect()
    } else {
        find_by_name(conn, text)?
    };

    match found.len() {
        0 => Ok(LookupOutcome::NotFound),
        1 => Ok(found
            .into_iter()
            .next()
            .map_or(LookupOutcome::NotFound, LookupOutcome::Selected)),
        _ => Ok(LookupOutcome::Choices(pick_list(conn, found)?)),
    }
}

fn find_by_name(conn: &Connection, text: &str) -> RecordResult<Vec<Student>> {
    if let Some((last, first)) = text.split_once(',') {
        return search(conn, last.trim(), first.trim());
    }

    let whole = search(conn, text, "")?;
    if !whole.is_empty() {
        return Ok(whole);
    }

    for (last, first) in name_candidates(text) {
        let found = search(conn, &last, &first)?;
        if !found.is_empty() {
            return Ok(found);
        }
    }
    Ok(Vec::new())
}

/// `(last, first)` splits of a comma-free name, most likely first.
pub fn name_candidates(text: &str) -> Vec<(String, String)> {
    let p: Vec<&str> = text.split(' ').filter(|s| !s.is_empty()).collect();
    let join = |a: &[&str]| a.join(" ");
    match p.len() {
        0 | 1 => Vec::new(),
        2 => vec![(p[1].to_string(), p[0].to_string())],
        3 => vec![
            (join(&p[1..3]), p[0].to_string()),
            (p[2].to_string(), join(&p[0..2])),
            (p[2].to_string(), p[0].to_string()),
        ],
        4 => vec![
            (join(&p[2..4]), join(&p[0..2])),
            (join(&p[2..4]), p[0].to_string()),
            (p[3].to_string(), join(&p[0..2])),
            (p[3].to_string(), p[0].to_string()),
        ],
        n => vec![
            (p[n - 1].to_string(), p[0].to_string()),
            (p[n - 1].to_string(), join(&p[0..2])),
            (join(&p[n - 2..n]), p[0].to_string()),
            (join(&p[n - 2..n]), join(&p[0..2])),
        ],
    }
}

fn search(conn: &Connection, last: &str, first: &str) -> RecordResult<Vec<Student>> {
    if matches!(last.trim(), "" | "\\" | "*" | "?") {
        return Ok(Vec::new());
    }
    if first.is_empty() {
        return student::find_by_last_name(conn, last);
    }
    let first_pattern = if first.ends_with('%') {
        first.to_string()
    } else {
        format!("{first}%")
    };
    student::find_by_last_and_first(conn, last, &first_pattern)
}

fn pick_list(conn: &Connection, mut found: Vec<Student>) -> RecordResult<Vec<Choice>> {
    found.sort_by(|a, b| {
        (&a.last_name, &a.first_name, &a.stu_id).cmp(&(&b.last_name, &b.first_name, &b.stu_id))
    });
    let active = term::active(conn)?;

    let mut registered = Vec::new();
    let mut unregistered = Vec::new();
    for s in found {
        let courses = match &active {
            Some(t) => course::registered_courses(conn, &s.stu_id, &t.term_key)?,
            None => Vec::new(),
        };
        if courses.is_empty() {
            unregistered.push(Choice {
                label: s.screen_name(),
                stu_id: s.stu_id,
                registered: false,
            });
        } else {
            registered.push(Choice {
                label: format!("{} ({})", s.screen_name(), courses.join(", ")),
                stu_id: s.stu_id,
                registered: true,
            });
        }
    }
    registered.extend(unregistered);
    Ok(registered)
}
