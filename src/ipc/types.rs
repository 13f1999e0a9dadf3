use std::path::PathBuf;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::records::student::Student;
use crate::student_data::StudentData;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub stu_id: String,
    pub label: String,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub selected: Option<StudentData>,
    /// Most recently selected first.
    pub history: Vec<HistoryEntry>,
    pub history_limit: usize,
}

impl AppState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            workspace: None,
            db: None,
            selected: None,
            history: Vec::new(),
            history_limit,
        }
    }

    /// Makes `data` the selected student and moves it to the front of the history.
    pub fn select(&mut self, data: StudentData) {
        self.remember(data.student());
        self.selected = Some(data);
    }

    fn remember(&mut self, student: &Student) {
        self.history.retain(|h| h.stu_id != student.stu_id);
        self.history.insert(
            0,
            HistoryEntry {
                stu_id: student.stu_id.clone(),
                label: format!("{} ({})", student.screen_name(), student.stu_id),
            },
        );
        self.history.truncate(self.history_limit);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn reset_session(&mut self) {
        self.selected = None;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, last: &str) -> StudentData {
        StudentData::new(Student {
            stu_id: id.into(),
            last_name: last.into(),
            first_name: "Pat".into(),
            pref_name: None,
            middle_initial: None,
            apln_term: None,
            licensed: false,
            sev_admin_hold: None,
            timelimit_factor: None,
        })
    }

    #[test]
    fn history_is_most_recent_first_without_duplicates() {
        let mut state = AppState::new(2);
        state.select(student("1", "Ames"));
        state.select(student("2", "Baker"));
        state.select(student("1", "Ames"));
        let ids: Vec<&str> = state.history.iter().map(|h| h.stu_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(state.history[0].label, "Ames, Pat (1)");

        state.select(student("3", "Cole"));
        let ids: Vec<&str> = state.history.iter().map(|h| h.stu_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
        assert_eq!(state.selected.as_ref().map(|d| d.stu_id()), Some("3"));
    }
}
