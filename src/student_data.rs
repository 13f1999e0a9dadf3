//! Per-student record cache for the currently selected student.
//!
//! The student row is loaded on selection; every related list is loaded the
//! first time an operation asks for it via [`StudentData::require`] and kept
//! until a write invalidates it.

use rusqlite::Connection;
use tracing::debug;

use crate::records::course::{self, CourseSection, Registration, StudentTerm};
use crate::records::discipline::{self, Discipline};
use crate::records::exam::{self, StudentExam};
use crate::records::hold::{self, AdminHold};
use crate::records::milestone::{self, Milestone, PaceAppeal, StudentMilestone};
use crate::records::placement::{self, PlacementAttempt, PlacementCredit, TransferCredit};
use crate::records::student::{self, Student};
use crate::records::term::{self, Term};
use crate::records::{RecordError, RecordResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Student,
    Term,
    StudentTerm,
    Registrations,
    Sections,
    Exams,
    Milestones,
    StudentMilestones,
    Appeals,
    Holds,
    Discipline,
    PlacementCredit,
    PlacementAttempts,
    Transfers,
}

/// `None` means "not loaded yet"; `Some(None)` means "loaded, no row".
#[derive(Debug)]
pub struct StudentData {
    student: Student,
    student_stale: bool,
    active_term: Option<Option<Term>>,
    student_term: Option<Option<StudentTerm>>,
    registrations: Option<Vec<Registration>>,
    sections: Option<Vec<CourseSection>>,
    exams: Option<Vec<StudentExam>>,
    milestones: Option<Vec<Milestone>>,
    student_milestones: Option<Vec<StudentMilestone>>,
    appeals: Option<Vec<PaceAppeal>>,
    holds: Option<Vec<AdminHold>>,
    discipline: Option<Vec<Discipline>>,
    placement_credit: Option<Vec<PlacementCredit>>,
    placement_attempts: Option<Vec<PlacementAttempt>>,
    transfers: Option<Vec<TransferCredit>>,
}

impl StudentData {
    pub fn new(student: Student) -> Self {
        Self {
            student,
            student_stale: false,
            active_term: None,
            student_term: None,
            registrations: None,
            sections: None,
            exams: None,
            milestones: None,
            student_milestones: None,
            appeals: None,
            holds: None,
            discipline: None,
            placement_credit: None,
            placement_attempts: None,
            transfers: None,
        }
    }

    pub fn load(conn: &Connection, stu_id: &str) -> RecordResult<Option<Self>> {
        Ok(student::get(conn, stu_id)?.map(Self::new))
    }

    pub fn stu_id(&self) -> &str {
        &self.student.stu_id
    }

    pub fn student(&self) -> &Student {
        &self.student
    }

    /// Loads every listed part that is not cached yet.
    pub fn require(&mut self, conn: &Connection, parts: &[Part]) -> RecordResult<()> {
        for part in parts {
            self.ensure(conn, *part)?;
        }
        Ok(())
    }

    fn ensure(&mut self, conn: &Connection, part: Part) -> RecordResult<()> {
        let stu_id = self.student.stu_id.clone();
        match part {
            Part::Student => {
                if self.student_stale {
                    self.student = student::get(conn, &stu_id)?.ok_or_else(|| {
                        RecordError::NotFound(format!("student {stu_id} no longer exists"))
                    })?;
                    self.student_stale = false;
                }
            }
            Part::Term => {
                if self.active_term.is_none() {
                    self.active_term = Some(term::active(conn)?);
                }
            }
            Part::StudentTerm => {
                if self.student_term.is_none() {
                    let loaded = match self.term_key(conn)? {
                        Some(key) => course::student_term(conn, &stu_id, &key)?,
                        None => None,
                    };
                    self.student_term = Some(loaded);
                }
            }
            Part::Registrations => {
                if self.registrations.is_none() {
                    self.registrations = Some(course::registrations_for_student(conn, &stu_id)?);
                }
            }
            Part::Sections => {
                if self.sections.is_none() {
                    let loaded = match self.term_key(conn)? {
                        Some(key) => course::sections_for_term(conn, &key)?,
                        None => Vec::new(),
                    };
                    self.sections = Some(loaded);
                }
            }
            Part::Exams => {
                if self.exams.is_none() {
                    self.exams = Some(exam::exams_for_student(conn, &stu_id)?);
                }
            }
            Part::Milestones => {
                if self.milestones.is_none() {
                    let loaded = match self.term_key(conn)? {
                        Some(key) => milestone::milestones_for_term(conn, &key)?,
                        None => Vec::new(),
                    };
                    self.milestones = Some(loaded);
                }
            }
            Part::StudentMilestones => {
                if self.student_milestones.is_none() {
                    let loaded = match self.term_key(conn)? {
                        Some(key) => milestone::student_milestones(conn, &stu_id, &key)?,
                        None => Vec::new(),
                    };
                    self.student_milestones = Some(loaded);
                }
            }
            Part::Appeals => {
                if self.appeals.is_none() {
                    self.appeals = Some(milestone::pace_appeals(conn, &stu_id)?);
                }
            }
            Part::Holds => {
                if self.holds.is_none() {
                    self.holds = Some(hold::holds_for_student(conn, &stu_id)?);
                }
            }
            Part::Discipline => {
                if self.discipline.is_none() {
                    self.discipline = Some(discipline::incidents_for_student(conn, &stu_id)?);
                }
            }
            Part::PlacementCredit => {
                if self.placement_credit.is_none() {
                    self.placement_credit = Some(placement::credits_for_student(conn, &stu_id)?);
                }
            }
            Part::PlacementAttempts => {
                if self.placement_attempts.is_none() {
                    self.placement_attempts = Some(placement::attempts_for_student(conn, &stu_id)?);
                }
            }
            Part::Transfers => {
                if self.transfers.is_none() {
                    self.transfers = Some(placement::transfers_for_student(conn, &stu_id)?);
                }
            }
        }
        Ok(())
    }

    fn term_key(&mut self, conn: &Connection) -> RecordResult<Option<String>> {
        self.ensure(conn, Part::Term)?;
        Ok(self.active_term().map(|t| t.term_key.clone()))
    }

    /// Drops a cached part so the next `require` reloads it.
    pub fn invalidate(&mut self, part: Part) {
        debug!(stu_id = %self.student.stu_id, ?part, "invalidating cached records");
        match part {
            Part::Student => self.student_stale = true,
            Part::Term => {
                self.active_term = None;
                self.student_term = None;
                self.sections = None;
                self.milestones = None;
                self.student_milestones = None;
            }
            Part::StudentTerm => self.student_term = None,
            Part::Registrations => self.registrations = None,
            Part::Sections => self.sections = None,
            Part::Exams => self.exams = None,
            Part::Milestones => self.milestones = None,
            Part::StudentMilestones => self.student_milestones = None,
            Part::Appeals => self.appeals = None,
            Part::Holds => self.holds = None,
            Part::Discipline => self.discipline = None,
            Part::PlacementCredit => self.placement_credit = None,
            Part::PlacementAttempts => self.placement_attempts = None,
            Part::Transfers => self.transfers = None,
        }
    }

    pub fn active_term(&self) -> Option<&Term> {
        self.active_term.as_ref().and_then(|t| t.as_ref())
    }

    pub fn student_term(&self) -> Option<&StudentTerm> {
        self.student_term.as_ref().and_then(|t| t.as_ref())
    }

    pub fn registrations(&self) -> &[Registration] {
        self.registrations.as_deref().unwrap_or_default()
    }

    /// Registrations in the active term, dropped ones included.
    pub fn active_registrations(&self) -> Vec<&Registration> {
        match self.active_term() {
            Some(term) => self
                .registrations()
                .iter()
                .filter(|r| r.term_key == term.term_key)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn sections(&self) -> &[CourseSection] {
        self.sections.as_deref().unwrap_or_default()
    }

    pub fn exams(&self) -> &[StudentExam] {
        self.exams.as_deref().unwrap_or_default()
    }

    pub fn milestones(&self) -> &[Milestone] {
        self.milestones.as_deref().unwrap_or_default()
    }

    /// Sorted by date ascending.
    pub fn student_milestones(&self) -> &[StudentMilestone] {
        self.student_milestones.as_deref().unwrap_or_default()
    }

    pub fn appeals(&self) -> &[PaceAppeal] {
        self.appeals.as_deref().unwrap_or_default()
    }

    pub fn holds(&self) -> &[AdminHold] {
        self.holds.as_deref().unwrap_or_default()
    }

    pub fn discipline(&self) -> &[Discipline] {
        self.discipline.as_deref().unwrap_or_default()
    }

    pub fn placement_credit(&self) -> &[PlacementCredit] {
        self.placement_credit.as_deref().unwrap_or_default()
    }

    pub fn placement_attempts(&self) -> &[PlacementAttempt] {
        self.placement_attempts.as_deref().unwrap_or_default()
    }

    pub fn transfers(&self) -> &[TransferCredit] {
        self.transfers.as_deref().unwrap_or_default()
    }
}
