//! Typed row access over the workspace tables.
//!
//! Each submodule maps one table family 1:1 onto plain structs and exposes the
//! handful of queries and updates the handlers need. No business rules live here.

pub mod course;
pub mod discipline;
pub mod exam;
pub mod hold;
pub mod milestone;
pub mod placement;
pub mod student;
pub mod term;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),
}

impl RecordError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RecordError::Invalid(message.into())
    }

    pub fn code(&self) -> &'static str {
        self.code_or("db_query_failed")
    }

    /// Protocol error code; `db_code` is used for database failures so callers can
    /// distinguish reads from writes.
    pub fn code_or(&self, db_code: &'static str) -> &'static str {
        match self {
            RecordError::Db(_) => db_code,
            RecordError::NotFound(_) => "not_found",
            RecordError::Invalid(_) => "validation_failed",
        }
    }
}

pub type RecordResult<T> = Result<T, RecordError>;

pub(crate) fn yn(flag: bool) -> &'static str {
    if flag {
        "Y"
    } else {
        "N"
    }
}

pub(crate) fn is_yes(value: Option<String>) -> bool {
    value.as_deref() == Some("Y")
}
