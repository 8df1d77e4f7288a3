//! Error types for registry mutations and exchange-file import.

use crate::id::{ElementId, FlowId};

/// A registry operation referenced something that does not exist or has the
/// wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiagramError {
    #[error("no element with id `{0}`")]
    UnknownElement(ElementId),
    #[error("no data flow with id `{0}`")]
    UnknownFlow(FlowId),
    #[error("parent `{0}` does not exist")]
    UnknownParent(ElementId),
    #[error("parent `{0}` is not a process")]
    ParentNotProcess(ElementId),
    #[error("`{0}` is not a process and has no sub-diagram")]
    NotAProcess(ElementId),
}

/// An exchange file was rejected before any state changed.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid file format: missing `context` object")]
    MissingContext,
    #[error("invalid file format: {0}")]
    Malformed(String),
    #[error("element id `{0}` appears more than once")]
    DuplicateId(String),
    #[error("`{0}` is not a usable element id")]
    InvalidId(String),
}

pub type Result<T> = std::result::Result<T, DiagramError>;
