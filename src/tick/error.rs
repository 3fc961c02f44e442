use std::fmt;

use crate::collaborators::CollaboratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickErrorKind {
    ThoughtGeneration,
    Publish,
    Panicked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickError {
    pub kind: TickErrorKind,
    pub message: String,
}

impl TickError {
    pub fn new(kind: TickErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TickError {}

pub fn thought_failed(err: CollaboratorError) -> TickError {
    TickError::new(
        TickErrorKind::ThoughtGeneration,
        format!("thought generation failed: {err}"),
    )
}

pub fn publish_failed(err: CollaboratorError) -> TickError {
    TickError::new(TickErrorKind::Publish, format!("publish failed: {err}"))
}

pub fn panicked(message: impl Into<String>) -> TickError {
    TickError::new(TickErrorKind::Panicked, message)
}
