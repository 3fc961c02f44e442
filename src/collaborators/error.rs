use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorErrorKind {
    Unavailable,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorError {
    pub kind: CollaboratorErrorKind,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(kind: CollaboratorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CollaboratorError {}

pub fn unavailable(message: impl Into<String>) -> CollaboratorError {
    CollaboratorError::new(CollaboratorErrorKind::Unavailable, message)
}

pub fn timeout(message: impl Into<String>) -> CollaboratorError {
    CollaboratorError::new(CollaboratorErrorKind::Timeout, message)
}
