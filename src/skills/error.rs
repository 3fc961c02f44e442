use std::fmt;

use crate::types::SkillId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillRegistryErrorKind {
    DuplicateId,
    InvalidDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillRegistryError {
    pub kind: SkillRegistryErrorKind,
    pub message: String,
}

impl SkillRegistryError {
    pub fn new(kind: SkillRegistryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SkillRegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SkillRegistryError {}

pub fn duplicate_id(id: SkillId) -> SkillRegistryError {
    SkillRegistryError::new(
        SkillRegistryErrorKind::DuplicateId,
        format!("skill id already registered: {id}"),
    )
}

pub fn invalid_descriptor(message: impl Into<String>) -> SkillRegistryError {
    SkillRegistryError::new(SkillRegistryErrorKind::InvalidDescriptor, message)
}
