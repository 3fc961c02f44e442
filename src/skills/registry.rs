use std::{collections::BTreeMap, sync::Arc};

use crate::{
    skills::{
        error::{SkillRegistryError, duplicate_id, invalid_descriptor},
        ports::{Skill, SkillDescriptor},
    },
    types::SkillId,
};

#[derive(Default)]
pub struct SkillRegistryBuilder {
    by_id: BTreeMap<SkillId, Arc<dyn Skill>>,
}

impl SkillRegistryBuilder {
    pub fn register(mut self, skill: Arc<dyn Skill>) -> Result<Self, SkillRegistryError> {
        let descriptor = skill.descriptor();
        if descriptor.name.trim().is_empty() {
            return Err(invalid_descriptor(format!(
                "skill {} has an empty name",
                descriptor.id
            )));
        }
        if self.by_id.contains_key(&descriptor.id) {
            return Err(duplicate_id(descriptor.id));
        }

        self.by_id.insert(descriptor.id, skill);
        Ok(self)
    }

    pub fn build(self) -> SkillRegistry {
        SkillRegistry { by_id: self.by_id }
    }
}

/// Id-keyed skill table. Filled once through the builder, read-only after.
#[derive(Default)]
pub struct SkillRegistry {
    by_id: BTreeMap<SkillId, Arc<dyn Skill>>,
}

impl SkillRegistry {
    pub fn builder() -> SkillRegistryBuilder {
        SkillRegistryBuilder::default()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn resolve(&self, id: SkillId) -> Option<Arc<dyn Skill>> {
        self.by_id.get(&id).map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Descriptors ordered by id.
    pub fn catalog(&self) -> Vec<SkillDescriptor> {
        self.by_id
            .values()
            .map(|skill| skill.descriptor().clone())
            .collect()
    }
}
