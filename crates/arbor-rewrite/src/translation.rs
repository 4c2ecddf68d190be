use std::collections::HashMap;

use arbor_types::{Relation, Resource, StructureId};

/// Maps source resources to their copies, by structure id and by root path.
#[derive(Clone, Debug, Default)]
pub struct TranslationTable {
    by_id: HashMap<StructureId, Resource>,
    by_path: HashMap<String, Resource>,
}

impl TranslationTable {
    pub fn insert(&mut self, source: &Resource, target: Resource) {
        self.by_path
            .insert(source.root_path().to_string(), target.clone());
        self.by_id.insert(source.structure_id(), target);
    }

    pub fn by_id(&self, id: StructureId) -> Option<&Resource> {
        self.by_id.get(&id)
    }

    pub fn by_path(&self, root_path: &str) -> Option<&Resource> {
        self.by_path.get(root_path)
    }

    /// The copy of a relation's target, by id first, then by path.
    pub fn target_of(&self, relation: &Relation) -> Option<&Resource> {
        self.by_id(relation.target_id)
            .or_else(|| self.by_path(&relation.target_path))
    }

    /// The copy of a relation's source, by id first, then by path.
    pub fn source_of(&self, relation: &Relation) -> Option<&Resource> {
        self.by_id(relation.source_id)
            .or_else(|| self.by_path(&relation.source_path))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
