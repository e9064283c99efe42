// ── Schema registry ──
//
// Maps schema keys to their shape descriptor: where the id lives in a
// payload and which nested relations can be normalized out of it.
// Populated once at startup, then shared read-only behind an `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::CoreError;
use crate::model::{RelationKey, SchemaKey};

/// Default JSON pointer to an entity's id.
pub const DEFAULT_ID_POINTER: &str = "/id";

/// A declared edge from one schema to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub key: RelationKey,
    pub target: SchemaKey,
    /// JSON pointer, relative to the parent payload, of the nested value.
    pub field: String,
}

/// Static descriptor of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySchema {
    pub key: SchemaKey,
    pub id_pointer: String,
    pub relations: Vec<Relation>,
}

impl EntitySchema {
    pub fn new(key: impl Into<SchemaKey>) -> Self {
        Self {
            key: key.into(),
            id_pointer: DEFAULT_ID_POINTER.into(),
            relations: Vec::new(),
        }
    }

    /// Set the JSON pointer used to read ids from payloads.
    pub fn with_id_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.id_pointer = pointer.into();
        self
    }

    /// Declare a relation to `target`, found at `field` in the payload.
    pub fn with_relation(mut self, target: impl Into<SchemaKey>, field: impl Into<String>) -> Self {
        let target = target.into();
        let key = RelationKey::between(&self.key, &target);
        self.relations.push(Relation {
            key,
            target,
            field: field.into(),
        });
        self
    }

    pub fn relation(&self, key: &RelationKey) -> Option<&Relation> {
        self.relations.iter().find(|r| &r.key == key)
    }
}

/// Registry of every known entity schema.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<SchemaKey, Arc<EntitySchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema. Each key may only be registered once.
    pub fn register(&mut self, schema: EntitySchema) -> Result<Arc<EntitySchema>, CoreError> {
        if self.schemas.contains_key(&schema.key) {
            return Err(CoreError::DuplicateSchema {
                schema_key: schema.key,
            });
        }
        let schema = Arc::new(schema);
        self.schemas.insert(schema.key.clone(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Look up a registered schema.
    pub fn lookup(&self, key: &SchemaKey) -> Result<Arc<EntitySchema>, CoreError> {
        self.schemas
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::UnknownSchema {
                schema_key: key.clone(),
            })
    }

    pub fn contains(&self, key: &SchemaKey) -> bool {
        self.schemas.contains_key(key)
    }

    /// Check that every relation target is itself registered.
    pub fn validate(&self) -> Result<(), CoreError> {
        for schema in self.schemas.values() {
            for relation in &schema.relations {
                if !self.contains(&relation.target) {
                    return Err(CoreError::UnknownSchema {
                        schema_key: relation.target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntitySchema>> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
