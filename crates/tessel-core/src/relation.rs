// ── Relation resolver ──
//
// Two jobs. Before a request: expand the requested relation keys into one
// ordered fetch plan, rejecting anything not reachable from the root.
// After a response: walk the payload and split every nested relation
// present in it into its own record, leaving the id in its place.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::error::CoreError;
use crate::model::{EntityId, RelationKey, SchemaKey};
use crate::schema::{EntitySchema, SchemaRegistry};

/// Ordered relation expansion for one root fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub root: SchemaKey,
    /// Relations in breadth-first order from the root.
    pub relations: Vec<RelationKey>,
    /// Longest chain of relations below the root.
    pub depth: usize,
}

impl FetchPlan {
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Value of the `include` query parameter, if any relations are planned.
    pub fn include_param(&self) -> Option<String> {
        if self.relations.is_empty() {
            return None;
        }
        let keys: Vec<&str> = self.relations.iter().map(RelationKey::as_str).collect();
        Some(keys.join(","))
    }
}

/// One record split out of a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntity {
    pub schema_key: SchemaKey,
    pub id: EntityId,
    pub payload: Value,
}

/// Every record contained in one payload. Nested records precede their
/// parents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub root: Option<EntityId>,
    pub entities: Vec<NormalizedEntity>,
}

#[derive(Debug, Clone)]
pub struct RelationResolver {
    registry: Arc<SchemaRegistry>,
}

impl RelationResolver {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Plan the fetch of `root` together with `relations`.
    ///
    /// Every relation must be declared on some schema, and its parent must
    /// be the root or the target of another planned relation.
    pub fn plan(&self, root: &SchemaKey, relations: &[RelationKey]) -> Result<FetchPlan, CoreError> {
        let root_schema = self.registry.lookup(root)?;

        let mut pending: Vec<(&RelationKey, SchemaKey, SchemaKey)> = Vec::new();
        let mut seen = BTreeSet::new();
        for key in relations {
            if !seen.insert(key) {
                continue;
            }
            let (parent, target) = self.declaring_schema(key).ok_or_else(|| {
                CoreError::UnknownRelation {
                    schema_key: root.clone(),
                    relation: key.clone(),
                }
            })?;
            pending.push((key, parent, target));
        }

        // Breadth-first: each round admits relations whose parent is
        // already reachable.
        let mut reachable = vec![(root_schema.key.clone(), 0usize)];
        let mut planned = Vec::with_capacity(pending.len());
        let mut depth = 0;
        while !pending.is_empty() {
            let mut admitted = Vec::new();
            let mut deferred = Vec::new();
            for (key, parent, target) in pending {
                let level = reachable
                    .iter()
                    .find(|(schema, _)| *schema == parent)
                    .map(|(_, level)| level + 1);
                match level {
                    Some(level) => {
                        depth = depth.max(level);
                        planned.push(key.clone());
                        admitted.push((target, level));
                    }
                    None => deferred.push((key, parent, target)),
                }
            }
            if admitted.is_empty() {
                if let Some((key, _, _)) = deferred.first() {
                    return Err(CoreError::UnknownRelation {
                        schema_key: root.clone(),
                        relation: (*key).clone(),
                    });
                }
            }
            reachable.extend(admitted);
            pending = deferred;
        }

        Ok(FetchPlan {
            root: root.clone(),
            relations: planned,
            depth,
        })
    }

    /// Split `payload` into records. `fallback_id` names the root when the
    /// payload itself carries no id.
    pub fn normalize(
        &self,
        schema_key: &SchemaKey,
        payload: Value,
        fallback_id: Option<&EntityId>,
    ) -> Result<Normalized, CoreError> {
        let schema = self.registry.lookup(schema_key)?;
        let mut entities = Vec::new();
        let root = self.normalize_into(&schema, payload, fallback_id, &mut entities);
        Ok(Normalized { root, entities })
    }

    fn normalize_into(
        &self,
        schema: &EntitySchema,
        mut payload: Value,
        fallback_id: Option<&EntityId>,
        out: &mut Vec<NormalizedEntity>,
    ) -> Option<EntityId> {
        for relation in &schema.relations {
            // Absent relations were simply not included.
            let Some(nested) = payload.pointer_mut(&relation.field) else {
                continue;
            };
            let Ok(target) = self.registry.lookup(&relation.target) else {
                warn!(relation = %relation.key, "relation target not registered, left inline");
                continue;
            };
            let replaced = match nested.take() {
                object @ Value::Object(_) => self.collapse(&target, object, out),
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::Object(_) => self.collapse(&target, item, out),
                            other => other,
                        })
                        .collect(),
                ),
                other => other,
            };
            *nested = replaced;
        }

        let id = read_id(&payload, &schema.id_pointer).or_else(|| fallback_id.cloned());
        match &id {
            Some(id) => out.push(NormalizedEntity {
                schema_key: schema.key.clone(),
                id: id.clone(),
                payload,
            }),
            None => warn!(schema = %schema.key, pointer = %schema.id_pointer, "payload has no id, dropped"),
        }
        id
    }

    /// Normalize a nested object and return what should stand in its
    /// place: its id, or the object itself if it has none.
    fn collapse(&self, target: &EntitySchema, nested: Value, out: &mut Vec<NormalizedEntity>) -> Value {
        if read_id(&nested, &target.id_pointer).is_none() {
            return nested;
        }
        match self.normalize_into(target, nested, None, out) {
            Some(id) => Value::String(id.to_string()),
            None => Value::Null,
        }
    }

    /// Find the schema declaring `key`: `(parent, target)`.
    fn declaring_schema(&self, key: &RelationKey) -> Option<(SchemaKey, SchemaKey)> {
        self.registry.iter().find_map(|schema| {
            schema
                .relation(key)
                .map(|r| (schema.key.clone(), r.target.clone()))
        })
    }
}

/// Read an id at `pointer`. Numeric ids are accepted as their decimal form.
pub(crate) fn read_id(payload: &Value, pointer: &str) -> Option<EntityId> {
    match payload.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(EntityId::new(s.clone())),
        Value::Number(n) => Some(EntityId::new(n.to_string())),
        _ => None,
    }
}
