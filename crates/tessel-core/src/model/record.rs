use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::entity_id::{EntityId, SchemaKey};

/// One normalized record, as read back out of the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub schema_key: SchemaKey,
    pub id: EntityId,
    pub payload: Arc<Value>,
}
