// ── Cache data model ──
//
// Identity newtypes, request lifecycle records, pagination state, stored
// records and the operation vocabulary shared by every other module.

pub mod entity_id;
pub mod operation;
pub mod pagination;
pub mod record;
pub mod request;

pub use entity_id::{
    EndpointId, EntityId, PaginationKey, QueryParams, RelationKey, SchemaKey, params_hash,
};
pub use operation::{HttpMethod, OperationKey};
pub use pagination::PaginationState;
pub use record::EntityRecord;
pub use request::{
    ActionState, CREATE_UPDATING_KEY, DELETE_UPDATING_KEY, RequestInfo, UPDATE_UPDATING_KEY,
};
