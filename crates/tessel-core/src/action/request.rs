// ── Dispatchable request descriptors ──

use serde::Serialize;
use serde_json::Value;

use crate::model::{
    EndpointId, EntityId, HttpMethod, OperationKey, PaginationKey, QueryParams, RelationKey,
    SchemaKey,
};

/// What a request writes into once it completes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "target_kind", rename_all = "snake_case")]
pub enum RequestTarget {
    Entity {
        schema_key: SchemaKey,
        id: EntityId,
    },
    Pagination {
        schema_key: SchemaKey,
        pagination_key: PaginationKey,
        page: u32,
    },
}

impl RequestTarget {
    pub fn schema_key(&self) -> &SchemaKey {
        match self {
            Self::Entity { schema_key, .. } | Self::Pagination { schema_key, .. } => schema_key,
        }
    }

    pub fn is_pagination(&self) -> bool {
        matches!(self, Self::Pagination { .. })
    }
}

/// The concrete unit handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestAction {
    pub target: RequestTarget,
    pub operation: OperationKey,
    pub entity_type: String,
    pub endpoint_type: String,
    pub endpoint_id: EndpointId,
    /// Rendered path, relative to the API base URL.
    pub url: String,
    pub http_method: HttpMethod,
    /// Relation expansions the response is expected to include.
    pub relations: Vec<RelationKey>,
    pub params: QueryParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub external: bool,
    /// Flatten mode for monitors opened from this action.
    pub flatten_pagination: bool,
}

impl RequestAction {
    pub fn is_pagination(&self) -> bool {
        self.target.is_pagination()
    }

    pub fn schema_key(&self) -> &SchemaKey {
        self.target.schema_key()
    }

    pub fn entity_id(&self) -> Option<&EntityId> {
        match &self.target {
            RequestTarget::Entity { id, .. } => Some(id),
            RequestTarget::Pagination { .. } => None,
        }
    }

    pub fn pagination_key(&self) -> Option<&PaginationKey> {
        match &self.target {
            RequestTarget::Pagination { pagination_key, .. } => Some(pagination_key),
            RequestTarget::Entity { .. } => None,
        }
    }

    pub fn page(&self) -> Option<u32> {
        match &self.target {
            RequestTarget::Pagination { page, .. } => Some(*page),
            RequestTarget::Entity { .. } => None,
        }
    }

    /// The same paged request, retargeted at another page.
    ///
    /// Entity actions are returned unchanged.
    pub fn for_page(&self, page: u32) -> Self {
        let mut action = self.clone();
        if let RequestTarget::Pagination { page: p, .. } = &mut action.target {
            *p = page;
        }
        action
    }
}

/// Optional per-call arguments forwarded to a builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMeta {
    pub params: QueryParams,
    pub relations: Vec<RelationKey>,
    pub body: Option<Value>,
    /// Overrides the pagination key base when the config has none.
    pub pagination_key: Option<String>,
    /// Relation path of a child listing, e.g. `application-route` for
    /// the routes of one application.
    pub relation_path: Option<RelationKey>,
    pub page: Option<u32>,
    pub flatten: Option<bool>,
}

/// Arguments of one builder call.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionArgs {
    /// Entity id; required for entity targets, parent id for child
    /// listings.
    pub id: Option<EntityId>,
    pub endpoint_id: EndpointId,
    pub meta: RequestMeta,
}

impl ActionArgs {
    /// Arguments targeting one entity.
    pub fn entity(id: impl Into<EntityId>, endpoint_id: impl Into<EndpointId>) -> Self {
        Self {
            id: Some(id.into()),
            endpoint_id: endpoint_id.into(),
            meta: RequestMeta::default(),
        }
    }

    /// Arguments targeting a collection.
    pub fn collection(endpoint_id: impl Into<EndpointId>) -> Self {
        Self {
            id: None,
            endpoint_id: endpoint_id.into(),
            meta: RequestMeta::default(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.params.insert(key.into(), value.into());
        self
    }

    pub fn include(mut self, relation: impl Into<RelationKey>) -> Self {
        self.meta.relations.push(relation.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.meta.body = Some(body);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.meta.page = Some(page);
        self
    }

    pub fn flatten(mut self, flatten: bool) -> Self {
        self.meta.flatten = Some(flatten);
        self
    }

    pub fn pagination_key(mut self, key: impl Into<String>) -> Self {
        self.meta.pagination_key = Some(key.into());
        self
    }

    pub fn relation_path(mut self, relation: impl Into<RelationKey>) -> Self {
        self.meta.relation_path = Some(relation.into());
        self
    }
}
