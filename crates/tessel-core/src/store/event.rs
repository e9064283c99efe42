// ── Reducer input ──
//
// The closed set of things that can change the store. `Started` comes
// from dispatch; terminal events come back from the transport.

use serde_json::Value;

use crate::action::{RequestAction, RequestTarget};
use crate::model::{EntityId, OperationKey, PaginationKey, SchemaKey};

/// Decoded response payload handed back by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// A single entity, possibly with nested relations.
    Entity(Value),
    /// One page of a collection.
    Page {
        entities: Vec<Value>,
        total_results: Option<u64>,
        total_pages: Option<u32>,
    },
    /// No content (e.g. `204` after a delete).
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Started(RequestAction),
    Succeeded {
        target: RequestTarget,
        operation: OperationKey,
        body: ResponseBody,
    },
    Failed {
        target: RequestTarget,
        operation: OperationKey,
        message: String,
    },
    /// Explicit clearing of a surfaced error.
    ClearError { target: RequestTarget },
    /// Drop a cached record so the next monitor subscription refetches it.
    Invalidate { schema_key: SchemaKey, id: EntityId },
    /// Navigate to a page without fetching it.
    SelectPage { key: PaginationKey, page: u32 },
}

impl StoreEvent {
    pub fn succeeded(action: &RequestAction, body: ResponseBody) -> Self {
        Self::Succeeded {
            target: action.target.clone(),
            operation: action.operation.clone(),
            body,
        }
    }

    pub fn failed(action: &RequestAction, message: impl Into<String>) -> Self {
        Self::Failed {
            target: action.target.clone(),
            operation: action.operation.clone(),
            message: message.into(),
        }
    }

    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started(_) => "started",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::ClearError { .. } => "clear_error",
            Self::Invalidate { .. } => "invalidate",
            Self::SelectPage { .. } => "select_page",
        }
    }
}
