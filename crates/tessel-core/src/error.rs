// ── Core error types ──
//
// Integration errors only: wiring defects between builders, schemas and
// their configuration. Remote failures never surface here; they are
// recorded on the request's `RequestInfo` instead. The
// `From<tessel_api::Error>` impl exists for the transport adapter, which
// flattens API errors into a message before they reach the store.

use thiserror::Error;

use crate::model::{OperationKey, RelationKey, SchemaKey};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Registration / wiring errors ─────────────────────────────────
    #[error("Unknown schema: {schema_key}")]
    UnknownSchema { schema_key: SchemaKey },

    #[error("Schema already registered: {schema_key}")]
    DuplicateSchema { schema_key: SchemaKey },

    #[error("Unknown relation {relation} (from schema {schema_key})")]
    UnknownRelation {
        schema_key: SchemaKey,
        relation: RelationKey,
    },

    #[error("Unknown entity type: {entity_type}")]
    UnknownEntityType { entity_type: String },

    #[error("Entity type already registered: {entity_type}")]
    DuplicateEntityType { entity_type: String },

    #[error("`{operation}` action is not of type pagination")]
    NotPagination { operation: OperationKey },

    #[error("`{operation}` action is not of type entity")]
    NotEntity { operation: OperationKey },

    #[error("No builder registered for operation `{operation}`")]
    UnknownOperation { operation: OperationKey },

    #[error("Custom operation `{operation}` must declare an explicit HTTP method")]
    MissingHttpMethod { operation: OperationKey },

    #[error("`{operation}` requires an entity id")]
    MissingEntityId { operation: OperationKey },

    #[error("Fetching `{entity_type}` requires an endpoint id")]
    MissingEndpoint { entity_type: String },

    #[error("Invalid URL template `{template}`: {reason}")]
    UrlTemplate { template: String, reason: String },

    // ── Runtime plumbing ─────────────────────────────────────────────
    #[error("Orchestrator already started")]
    AlreadyStarted,

    #[error("Transport error: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tessel_api::Error> for CoreError {
    fn from(err: tessel_api::Error) -> Self {
        match err {
            tessel_api::Error::Api {
                status, message, ..
            } => CoreError::Transport {
                message,
                status: Some(status),
            },
            tessel_api::Error::Timeout { url } => CoreError::Transport {
                message: format!("request to {url} timed out"),
                status: None,
            },
            other => CoreError::Transport {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
