//! Normalized entity cache between `tessel-api` and its consumers.
//!
//! This crate owns the request/response cache of the tessel console:
//!
//! - **[`NormalizedStore`]**: one record per `(schema, id)`, one
//!   [`RequestInfo`] per entity id or page, one [`PaginationState`] per
//!   pagination key. Everything lives in `DashMap`s of
//!   `tokio::sync::watch` slots; request and pagination slots also
//!   broadcast each change so lifecycle streams miss no transition.
//!   Every write goes through a single sequential reducer driven by
//!   [`StoreEvent`]s.
//!
//! - **Action builders** ([`action`]): declarative per-operation configs
//!   ([`ActionBuilderConfig`]) become [`ActionBuilder`]s producing
//!   [`RequestAction`]s, and [`ActionDispatcher`]s that dispatch and then
//!   observe the request lifecycle.
//!
//! - **Monitors** ([`monitor`]): [`EntityMonitor`] and
//!   [`PaginationMonitor`] expose replaying streams of cached state and
//!   trigger deduplicated fetches on first subscription.
//!
//! - **[`RelationResolver`]**: plans relation expansions before a request
//!   and splits nested payloads into their own records after it.
//!
//! - **[`Orchestrator`]**: drains the dispatch channel, runs each action
//!   through a [`Transport`] (e.g. [`HttpTransport`]) and reports the
//!   terminal event back into the store.

pub mod action;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod monitor;
pub mod orchestrator;
pub mod relation;
pub mod schema;
pub mod store;
pub mod stream;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::{
    ActionArgs, ActionBuilder, ActionBuilderConfig, ActionDispatcher, ActionKind, EntityInstance,
    RequestAction, RequestMeta, RequestTarget, UrlTemplate, build_action_builders,
    build_action_dispatcher, build_entity_instances, resolve_http_method,
};
pub use catalog::{EntityCatalog, EntityCatalogEntry, EntityDefinition, EntityMonitorOptions};
pub use config::OrchestratorConfig;
pub use error::CoreError;
pub use model::{
    ActionState, EndpointId, EntityId, EntityRecord, HttpMethod, OperationKey, PaginationKey,
    PaginationState, QueryParams, RelationKey, RequestInfo, SchemaKey,
};
pub use monitor::{
    EntityInfo, EntityMonitor, PaginationMonitor, PaginationMonitorFactory, PaginationObservables,
};
pub use orchestrator::{Orchestrator, OrchestratorState, Transport};
pub use relation::{FetchPlan, RelationResolver};
pub use schema::{EntitySchema, Relation, SchemaRegistry};
pub use store::{DISPATCH_CLOSED, NormalizedStore, ResponseBody, StoreEvent, StoreSnapshot};
pub use stream::{Transitions, Watched};
pub use transport::{ENDPOINT_HEADER, HttpTransport};
