#![allow(dead_code, clippy::unwrap_used)]
// Shared fixtures for the cache integration tests.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use tessel_core::{
    ActionArgs, ActionBuilderConfig, EntityCatalogEntry, EntityDefinition, EntityMonitorOptions,
    EntitySchema, HttpMethod, NormalizedStore, RequestAction, SchemaRegistry,
};

pub const ENDPOINT: &str = "ep-1";

pub fn registry() -> Arc<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry
        .register(
            EntitySchema::new("application")
                .with_id_pointer("/metadata/guid")
                .with_relation("route", "/entity/routes"),
        )
        .unwrap();
    registry
        .register(EntitySchema::new("route").with_id_pointer("/metadata/guid"))
        .unwrap();
    registry.validate().unwrap();
    Arc::new(registry)
}

pub fn application_definition() -> EntityDefinition {
    EntityDefinition::new("application", "cf", "application")
        .operation("get", ActionBuilderConfig::entity("application", "apps/{id}"))
        .operation("getMultiple", ActionBuilderConfig::pagination("application", "apps"))
        .operation("update", ActionBuilderConfig::entity("application", "apps/{id}"))
        .operation("remove", ActionBuilderConfig::entity("application", "apps/{id}"))
        .operation(
            "restage",
            ActionBuilderConfig::entity("application", "apps/{id}/restage")
                .with_method(HttpMethod::Post),
        )
        .operation(
            "routes",
            ActionBuilderConfig::pagination("route", "apps/{id}/routes"),
        )
}

/// A store with the application entity type registered, and the
/// dispatch channel in the test's hands.
pub struct Fixture {
    pub store: Arc<NormalizedStore>,
    pub apps: Arc<EntityCatalogEntry>,
    pub actions: mpsc::UnboundedReceiver<RequestAction>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(NormalizedStore::new(registry()));
        let actions = store.take_action_receiver().unwrap();
        let apps = EntityCatalogEntry::new(Arc::clone(&store), application_definition()).unwrap();
        Self {
            store,
            apps,
            actions,
        }
    }

    /// Every action dispatched so far.
    pub fn drain(&mut self) -> Vec<RequestAction> {
        let mut out = Vec::new();
        while let Ok(action) = self.actions.try_recv() {
            out.push(action);
        }
        out
    }
}

pub fn fetching(endpoint: &str) -> EntityMonitorOptions {
    EntityMonitorOptions {
        start_fetch: true,
        endpoint_id: Some(endpoint.into()),
        ..EntityMonitorOptions::default()
    }
}

pub fn list_args() -> ActionArgs {
    ActionArgs::collection(ENDPOINT)
}

pub fn app(id: &str, name: &str) -> Value {
    json!({ "metadata": { "guid": id }, "entity": { "name": name } })
}

pub fn apps(ids: &[&str]) -> Vec<Value> {
    ids.iter().map(|id| app(id, id)).collect()
}

/// Next item, failing the test if nothing arrives.
pub async fn next<S: Stream + Unpin>(stream: &mut S) -> S::Item {
    tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("stream emitted nothing")
        .expect("stream ended")
}

/// Whether the stream stays silent for a while.
pub async fn stays_silent<S: Stream + Unpin>(stream: &mut S) -> bool {
    tokio::time::timeout(Duration::from_millis(200), stream.next())
        .await
        .is_err()
}
