// ── Entity monitor ──
//
// Reactive view of one (schema, id) pair. Every stream replays the
// current value first and never completes while the store is alive.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_json::Value;

use crate::action::RequestAction;
use crate::model::{EntityId, RequestInfo, SchemaKey};
use crate::store::NormalizedStore;
use crate::stream::{Watched, distinct_until_changed};

/// A settled entity together with the request state it settled under.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub entity: Arc<Value>,
    pub request_info: RequestInfo,
}

#[derive(Debug, Clone)]
pub struct EntityMonitor {
    store: Arc<NormalizedStore>,
    schema_key: SchemaKey,
    id: EntityId,
    /// Fetch dispatched on subscription while the record is absent.
    fetch: Option<RequestAction>,
}

impl EntityMonitor {
    /// A monitor that never fetches on its own.
    pub fn new(store: Arc<NormalizedStore>, schema_key: SchemaKey, id: EntityId) -> Self {
        Self {
            store,
            schema_key,
            id,
            fetch: None,
        }
    }

    /// Fetch with `action` on subscription whenever the record is absent.
    pub fn with_fetch(mut self, action: RequestAction) -> Self {
        self.fetch = Some(action);
        self
    }

    pub fn schema_key(&self) -> &SchemaKey {
        &self.schema_key
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Every distinct request lifecycle transition for the id, in the
    /// order the store applied them.
    pub fn entity_request(&self) -> BoxStream<'static, RequestInfo> {
        self.ensure_fetched();
        self.request_lifecycle()
    }

    /// Like [`Self::entity_request`] without the initial fetch.
    pub(crate) fn request_lifecycle(&self) -> BoxStream<'static, RequestInfo> {
        let transitions = self.store.request_transitions(&self.schema_key, &self.id);
        distinct_until_changed(transitions.into_stream()).boxed()
    }

    /// The cached record, or `None` while absent.
    pub fn entity(&self) -> BoxStream<'static, Option<Arc<Value>>> {
        self.ensure_fetched();
        let watched = Watched::new(self.store.subscribe_entity(&self.schema_key, &self.id));
        distinct_until_changed(watched.into_stream()).boxed()
    }

    /// The record once present and not being fetched. Holds otherwise.
    pub fn wait_for_entity(&self) -> BoxStream<'static, EntityInfo> {
        self.ensure_fetched();
        let mut info_rx = self.store.subscribe_request(&self.schema_key, &self.id);
        let mut entity_rx = self.store.subscribe_entity(&self.schema_key, &self.id);

        let settled = async_stream::stream! {
            loop {
                let request_info = info_rx.borrow_and_update().clone();
                let entity = entity_rx.borrow_and_update().clone();
                if let (false, Some(entity)) = (request_info.fetching, entity) {
                    yield EntityInfo { entity, request_info };
                }
                tokio::select! {
                    changed = info_rx.changed() => if changed.is_err() { break },
                    changed = entity_rx.changed() => if changed.is_err() { break },
                }
            }
        };
        distinct_until_changed(settled).boxed()
    }

    pub fn is_fetching_entity(&self) -> BoxStream<'static, bool> {
        distinct_until_changed(self.entity_request().map(|info| info.fetching)).boxed()
    }

    pub fn is_deleting_entity(&self) -> BoxStream<'static, bool> {
        distinct_until_changed(self.entity_request().map(|info| info.is_deleting())).boxed()
    }

    pub fn is_creating_entity(&self) -> BoxStream<'static, bool> {
        distinct_until_changed(self.entity_request().map(|info| info.is_creating())).boxed()
    }

    /// Busy flag of any operation, e.g. `"update"` or a custom key.
    pub fn is_updating(&self, operation: &str) -> BoxStream<'static, bool> {
        let operation = operation.to_owned();
        distinct_until_changed(self.entity_request().map(move |info| info.is_busy(&operation)))
            .boxed()
    }

    pub fn current_request(&self) -> RequestInfo {
        self.store.request_info(&self.schema_key, &self.id)
    }

    pub fn current_entity(&self) -> Option<Arc<Value>> {
        self.store.entity(&self.schema_key, &self.id)
    }

    /// Dispatch the bound fetch if the record is absent and nothing is in
    /// flight. Returns whether a fetch was dispatched.
    fn ensure_fetched(&self) -> bool {
        let Some(action) = &self.fetch else {
            return false;
        };
        if self.current_entity().is_some() {
            return false;
        }
        self.store.dispatch_if_idle(action.clone())
    }
}
