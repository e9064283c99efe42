// ── Normalized store ──
//
// The single shared mutable resource of the cache. Reads are lock-free
// lookups into `DashMap`s of watch slots; every write goes through the
// reducer, which applies one event at a time.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::stream::BoxStream;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use super::collection::EntityCollection;
use super::event::StoreEvent;
use super::slot::Slot;
use crate::action::{RequestAction, RequestTarget};
use crate::model::{EntityId, EntityRecord, PaginationKey, PaginationState, RequestInfo, SchemaKey};
use crate::relation::RelationResolver;
use crate::schema::SchemaRegistry;
use crate::stream::Transitions;

/// Failure recorded for actions nobody is left to execute.
pub const DISPATCH_CLOSED: &str = "dispatch channel closed";

pub(super) type RequestSlot = Slot<RequestInfo>;
pub(super) type PaginationSlot = Slot<Option<Arc<PaginationState>>>;

/// Value-comparable copy of everything the store holds.
///
/// Timestamps and subscription bookkeeping are left out, so two stores
/// that saw the same effective events compare equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub entities: BTreeMap<SchemaKey, BTreeMap<EntityId, Value>>,
    /// Non-idle request records only.
    pub requests: BTreeMap<SchemaKey, BTreeMap<EntityId, RequestInfo>>,
    pub paginations: BTreeMap<PaginationKey, PaginationState>,
}

/// Normalized entity cache with per-key request lifecycle.
///
/// Construct one per application (or per test). Share it behind an
/// `Arc`; all methods take `&self`.
pub struct NormalizedStore {
    pub(super) resolver: RelationResolver,
    pub(super) collections: DashMap<SchemaKey, Arc<EntityCollection>>,
    pub(super) requests: DashMap<(SchemaKey, EntityId), RequestSlot>,
    pub(super) paginations: DashMap<PaginationKey, PaginationSlot>,
    /// Serializes reducer application.
    reducer: Mutex<()>,
    /// Bumped after every applied event.
    version: watch::Sender<u64>,
    last_applied: watch::Sender<Option<DateTime<Utc>>>,
    actions: mpsc::UnboundedSender<RequestAction>,
    action_rx: Mutex<Option<mpsc::UnboundedReceiver<RequestAction>>>,
}

impl NormalizedStore {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        let (actions, rx) = mpsc::unbounded_channel();
        let (version, _) = watch::channel(0u64);
        let (last_applied, _) = watch::channel(None);
        Self {
            resolver: RelationResolver::new(registry),
            collections: DashMap::new(),
            requests: DashMap::new(),
            paginations: DashMap::new(),
            reducer: Mutex::new(()),
            version,
            last_applied,
            actions,
            action_rx: Mutex::new(Some(rx)),
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        self.resolver.registry()
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Record the start of `action` and hand it to the transport.
    pub fn dispatch(&self, action: RequestAction) {
        {
            let _guard = self.lock_reducer();
            self.apply_locked(StoreEvent::Started(action.clone()));
        }
        self.forward(action);
    }

    /// Dispatch `action` only if nothing is outstanding for its key.
    ///
    /// The check and the `Started` transition happen under the reducer
    /// lock, so concurrent callers collapse to a single dispatch.
    pub fn dispatch_if_idle(&self, action: RequestAction) -> bool {
        {
            let _guard = self.lock_reducer();
            if !self.is_idle(&action) {
                debug!(
                    operation = %action.operation,
                    schema = %action.schema_key(),
                    "request already in flight, not dispatching"
                );
                return false;
            }
            self.apply_locked(StoreEvent::Started(action.clone()));
        }
        self.forward(action);
        true
    }

    /// Apply one event through the reducer.
    pub fn apply(&self, event: StoreEvent) {
        let _guard = self.lock_reducer();
        self.apply_locked(event);
    }

    /// Take the dispatch channel. Only the first caller gets it.
    pub fn take_action_receiver(&self) -> Option<mpsc::UnboundedReceiver<RequestAction>> {
        self.action_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    // ── Point-in-time reads ──────────────────────────────────────────

    pub fn entity(&self, schema_key: &SchemaKey, id: &EntityId) -> Option<Arc<Value>> {
        self.collections.get(schema_key)?.get(id)
    }

    /// Records for `ids`, in order. Ids with no record are skipped.
    pub fn records(&self, schema_key: &SchemaKey, ids: &[EntityId]) -> Vec<EntityRecord> {
        let Some(collection) = self.collections.get(schema_key).map(|c| Arc::clone(&c)) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| {
                collection.get(id).map(|payload| EntityRecord {
                    schema_key: schema_key.clone(),
                    id: id.clone(),
                    payload,
                })
            })
            .collect()
    }

    pub fn request_info(&self, schema_key: &SchemaKey, id: &EntityId) -> RequestInfo {
        self.requests
            .get(&(schema_key.clone(), id.clone()))
            .map(|slot| slot.borrow().clone())
            .unwrap_or_default()
    }

    /// Request lifecycle of any target. For pages this is the page's own
    /// record.
    pub fn target_request_info(&self, target: &RequestTarget) -> RequestInfo {
        match target {
            RequestTarget::Entity { schema_key, id } => self.request_info(schema_key, id),
            RequestTarget::Pagination {
                pagination_key,
                page,
                ..
            } => self
                .pagination(pagination_key)
                .and_then(|state| state.page_requests.get(page).cloned())
                .unwrap_or_default(),
        }
    }

    pub fn pagination(&self, key: &PaginationKey) -> Option<Arc<PaginationState>> {
        self.paginations.get(key).and_then(|slot| slot.borrow().clone())
    }

    pub fn last_applied(&self) -> Option<DateTime<Utc>> {
        *self.last_applied.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_entity(
        &self,
        schema_key: &SchemaKey,
        id: &EntityId,
    ) -> watch::Receiver<Option<Arc<Value>>> {
        self.collection(schema_key).subscribe(id)
    }

    /// Latest request state only; intermediate values may be skipped.
    pub fn subscribe_request(&self, schema_key: &SchemaKey, id: &EntityId) -> watch::Receiver<RequestInfo> {
        self.requests
            .entry((schema_key.clone(), id.clone()))
            .or_insert_with(|| Slot::new(RequestInfo::default()))
            .subscribe()
    }

    /// Every request state the key goes through, starting with the
    /// current one.
    pub fn request_transitions(&self, schema_key: &SchemaKey, id: &EntityId) -> Transitions<RequestInfo> {
        // `entry` holds the shard write lock, which excludes the reducer.
        self.requests
            .entry((schema_key.clone(), id.clone()))
            .or_insert_with(|| Slot::new(RequestInfo::default()))
            .transitions()
    }

    pub fn subscribe_pagination(&self, key: &PaginationKey) -> watch::Receiver<Option<Arc<PaginationState>>> {
        self.paginations
            .entry(key.clone())
            .or_insert_with(|| Slot::new(None))
            .subscribe()
    }

    pub fn pagination_transitions(&self, key: &PaginationKey) -> Transitions<Option<Arc<PaginationState>>> {
        self.paginations
            .entry(key.clone())
            .or_insert_with(|| Slot::new(None))
            .transitions()
    }

    /// Version counter of one schema's records.
    pub fn subscribe_schema_version(&self, schema_key: &SchemaKey) -> watch::Receiver<u64> {
        self.collection(schema_key).subscribe_version()
    }

    /// Store-wide version counter, bumped after every applied event.
    pub fn subscribe_version(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Distinct values of `selector`, re-evaluated after every applied
    /// event. The current value is yielded first.
    pub fn select<T, F>(self: &Arc<Self>, selector: F) -> BoxStream<'static, T>
    where
        F: Fn(&NormalizedStore) -> T + Send + 'static,
        T: Clone + PartialEq + Send + 'static,
    {
        let store = Arc::clone(self);
        let mut version = self.version.subscribe();
        Box::pin(async_stream::stream! {
            let mut last: Option<T> = None;
            loop {
                version.mark_unchanged();
                let value = selector(&store);
                if last.as_ref() != Some(&value) {
                    last = Some(value.clone());
                    yield value;
                }
                if version.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let entities = self
            .collections
            .iter()
            .filter_map(|c| {
                let records = c.value().snapshot();
                (!records.is_empty()).then(|| (c.key().clone(), records))
            })
            .collect();

        let mut requests: BTreeMap<SchemaKey, BTreeMap<EntityId, RequestInfo>> = BTreeMap::new();
        for slot in &self.requests {
            let info = slot.value().borrow().clone();
            if info != RequestInfo::default() {
                let (schema_key, id) = slot.key().clone();
                requests.entry(schema_key).or_default().insert(id, info);
            }
        }

        let paginations = self
            .paginations
            .iter()
            .filter_map(|slot| {
                let state = slot.value().borrow().clone()?;
                Some((slot.key().clone(), (*state).clone()))
            })
            .collect();

        StoreSnapshot {
            entities,
            requests,
            paginations,
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    pub(super) fn collection(&self, schema_key: &SchemaKey) -> Arc<EntityCollection> {
        Arc::clone(
            &self
                .collections
                .entry(schema_key.clone())
                .or_insert_with(|| Arc::new(EntityCollection::new())),
        )
    }

    fn lock_reducer(&self) -> std::sync::MutexGuard<'_, ()> {
        self.reducer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Caller must hold the reducer lock.
    fn apply_locked(&self, event: StoreEvent) {
        debug!(event = event.kind(), "applying store event");
        self.reduce(event);
        self.version.send_modify(|v| *v += 1);
        self.last_applied.send_replace(Some(Utc::now()));
    }

    /// Whether `action` may start without duplicating outstanding work.
    fn is_idle(&self, action: &RequestAction) -> bool {
        match &action.target {
            RequestTarget::Entity { schema_key, id } => {
                let info = self.request_info(schema_key, id);
                if action.operation.is_fetch() {
                    !info.fetching
                } else {
                    !info.is_busy(action.operation.as_str())
                }
            }
            RequestTarget::Pagination { pagination_key, .. } => self
                .pagination(pagination_key)
                .is_none_or(|state| !state.is_fetching()),
        }
    }

    /// Hand `action` to the transport. If the receiving side is gone the
    /// action fails at once, so its key never stays marked in flight.
    fn forward(&self, action: RequestAction) {
        debug!(
            operation = %action.operation,
            schema = %action.schema_key(),
            url = %action.url,
            "dispatching request"
        );
        if let Err(mpsc::error::SendError(action)) = self.actions.send(action) {
            self.reject(&action);
        }
    }

    /// Record `action` as failed because it will never be executed.
    pub(crate) fn reject(&self, action: &RequestAction) {
        warn!(
            operation = %action.operation,
            schema = %action.schema_key(),
            "dispatch channel closed, request failed"
        );
        self.apply(StoreEvent::failed(action, DISPATCH_CLOSED));
    }
}

impl fmt::Debug for NormalizedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedStore")
            .field("schemas", &self.collections.len())
            .field("requests", &self.requests.len())
            .field("paginations", &self.paginations.len())
            .field("version", &*self.version.borrow())
            .finish_non_exhaustive()
    }
}
