// ── Pagination monitor ──
//
// Reactive view of one pagination key. Flatten mode is fixed at
// construction: either the current page alone, or every fetched page
// concatenated in page order.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use crate::action::RequestAction;
use crate::error::CoreError;
use crate::model::{EntityId, EntityRecord, PaginationKey, PaginationState, RequestInfo, SchemaKey};
use crate::store::{NormalizedStore, StoreEvent};
use crate::stream::distinct_until_changed;

#[derive(Debug, Clone)]
pub struct PaginationMonitor {
    store: Arc<NormalizedStore>,
    key: PaginationKey,
    schema_key: SchemaKey,
    /// Template for every page fetch; retargeted per page.
    action: RequestAction,
    flatten: bool,
}

impl PaginationMonitor {
    /// Monitor the query `action` targets. Entity actions are rejected.
    pub fn new(store: Arc<NormalizedStore>, action: RequestAction, flatten: bool) -> Result<Self, CoreError> {
        let key = action
            .pagination_key()
            .cloned()
            .ok_or_else(|| CoreError::NotPagination {
                operation: action.operation.clone(),
            })?;
        Ok(Self {
            store,
            key,
            schema_key: action.schema_key().clone(),
            action,
            flatten,
        })
    }

    /// The same monitor with its first fetch aimed at `page`.
    pub(crate) fn retargeted(&self, page: u32) -> Self {
        Self {
            action: self.action.for_page(page),
            ..self.clone()
        }
    }

    pub fn pagination_key(&self) -> &PaginationKey {
        &self.key
    }

    pub fn schema_key(&self) -> &SchemaKey {
        &self.schema_key
    }

    pub fn is_flatten(&self) -> bool {
        self.flatten
    }

    /// Raw pagination state, `None` until the first dispatch. Never
    /// fetches. Every state the reducer produced is delivered.
    pub fn pagination(&self) -> BoxStream<'static, Option<Arc<PaginationState>>> {
        let transitions = self.store.pagination_transitions(&self.key);
        distinct_until_changed(transitions.into_stream()).boxed()
    }

    /// Records of the current page (or of every fetched page in flatten
    /// mode). Fetches the initial page on subscription if uncached.
    ///
    /// Holds while the selected page has not been fetched. Re-emits when
    /// a record on the page changes.
    pub fn current_page(&self) -> BoxStream<'static, Vec<EntityRecord>> {
        self.ensure_initial_fetch();
        let store = Arc::clone(&self.store);
        let schema_key = self.schema_key.clone();
        let flatten = self.flatten;
        let mut pagination_rx = self.store.subscribe_pagination(&self.key);
        let mut records_rx = self.store.subscribe_schema_version(&self.schema_key);

        let records = async_stream::stream! {
            loop {
                let state = pagination_rx.borrow_and_update().clone();
                records_rx.mark_unchanged();
                if let Some(ids) = state.as_deref().and_then(|s| visible_ids(s, flatten)) {
                    yield store.records(&schema_key, &ids);
                }
                tokio::select! {
                    changed = pagination_rx.changed() => if changed.is_err() { break },
                    changed = records_rx.changed() => if changed.is_err() { break },
                }
            }
        };
        distinct_until_changed(records).boxed()
    }

    /// Ids only, without resolving records.
    pub fn current_page_ids(&self) -> BoxStream<'static, Vec<EntityId>> {
        self.ensure_initial_fetch();
        let flatten = self.flatten;
        let ids = self
            .pagination()
            .filter_map(move |state| {
                futures_util::future::ready(state.as_deref().and_then(|s| visible_ids(s, flatten)))
            });
        distinct_until_changed(ids).boxed()
    }

    /// Request lifecycle of the currently selected page.
    pub fn current_page_request_info(&self) -> BoxStream<'static, RequestInfo> {
        let infos = self.pagination().map(|state| {
            state
                .map(|s| s.current_page_request_info())
                .unwrap_or_default()
        });
        distinct_until_changed(infos).boxed()
    }

    pub fn snapshot(&self) -> Option<Arc<PaginationState>> {
        self.store.pagination(&self.key)
    }

    /// Select page `page`, fetching it only if it is not cached.
    /// Returns whether a fetch was dispatched.
    pub fn fetch_page(&self, page: u32) -> bool {
        let page = page.max(1);
        match self.snapshot() {
            Some(state) if state.has_page(page) => {
                self.store.apply(StoreEvent::SelectPage {
                    key: self.key.clone(),
                    page,
                });
                false
            }
            _ => self.store.dispatch_if_idle(self.action.for_page(page)),
        }
    }

    /// Fetch the page after the highest one fetched so far, if the
    /// server reported more.
    pub fn load_next_page(&self) -> bool {
        let Some(state) = self.snapshot() else {
            return self.ensure_initial_fetch();
        };
        if !state.has_more_pages() {
            return false;
        }
        let next = state.pages.keys().next_back().map_or(1, |highest| highest + 1);
        self.fetch_page(next)
    }

    /// Dispatch the first fetch if no state exists yet for the key, or if
    /// the selected page is neither cached nor being fetched.
    fn ensure_initial_fetch(&self) -> bool {
        match self.snapshot() {
            None => self.store.dispatch_if_idle(self.action.clone()),
            Some(state) if !state.has_page(state.current_page) && !state.is_fetching() => {
                let info = state.current_page_request_info();
                // A failed page waits for an explicit retry.
                if info.error {
                    return false;
                }
                self.store
                    .dispatch_if_idle(self.action.for_page(state.current_page))
            }
            Some(_) => false,
        }
    }
}

fn visible_ids(state: &PaginationState, flatten: bool) -> Option<Vec<EntityId>> {
    if flatten {
        (!state.pages.is_empty()).then(|| state.ids_in_order())
    } else {
        state.current_page_ids().map(<[EntityId]>::to_vec)
    }
}
