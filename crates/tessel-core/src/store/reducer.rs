// ── Reducer ──
//
// Sequential state transitions for every `StoreEvent`. Only called with
// the reducer lock held. Writes use `send_if_modified`, so an event that
// changes nothing wakes nobody, and replaying a success is a no-op.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::data_store::{NormalizedStore, PaginationSlot};
use super::slot::Slot;
use super::event::{ResponseBody, StoreEvent};
use crate::action::RequestTarget;
use crate::model::{
    ActionState, EntityId, OperationKey, PaginationKey, PaginationState, QueryParams, RequestInfo,
    SchemaKey,
};

impl NormalizedStore {
    pub(super) fn reduce(&self, event: StoreEvent) {
        match event {
            StoreEvent::Started(action) => match &action.target {
                RequestTarget::Entity { schema_key, id } => {
                    self.update_request(schema_key, id, |info| {
                        if action.operation.is_fetch() {
                            info.start_fetch();
                        } else {
                            info.updating
                                .insert(action.operation.to_string(), ActionState::busy());
                        }
                    });
                }
                RequestTarget::Pagination {
                    schema_key,
                    pagination_key,
                    page,
                } => {
                    let page = *page;
                    self.update_pagination(
                        pagination_key,
                        || new_state(pagination_key, schema_key, action.params.clone(), page),
                        |state| {
                            state.current_page = page;
                            state.page_request_mut(page).start_fetch();
                        },
                    );
                }
            },

            StoreEvent::Succeeded {
                target,
                operation,
                body,
            } => self.reduce_success(&target, &operation, body),

            StoreEvent::Failed {
                target,
                operation,
                message,
            } => match &target {
                RequestTarget::Entity { schema_key, id } => {
                    self.update_request(schema_key, id, |info| {
                        if operation.is_fetch() {
                            info.fetch_failed(&message);
                        } else {
                            info.updating
                                .insert(operation.to_string(), ActionState::failed(&message));
                        }
                    });
                }
                RequestTarget::Pagination {
                    schema_key,
                    pagination_key,
                    page,
                } => {
                    let page = *page;
                    self.update_pagination(
                        pagination_key,
                        || new_state(pagination_key, schema_key, QueryParams::new(), page),
                        |state| state.page_request_mut(page).fetch_failed(&message),
                    );
                }
            },

            StoreEvent::ClearError { target } => match &target {
                RequestTarget::Entity { schema_key, id } => {
                    self.update_request(schema_key, id, RequestInfo::clear_error);
                }
                RequestTarget::Pagination {
                    pagination_key,
                    page,
                    ..
                } => {
                    if let Some(slot) = self.paginations.get(pagination_key) {
                        modify_pagination(&slot, |state| {
                            if let Some(info) = state.page_requests.get_mut(page) {
                                info.clear_error();
                            }
                        });
                    }
                }
            },

            StoreEvent::Invalidate { schema_key, id } => {
                self.collection(&schema_key).remove(&id);
                self.update_request(&schema_key, &id, |info| {
                    let fetching = info.fetching;
                    *info = RequestInfo::default();
                    info.fetching = fetching;
                });
            }

            StoreEvent::SelectPage { key, page } => {
                if let Some(slot) = self.paginations.get(&key) {
                    modify_pagination(&slot, |state| state.current_page = page);
                }
            }
        }
    }

    fn reduce_success(&self, target: &RequestTarget, operation: &OperationKey, body: ResponseBody) {
        match target {
            RequestTarget::Entity { schema_key, id } => {
                if operation.is_fetch() {
                    self.store_body(schema_key, id, body);
                    self.update_request(schema_key, id, RequestInfo::fetch_succeeded);
                } else if *operation == OperationKey::Remove {
                    self.collection(schema_key).remove(id);
                    self.update_request(schema_key, id, |info| {
                        info.updating.insert(operation.to_string(), ActionState::default());
                        info.deleted = true;
                    });
                } else {
                    self.store_body(schema_key, id, body);
                    self.update_request(schema_key, id, |info| {
                        info.updating.insert(operation.to_string(), ActionState::default());
                    });
                }
            }
            RequestTarget::Pagination {
                schema_key,
                pagination_key,
                page,
            } => {
                let (items, total_results, total_pages) = match body {
                    ResponseBody::Page {
                        entities,
                        total_results,
                        total_pages,
                    } => (entities, total_results, total_pages),
                    ResponseBody::Entity(Value::Array(items)) => (items, None, None),
                    ResponseBody::Entity(other) => (vec![other], None, None),
                    ResponseBody::Empty => (Vec::new(), None, None),
                };
                let ids: Vec<EntityId> = items
                    .into_iter()
                    .filter_map(|item| self.store_payload(schema_key, item, None))
                    .collect();

                let page = *page;
                self.update_pagination(
                    pagination_key,
                    || new_state(pagination_key, schema_key, QueryParams::new(), page),
                    |state| {
                        state.pages.insert(page, ids);
                        if total_results.is_some() {
                            state.total_results = total_results;
                        }
                        if total_pages.is_some() {
                            state.total_pages = total_pages;
                        }
                        state.page_request_mut(page).fetch_succeeded();
                    },
                );
            }
        }
    }

    /// Store whatever an entity-targeted response carried.
    fn store_body(&self, schema_key: &SchemaKey, id: &EntityId, body: ResponseBody) {
        match body {
            ResponseBody::Entity(payload) => {
                self.store_payload(schema_key, payload, Some(id));
            }
            ResponseBody::Page { entities, .. } => {
                for payload in entities {
                    self.store_payload(schema_key, payload, None);
                }
            }
            ResponseBody::Empty => {}
        }
    }

    /// Normalize one payload and upsert every record in it. Returns the
    /// root id.
    fn store_payload(
        &self,
        schema_key: &SchemaKey,
        payload: Value,
        fallback_id: Option<&EntityId>,
    ) -> Option<EntityId> {
        let normalized = match self.resolver.normalize(schema_key, payload, fallback_id) {
            Ok(normalized) => normalized,
            Err(err) => {
                warn!(schema = %schema_key, error = %err, "cannot normalize payload");
                return None;
            }
        };
        for entity in normalized.entities {
            self.collection(&entity.schema_key)
                .upsert(entity.id, entity.payload);
        }
        normalized.root
    }

    fn update_request(&self, schema_key: &SchemaKey, id: &EntityId, f: impl FnOnce(&mut RequestInfo)) {
        self.requests
            .entry((schema_key.clone(), id.clone()))
            .or_insert_with(|| Slot::new(RequestInfo::default()))
            .send_if_modified(|info| {
                let before = info.clone();
                f(info);
                *info != before
            });
    }

    fn update_pagination(
        &self,
        key: &PaginationKey,
        init: impl FnOnce() -> PaginationState,
        f: impl FnOnce(&mut PaginationState),
    ) {
        let slot = self
            .paginations
            .entry(key.clone())
            .or_insert_with(|| Slot::new(None));
        slot.send_if_modified(|current| {
            let mut state = current.as_deref().cloned().unwrap_or_else(init);
            f(&mut state);
            if current.as_deref() == Some(&state) {
                return false;
            }
            *current = Some(Arc::new(state));
            true
        });
    }
}

/// Modify an existing pagination state; absent states stay absent.
fn modify_pagination(slot: &PaginationSlot, f: impl FnOnce(&mut PaginationState)) {
    slot.send_if_modified(|current| {
        let Some(existing) = current.as_deref() else {
            return false;
        };
        let mut state = existing.clone();
        f(&mut state);
        if state == *existing {
            return false;
        }
        *current = Some(Arc::new(state));
        true
    });
}

fn new_state(key: &PaginationKey, schema_key: &SchemaKey, params: QueryParams, page: u32) -> PaginationState {
    PaginationState::new(key.clone(), schema_key.clone(), params, page)
}
