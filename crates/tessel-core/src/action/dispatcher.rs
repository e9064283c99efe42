use std::sync::Arc;

use futures_util::stream::BoxStream;
use tracing::debug;

use super::builder::ActionBuilder;
use super::request::{ActionArgs, RequestTarget};
use crate::catalog::{EntityCatalogEntry, EntityMonitorOptions};
use crate::error::CoreError;
use crate::model::{OperationKey, RequestInfo};
use crate::monitor::{EntityMonitor, PaginationMonitor};

/// Builds, dispatches and observes one operation's requests.
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    access: Arc<EntityCatalogEntry>,
    builder: ActionBuilder,
    operation: OperationKey,
}

impl ActionDispatcher {
    pub fn operation(&self) -> &OperationKey {
        &self.operation
    }

    /// Dispatch one request and observe its lifecycle.
    ///
    /// Paged requests yield the request state of the current page only;
    /// entity requests yield the raw lifecycle of the entity id. Fetches
    /// are not dispatched again while one is already in flight for the
    /// same key.
    pub fn dispatch(&self, args: ActionArgs) -> Result<BoxStream<'static, RequestInfo>, CoreError> {
        let action = self.builder.build(args)?;

        // Resolve the observer before dispatching so a wiring mismatch
        // leaves the store untouched.
        let observer = match &action.target {
            RequestTarget::Pagination { .. } => Observer::Page(
                self.access
                    .instance(&self.operation)
                    .ok_or_else(|| CoreError::NotPagination {
                        operation: self.operation.clone(),
                    })?
                    .monitor_for(&action)?,
            ),
            RequestTarget::Entity { schema_key, id } => Observer::Entity(
                self.access.get_entity_monitor(
                    id.clone(),
                    EntityMonitorOptions {
                        schema_key: Some(schema_key.clone()),
                        ..EntityMonitorOptions::default()
                    },
                )?,
            ),
        };

        let store = self.access.store();
        if action.is_pagination() || action.operation.is_fetch() {
            if !store.dispatch_if_idle(action) {
                debug!(operation = %self.operation, "joined in-flight request");
            }
        } else {
            store.dispatch(action);
        }

        // Subscribed after dispatch so the stream opens on the request's
        // own started state.
        Ok(match observer {
            Observer::Page(monitor) => monitor.current_page_request_info(),
            Observer::Entity(monitor) => monitor.request_lifecycle(),
        })
    }
}

enum Observer {
    Page(PaginationMonitor),
    Entity(EntityMonitor),
}

/// Bind `builder` to `access` as a dispatcher for `operation`.
pub fn build_action_dispatcher(
    access: &Arc<EntityCatalogEntry>,
    builder: ActionBuilder,
    operation: OperationKey,
) -> ActionDispatcher {
    ActionDispatcher {
        access: Arc::clone(access),
        builder,
        operation,
    }
}
