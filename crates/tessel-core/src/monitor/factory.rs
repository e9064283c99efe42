use std::sync::Arc;

use dashmap::DashMap;

use super::pagination::PaginationMonitor;
use crate::action::RequestAction;
use crate::error::CoreError;
use crate::model::PaginationKey;
use crate::store::NormalizedStore;

/// Hands out one shared monitor per `(pagination key, flatten)` pair.
#[derive(Debug)]
pub struct PaginationMonitorFactory {
    store: Arc<NormalizedStore>,
    monitors: DashMap<(PaginationKey, bool), PaginationMonitor>,
}

impl PaginationMonitorFactory {
    pub fn new(store: Arc<NormalizedStore>) -> Self {
        Self {
            store,
            monitors: DashMap::new(),
        }
    }

    /// The monitor for the query `action` targets, in the action's
    /// flatten mode. A cached monitor is aimed at the action's page.
    pub fn create(&self, action: &RequestAction) -> Result<PaginationMonitor, CoreError> {
        let key = action
            .pagination_key()
            .cloned()
            .ok_or_else(|| CoreError::NotPagination {
                operation: action.operation.clone(),
            })?;
        let flatten = action.flatten_pagination;
        if let Some(existing) = self.monitors.get(&(key.clone(), flatten)) {
            return Ok(match action.page() {
                Some(page) => existing.retargeted(page),
                None => existing.clone(),
            });
        }
        let monitor = PaginationMonitor::new(Arc::clone(&self.store), action.clone(), flatten)?;
        Ok(self
            .monitors
            .entry((key, flatten))
            .or_insert(monitor)
            .clone())
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}
