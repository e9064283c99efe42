use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use super::pagination::PaginationMonitor;
use crate::model::{EntityRecord, PaginationState};
use crate::stream::distinct_until_changed;

/// Everything a list view needs from one paged query.
#[derive(Debug, Clone)]
pub struct PaginationObservables {
    pub monitor: PaginationMonitor,
}

impl PaginationObservables {
    pub fn new(monitor: PaginationMonitor) -> Self {
        Self { monitor }
    }

    /// Records to display. Subscribing triggers the initial fetch.
    pub fn entities(&self) -> BoxStream<'static, Vec<EntityRecord>> {
        self.monitor.current_page()
    }

    pub fn pagination(&self) -> BoxStream<'static, Option<Arc<PaginationState>>> {
        self.monitor.pagination()
    }

    /// Whether the current page is being fetched.
    pub fn fetching(&self) -> BoxStream<'static, bool> {
        distinct_until_changed(
            self.monitor
                .current_page_request_info()
                .map(|info| info.fetching),
        )
        .boxed()
    }

    /// Total result count as reported by the server.
    pub fn total_entities(&self) -> BoxStream<'static, Option<u64>> {
        distinct_until_changed(
            self.monitor
                .pagination()
                .map(|state| state.and_then(|s| s.total_results)),
        )
        .boxed()
    }
}
