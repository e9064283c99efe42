// ── Pagination state ──
//
// Sparse page map for one pagination key. Pages are only present once
// a fetch for them succeeded; nothing is prefetched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity_id::{EntityId, PaginationKey, QueryParams, SchemaKey};
use super::request::RequestInfo;

/// Cached state of one paged query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub key: PaginationKey,
    pub schema_key: SchemaKey,
    pub params_hash: String,
    pub params: QueryParams,
    /// Page number -> ids on that page, in response order.
    pub pages: BTreeMap<u32, Vec<EntityId>>,
    pub current_page: u32,
    pub total_results: Option<u64>,
    pub total_pages: Option<u32>,
    /// Request lifecycle per page.
    pub page_requests: BTreeMap<u32, RequestInfo>,
}

impl PaginationState {
    pub(crate) fn new(
        key: PaginationKey,
        schema_key: SchemaKey,
        params: QueryParams,
        current_page: u32,
    ) -> Self {
        Self {
            key,
            schema_key,
            params_hash: super::entity_id::params_hash(&params),
            params,
            pages: BTreeMap::new(),
            current_page,
            total_results: None,
            total_pages: None,
            page_requests: BTreeMap::new(),
        }
    }

    /// Request lifecycle of the currently selected page.
    pub fn current_page_request_info(&self) -> RequestInfo {
        self.page_requests
            .get(&self.current_page)
            .cloned()
            .unwrap_or_default()
    }

    /// Ids of the currently selected page, if fetched.
    pub fn current_page_ids(&self) -> Option<&[EntityId]> {
        self.pages.get(&self.current_page).map(Vec::as_slice)
    }

    /// All fetched ids, concatenated in ascending page order.
    pub fn ids_in_order(&self) -> Vec<EntityId> {
        self.pages.values().flatten().cloned().collect()
    }

    pub fn has_page(&self, page: u32) -> bool {
        self.pages.contains_key(&page)
    }

    /// True while any page of this query is being fetched.
    pub fn is_fetching(&self) -> bool {
        self.page_requests.values().any(|r| r.fetching)
    }

    /// Whether a page beyond the highest fetched one exists.
    pub fn has_more_pages(&self) -> bool {
        let highest = self.pages.keys().next_back().copied().unwrap_or(0);
        match self.total_pages {
            Some(total) => highest < total,
            None => highest == 0,
        }
    }

    pub(crate) fn page_request_mut(&mut self, page: u32) -> &mut RequestInfo {
        self.page_requests.entry(page).or_default()
    }
}
