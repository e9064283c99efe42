// ── Request lifecycle records ──
//
// One `RequestInfo` per entity id or pagination page. The store owns
// them; consumers only ever see clones pushed through watch channels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Updating key for create operations.
pub const CREATE_UPDATING_KEY: &str = "create";
/// Updating key for update operations.
pub const UPDATE_UPDATING_KEY: &str = "update";
/// Updating key for remove operations.
pub const DELETE_UPDATING_KEY: &str = "remove";

/// Busy/error status of one non-fetch operation on an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionState {
    pub busy: bool,
    pub error: bool,
    pub message: String,
}

impl ActionState {
    pub(crate) fn busy() -> Self {
        Self {
            busy: true,
            ..Self::default()
        }
    }

    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            busy: false,
            error: true,
            message: message.into(),
        }
    }
}

/// Lifecycle metadata for one request key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    /// True between dispatch of a fetch and its first terminal event.
    pub fetching: bool,
    pub error: bool,
    pub message: String,
    /// Per-operation status for create/update/remove and custom operations.
    pub updating: BTreeMap<String, ActionState>,
    /// Set once a remove operation succeeds.
    pub deleted: bool,
}

impl RequestInfo {
    /// Status of one operation, or the idle default.
    pub fn updating(&self, operation: &str) -> ActionState {
        self.updating.get(operation).cloned().unwrap_or_default()
    }

    pub fn is_busy(&self, operation: &str) -> bool {
        self.updating.get(operation).is_some_and(|s| s.busy)
    }

    pub fn is_deleting(&self) -> bool {
        self.is_busy(DELETE_UPDATING_KEY)
    }

    pub fn is_creating(&self) -> bool {
        self.is_busy(CREATE_UPDATING_KEY)
    }

    /// True while a fetch or any operation is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.fetching || self.updating.values().any(|s| s.busy)
    }

    pub(crate) fn start_fetch(&mut self) {
        self.fetching = true;
        self.error = false;
        self.message.clear();
    }

    pub(crate) fn fetch_succeeded(&mut self) {
        self.fetching = false;
        self.error = false;
        self.message.clear();
    }

    pub(crate) fn fetch_failed(&mut self, message: &str) {
        self.fetching = false;
        self.error = true;
        message.clone_into(&mut self.message);
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = false;
        self.message.clear();
        for state in self.updating.values_mut() {
            state.error = false;
            state.message.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_cycle_resets_error() {
        let mut info = RequestInfo::default();
        info.start_fetch();
        info.fetch_failed("not found");
        assert!(!info.fetching);
        assert!(info.error);
        assert_eq!(info.message, "not found");

        info.start_fetch();
        assert!(info.fetching);
        assert!(!info.error);
        assert!(info.message.is_empty());
    }

    #[test]
    fn deleting_reads_remove_key() {
        let mut info = RequestInfo::default();
        assert!(!info.is_deleting());
        info.updating
            .insert(DELETE_UPDATING_KEY.into(), ActionState::busy());
        assert!(info.is_deleting());
        assert!(info.is_in_flight());
        assert!(!info.is_creating());
    }

    #[test]
    fn clear_error_clears_operation_errors() {
        let mut info = RequestInfo::default();
        info.updating
            .insert(UPDATE_UPDATING_KEY.into(), ActionState::failed("conflict"));
        info.error = true;
        info.clear_error();
        assert!(!info.error);
        assert!(!info.updating(UPDATE_UPDATING_KEY).error);
    }
}
