// ── Per-schema entity collection ──
//
// Concurrent storage with O(1) lookups and push-based change
// notification via `watch` channels. One watch slot per entity id,
// created lazily on first read or write, plus a collection-wide version
// counter for consumers that project over many ids at once.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;

use crate::model::EntityId;

type Slot = watch::Sender<Option<Arc<Value>>>;

/// Reactive record storage for a single schema.
///
/// Every effective mutation bumps the version counter; writes that leave
/// a record unchanged notify nobody.
pub(crate) struct EntityCollection {
    /// Primary storage: entity id -> latest record (or `None` if absent).
    by_id: DashMap<EntityId, Slot>,

    /// Version counter, bumped on every effective mutation.
    version: watch::Sender<u64>,
}

impl EntityCollection {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            by_id: DashMap::new(),
            version,
        }
    }

    /// Insert or overwrite a record. Returns `true` if anything changed.
    pub(crate) fn upsert(&self, id: EntityId, entity: Value) -> bool {
        let modified = self
            .by_id
            .entry(id)
            .or_insert_with(|| watch::channel(None).0)
            .send_if_modified(|slot| {
                if slot.as_deref() == Some(&entity) {
                    return false;
                }
                *slot = Some(Arc::new(entity));
                true
            });
        if modified {
            self.bump_version();
        }
        modified
    }

    /// Drop a record. Subscribers observe `None`. Returns the removed value.
    pub(crate) fn remove(&self, id: &EntityId) -> Option<Arc<Value>> {
        let slot = self.by_id.get(id)?;
        let mut removed = None;
        slot.send_if_modified(|current| {
            removed = current.take();
            removed.is_some()
        });
        drop(slot);
        if removed.is_some() {
            self.bump_version();
        }
        removed
    }

    /// Look up a record by id.
    pub(crate) fn get(&self, id: &EntityId) -> Option<Arc<Value>> {
        self.by_id.get(id).and_then(|slot| slot.borrow().clone())
    }

    /// Subscribe to one record's changes. The receiver starts at the
    /// current value.
    pub(crate) fn subscribe(&self, id: &EntityId) -> watch::Receiver<Option<Arc<Value>>> {
        self.by_id
            .entry(id.clone())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    /// Subscribe to the collection-wide version counter.
    pub(crate) fn subscribe_version(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Present records, ordered by id.
    pub(crate) fn snapshot(&self) -> BTreeMap<EntityId, Value> {
        self.by_id
            .iter()
            .filter_map(|r| {
                let value = r.value().borrow().clone()?;
                Some((r.key().clone(), (*value).clone()))
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.by_id
            .iter()
            .filter(|r| r.value().borrow().is_some())
            .count()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Increment the version counter.
    fn bump_version(&self) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn upsert_reports_changes_only() {
        let col = EntityCollection::new();
        let id = EntityId::from("app-1");
        assert!(col.upsert(id.clone(), json!({ "name": "web" })));
        assert!(!col.upsert(id.clone(), json!({ "name": "web" })));
        assert!(col.upsert(id, json!({ "name": "api" })));
        assert_eq!(*col.subscribe_version().borrow(), 2);
    }

    #[test]
    fn overwrite_never_duplicates() {
        let col = EntityCollection::new();
        col.upsert("a".into(), json!(1));
        col.upsert("a".into(), json!(2));
        assert_eq!(col.len(), 1);
        assert_eq!(*col.get(&"a".into()).unwrap(), json!(2));
    }

    #[test]
    fn remove_notifies_subscribers() {
        let col = EntityCollection::new();
        let id = EntityId::from("app-1");
        col.upsert(id.clone(), json!({}));
        let mut rx = col.subscribe(&id);
        assert!(rx.borrow_and_update().is_some());

        assert!(col.remove(&id).is_some());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow().is_none());
        assert!(col.remove(&id).is_none());
        assert_eq!(col.len(), 0);
    }

    #[test]
    fn subscribing_to_absent_id_does_not_create_a_record() {
        let col = EntityCollection::new();
        let rx = col.subscribe(&"ghost".into());
        assert!(rx.borrow().is_none());
        assert!(col.snapshot().is_empty());
    }
}
