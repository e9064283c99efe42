// ── Store slots ──
//
// One keyed value of the store. The watch half holds the latest value for
// point-in-time reads and gating; the broadcast half carries every change
// in order, so transition streams see each step the reducer took.

use tokio::sync::{broadcast, watch};

use crate::stream::Transitions;

/// Changes a subscriber may fall behind by before the oldest are dropped.
const TRANSITION_CAPACITY: usize = 64;

#[derive(Debug)]
pub(crate) struct Slot<T> {
    value: watch::Sender<T>,
    changes: broadcast::Sender<T>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Slot<T> {
    pub(crate) fn new(initial: T) -> Self {
        let (value, _) = watch::channel(initial);
        let (changes, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self { value, changes }
    }

    pub(crate) fn borrow(&self) -> watch::Ref<'_, T> {
        self.value.borrow()
    }

    /// Modify in place. Publishes only when `f` reports a change.
    pub(crate) fn send_if_modified(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        let changed = self.value.send_if_modified(f);
        if changed {
            // No receivers is fine; the watch still holds the value.
            let _ = self.changes.send(self.value.borrow().clone());
        }
        changed
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<T> {
        self.value.subscribe()
    }

    /// Current value plus every later change.
    ///
    /// Callers must hold exclusive access to the slot's map entry so no
    /// write lands between the broadcast subscription and the read.
    pub(crate) fn transitions(&self) -> Transitions<T> {
        let changes = self.changes.subscribe();
        Transitions::new(self.value.borrow().clone(), changes)
    }
}
