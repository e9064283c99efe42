// ── Normalized store ──
//
// Per-schema record collections, per-key request lifecycle and
// pagination state, all behind one sequential reducer.

mod collection;
mod data_store;
mod event;
mod reducer;
mod slot;

pub use data_store::{DISPATCH_CLOSED, NormalizedStore, StoreSnapshot};
pub use event::{ResponseBody, StoreEvent};
