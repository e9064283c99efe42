// ── Monitors ──
//
// Reactive views over the store for one entity or one paged query.

mod entity;
mod factory;
mod observables;
mod pagination;

pub use entity::{EntityInfo, EntityMonitor};
pub use factory::PaginationMonitorFactory;
pub use observables::PaginationObservables;
pub use pagination::PaginationMonitor;
