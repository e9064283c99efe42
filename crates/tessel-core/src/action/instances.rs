use std::sync::Arc;

use indexmap::IndexMap;

use super::builder::ActionBuilder;
use super::request::{ActionArgs, RequestAction};
use crate::error::CoreError;
use crate::model::OperationKey;
use crate::monitor::{PaginationMonitor, PaginationMonitorFactory, PaginationObservables};

/// Monitor accessors for one pagination-kind operation.
#[derive(Debug, Clone)]
pub struct EntityInstance {
    builder: ActionBuilder,
    monitors: Arc<PaginationMonitorFactory>,
}

impl EntityInstance {
    pub fn operation(&self) -> &OperationKey {
        self.builder.operation()
    }

    /// The shared monitor for the query these arguments describe.
    pub fn pagination_monitor(&self, args: ActionArgs) -> Result<PaginationMonitor, CoreError> {
        let action = self.builder.build(args)?;
        self.monitor_for(&action)
    }

    pub(crate) fn monitor_for(&self, action: &RequestAction) -> Result<PaginationMonitor, CoreError> {
        self.monitors.create(action)
    }

    /// The monitor plus its fetch-triggering views.
    pub fn pagination_service(&self, args: ActionArgs) -> Result<PaginationObservables, CoreError> {
        self.pagination_monitor(args).map(PaginationObservables::new)
    }
}

/// One instance per pagination-kind builder. Entity-kind builders are
/// left out entirely.
pub fn build_entity_instances(
    builders: &IndexMap<OperationKey, ActionBuilder>,
    monitors: &Arc<PaginationMonitorFactory>,
) -> IndexMap<OperationKey, EntityInstance> {
    builders
        .iter()
        .filter(|(_, builder)| builder.yields_pagination())
        .map(|(operation, builder)| {
            let instance = EntityInstance {
                builder: builder.clone(),
                monitors: Arc::clone(monitors),
            };
            (operation.clone(), instance)
        })
        .collect()
}
