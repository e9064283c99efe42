// ── Entity catalog ──
//
// One entry per entity type: its builders, the pagination instances
// derived from them, and accessors for monitors and dispatchers. The
// entry is what dispatchers observe through.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::action::{
    ActionArgs, ActionBuilder, ActionBuilderConfig, ActionDispatcher, ActionKind, EntityInstance,
    build_action_builders, build_action_dispatcher, build_entity_instances,
};
use crate::error::CoreError;
use crate::model::{EndpointId, EntityId, OperationKey, RelationKey, SchemaKey};
use crate::monitor::{EntityMonitor, PaginationMonitor, PaginationMonitorFactory, PaginationObservables};
use crate::schema::EntitySchema;
use crate::store::NormalizedStore;

/// Declaration of one entity type.
#[derive(Debug, Clone)]
pub struct EntityDefinition {
    pub entity_type: String,
    pub endpoint_type: String,
    pub schema_key: SchemaKey,
    pub operations: IndexMap<OperationKey, ActionBuilderConfig>,
}

impl EntityDefinition {
    pub fn new(
        entity_type: impl Into<String>,
        endpoint_type: impl Into<String>,
        schema_key: impl Into<SchemaKey>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            endpoint_type: endpoint_type.into(),
            schema_key: schema_key.into(),
            operations: IndexMap::new(),
        }
    }

    pub fn operation(mut self, key: impl Into<OperationKey>, config: ActionBuilderConfig) -> Self {
        self.operations.insert(key.into(), config);
        self
    }
}

/// Options for [`EntityCatalogEntry::get_entity_monitor`].
#[derive(Debug, Clone, Default)]
pub struct EntityMonitorOptions {
    /// Watch a different schema than the entry's own.
    pub schema_key: Option<SchemaKey>,
    /// Fetch through the `get` operation when the record is absent.
    pub start_fetch: bool,
    /// Endpoint to fetch from. Required with `start_fetch`.
    pub endpoint_id: Option<EndpointId>,
    pub relations: Vec<RelationKey>,
}

#[derive(Debug)]
pub struct EntityCatalogEntry {
    entity_type: String,
    endpoint_type: String,
    schema: Arc<EntitySchema>,
    store: Arc<NormalizedStore>,
    builders: IndexMap<OperationKey, ActionBuilder>,
    instances: IndexMap<OperationKey, EntityInstance>,
    monitors: Arc<PaginationMonitorFactory>,
}

impl EntityCatalogEntry {
    /// Build and validate an entry. `get` must be entity-kind and
    /// `getMultiple` pagination-kind when declared.
    pub fn new(store: Arc<NormalizedStore>, definition: EntityDefinition) -> Result<Arc<Self>, CoreError> {
        let schema = store.registry().lookup(&definition.schema_key)?;
        let builders = build_action_builders(
            definition.operations,
            &definition.endpoint_type,
            &definition.entity_type,
            store.registry(),
        )?;

        for (operation, builder) in &builders {
            match (operation, builder.kind()) {
                (OperationKey::Get, ActionKind::Pagination) => {
                    return Err(CoreError::NotEntity {
                        operation: operation.clone(),
                    });
                }
                (OperationKey::GetMultiple, ActionKind::Entity) => {
                    return Err(CoreError::NotPagination {
                        operation: operation.clone(),
                    });
                }
                _ => {}
            }
        }

        let monitors = Arc::new(PaginationMonitorFactory::new(Arc::clone(&store)));
        let instances = build_entity_instances(&builders, &monitors);
        debug!(
            entity_type = %definition.entity_type,
            operations = builders.len(),
            paged = instances.len(),
            "registered entity type"
        );

        Ok(Arc::new(Self {
            entity_type: definition.entity_type,
            endpoint_type: definition.endpoint_type,
            schema,
            store,
            builders,
            instances,
            monitors,
        }))
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn endpoint_type(&self) -> &str {
        &self.endpoint_type
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    pub fn store(&self) -> &Arc<NormalizedStore> {
        &self.store
    }

    pub fn builders(&self) -> &IndexMap<OperationKey, ActionBuilder> {
        &self.builders
    }

    pub fn builder(&self, operation: &OperationKey) -> Result<&ActionBuilder, CoreError> {
        self.builders
            .get(operation)
            .ok_or_else(|| CoreError::UnknownOperation {
                operation: operation.clone(),
            })
    }

    pub fn instances(&self) -> &IndexMap<OperationKey, EntityInstance> {
        &self.instances
    }

    pub fn instance(&self, operation: &OperationKey) -> Option<&EntityInstance> {
        self.instances.get(operation)
    }

    pub fn pagination_monitors(&self) -> &Arc<PaginationMonitorFactory> {
        &self.monitors
    }

    pub fn dispatcher(self: &Arc<Self>, operation: &OperationKey) -> Result<ActionDispatcher, CoreError> {
        let builder = self.builder(operation)?.clone();
        Ok(build_action_dispatcher(self, builder, operation.clone()))
    }

    /// One dispatcher per declared operation, in declaration order.
    pub fn dispatchers(self: &Arc<Self>) -> IndexMap<OperationKey, ActionDispatcher> {
        self.builders
            .iter()
            .map(|(operation, builder)| {
                let dispatcher = build_action_dispatcher(self, builder.clone(), operation.clone());
                (operation.clone(), dispatcher)
            })
            .collect()
    }

    pub fn get_entity_monitor(
        &self,
        id: impl Into<EntityId>,
        options: EntityMonitorOptions,
    ) -> Result<EntityMonitor, CoreError> {
        let id = id.into();
        let schema_key = options.schema_key.unwrap_or_else(|| self.schema.key.clone());
        let monitor = EntityMonitor::new(Arc::clone(&self.store), schema_key, id.clone());
        if !options.start_fetch {
            return Ok(monitor);
        }

        let endpoint_id = options
            .endpoint_id
            .ok_or_else(|| CoreError::MissingEndpoint {
                entity_type: self.entity_type.clone(),
            })?;
        let mut args = ActionArgs::entity(id, endpoint_id);
        args.meta.relations = options.relations;
        let action = self.builder(&OperationKey::Get)?.build(args)?;
        Ok(monitor.with_fetch(action))
    }

    /// Monitor for the `getMultiple` query these arguments describe.
    pub fn get_pagination_monitor(&self, args: ActionArgs) -> Result<PaginationMonitor, CoreError> {
        self.paged_instance(&OperationKey::GetMultiple)?
            .pagination_monitor(args)
    }

    pub fn get_pagination_service(&self, args: ActionArgs) -> Result<PaginationObservables, CoreError> {
        self.paged_instance(&OperationKey::GetMultiple)?
            .pagination_service(args)
    }

    /// The pagination instance of `operation`.
    pub fn paged_instance(&self, operation: &OperationKey) -> Result<&EntityInstance, CoreError> {
        self.builder(operation)?;
        self.instance(operation)
            .ok_or_else(|| CoreError::NotPagination {
                operation: operation.clone(),
            })
    }
}

/// Every registered entity type, by name.
#[derive(Debug)]
pub struct EntityCatalog {
    store: Arc<NormalizedStore>,
    entries: IndexMap<String, Arc<EntityCatalogEntry>>,
}

impl EntityCatalog {
    pub fn new(store: Arc<NormalizedStore>) -> Self {
        Self {
            store,
            entries: IndexMap::new(),
        }
    }

    pub fn register(&mut self, definition: EntityDefinition) -> Result<Arc<EntityCatalogEntry>, CoreError> {
        if self.entries.contains_key(&definition.entity_type) {
            return Err(CoreError::DuplicateEntityType {
                entity_type: definition.entity_type,
            });
        }
        let entity_type = definition.entity_type.clone();
        let entry = EntityCatalogEntry::new(Arc::clone(&self.store), definition)?;
        self.entries.insert(entity_type, Arc::clone(&entry));
        Ok(entry)
    }

    pub fn get(&self, entity_type: &str) -> Result<&Arc<EntityCatalogEntry>, CoreError> {
        self.entries
            .get(entity_type)
            .ok_or_else(|| CoreError::UnknownEntityType {
                entity_type: entity_type.to_owned(),
            })
    }

    pub fn store(&self) -> &Arc<NormalizedStore> {
        &self.store
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityCatalogEntry>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
