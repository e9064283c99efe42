// ── Action builders ──
//
// Turn an operation's declarative config into a function from call
// arguments to a concrete `RequestAction`. Builders are assembled once
// per entity type; every wiring defect surfaces here rather than on
// first use.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::config::{ActionBuilderConfig, TemplateVars};
use super::request::{ActionArgs, RequestAction, RequestTarget};
use crate::error::CoreError;
use crate::model::{EntityId, HttpMethod, OperationKey, PaginationKey};
use crate::relation::RelationResolver;
use crate::schema::{EntitySchema, SchemaRegistry};

/// Query parameter that selects a page rather than narrowing the query.
const PAGE_PARAM: &str = "page";

/// Which kind of action a builder yields. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ActionKind {
    Entity,
    Pagination,
}

/// Resolve the HTTP method of `operation` under `config`.
///
/// For `update` an explicit method wins over the PUT default. For every
/// other well-known key the default wins and an explicit method is
/// ignored. Custom keys have no default: a pagination config falls back
/// to GET, an entity config must name its method.
pub fn resolve_http_method(
    operation: &OperationKey,
    config: &ActionBuilderConfig,
) -> Result<HttpMethod, CoreError> {
    let explicit = config.http_method();
    match operation {
        OperationKey::Update => Ok(explicit.unwrap_or(HttpMethod::Put)),
        OperationKey::Custom(_) => match (explicit, config) {
            (Some(method), _) => Ok(method),
            (None, ActionBuilderConfig::Pagination(_)) => Ok(HttpMethod::Get),
            (None, ActionBuilderConfig::Entity(_)) => Err(CoreError::MissingHttpMethod {
                operation: operation.clone(),
            }),
        },
        known => known
            .default_http_method()
            .or(explicit)
            .ok_or_else(|| CoreError::MissingHttpMethod {
                operation: operation.clone(),
            }),
    }
}

/// Builds actions for one operation of one entity type.
#[derive(Debug, Clone)]
pub struct ActionBuilder {
    operation: OperationKey,
    config: ActionBuilderConfig,
    schema: Arc<EntitySchema>,
    resolver: RelationResolver,
    endpoint_type: String,
    entity_type: String,
    http_method: HttpMethod,
}

impl ActionBuilder {
    pub fn new(
        operation: OperationKey,
        config: ActionBuilderConfig,
        endpoint_type: impl Into<String>,
        entity_type: impl Into<String>,
        registry: &Arc<SchemaRegistry>,
    ) -> Result<Self, CoreError> {
        let schema = registry.lookup(config.schema_key())?;
        let http_method = resolve_http_method(&operation, &config)?;
        Ok(Self {
            operation,
            config,
            schema,
            resolver: RelationResolver::new(Arc::clone(registry)),
            endpoint_type: endpoint_type.into(),
            entity_type: entity_type.into(),
            http_method,
        })
    }

    pub fn kind(&self) -> ActionKind {
        match self.config {
            ActionBuilderConfig::Entity(_) => ActionKind::Entity,
            ActionBuilderConfig::Pagination(_) => ActionKind::Pagination,
        }
    }

    pub fn yields_pagination(&self) -> bool {
        self.kind() == ActionKind::Pagination
    }

    pub fn operation(&self) -> &OperationKey {
        &self.operation
    }

    pub fn config(&self) -> &ActionBuilderConfig {
        &self.config
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    pub fn http_method(&self) -> HttpMethod {
        self.http_method
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Build the action for one call.
    pub fn build(&self, args: ActionArgs) -> Result<RequestAction, CoreError> {
        let ActionArgs {
            id,
            endpoint_id,
            mut meta,
        } = args;

        let plan = self.resolver.plan(&self.schema.key, &meta.relations)?;

        let (target, flatten_pagination) = match &self.config {
            ActionBuilderConfig::Entity(_) => {
                let id = id.clone().ok_or_else(|| CoreError::MissingEntityId {
                    operation: self.operation.clone(),
                })?;
                let target = RequestTarget::Entity {
                    schema_key: self.schema.key.clone(),
                    id,
                };
                (target, false)
            }
            ActionBuilderConfig::Pagination(config) => {
                let page_param = meta.params.remove(PAGE_PARAM);
                let page = meta
                    .page
                    .or_else(|| page_param.and_then(|p| p.parse().ok()))
                    .unwrap_or(1)
                    .max(1);

                let base = config
                    .pagination_key
                    .clone()
                    .or_else(|| meta.pagination_key.clone())
                    .unwrap_or_else(|| self.schema.key.to_string());
                // Child listings are scoped to their parent.
                let base = match &id {
                    Some(parent) => format!("{base}-{parent}"),
                    None => base,
                };

                let target = RequestTarget::Pagination {
                    schema_key: self.schema.key.clone(),
                    pagination_key: PaginationKey::derive(
                        &base,
                        meta.relation_path.as_ref(),
                        &meta.params,
                    ),
                    page,
                };
                (target, meta.flatten.unwrap_or(config.flatten_pagination))
            }
        };

        let url = self.config.url().render(&TemplateVars {
            id: id.as_ref().map(EntityId::as_str),
            endpoint: Some(endpoint_id.as_str()),
            params: Some(&meta.params),
        })?;

        let action = RequestAction {
            target,
            operation: self.operation.clone(),
            entity_type: self.entity_type.clone(),
            endpoint_type: self.endpoint_type.clone(),
            endpoint_id,
            url,
            http_method: self.http_method,
            relations: plan.relations,
            params: meta.params,
            body: meta.body,
            external: self.config.external(),
            flatten_pagination,
        };
        debug!(
            operation = %action.operation,
            schema = %action.schema_key(),
            method = %action.http_method,
            url = %action.url,
            "built request action"
        );
        Ok(action)
    }
}

/// Build one builder per configured operation, preserving declaration
/// order.
pub fn build_action_builders(
    configs: IndexMap<OperationKey, ActionBuilderConfig>,
    endpoint_type: &str,
    entity_type: &str,
    registry: &Arc<SchemaRegistry>,
) -> Result<IndexMap<OperationKey, ActionBuilder>, CoreError> {
    configs
        .into_iter()
        .map(|(operation, config)| {
            let builder = ActionBuilder::new(
                operation.clone(),
                config,
                endpoint_type,
                entity_type,
                registry,
            )?;
            Ok((operation, builder))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schema::EntitySchema;

    fn registry() -> Arc<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        registry
            .register(EntitySchema::new("application").with_relation("route", "/entity/routes"))
            .unwrap();
        registry.register(EntitySchema::new("route")).unwrap();
        Arc::new(registry)
    }

    fn entity_cfg() -> ActionBuilderConfig {
        ActionBuilderConfig::entity("application", "apps/{id}")
    }

    #[test]
    fn well_known_defaults_ignore_explicit_methods() {
        let cfg = entity_cfg().with_method(HttpMethod::Post);
        assert_eq!(resolve_http_method(&OperationKey::Get, &cfg).unwrap(), HttpMethod::Get);
        assert_eq!(
            resolve_http_method(&OperationKey::Remove, &cfg).unwrap(),
            HttpMethod::Delete
        );
        let cfg = entity_cfg().with_method(HttpMethod::Get);
        assert_eq!(
            resolve_http_method(&OperationKey::Create, &cfg).unwrap(),
            HttpMethod::Post
        );
    }

    #[test]
    fn update_prefers_the_explicit_method() {
        assert_eq!(
            resolve_http_method(&OperationKey::Update, &entity_cfg()).unwrap(),
            HttpMethod::Put
        );
        let cfg = entity_cfg().with_method(HttpMethod::Patch);
        assert_eq!(
            resolve_http_method(&OperationKey::Update, &cfg).unwrap(),
            HttpMethod::Patch
        );
    }

    #[test]
    fn custom_entity_operations_need_a_method() {
        let op = OperationKey::from("restage");
        assert!(matches!(
            resolve_http_method(&op, &entity_cfg()),
            Err(CoreError::MissingHttpMethod { .. })
        ));
        let cfg = entity_cfg().with_method(HttpMethod::Post);
        assert_eq!(resolve_http_method(&op, &cfg).unwrap(), HttpMethod::Post);

        let paged = ActionBuilderConfig::pagination("application", "apps/{id}/history");
        assert_eq!(
            resolve_http_method(&OperationKey::from("scaleHistory"), &paged).unwrap(),
            HttpMethod::Get
        );
    }

    #[test]
    fn entity_builder_requires_an_id() {
        let builder =
            ActionBuilder::new(OperationKey::Get, entity_cfg(), "cf", "application", &registry())
                .unwrap();
        assert_eq!(builder.kind(), ActionKind::Entity);
        let err = builder.build(ActionArgs::collection("ep-1")).unwrap_err();
        assert!(matches!(err, CoreError::MissingEntityId { .. }));

        let action = builder.build(ActionArgs::entity("app-1", "ep-1")).unwrap();
        assert_eq!(action.url, "apps/app-1");
        assert_eq!(action.entity_id().unwrap().as_str(), "app-1");
        assert_eq!(action.http_method, HttpMethod::Get);
    }

    #[test]
    fn pagination_keys_separate_params_but_not_pages() {
        let builder = ActionBuilder::new(
            OperationKey::GetMultiple,
            ActionBuilderConfig::pagination("application", "apps"),
            "cf",
            "application",
            &registry(),
        )
        .unwrap();

        let sorted = builder
            .build(ActionArgs::collection("ep-1").param("order", "asc"))
            .unwrap();
        let other = builder
            .build(ActionArgs::collection("ep-1").param("order", "desc"))
            .unwrap();
        let page_two = builder
            .build(ActionArgs::collection("ep-1").param("order", "asc").param("page", "2"))
            .unwrap();

        assert_ne!(sorted.pagination_key(), other.pagination_key());
        assert_eq!(sorted.pagination_key(), page_two.pagination_key());
        assert_eq!(sorted.page(), Some(1));
        assert_eq!(page_two.page(), Some(2));
        assert!(!page_two.params.contains_key("page"));
    }

    #[test]
    fn config_pagination_key_takes_precedence() {
        let builder = ActionBuilder::new(
            OperationKey::GetMultiple,
            ActionBuilderConfig::pagination("application", "apps").with_pagination_key("all-apps"),
            "cf",
            "application",
            &registry(),
        )
        .unwrap();
        let action = builder
            .build(ActionArgs::collection("ep-1").pagination_key("ignored"))
            .unwrap();
        assert!(action.pagination_key().unwrap().as_str().starts_with("all-apps:"));
    }

    #[test]
    fn child_listings_are_keyed_by_parent() {
        let builder = ActionBuilder::new(
            OperationKey::from("routes"),
            ActionBuilderConfig::pagination("route", "apps/{id}/routes"),
            "cf",
            "route",
            &registry(),
        )
        .unwrap();
        let a = builder
            .build(ActionArgs::entity("app-1", "ep").relation_path("application-route"))
            .unwrap();
        let b = builder
            .build(ActionArgs::entity("app-2", "ep").relation_path("application-route"))
            .unwrap();
        assert_eq!(a.url, "apps/app-1/routes");
        assert_ne!(a.pagination_key(), b.pagination_key());
        assert!(
            a.pagination_key()
                .unwrap()
                .as_str()
                .starts_with("route-app-1:application-route:")
        );
    }

    #[test]
    fn unknown_relations_fail_the_build() {
        let builder =
            ActionBuilder::new(OperationKey::Get, entity_cfg(), "cf", "application", &registry())
                .unwrap();
        let err = builder
            .build(ActionArgs::entity("app-1", "ep").include("application-space"))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownRelation { .. }));

        let action = builder
            .build(ActionArgs::entity("app-1", "ep").include("application-route"))
            .unwrap();
        assert_eq!(action.relations, vec!["application-route".into()]);
    }

    #[test]
    fn builders_keep_declaration_order() {
        let mut configs = IndexMap::new();
        configs.insert(OperationKey::Update, entity_cfg());
        configs.insert(OperationKey::Get, entity_cfg());
        configs.insert(
            OperationKey::GetMultiple,
            ActionBuilderConfig::pagination("application", "apps"),
        );
        let builders = build_action_builders(configs, "cf", "application", &registry()).unwrap();
        let keys: Vec<&str> = builders.keys().map(OperationKey::as_str).collect();
        assert_eq!(keys, ["update", "get", "getMultiple"]);
        assert_eq!(builders[&OperationKey::Update].http_method(), HttpMethod::Put);
        assert!(builders[&OperationKey::GetMultiple].yields_pagination());
    }

    #[test]
    fn unknown_schema_fails_fast() {
        let err = ActionBuilder::new(
            OperationKey::Get,
            ActionBuilderConfig::entity("space", "spaces/{id}"),
            "cf",
            "space",
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::UnknownSchema { .. }));
    }
}
