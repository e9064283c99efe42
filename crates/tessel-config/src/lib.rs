//! Configuration for the tessel console tools.
//!
//! One TOML file (plus `TESSEL_` environment overrides) declares the API
//! endpoint, store tuning, entity schemas and per-entity operations.
//! This crate loads it and translates it into the `tessel_core` and
//! `tessel_api` types the runtime is assembled from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use tessel_api::{TlsMode, TransportConfig};
use tessel_core::{
    ActionBuilderConfig, CoreError, EntityCatalog, EntityDefinition, EntitySchema, HttpMethod,
    NormalizedStore, OperationKey, OrchestratorConfig, SchemaRegistry,
};

const ENV_PREFIX: &str = "TESSEL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API URL configured")]
    MissingUrl,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub store: StoreSection,

    /// Entity schemas by key.
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaSection>,

    /// Entity types by name.
    #[serde(default)]
    pub entities: BTreeMap<String, EntitySection>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiSection {
    /// API base URL (e.g. "https://api.example.com/v2").
    pub url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            url: None,
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoreSection {
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
        }
    }
}

fn default_max_in_flight() -> usize {
    OrchestratorConfig::default().max_in_flight
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SchemaSection {
    /// JSON pointer to the id inside a payload. Defaults to `/id`.
    pub id: Option<String>,

    #[serde(default)]
    pub relations: Vec<RelationSection>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RelationSection {
    /// Schema key of the nested entity.
    pub target: String,
    /// JSON pointer to the nested value inside the parent payload.
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EntitySection {
    /// Backend family the entity belongs to.
    #[serde(default = "default_endpoint_type")]
    pub endpoint_type: String,

    /// Schema of the entity. Defaults to the entity name.
    pub schema: Option<String>,

    #[serde(default)]
    pub operations: BTreeMap<String, OperationSection>,
}

fn default_endpoint_type() -> String {
    "default".into()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Entity,
    Pagination,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OperationSection {
    #[serde(default)]
    pub kind: OperationKind,

    /// URL template, e.g. `apps/{id}`.
    pub url: String,

    pub method: Option<String>,

    /// Schema of the operation's payload. Defaults to the entity's schema.
    pub schema: Option<String>,

    pub pagination_key: Option<String>,

    #[serde(default)]
    pub flatten: bool,

    #[serde(default)]
    pub external: bool,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "tessel", "tessel").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tessel");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the default path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` plus environment. A missing file yields
/// the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize the config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation into runtime types ──────────────────────────────────

impl Config {
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let raw = self.api.url.as_deref().ok_or(ConfigError::MissingUrl)?;
        raw.parse().map_err(|_| ConfigError::Validation {
            field: "api.url".into(),
            reason: format!("invalid URL: {raw}"),
        })
    }

    pub fn transport_config(&self) -> TransportConfig {
        let tls = if self.api.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.api.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };
        TransportConfig {
            tls,
            timeout: Duration::from_secs(self.api.timeout),
        }
    }

    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig, ConfigError> {
        if self.store.max_in_flight == 0 {
            return Err(ConfigError::Validation {
                field: "store.max_in_flight".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(OrchestratorConfig {
            max_in_flight: self.store.max_in_flight,
        })
    }

    /// Every declared schema, with relation targets checked.
    pub fn schema_registry(&self) -> Result<Arc<SchemaRegistry>, ConfigError> {
        let mut registry = SchemaRegistry::new();
        for (key, section) in &self.schemas {
            let mut schema = EntitySchema::new(key.as_str());
            if let Some(pointer) = &section.id {
                if !pointer.starts_with('/') {
                    return Err(ConfigError::Validation {
                        field: format!("schemas.{key}.id"),
                        reason: format!("expected a JSON pointer, got '{pointer}'"),
                    });
                }
                schema = schema.with_id_pointer(pointer.as_str());
            }
            for relation in &section.relations {
                schema = schema.with_relation(relation.target.as_str(), relation.field.as_str());
            }
            registry.register(schema)?;
        }
        registry.validate()?;
        Ok(Arc::new(registry))
    }

    /// One definition per declared entity type, in name order.
    pub fn entity_definitions(&self) -> Result<Vec<EntityDefinition>, ConfigError> {
        self.entities
            .iter()
            .map(|(name, section)| entity_definition(name, section))
            .collect()
    }

    /// Register every entity type against `store`.
    pub fn catalog(&self, store: Arc<NormalizedStore>) -> Result<EntityCatalog, ConfigError> {
        let mut catalog = EntityCatalog::new(store);
        for definition in self.entity_definitions()? {
            catalog.register(definition)?;
        }
        Ok(catalog)
    }
}

fn entity_definition(name: &str, section: &EntitySection) -> Result<EntityDefinition, ConfigError> {
    let schema = section.schema.as_deref().unwrap_or(name);
    let mut definition = EntityDefinition::new(name, section.endpoint_type.as_str(), schema);
    for (op, op_section) in &section.operations {
        let config = action_config(schema, op_section).map_err(|reason| ConfigError::Validation {
            field: format!("entities.{name}.operations.{op}"),
            reason,
        })?;
        definition = definition.operation(OperationKey::from(op.as_str()), config);
    }
    Ok(definition)
}

fn action_config(entity_schema: &str, section: &OperationSection) -> Result<ActionBuilderConfig, String> {
    let schema = section.schema.as_deref().unwrap_or(entity_schema);
    let mut config = match section.kind {
        OperationKind::Entity => ActionBuilderConfig::entity(schema, section.url.as_str()),
        OperationKind::Pagination => ActionBuilderConfig::pagination(schema, section.url.as_str())
            .with_flatten(section.flatten),
    };
    if let Some(raw) = &section.method {
        let method: HttpMethod = raw
            .parse()
            .map_err(|_| format!("unknown HTTP method '{raw}'"))?;
        config = config.with_method(method);
    }
    if let Some(key) = &section.pagination_key {
        config = config.with_pagination_key(key.as_str());
    }
    if section.external {
        config = config.with_external(true);
    }
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"
[api]
url = "https://api.example.com/v2"
timeout = 10

[store]
max_in_flight = 4

[schemas.application]
id = "/metadata/guid"
relations = [{ target = "route", field = "/entity/routes" }]

[schemas.route]
id = "/metadata/guid"

[entities.application]
endpoint_type = "cf"

[entities.application.operations.get]
url = "apps/{id}"

[entities.application.operations.getMultiple]
kind = "pagination"
url = "apps"

[entities.application.operations.restage]
url = "apps/{id}/restage"
method = "post"
"#;

    fn sample() -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        load_config_from(&path).unwrap()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(matches!(config.api_url(), Err(ConfigError::MissingUrl)));
    }

    #[test]
    fn sections_translate_into_runtime_types() {
        let config = sample();
        assert_eq!(config.api_url().unwrap().as_str(), "https://api.example.com/v2");
        assert_eq!(config.transport_config().timeout, Duration::from_secs(10));
        assert_eq!(config.transport_config().tls, TlsMode::System);
        assert_eq!(config.orchestrator_config().unwrap().max_in_flight, 4);

        let registry = config.schema_registry().unwrap();
        let app = registry.lookup(&"application".into()).unwrap();
        assert_eq!(app.id_pointer, "/metadata/guid");
        assert_eq!(app.relations[0].key.as_str(), "application-route");
    }

    #[test]
    fn operations_become_builder_configs() {
        let definitions = sample().entity_definitions().unwrap();
        assert_eq!(definitions.len(), 1);
        let app = &definitions[0];
        assert_eq!(app.endpoint_type, "cf");
        assert!(app.operations[&OperationKey::GetMultiple].is_pagination());
        assert_eq!(
            app.operations[&OperationKey::from("restage")].http_method(),
            Some(HttpMethod::Post)
        );
    }

    #[test]
    fn catalog_registers_every_entity() {
        let config = sample();
        let store = Arc::new(NormalizedStore::new(config.schema_registry().unwrap()));
        let catalog = config.catalog(store).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("application").is_ok());
    }

    #[test]
    fn bad_methods_name_the_operation() {
        let mut config = sample();
        config
            .entities
            .get_mut("application")
            .unwrap()
            .operations
            .get_mut("restage")
            .unwrap()
            .method = Some("FETCH".into());
        let err = config.entity_definitions().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid entities.application.operations.restage: unknown HTTP method 'FETCH'"
        );
    }

    #[test]
    fn relations_to_undeclared_schemas_are_rejected() {
        let mut config = sample();
        config.schemas.remove("route");
        assert!(matches!(
            config.schema_registry(),
            Err(ConfigError::Core(CoreError::UnknownSchema { .. }))
        ));
    }

    #[test]
    fn insecure_wins_over_custom_ca() {
        let mut config = Config::default();
        config.api.ca_cert = Some("/etc/ca.pem".into());
        assert_eq!(
            config.transport_config().tls,
            TlsMode::CustomCa("/etc/ca.pem".into())
        );
        config.api.insecure = true;
        assert_eq!(config.transport_config().tls, TlsMode::DangerAcceptInvalid);
    }

    #[test]
    fn environment_overrides_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            jail.set_env("TESSEL_API__TIMEOUT", "5");
            jail.set_env("TESSEL_STORE__MAX_IN_FLIGHT", "2");
            let config = load_config_from(Path::new("config.toml")).unwrap();
            assert_eq!(config.api.timeout, 5);
            assert_eq!(config.store.max_in_flight, 2);
            Ok(())
        });
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = sample();
        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }
}
