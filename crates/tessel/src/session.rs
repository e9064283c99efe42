//! Runtime assembly: store, catalog and a running orchestrator over
//! HTTP, built from the effective config.

use std::sync::Arc;

use tessel_api::ApiClient;
use tessel_config::ConfigError;
use tessel_core::{EntityCatalog, EntityCatalogEntry, HttpTransport, NormalizedStore, Orchestrator};

use crate::config::Config;
use crate::error::CliError;

pub struct Session {
    catalog: EntityCatalog,
    orchestrator: Orchestrator,
}

impl Session {
    /// Validate the config, then start processing requests.
    pub async fn start(cfg: &Config, config_path: &str) -> Result<Self, CliError> {
        let registry = cfg.schema_registry()?;
        let store = Arc::new(NormalizedStore::new(registry));
        let catalog = cfg.catalog(Arc::clone(&store))?;

        let url = cfg.api_url().map_err(|err| match err {
            ConfigError::MissingUrl => CliError::NoUrl {
                path: config_path.to_owned(),
            },
            other => other.into(),
        })?;
        let client = ApiClient::new(url, &cfg.transport_config())?;
        let orchestrator = Orchestrator::new(
            cfg.orchestrator_config()?,
            store,
            Arc::new(HttpTransport::new(client)),
        );
        orchestrator.start().await?;

        Ok(Self {
            catalog,
            orchestrator,
        })
    }

    /// Look up an entity type, listing the declared ones on a miss.
    pub fn entry(&self, name: &str) -> Result<&Arc<EntityCatalogEntry>, CliError> {
        self.catalog.get(name).map_err(|_| CliError::UnknownEntity {
            name: name.to_owned(),
            available: available(&self.catalog),
        })
    }

    pub async fn shutdown(self) {
        self.orchestrator.shutdown().await;
    }
}

fn available(catalog: &EntityCatalog) -> String {
    if catalog.is_empty() {
        return "(none)".into();
    }
    catalog
        .iter()
        .map(|entry| entry.entity_type())
        .collect::<Vec<_>>()
        .join(", ")
}
