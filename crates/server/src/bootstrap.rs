use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use optibot_agent::DialogueRuntime;
use optibot_core::config::{AppConfig, ConfigError, LoadOptions};
use optibot_sheets::{CatalogService, GoogleSheetsClient, SchemaRegistry, SheetsError};

pub struct Application {
    pub config: AppConfig,
    pub catalog: CatalogService,
    pub runtime: Arc<DialogueRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("sheets client construction failed: {0}")]
    SheetsClient(#[source] SheetsError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Wires the catalog and the dialogue runtime from an already-loaded config.
/// No network traffic happens here; the first sheet fetch is on demand.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let client = GoogleSheetsClient::new(&config.sheets).map_err(BootstrapError::SheetsClient)?;
    let catalog = CatalogService::new(
        Arc::new(client),
        SchemaRegistry::builtin(),
        config.business.categories.clone(),
    );
    info!(
        event_name = "system.bootstrap.catalog_ready",
        categories = config.business.categories.len(),
        "catalog service wired to the sheets client"
    );

    let runtime = Arc::new(DialogueRuntime::new(
        catalog.clone(),
        config.business.clone(),
        config.context.clone(),
    ));

    Ok(Application { config, catalog, runtime })
}

#[cfg(test)]
mod tests {
    use optibot_core::config::{ConfigOverrides, LoadOptions};

    use super::{bootstrap, BootstrapError};

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_spreadsheet_id() {
        let result = bootstrap(LoadOptions::default()).await;

        let error = match result {
            Ok(_) => panic!("bootstrap should fail without sheets credentials"),
            Err(error) => error,
        };
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("sheets.spreadsheet_id"));
    }

    #[tokio::test]
    async fn bootstrap_succeeds_with_minimal_overrides() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                spreadsheet_id: Some("sheet-test-id".to_string()),
                api_key: Some("key-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with valid overrides");

        assert_eq!(app.catalog.categories(), app.config.business.categories.as_slice());
        assert_eq!(app.runtime.store().active_users().await, 0);
    }
}
