use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use pictag_config::Config;
use pictag_core::{
    CatalogService, LabelClient,
    database::{SqliteCatalogRepository, ports::CatalogRepository},
    providers::build_provider,
};

use crate::infra::app_state::AppState;

/// Open the catalog database and apply the startup policy: wipe it, or
/// only make sure the table exists.
pub async fn prepare_catalog_store(
    url: &str,
    reset_on_start: bool,
) -> Result<SqliteCatalogRepository> {
    let repository = SqliteCatalogRepository::connect(url)
        .await
        .with_context(|| format!("failed to open catalog database {url}"))?;

    if reset_on_start {
        repository
            .reset()
            .await
            .context("failed to reset catalog table")?;
    } else {
        repository
            .ensure_schema()
            .await
            .context("failed to prepare catalog table")?;
    }

    Ok(repository)
}

/// Build everything the handlers need from a resolved configuration.
pub async fn wire_app_state(config: &Config) -> Result<AppState> {
    let repository =
        prepare_catalog_store(&config.database.url, config.database.reset_on_start)
            .await?;

    let provider = build_provider(config.labels.backend, config.labels.provider_settings())
        .with_context(|| {
            format!("failed to build {} label provider", config.labels.backend)
        })?;
    let labels = LabelClient::new(provider);

    info!(
        backend = %config.labels.backend,
        endpoint = %config.labels.endpoint,
        local_files = labels.capabilities().supports_local_files,
        "label provider ready"
    );

    let repository: Arc<dyn CatalogRepository> = Arc::new(repository);
    let catalog = CatalogService::new(
        repository,
        labels,
        config.storage.upload_dir.clone(),
    );

    Ok(AppState::new(catalog, config.server.max_upload_bytes))
}
