//! CLI helper functions

use crate::{
    collections::{BulkLoader, CollectionCatalog, CollectionExtractor},
    etl::{IdentityTransformer, Pipeline},
    ingest::BatchResult,
    server::{self, AppState},
    settings::Settings,
    storage::{NdjsonWriter, RecordFileReader},
    store::Store,
};
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

/// Build the shared application state from settings
///
/// With `memory` set, records live in an in-process store carrying the
/// catalog's unique constraints; otherwise the PostgREST store is used.
pub fn load_state(settings: &Settings, memory: bool) -> Result<AppState> {
    let catalog = settings.catalog()?;
    let store: Arc<dyn Store> = if memory {
        log::warn!("Using in-memory store, nothing will be persisted");
        Arc::new(catalog.memory_store())
    } else {
        let client = settings.postgrest_client()?;
        log::debug!("Using store at {}", client);
        Arc::new(client)
    };

    Ok(AppState::new(store, catalog)
        .with_classifier(settings.classifier())
        .with_bulk_config(settings.bulk_config())
        .with_page_size(settings.page_size))
}

/// Run the HTTP service
pub async fn serve(settings: &Settings, bind: Option<SocketAddr>, memory: bool) -> Result<()> {
    let state = load_state(settings, memory)?;
    server::serve(state, bind.unwrap_or(settings.bind)).await
}

/// Check the store is reachable with the configured key
pub async fn ping(state: &AppState) -> Result<()> {
    state
        .store
        .ping()
        .await
        .context("Store did not answer")?;
    log::info!("✓ Store is reachable");
    Ok(())
}

/// Print the catalog
pub fn print_collections(catalog: &CollectionCatalog) {
    for spec in &catalog.collections {
        let key = spec.key_field.as_deref().unwrap_or("-");
        println!(
            "{:<26} {:<30} key: {:<16} rules: {}",
            spec.name.cyan(),
            spec.table.bright_black(),
            key,
            spec.rules.len()
        );
    }
}

/// Write the built-in catalog to `path` for editing
pub fn init_catalog(path: impl AsRef<Path>, force: bool) -> Result<usize> {
    let path = path.as_ref();
    if path.exists() && !force {
        eyre::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let catalog = CollectionCatalog::builtin();
    catalog.write(path)?;
    log::info!(
        "✓ Wrote {} collection(s) to {}",
        catalog.count(),
        path.display()
    );
    Ok(catalog.count())
}

/// Import a records file into a collection
///
/// Pipeline: RecordFileReader → RecordPreparer → BulkLoader
pub async fn import(state: &AppState, collection: &str, file: impl AsRef<Path>) -> Result<BatchResult> {
    let file = file.as_ref();
    let spec = state.catalog.require(collection)?;

    log::info!(
        "Importing {} into {}",
        file.display().bright_black(),
        collection.cyan()
    );

    let loader = BulkLoader::new(
        state.store.clone(),
        state.classifier.clone(),
        spec.ingest_target()?,
    )
    .with_config(state.bulk);

    let pipeline = Pipeline::new(RecordFileReader::new(file), spec.preparer(), loader);
    let result = pipeline
        .run()
        .await
        .with_context(|| format!("Failed to import {}", file.display()))?;

    log::info!(
        "✓ {} inserted, {} failed",
        result.success_count.green(),
        result.failed_count.red()
    );
    for error in &result.errors {
        log::warn!("  {}", error);
    }
    Ok(result)
}

/// Export every row of a collection to an NDJSON file
///
/// Pipeline: CollectionExtractor → IdentityTransformer → NdjsonWriter
pub async fn export(state: &AppState, collection: &str, output: impl AsRef<Path>) -> Result<usize> {
    let output = output.as_ref();
    let spec = state.catalog.require(collection)?;

    let extractor = CollectionExtractor::new(state.store.clone(), &spec.table)
        .with_page_size(state.page_size);
    let pipeline = Pipeline::new(
        extractor,
        IdentityTransformer::<serde_json::Value>::new(),
        NdjsonWriter::new(output),
    );

    let count = pipeline
        .run()
        .await
        .with_context(|| format!("Failed to export {}", collection))?;

    log::info!(
        "✓ Exported {} row(s) from {} to {}",
        count,
        collection.cyan(),
        output.display()
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    #[serial_test::serial]
    fn test_load_state_requires_url() {
        unsafe {
            std::env::remove_var("FINOPS_STORE_URL");
            std::env::remove_var("FINOPS_CATALOG");
        }
        let settings = Settings::from_env().unwrap();

        let err = load_state(&settings, false).err().unwrap();
        assert!(err.to_string().contains("FINOPS_STORE_URL"));
        assert!(load_state(&settings, true).is_ok());
    }

    #[test]
    fn test_init_catalog_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("collections.yml");

        assert_eq!(init_catalog(&path, false).unwrap(), 9);
        assert!(init_catalog(&path, false).is_err());
        assert!(init_catalog(&path, true).is_ok());
        assert_eq!(CollectionCatalog::read(&path).unwrap().count(), 9);
    }
}
