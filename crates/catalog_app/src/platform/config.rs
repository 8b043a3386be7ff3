//! RON loading of catalog settings and repository fixtures.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use catalog_core::{Datestamp, ItemSnapshot, MetadataField, ScopeContainer};
use catalog_engine::{CatalogSettings, InMemoryRepository, StoredItem};
use catalog_logging::{catalog_info, catalog_warn};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct FixtureItem {
    handle: String,
    last_modified: String,
    #[serde(default)]
    withdrawn: bool,
    #[serde(default)]
    collections: Vec<String>,
    #[serde(default)]
    fields: Vec<MetadataField>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RepositoryFixture {
    containers: Vec<ScopeContainer>,
    items: Vec<FixtureItem>,
}

/// Reads settings from `path`, or uses the defaults when no path is given.
pub fn load_settings(path: Option<&Path>) -> Result<CatalogSettings> {
    let settings = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings from {path:?}"))?;
            let settings: CatalogSettings = ron::from_str(&content)
                .with_context(|| format!("failed to parse settings from {path:?}"))?;
            catalog_info!("Loaded settings from {:?}", path);
            settings
        }
        None => {
            catalog_warn!("No settings file given, using defaults");
            CatalogSettings::default()
        }
    };
    settings.validate()?;
    Ok(settings)
}

pub fn load_repository(path: &Path) -> Result<InMemoryRepository> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read repository fixture from {path:?}"))?;
    let fixture: RepositoryFixture = ron::from_str(&content)
        .with_context(|| format!("failed to parse repository fixture from {path:?}"))?;
    let repository = populate(fixture)?;
    catalog_info!("Loaded repository fixture from {:?}", path);
    Ok(repository)
}

fn populate(fixture: RepositoryFixture) -> Result<InMemoryRepository> {
    let repository = InMemoryRepository::new();
    for container in fixture.containers {
        repository.add_container(container);
    }
    for item in fixture.items {
        let last_modified: Datestamp = item
            .last_modified
            .parse()
            .map_err(|err| anyhow!("item {}: {err}", item.handle))?;
        repository.add_item(StoredItem {
            handle: item.handle,
            last_modified,
            withdrawn: item.withdrawn,
            collections: item.collections,
            snapshot: Arc::new(ItemSnapshot::new(item.fields)),
        });
    }
    Ok(repository)
}
