#![allow(dead_code)]

use std::sync::Arc;

use catalog_core::{Datestamp, ItemSnapshot, MetadataField, ScopeContainer, ScopeKind};
use catalog_engine::{Catalog, CatalogSettings, InMemoryRepository, SnapshotHarvester, StoredItem};

pub const HOST: &str = "repo.example.org";
/// 2020-09-13T12:26:40Z
pub const BASE_SECS: i64 = 1_600_000_000;

pub fn init_logging() {
    catalog_logging::initialize_for_tests();
}

pub fn settings() -> CatalogSettings {
    CatalogSettings {
        hostname: HOST.to_string(),
        ..CatalogSettings::default()
    }
}

pub fn stamp(offset_secs: i64) -> Datestamp {
    Datestamp::from_unix(BASE_SECS + offset_secs).unwrap()
}

pub fn external(handle: &str) -> String {
    format!("oai:{HOST}:{handle}")
}

pub fn collection(id: &str, name: Option<&str>, parent: Option<&str>) -> ScopeContainer {
    ScopeContainer {
        id: id.to_string(),
        kind: ScopeKind::Collection,
        name: name.map(str::to_string),
        parent: parent.map(str::to_string),
    }
}

pub fn community(id: &str, name: Option<&str>, parent: Option<&str>) -> ScopeContainer {
    ScopeContainer {
        kind: ScopeKind::Community,
        ..collection(id, name, parent)
    }
}

fn stored(handle: &str, offset_secs: i64, collections: &[&str], kind: &str) -> StoredItem {
    StoredItem {
        handle: handle.to_string(),
        last_modified: stamp(offset_secs),
        withdrawn: false,
        collections: collections.iter().map(|c| c.to_string()).collect(),
        snapshot: Arc::new(ItemSnapshot::new(vec![
            MetadataField::new("title", None, &format!("Item {handle}")),
            MetadataField::new("contributor", Some("author"), "Doe, Jane"),
            MetadataField::new("type", None, kind),
        ])),
    }
}

pub fn article(handle: &str, offset_secs: i64, collections: &[&str]) -> StoredItem {
    stored(handle, offset_secs, collections, "Article")
}

pub fn thesis(handle: &str, offset_secs: i64, collections: &[&str]) -> StoredItem {
    stored(handle, offset_secs, collections, "Thesis (PhD)")
}

/// Collection `1/2` holding `count` articles `1/1000..`, one minute apart.
pub fn repository_with(count: usize) -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    repo.add_container(collection("1/2", Some("Articles"), None));
    for i in 0..count {
        repo.add_item(article(&handle(i), i as i64 * 60, &["1/2"]));
    }
    repo
}

pub fn handle(i: usize) -> String {
    format!("1/{}", 1000 + i)
}

pub fn catalog(repo: &InMemoryRepository, settings: CatalogSettings) -> Catalog {
    Catalog::new(settings, Arc::new(repo.clone()), Arc::new(SnapshotHarvester)).unwrap()
}
