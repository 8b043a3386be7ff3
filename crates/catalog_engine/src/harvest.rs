use std::collections::{HashMap, HashSet};

use catalog_core::{DateWindow, HarvestEntry, ScopeContainer, ScopeKind};

use crate::store::{StoreError, StoreSession, StoredItem, StoredObject};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarvestQuery {
    pub scope: Option<ScopeContainer>,
    pub window: DateWindow,
    pub offset: u64,
    /// Maximum number of entries; zero means unbounded.
    pub limit: usize,
    pub include_items: bool,
    pub include_containers: bool,
    pub include_withdrawals: bool,
}

/// Runs harvest queries against an open store session.
///
/// Entries come back ordered by ascending datestamp, then handle, so offsets are
/// stable across pages of the same query.
#[async_trait::async_trait]
pub trait HarvestExecutor: Send + Sync {
    async fn harvest(
        &self,
        session: &dyn StoreSession,
        query: &HarvestQuery,
    ) -> Result<Vec<HarvestEntry>, StoreError>;

    async fn single(
        &self,
        session: &dyn StoreSession,
        handle: &str,
        include_items: bool,
    ) -> Result<Option<HarvestEntry>, StoreError>;
}

/// Executor that filters and orders the session's full item listing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotHarvester;

#[async_trait::async_trait]
impl HarvestExecutor for SnapshotHarvester {
    async fn harvest(
        &self,
        session: &dyn StoreSession,
        query: &HarvestQuery,
    ) -> Result<Vec<HarvestEntry>, StoreError> {
        let in_scope = match &query.scope {
            Some(scope) => Some(collections_within(session, scope)?),
            None => None,
        };

        let mut matching: Vec<StoredItem> = session
            .items()?
            .into_iter()
            .filter(|item| query.include_withdrawals || !item.withdrawn)
            .filter(|item| query.window.contains(item.last_modified))
            .filter(|item| {
                in_scope
                    .as_ref()
                    .map_or(true, |cols| item.collections.iter().any(|c| cols.contains(c)))
            })
            .collect();
        matching.sort_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.handle.cmp(&b.handle))
        });

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = if query.limit == 0 {
            usize::MAX
        } else {
            query.limit
        };
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|item| to_entry(item, query.include_items, query.include_containers))
            .collect())
    }

    async fn single(
        &self,
        session: &dyn StoreSession,
        handle: &str,
        include_items: bool,
    ) -> Result<Option<HarvestEntry>, StoreError> {
        match session.resolve(handle)? {
            Some(StoredObject::Item(item)) => Ok(Some(to_entry(item, include_items, true))),
            Some(StoredObject::Container(_)) | None => Ok(None),
        }
    }
}

fn to_entry(item: StoredItem, include_items: bool, include_containers: bool) -> HarvestEntry {
    HarvestEntry {
        handle: item.handle,
        datestamp: item.last_modified,
        withdrawn: item.withdrawn,
        containers: if include_containers {
            item.collections
        } else {
            Vec::new()
        },
        snapshot: include_items.then_some(item.snapshot),
    }
}

/// Collection ids covered by `scope`: itself, or every collection beneath a community.
fn collections_within(
    session: &dyn StoreSession,
    scope: &ScopeContainer,
) -> Result<HashSet<String>, StoreError> {
    if scope.kind == ScopeKind::Collection {
        return Ok(HashSet::from([scope.id.clone()]));
    }

    let containers = session.containers()?;
    let parents: HashMap<&str, Option<&str>> = containers
        .iter()
        .map(|c| (c.id.as_str(), c.parent.as_deref()))
        .collect();

    let mut covered = HashSet::new();
    for collection in containers.iter().filter(|c| c.kind == ScopeKind::Collection) {
        let mut current = collection.parent.as_deref();
        // Bounded walk; a malformed hierarchy must not loop forever.
        for _ in 0..containers.len() {
            match current {
                Some(id) if id == scope.id => {
                    covered.insert(collection.id.clone());
                    break;
                }
                Some(id) => current = parents.get(id).copied().flatten(),
                None => break,
            }
        }
    }
    Ok(covered)
}
