use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use catalog_core::{Datestamp, ScopeContainer};

use crate::store::{ContentStore, StoreError, StoreSession, StoredItem, StoredObject};

#[derive(Debug, Default)]
struct RepositoryState {
    items: BTreeMap<String, StoredItem>,
    containers: BTreeMap<String, ScopeContainer>,
}

/// Content store held in memory. Clones share the same data.
///
/// Tracks how many sessions are open and can be switched into a failing mode
/// where every query returns a [`StoreError`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<RwLock<RepositoryState>>,
    open_sessions: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_container(&self, container: ScopeContainer) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.containers.insert(container.id.clone(), container);
    }

    pub fn add_item(&self, item: StoredItem) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.items.insert(item.handle.clone(), item);
    }

    /// Marks an item withdrawn at `at`. Returns `false` if the handle is unknown.
    pub fn withdraw(&self, handle: &str, at: Datestamp) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.items.get_mut(handle) {
            Some(item) => {
                item.withdrawn = true;
                item.last_modified = at;
                true
            }
            None => false,
        }
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl ContentStore for InMemoryRepository {
    fn open_session(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            state: self.state.clone(),
            open_sessions: self.open_sessions.clone(),
            failing: self.failing.clone(),
            released: false,
        }))
    }
}

struct MemorySession {
    state: Arc<RwLock<RepositoryState>>,
    open_sessions: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    released: bool,
}

impl MemorySession {
    fn read<T>(&self, f: impl FnOnce(&RepositoryState) -> T) -> Result<T, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Query("repository is failing".into()));
        }
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("repository lock poisoned".into()))?;
        Ok(f(&state))
    }
}

impl StoreSession for MemorySession {
    fn resolve(&self, handle: &str) -> Result<Option<StoredObject>, StoreError> {
        self.read(|state| {
            state
                .items
                .get(handle)
                .cloned()
                .map(StoredObject::Item)
                .or_else(|| state.containers.get(handle).cloned().map(StoredObject::Container))
        })
    }

    fn containers(&self) -> Result<Vec<ScopeContainer>, StoreError> {
        self.read(|state| state.containers.values().cloned().collect())
    }

    fn items(&self) -> Result<Vec<StoredItem>, StoreError> {
        self.read(|state| state.items.values().cloned().collect())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.release();
    }
}
