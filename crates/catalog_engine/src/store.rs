use std::ops::Deref;
use std::sync::Arc;

use catalog_core::{CatalogError, Datestamp, ItemSnapshot, ScopeContainer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(String),
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        CatalogError::InternalServerError(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    pub handle: String,
    pub last_modified: Datestamp,
    pub withdrawn: bool,
    /// Ids of the collections the item belongs to.
    pub collections: Vec<String>,
    pub snapshot: Arc<ItemSnapshot>,
}

/// Whatever a handle resolves to in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredObject {
    Item(StoredItem),
    Container(ScopeContainer),
}

/// Read access to the content store for the duration of one request.
pub trait StoreSession: Send + Sync {
    fn resolve(&self, handle: &str) -> Result<Option<StoredObject>, StoreError>;
    fn containers(&self) -> Result<Vec<ScopeContainer>, StoreError>;
    fn items(&self) -> Result<Vec<StoredItem>, StoreError>;
    /// Gives the handle back to the store. Must be safe to call more than once.
    fn release(&mut self);
}

pub trait ContentStore: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn StoreSession>, StoreError>;
}

/// Releases its session when dropped, whichever way the request ends.
pub struct SessionGuard {
    session: Box<dyn StoreSession>,
}

impl SessionGuard {
    pub fn open(store: &dyn ContentStore) -> Result<Self, StoreError> {
        Ok(Self {
            session: store.open_session()?,
        })
    }
}

impl Deref for SessionGuard {
    type Target = dyn StoreSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.release();
    }
}
