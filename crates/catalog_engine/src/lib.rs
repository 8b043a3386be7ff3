//! Catalog engine: collaborator traits, record builders and the harvesting façade.
mod catalog;
mod formats;
mod harvest;
mod memory;
mod records;
mod sets;
mod settings;
mod store;

pub use catalog::{BuildError, Catalog};
pub use formats::{
    default_formats, oai_dc_format, uketd_dc_format, FormatRegistry, StaticFormatRegistry,
    OAI_DC_PREFIX, UKETD_DC_PREFIX,
};
pub use harvest::{HarvestExecutor, HarvestQuery, SnapshotHarvester};
pub use memory::InMemoryRepository;
pub use records::{DublinCoreRecordBuilder, RecordBuilder, ThesisRecordBuilder};
pub use sets::SetResolver;
pub use settings::{CatalogSettings, RecordBuilderKind, SettingsError};
pub use store::{ContentStore, SessionGuard, StoreError, StoreSession, StoredItem, StoredObject};
