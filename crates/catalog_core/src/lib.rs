//! Catalog core: harvesting data model, error taxonomy and the pure codecs
//! (datestamps, identifiers, set specs, resumption tokens).
mod datestamp;
mod error;
mod identifier;
mod set_spec;
mod token;
mod types;

pub use datestamp::{DateWindow, Datestamp, Granularity, DATESTAMP_FORMAT};
pub use error::CatalogError;
pub use identifier::IdentifierScheme;
pub use set_spec::{encode_set_spec, parse_set_spec, SET_SPEC_PREFIX};
pub use token::{ResumptionState, ResumptionToken};
pub use types::{
    HarvestEntry, Header, IdentifierPage, ItemSnapshot, MetadataField, MetadataFormat, Record,
    RecordPage, RepositoryIdentity, SchemaLocation, ScopeContainer, ScopeKind, SetDescriptor,
    SetSpecs,
};
