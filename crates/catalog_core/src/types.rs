use std::collections::BTreeSet;
use std::iter::FusedIterator;
use std::slice;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::set_spec::encode_set_spec;
use crate::{Datestamp, ResumptionToken};

/// One qualified Dublin Core value, e.g. `contributor.author`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub element: String,
    #[serde(default)]
    pub qualifier: Option<String>,
    pub value: String,
}

impl MetadataField {
    pub fn new(element: &str, qualifier: Option<&str>, value: &str) -> Self {
        Self {
            element: element.to_string(),
            qualifier: qualifier.map(str::to_string),
            value: value.to_string(),
        }
    }
}

/// Descriptive metadata of an item at harvest time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub fields: Vec<MetadataField>,
}

impl ItemSnapshot {
    pub fn new(fields: Vec<MetadataField>) -> Self {
        Self { fields }
    }

    pub fn values<'a>(&'a self, element: &'a str) -> impl Iterator<Item = &'a MetadataField> + 'a {
        self.fields.iter().filter(move |field| field.element == element)
    }
}

/// An item as seen by one harvest call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestEntry {
    pub handle: String,
    pub datestamp: Datestamp,
    pub withdrawn: bool,
    /// Ids of the collections holding the item, empty unless requested.
    pub containers: Vec<String>,
    /// Present only when the harvest asked for item content.
    pub snapshot: Option<Arc<ItemSnapshot>>,
}

impl HarvestEntry {
    pub fn set_specs(&self) -> SetSpecs<'_> {
        SetSpecs::new(&self.containers)
    }
}

/// Lazily encodes container ids into set specs.
#[derive(Debug, Clone)]
pub struct SetSpecs<'a> {
    containers: slice::Iter<'a, String>,
}

impl<'a> SetSpecs<'a> {
    pub fn new(containers: &'a [String]) -> Self {
        Self {
            containers: containers.iter(),
        }
    }
}

impl Iterator for SetSpecs<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.containers.next().map(|id| encode_set_spec(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.containers.size_hint()
    }
}

impl ExactSizeIterator for SetSpecs<'_> {}
impl FusedIterator for SetSpecs<'_> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Collection,
    Community,
}

/// A resolved set: a collection or a community of the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeContainer {
    pub id: String,
    pub kind: ScopeKind,
    #[serde(default)]
    pub name: Option<String>,
    /// Enclosing community, if any.
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub identifier: String,
    pub datestamp: Datestamp,
    pub set_specs: BTreeSet<String>,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub header: Header,
    /// Serialized record as produced by the record builder.
    pub metadata: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetDescriptor {
    pub spec: String,
    /// Empty when the container has no name.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaLocation {
    pub metadata_prefix: String,
    pub namespace: String,
    pub schema_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFormat {
    pub prefix: String,
    pub namespace: String,
    pub schema_url: String,
}

impl MetadataFormat {
    pub fn new(prefix: &str, namespace: &str, schema_url: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            namespace: namespace.to_string(),
            schema_url: schema_url.to_string(),
        }
    }

    pub fn schema_location(&self) -> SchemaLocation {
        SchemaLocation {
            metadata_prefix: self.prefix.clone(),
            namespace: self.namespace.clone(),
            schema_url: self.schema_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierPage {
    pub headers: Vec<Header>,
    pub resumption_token: Option<ResumptionToken>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub resumption_token: Option<ResumptionToken>,
    /// Identifiers left out because they cannot be rendered in the requested format.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryIdentity {
    pub repository_name: String,
    pub base_url: String,
    pub protocol_version: &'static str,
    pub admin_emails: Vec<String>,
    pub earliest_datestamp: Datestamp,
    pub deleted_record: &'static str,
    pub granularity: &'static str,
}
