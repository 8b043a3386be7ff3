//! Record builders turn harvested entries into headers and serialized records.
//!
//! Builders are picked when the catalog is composed. Each one decides which
//! metadata prefixes an individual item can be disseminated in.

use std::fmt::Write;

use catalog_core::{
    CatalogError, HarvestEntry, Header, IdentifierScheme, ItemSnapshot, MetadataField,
    MetadataFormat, SchemaLocation, SetSpecs,
};

use crate::formats::{oai_dc_format, uketd_dc_format, OAI_DC_PREFIX, UKETD_DC_PREFIX};

const DC_URI: &str = "http://purl.org/dc/elements/1.1/";
const DC_TERMS_URI: &str = "http://purl.org/dc/terms/";
const UKETD_TERMS_URI: &str = "http://naca.central.cranfield.ac.uk/ethos-oai/terms/";
const XSI_URI: &str = "http://www.w3.org/2001/XMLSchema-instance";

const DC_ELEMENTS: &[&str] = &[
    "contributor", "coverage", "creator", "date", "description", "format", "identifier",
    "language", "publisher", "relation", "rights", "source", "subject", "title", "type",
];

pub trait RecordBuilder: Send + Sync {
    fn identifiers(&self) -> &IdentifierScheme;

    fn identifier_of(&self, entry: &HarvestEntry) -> String {
        self.identifiers().external_id(&entry.handle)
    }

    /// Inverse of [`RecordBuilder::identifier_of`].
    fn item_for(&self, identifier: &str) -> Option<String> {
        self.identifiers().local_id(identifier).map(str::to_string)
    }

    fn datestamp_of(&self, entry: &HarvestEntry) -> String {
        entry.datestamp.to_string()
    }

    fn set_specs_of<'a>(&self, entry: &'a HarvestEntry) -> SetSpecs<'a> {
        entry.set_specs()
    }

    fn is_deleted(&self, entry: &HarvestEntry) -> bool {
        entry.withdrawn
    }

    fn build_header(&self, entry: &HarvestEntry) -> Header {
        Header {
            identifier: self.identifier_of(entry),
            datestamp: entry.datestamp,
            set_specs: self.set_specs_of(entry).collect(),
            deleted: self.is_deleted(entry),
        }
    }

    /// Serializes the record, or fails with `CannotDisseminateFormat` when this
    /// item cannot be rendered in `metadata_prefix`.
    fn build_record(
        &self,
        entry: &HarvestEntry,
        schema_url: &str,
        metadata_prefix: &str,
    ) -> Result<String, CatalogError>;

    fn schema_locations_for(&self, entry: &HarvestEntry) -> Result<Vec<SchemaLocation>, CatalogError>;
}

/// Simple Dublin Core for every item.
#[derive(Debug, Clone)]
pub struct DublinCoreRecordBuilder {
    identifiers: IdentifierScheme,
    format: MetadataFormat,
}

impl DublinCoreRecordBuilder {
    pub fn new(identifiers: IdentifierScheme) -> Self {
        Self {
            identifiers,
            format: oai_dc_format(),
        }
    }

    fn render_metadata(&self, snapshot: &ItemSnapshot, schema_url: &str) -> String {
        let mut xml = String::new();
        let _ = write!(
            xml,
            "<oai_dc:dc xmlns:oai_dc=\"{ns}\" xmlns:dc=\"{DC_URI}\" xmlns:xsi=\"{XSI_URI}\" \
             xsi:schemaLocation=\"{ns} {schema_url}\">",
            ns = escape_attribute(&self.format.namespace),
            schema_url = escape_attribute(schema_url),
        );
        for field in &snapshot.fields {
            if DC_ELEMENTS.contains(&field.element.as_str()) {
                push_element(&mut xml, "dc", &field.element, &field.value);
            }
        }
        xml.push_str("</oai_dc:dc>");
        xml
    }
}

impl RecordBuilder for DublinCoreRecordBuilder {
    fn identifiers(&self) -> &IdentifierScheme {
        &self.identifiers
    }

    fn build_record(
        &self,
        entry: &HarvestEntry,
        schema_url: &str,
        metadata_prefix: &str,
    ) -> Result<String, CatalogError> {
        if metadata_prefix != OAI_DC_PREFIX {
            return Err(CatalogError::CannotDisseminateFormat(metadata_prefix.to_string()));
        }
        let header = self.build_header(entry);
        if header.deleted {
            return Ok(render_record(&header, None));
        }
        let snapshot = loaded_snapshot(entry)?;
        Ok(render_record(&header, Some(&self.render_metadata(snapshot, schema_url))))
    }

    fn schema_locations_for(&self, entry: &HarvestEntry) -> Result<Vec<SchemaLocation>, CatalogError> {
        if self.is_deleted(entry) {
            return Err(CatalogError::NoMetadataFormats);
        }
        Ok(vec![self.format.schema_location()])
    }
}

/// UK ETD Dublin Core for theses, plus simple Dublin Core for everything.
#[derive(Debug, Clone)]
pub struct ThesisRecordBuilder {
    dublin_core: DublinCoreRecordBuilder,
    format: MetadataFormat,
}

impl ThesisRecordBuilder {
    pub fn new(identifiers: IdentifierScheme) -> Self {
        Self {
            dublin_core: DublinCoreRecordBuilder::new(identifiers),
            format: uketd_dc_format(),
        }
    }

    fn render_metadata(&self, snapshot: &ItemSnapshot, schema_url: &str) -> String {
        let mut xml = String::new();
        let _ = write!(
            xml,
            "<uketd_dc:uketddc xmlns:uketd_dc=\"{ns}\" xmlns:dc=\"{DC_URI}\" \
             xmlns:dcterms=\"{DC_TERMS_URI}\" xmlns:uketdterms=\"{UKETD_TERMS_URI}\" \
             xmlns:xsi=\"{XSI_URI}\" xsi:schemaLocation=\"{ns} {schema_url}\">",
            ns = escape_attribute(&self.format.namespace),
            schema_url = escape_attribute(schema_url),
        );
        for field in &snapshot.fields {
            if let Some((ns, name)) = thesis_element(field) {
                push_element(&mut xml, ns, name, &field.value);
            }
        }
        xml.push_str("</uketd_dc:uketddc>");
        xml
    }
}

impl RecordBuilder for ThesisRecordBuilder {
    fn identifiers(&self) -> &IdentifierScheme {
        self.dublin_core.identifiers()
    }

    fn build_record(
        &self,
        entry: &HarvestEntry,
        schema_url: &str,
        metadata_prefix: &str,
    ) -> Result<String, CatalogError> {
        if metadata_prefix != UKETD_DC_PREFIX {
            return self.dublin_core.build_record(entry, schema_url, metadata_prefix);
        }
        let header = self.build_header(entry);
        if header.deleted {
            return Ok(render_record(&header, None));
        }
        let snapshot = loaded_snapshot(entry)?;
        if !is_thesis(snapshot) {
            return Err(CatalogError::CannotDisseminateFormat(metadata_prefix.to_string()));
        }
        Ok(render_record(&header, Some(&self.render_metadata(snapshot, schema_url))))
    }

    fn schema_locations_for(&self, entry: &HarvestEntry) -> Result<Vec<SchemaLocation>, CatalogError> {
        let mut locations = self.dublin_core.schema_locations_for(entry)?;
        if entry.snapshot.as_deref().is_some_and(is_thesis) {
            locations.push(self.format.schema_location());
        }
        Ok(locations)
    }
}

fn is_thesis(snapshot: &ItemSnapshot) -> bool {
    snapshot
        .values("type")
        .any(|field| field.value.to_ascii_lowercase().contains("thesis"))
}

/// Where a qualified DC field lands in a UK ETD record, if anywhere.
fn thesis_element(field: &MetadataField) -> Option<(&'static str, &'static str)> {
    match (field.element.as_str(), field.qualifier.as_deref()) {
        ("title", None) => Some(("dc", "title")),
        ("title", Some("alternative")) => Some(("dcterms", "alternative")),
        ("contributor", Some("author")) => Some(("dc", "creator")),
        ("contributor", Some("advisor")) => Some(("uketdterms", "advisor")),
        ("contributor", Some("sponsor" | "funder")) => Some(("uketdterms", "sponsor")),
        ("contributor", _) => Some(("dc", "contributor")),
        ("date", Some("issued")) => Some(("dcterms", "issued")),
        ("description", Some("abstract")) => Some(("dcterms", "abstract")),
        ("description", None) => Some(("dc", "description")),
        ("identifier", Some("uri")) => Some(("dc", "identifier")),
        ("language", _) => Some(("dc", "language")),
        ("publisher", None) => Some(("dc", "publisher")),
        ("rights", _) => Some(("dc", "rights")),
        ("subject", _) => Some(("dc", "subject")),
        ("type", None) => Some(("dc", "type")),
        _ => None,
    }
}

fn loaded_snapshot(entry: &HarvestEntry) -> Result<&ItemSnapshot, CatalogError> {
    entry.snapshot.as_deref().ok_or_else(|| {
        CatalogError::InternalServerError(format!("item {} harvested without content", entry.handle))
    })
}

fn render_record(header: &Header, metadata: Option<&str>) -> String {
    let mut xml = String::from("<record>");
    if header.deleted {
        xml.push_str("<header status=\"deleted\">");
    } else {
        xml.push_str("<header>");
    }
    push_element(&mut xml, "", "identifier", &header.identifier);
    push_element(&mut xml, "", "datestamp", &header.datestamp.to_string());
    for spec in &header.set_specs {
        push_element(&mut xml, "", "setSpec", spec);
    }
    xml.push_str("</header>");
    if let Some(metadata) = metadata {
        xml.push_str("<metadata>");
        xml.push_str(metadata);
        xml.push_str("</metadata>");
    }
    xml.push_str("</record>");
    xml
}

fn push_element(xml: &mut String, ns: &str, name: &str, value: &str) {
    let tag = if ns.is_empty() {
        name.to_string()
    } else {
        format!("{ns}:{name}")
    };
    let _ = write!(xml, "<{tag}>{}</{tag}>", escape_xml(value));
}

/// Characters XML 1.0 cannot carry at all.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || !(c < '\u{20}' || c == '\u{FFFE}' || c == '\u{FFFF}')
}

fn escape_xml(value: &str) -> String {
    let valid: String = value.chars().filter(|c| is_xml_char(*c)).collect();
    html_escape::encode_text(&valid).into_owned()
}

fn escape_attribute(value: &str) -> String {
    let valid: String = value.chars().filter(|c| is_xml_char(*c)).collect();
    html_escape::encode_double_quoted_attribute(&valid).into_owned()
}
