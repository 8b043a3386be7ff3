use catalog_core::MetadataFormat;

pub const OAI_DC_PREFIX: &str = "oai_dc";
pub const UKETD_DC_PREFIX: &str = "uketd_dc";

pub fn oai_dc_format() -> MetadataFormat {
    MetadataFormat::new(
        OAI_DC_PREFIX,
        "http://www.openarchives.org/OAI/2.0/oai_dc/",
        "http://www.openarchives.org/OAI/2.0/oai_dc.xsd",
    )
}

pub fn uketd_dc_format() -> MetadataFormat {
    MetadataFormat::new(
        UKETD_DC_PREFIX,
        "http://naca.central.cranfield.ac.uk/ethos-oai/2.0/",
        "http://naca.central.cranfield.ac.uk/ethos-oai/2.0/uketd_dc.xsd",
    )
}

pub fn default_formats() -> Vec<MetadataFormat> {
    vec![oai_dc_format(), uketd_dc_format()]
}

/// Maps metadata prefixes to their schemas.
pub trait FormatRegistry: Send + Sync {
    fn formats(&self) -> &[MetadataFormat];

    fn format(&self, prefix: &str) -> Option<&MetadataFormat> {
        self.formats().iter().find(|format| format.prefix == prefix)
    }

    fn schema_url(&self, prefix: &str) -> Option<&str> {
        self.format(prefix).map(|format| format.schema_url.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct StaticFormatRegistry {
    formats: Vec<MetadataFormat>,
}

impl StaticFormatRegistry {
    pub fn new(formats: Vec<MetadataFormat>) -> Self {
        Self { formats }
    }
}

impl Default for StaticFormatRegistry {
    fn default() -> Self {
        Self::new(default_formats())
    }
}

impl FormatRegistry for StaticFormatRegistry {
    fn formats(&self) -> &[MetadataFormat] {
        &self.formats
    }
}
