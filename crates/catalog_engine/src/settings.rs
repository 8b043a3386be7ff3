use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use catalog_core::{IdentifierScheme, MetadataFormat};
use serde::Deserialize;
use thiserror::Error;

use crate::formats::{default_formats, oai_dc_format};
use crate::records::{DublinCoreRecordBuilder, RecordBuilder, ThesisRecordBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum RecordBuilderKind {
    #[default]
    DublinCore,
    Thesis,
}

impl RecordBuilderKind {
    /// Formats this builder can render for at least some items.
    pub fn formats(self) -> Vec<MetadataFormat> {
        match self {
            RecordBuilderKind::DublinCore => vec![oai_dc_format()],
            RecordBuilderKind::Thesis => default_formats(),
        }
    }

    pub fn renders(self, prefix: &str) -> bool {
        self.formats().iter().any(|format| format.prefix == prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Host part of every external identifier, `oai:{hostname}:{handle}`.
    pub hostname: String,
    pub repository_name: String,
    pub base_url: String,
    pub admin_emails: Vec<String>,
    pub max_page_size: usize,
    pub harvest_timeout_secs: u64,
    /// Page `ListIdentifiers` like `ListRecords` instead of answering in one go.
    pub page_identifiers: bool,
    pub list_community_sets: bool,
    pub record_builder: RecordBuilderKind,
    /// Advertised formats. Empty means every format the record builder renders.
    pub formats: Vec<MetadataFormat>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            repository_name: "Repository".to_string(),
            base_url: "http://localhost/oai/request".to_string(),
            admin_emails: Vec::new(),
            max_page_size: 100,
            harvest_timeout_secs: 30,
            page_identifiers: false,
            list_community_sets: false,
            record_builder: RecordBuilderKind::default(),
            formats: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("hostname must not be empty")]
    MissingHostname,
    #[error("max_page_size must be positive")]
    ZeroPageSize,
    #[error("harvest_timeout_secs must be positive")]
    ZeroTimeout,
    #[error("invalid metadata prefix '{0}'")]
    InvalidPrefix(String),
    #[error("duplicate metadata prefix '{0}'")]
    DuplicatePrefix(String),
    #[error("record builder cannot render metadata prefix '{0}'")]
    UnsupportedPrefix(String),
}

impl CatalogSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.hostname.trim().is_empty() {
            return Err(SettingsError::MissingHostname);
        }
        if self.max_page_size == 0 {
            return Err(SettingsError::ZeroPageSize);
        }
        if self.harvest_timeout_secs == 0 {
            return Err(SettingsError::ZeroTimeout);
        }
        let mut seen = HashSet::new();
        for format in &self.formats {
            let prefix = format.prefix.as_str();
            if prefix.is_empty() || prefix.chars().any(|c| c.is_whitespace() || c == '/') {
                return Err(SettingsError::InvalidPrefix(prefix.to_string()));
            }
            if !seen.insert(prefix) {
                return Err(SettingsError::DuplicatePrefix(prefix.to_string()));
            }
            if !self.record_builder.renders(prefix) {
                return Err(SettingsError::UnsupportedPrefix(prefix.to_string()));
            }
        }
        Ok(())
    }

    pub fn metadata_formats(&self) -> Vec<MetadataFormat> {
        if self.formats.is_empty() {
            self.record_builder.formats()
        } else {
            self.formats.clone()
        }
    }

    pub fn identifier_scheme(&self) -> IdentifierScheme {
        IdentifierScheme::for_host(&self.hostname)
    }

    pub fn harvest_timeout(&self) -> Duration {
        Duration::from_secs(self.harvest_timeout_secs)
    }

    pub fn build_record_builder(&self) -> Arc<dyn RecordBuilder> {
        let identifiers = self.identifier_scheme();
        match self.record_builder {
            RecordBuilderKind::DublinCore => Arc::new(DublinCoreRecordBuilder::new(identifiers)),
            RecordBuilderKind::Thesis => Arc::new(ThesisRecordBuilder::new(identifiers)),
        }
    }
}
