use thiserror::Error;

/// Conditions a harvesting request can be refused with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("bad argument: {0}")]
    BadArgument(String),
    #[error("bad resumption token")]
    BadResumptionToken,
    #[error("identifier does not exist: {0}")]
    IdDoesNotExist(String),
    #[error("no metadata formats available for item")]
    NoMetadataFormats,
    #[error("cannot disseminate format {0}")]
    CannotDisseminateFormat(String),
    #[error("no items match the request")]
    NoItemsMatch,
    #[error("repository defines no set hierarchy")]
    NoSetHierarchy,
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl CatalogError {
    /// Protocol error code reported to the harvester. Internal failures have none.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            CatalogError::BadArgument(_) => Some("badArgument"),
            CatalogError::BadResumptionToken => Some("badResumptionToken"),
            CatalogError::IdDoesNotExist(_) => Some("idDoesNotExist"),
            CatalogError::NoMetadataFormats => Some("noMetadataFormats"),
            CatalogError::CannotDisseminateFormat(_) => Some("cannotDisseminateFormat"),
            CatalogError::NoItemsMatch => Some("noRecordsMatch"),
            CatalogError::NoSetHierarchy => Some("noSetHierarchy"),
            CatalogError::InternalServerError(_) => None,
        }
    }
}
