use catalog_core::CatalogError;
use catalog_engine::Catalog;
use clap::Subcommand;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Verb {
    Identify,
    GetRecord {
        #[arg(long)]
        identifier: String,
        #[arg(long, default_value = "oai_dc")]
        metadata_prefix: String,
    },
    /// Headers only. With `--resumption-token`, every other argument is ignored.
    ListIdentifiers {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        until: Option<String>,
        #[arg(long)]
        set: Option<String>,
        #[arg(long)]
        metadata_prefix: Option<String>,
        #[arg(long)]
        resumption_token: Option<String>,
    },
    ListRecords {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        until: Option<String>,
        #[arg(long)]
        set: Option<String>,
        #[arg(long, default_value = "oai_dc")]
        metadata_prefix: String,
        #[arg(long)]
        resumption_token: Option<String>,
    },
    ListSets {
        #[arg(long)]
        resumption_token: Option<String>,
    },
    ListMetadataFormats {
        #[arg(long)]
        identifier: Option<String>,
    },
    SchemaLocations {
        #[arg(long)]
        identifier: String,
    },
}

/// Runs one verb. Protocol errors are part of the answer, rendered as
/// `{"error": {"code": .., "message": ..}}`.
pub fn run(catalog: &Catalog, verb: &Verb) -> Result<Value, serde_json::Error> {
    match verb {
        Verb::Identify => render(catalog.identify()),
        Verb::GetRecord {
            identifier,
            metadata_prefix,
        } => render(catalog.get_record(identifier, metadata_prefix)),
        Verb::ListIdentifiers {
            resumption_token: Some(token),
            ..
        } => render(catalog.list_identifiers_resume(token)),
        Verb::ListIdentifiers {
            from,
            until,
            set,
            metadata_prefix,
            resumption_token: None,
        } => render(catalog.list_identifiers(
            from.as_deref(),
            until.as_deref(),
            set.as_deref(),
            metadata_prefix.as_deref(),
        )),
        Verb::ListRecords {
            resumption_token: Some(token),
            ..
        } => render(catalog.list_records_resume(token)),
        Verb::ListRecords {
            from,
            until,
            set,
            metadata_prefix,
            resumption_token: None,
        } => render(catalog.list_records(
            from.as_deref(),
            until.as_deref(),
            set.as_deref(),
            metadata_prefix,
        )),
        Verb::ListSets {
            resumption_token: Some(token),
        } => render(catalog.list_sets_resume(token)),
        Verb::ListSets {
            resumption_token: None,
        } => render(catalog.list_sets()),
        Verb::ListMetadataFormats { identifier } => {
            render(catalog.list_metadata_formats(identifier.as_deref()))
        }
        Verb::SchemaLocations { identifier } => render(catalog.schema_locations(identifier)),
    }
}

fn render<T: Serialize>(outcome: Result<T, CatalogError>) -> Result<Value, serde_json::Error> {
    match outcome {
        Ok(answer) => serde_json::to_value(answer),
        Err(err) => Ok(json!({
            "error": {
                "code": err.code().unwrap_or("internalServerError"),
                "message": err.to_string(),
            }
        })),
    }
}
