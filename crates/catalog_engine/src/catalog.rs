use std::future::Future;
use std::sync::Arc;

use catalog_core::{
    CatalogError, DateWindow, Datestamp, HarvestEntry, IdentifierPage, MetadataFormat, Record,
    RecordPage, RepositoryIdentity, ResumptionState, ResumptionToken, SchemaLocation,
    SetDescriptor,
};
use catalog_logging::{catalog_debug, catalog_info, catalog_warn, log_header};
use thiserror::Error;

use crate::formats::{FormatRegistry, StaticFormatRegistry};
use crate::harvest::{HarvestExecutor, HarvestQuery};
use crate::records::RecordBuilder;
use crate::sets::SetResolver;
use crate::settings::{CatalogSettings, SettingsError};
use crate::store::{ContentStore, SessionGuard, StoreError, StoreSession};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("failed to start harvest runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Arguments of one bounded page, fresh or decoded from a resumption token.
#[derive(Debug, Clone, Copy)]
struct PageRequest<'a> {
    window: DateWindow,
    set_spec: Option<&'a str>,
    metadata_prefix: Option<&'a str>,
    offset: u64,
}

impl<'a> PageRequest<'a> {
    fn first(window: DateWindow, set_spec: Option<&'a str>, metadata_prefix: Option<&'a str>) -> Self {
        Self {
            window,
            set_spec,
            metadata_prefix,
            offset: 0,
        }
    }

    fn resumed(state: &'a ResumptionState) -> Result<Self, CatalogError> {
        Ok(Self {
            window: DateWindow::new(state.from, state.until)?,
            set_spec: state.set_spec.as_deref(),
            metadata_prefix: state.metadata_prefix.as_deref(),
            offset: state.offset,
        })
    }
}

/// Answers harvesting requests.
///
/// Every verb is a synchronous, stateless call holding one store session for its
/// duration. Paging state lives only in the resumption tokens handed to the caller.
///
/// Verbs must be called from synchronous code. Called from inside an async
/// runtime they fail with `InternalServerError`, and a `Catalog` must not be
/// dropped there either.
pub struct Catalog {
    store: Arc<dyn ContentStore>,
    executor: Arc<dyn HarvestExecutor>,
    formats: Arc<dyn FormatRegistry>,
    records: Arc<dyn RecordBuilder>,
    sets: SetResolver,
    settings: CatalogSettings,
    runtime: tokio::runtime::Runtime,
}

impl Catalog {
    /// Composes a catalog with the format registry and record builder the settings name.
    pub fn new(
        settings: CatalogSettings,
        store: Arc<dyn ContentStore>,
        executor: Arc<dyn HarvestExecutor>,
    ) -> Result<Self, BuildError> {
        settings.validate()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("catalog-harvest")
            .enable_time()
            .build()?;
        Ok(Self {
            formats: Arc::new(StaticFormatRegistry::new(settings.metadata_formats())),
            records: settings.build_record_builder(),
            sets: SetResolver::new(settings.list_community_sets),
            store,
            executor,
            settings,
            runtime,
        })
    }

    pub fn with_record_builder(mut self, records: Arc<dyn RecordBuilder>) -> Self {
        self.records = records;
        self
    }

    pub fn with_format_registry(mut self, formats: Arc<dyn FormatRegistry>) -> Self {
        self.formats = formats;
        self
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    pub fn get_record(&self, identifier: &str, metadata_prefix: &str) -> Result<Record, CatalogError> {
        log_request(
            "GetRecord",
            &[("identifier", Some(identifier)), ("metadataPrefix", Some(metadata_prefix))],
        );
        self.get_record_inner(identifier, metadata_prefix)
            .inspect_err(log_rejection)
    }

    /// Headers for everything matching. Unbounded unless `page_identifiers` is set.
    pub fn list_identifiers(
        &self,
        from: Option<&str>,
        until: Option<&str>,
        set_spec: Option<&str>,
        metadata_prefix: Option<&str>,
    ) -> Result<IdentifierPage, CatalogError> {
        log_request(
            "ListIdentifiers",
            &[
                ("from", from),
                ("until", until),
                ("set", set_spec),
                ("metadataPrefix", metadata_prefix),
            ],
        );
        let result = DateWindow::parse(from, until).and_then(|window| {
            let request = PageRequest::first(window, set_spec, metadata_prefix);
            let limit = if self.settings.page_identifiers {
                self.settings.max_page_size
            } else {
                0
            };
            self.identifier_page(&request, limit)
        });
        result.inspect_err(log_rejection)
    }

    pub fn list_identifiers_resume(&self, token: &str) -> Result<IdentifierPage, CatalogError> {
        log_request("ListIdentifiers", &[("resumptionToken", Some(token))]);
        let result = ResumptionState::decode(token).and_then(|state| {
            PageRequest::resumed(&state)
                .and_then(|request| self.identifier_page(&request, self.settings.max_page_size))
                .map_err(as_resumption_failure)
        });
        result.inspect_err(log_rejection)
    }

    pub fn list_records(
        &self,
        from: Option<&str>,
        until: Option<&str>,
        set_spec: Option<&str>,
        metadata_prefix: &str,
    ) -> Result<RecordPage, CatalogError> {
        log_request(
            "ListRecords",
            &[
                ("from", from),
                ("until", until),
                ("set", set_spec),
                ("metadataPrefix", Some(metadata_prefix)),
            ],
        );
        let result = DateWindow::parse(from, until).and_then(|window| {
            self.record_page(&PageRequest::first(window, set_spec, Some(metadata_prefix)))
        });
        result.inspect_err(log_rejection)
    }

    pub fn list_records_resume(&self, token: &str) -> Result<RecordPage, CatalogError> {
        log_request("ListRecords", &[("resumptionToken", Some(token))]);
        let result = ResumptionState::decode(token).and_then(|state| {
            PageRequest::resumed(&state)
                .and_then(|request| self.record_page(&request))
                .map_err(as_resumption_failure)
        });
        result.inspect_err(log_rejection)
    }

    pub fn list_sets(&self) -> Result<Vec<SetDescriptor>, CatalogError> {
        log_request("ListSets", &[]);
        let result = self.open_session().and_then(|session| {
            let sets = self.sets.list_all_sets(&*session)?;
            if sets.is_empty() {
                return Err(CatalogError::NoSetHierarchy);
            }
            Ok(sets)
        });
        result.inspect_err(log_rejection)
    }

    /// Set listings are never split into pages, so no token can be valid here.
    pub fn list_sets_resume(&self, token: &str) -> Result<Vec<SetDescriptor>, CatalogError> {
        log_request("ListSets", &[("resumptionToken", Some(token))]);
        Err(CatalogError::BadResumptionToken).inspect_err(log_rejection)
    }

    pub fn schema_locations(&self, identifier: &str) -> Result<Vec<SchemaLocation>, CatalogError> {
        log_request("SchemaLocations", &[("identifier", Some(identifier))]);
        self.schema_locations_inner(identifier)
            .inspect_err(log_rejection)
    }

    /// All registered formats, or those a single item can be disseminated in.
    pub fn list_metadata_formats(
        &self,
        identifier: Option<&str>,
    ) -> Result<Vec<MetadataFormat>, CatalogError> {
        log_request("ListMetadataFormats", &[("identifier", identifier)]);
        let result = match identifier {
            None => Ok(self.formats.formats().to_vec()),
            Some(identifier) => self.schema_locations_inner(identifier).map(|locations| {
                self.formats
                    .formats()
                    .iter()
                    .filter(|format| {
                        locations
                            .iter()
                            .any(|location| location.metadata_prefix == format.prefix)
                    })
                    .cloned()
                    .collect()
            }),
        };
        result.inspect_err(log_rejection)
    }

    pub fn identify(&self) -> Result<RepositoryIdentity, CatalogError> {
        log_request("Identify", &[]);
        let result = self.open_session().and_then(|session| {
            let query = HarvestQuery {
                limit: 1,
                include_withdrawals: true,
                ..HarvestQuery::default()
            };
            let earliest = self
                .run(self.executor.harvest(&*session, &query))?
                .first()
                .map_or_else(Datestamp::epoch, |entry| entry.datestamp);
            Ok(RepositoryIdentity {
                repository_name: self.settings.repository_name.clone(),
                base_url: self.settings.base_url.clone(),
                protocol_version: "2.0",
                admin_emails: self.settings.admin_emails.clone(),
                earliest_datestamp: earliest,
                deleted_record: "persistent",
                granularity: "YYYY-MM-DDThh:mm:ssZ",
            })
        });
        result.inspect_err(log_rejection)
    }

    fn get_record_inner(&self, identifier: &str, metadata_prefix: &str) -> Result<Record, CatalogError> {
        let handle = self.handle_for(identifier)?;
        let session = self.open_session()?;
        let entry = self
            .run(self.executor.single(&*session, &handle, true))?
            .ok_or_else(|| CatalogError::IdDoesNotExist(identifier.to_string()))?;
        let schema_url = self.schema_url(metadata_prefix)?;
        let metadata = self.records.build_record(&entry, schema_url, metadata_prefix)?;
        Ok(Record {
            header: self.records.build_header(&entry),
            metadata,
        })
    }

    fn schema_locations_inner(&self, identifier: &str) -> Result<Vec<SchemaLocation>, CatalogError> {
        let handle = self.handle_for(identifier)?;
        let session = self.open_session()?;
        let entry = self
            .run(self.executor.single(&*session, &handle, true))?
            .ok_or_else(|| CatalogError::IdDoesNotExist(identifier.to_string()))?;
        if self.records.is_deleted(&entry) {
            return Err(CatalogError::NoMetadataFormats);
        }
        self.records.schema_locations_for(&entry)
    }

    fn identifier_page(
        &self,
        request: &PageRequest<'_>,
        limit: usize,
    ) -> Result<IdentifierPage, CatalogError> {
        let session = self.open_session()?;
        let scope = self.sets.resolve(&*session, request.set_spec)?;
        if let Some(prefix) = request.metadata_prefix {
            self.schema_url(prefix)?;
        }
        let entries = self.harvest(
            &*session,
            HarvestQuery {
                scope,
                window: request.window,
                offset: request.offset,
                limit,
                include_items: false,
                include_containers: true,
                include_withdrawals: true,
            },
        )?;

        let headers = entries
            .iter()
            .map(|entry| self.records.build_header(entry))
            .collect();
        Ok(IdentifierPage {
            headers,
            resumption_token: self.next_token(request, request.offset, limit, entries.len()),
        })
    }

    /// Builds one page of records. A full page on which every item was skipped
    /// is followed by the next one, so a page never succeeds empty.
    fn record_page(&self, request: &PageRequest<'_>) -> Result<RecordPage, CatalogError> {
        let session = self.open_session()?;
        let scope = self.sets.resolve(&*session, request.set_spec)?;
        let prefix = request
            .metadata_prefix
            .ok_or_else(|| CatalogError::CannotDisseminateFormat(String::new()))?;
        let schema_url = self.schema_url(prefix)?;
        let limit = self.settings.max_page_size;

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        let mut offset = request.offset;
        let resumption_token = loop {
            let query = HarvestQuery {
                scope: scope.clone(),
                window: request.window,
                offset,
                limit,
                include_items: true,
                include_containers: true,
                include_withdrawals: true,
            };
            let entries = self.run(self.executor.harvest(&*session, &query))?;
            for entry in &entries {
                match self.records.build_record(entry, schema_url, prefix) {
                    Ok(metadata) => records.push(Record {
                        header: self.records.build_header(entry),
                        metadata,
                    }),
                    Err(CatalogError::CannotDisseminateFormat(_)) => {
                        let identifier = self.records.identifier_of(entry);
                        catalog_debug!(
                            "{}",
                            log_header(
                                "oai_warning",
                                &[("cannot_disseminate", Some(prefix)), ("identifier", Some(identifier.as_str()))],
                            )
                        );
                        skipped.push(identifier);
                    }
                    Err(err) => return Err(err),
                }
            }
            let token = self.next_token(request, offset, limit, entries.len());
            if !records.is_empty() || token.is_none() {
                break token;
            }
            offset = offset.saturating_add(limit as u64);
        };
        catalog_info!(
            "oai_harvest: results={}, ignore={}",
            records.len(),
            skipped.len()
        );
        if records.is_empty() {
            return Err(CatalogError::NoItemsMatch);
        }

        Ok(RecordPage {
            records,
            resumption_token,
            skipped,
        })
    }

    /// Runs a harvest and refuses an empty result.
    fn harvest(
        &self,
        session: &dyn StoreSession,
        query: HarvestQuery,
    ) -> Result<Vec<HarvestEntry>, CatalogError> {
        let entries = self.run(self.executor.harvest(session, &query))?;
        if entries.is_empty() {
            return Err(CatalogError::NoItemsMatch);
        }
        Ok(entries)
    }

    /// A full page means there may be more; a short one ends the harvest.
    fn next_token(
        &self,
        request: &PageRequest<'_>,
        offset: u64,
        limit: usize,
        returned: usize,
    ) -> Option<ResumptionToken> {
        if limit == 0 || returned != limit {
            return None;
        }
        let token = ResumptionState::new(
            request.window.from,
            request.window.until,
            request.set_spec,
            request.metadata_prefix,
            offset.saturating_add(limit as u64),
        )
        .encode();
        catalog_debug!("made_resumption_token: token={token}");
        Some(token)
    }

    fn handle_for(&self, identifier: &str) -> Result<String, CatalogError> {
        self.records
            .item_for(identifier)
            .ok_or_else(|| CatalogError::IdDoesNotExist(identifier.to_string()))
    }

    fn schema_url(&self, metadata_prefix: &str) -> Result<&str, CatalogError> {
        self.formats
            .schema_url(metadata_prefix)
            .ok_or_else(|| CatalogError::CannotDisseminateFormat(metadata_prefix.to_string()))
    }

    fn open_session(&self) -> Result<SessionGuard, CatalogError> {
        SessionGuard::open(self.store.as_ref()).map_err(database_error)
    }

    /// Blocks on an executor call, bounded by the configured harvest timeout.
    fn run<T>(&self, call: impl Future<Output = Result<T, StoreError>>) -> Result<T, CatalogError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            catalog_warn!("harvest_refused: called from inside an async runtime");
            return Err(CatalogError::InternalServerError(
                "catalog verbs cannot block inside an async runtime".to_string(),
            ));
        }
        let timeout = self.settings.harvest_timeout();
        let outcome = self
            .runtime
            .block_on(async { tokio::time::timeout(timeout, call).await });
        match outcome {
            Ok(result) => result.map_err(database_error),
            Err(_) => {
                catalog_warn!("harvest_timeout: after {:?}", timeout);
                Err(CatalogError::InternalServerError(format!(
                    "harvest timed out after {}s",
                    timeout.as_secs()
                )))
            }
        }
    }
}

fn database_error(err: StoreError) -> CatalogError {
    catalog_warn!("database_error: {err}");
    err.into()
}

/// A resumed request fails closed: parameters that no longer resolve mean a bad token.
fn as_resumption_failure(err: CatalogError) -> CatalogError {
    match err {
        CatalogError::BadArgument(_) | CatalogError::CannotDisseminateFormat(_) => {
            CatalogError::BadResumptionToken
        }
        other => other,
    }
}

fn log_request(verb: &str, params: &[(&str, Option<&str>)]) {
    let mut all = Vec::with_capacity(params.len() + 1);
    all.push(("verb", Some(verb)));
    all.extend_from_slice(params);
    catalog_info!("{}", log_header("oai_request", &all));
}

fn log_rejection(err: &CatalogError) {
    let detail = err.to_string();
    catalog_info!(
        "{}",
        log_header("oai_error", &[("code", err.code()), ("detail", Some(detail.as_str()))])
    );
}
