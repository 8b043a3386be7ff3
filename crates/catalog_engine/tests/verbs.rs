mod common;

use std::sync::Arc;
use std::time::Duration;

use catalog_core::{
    CatalogError, HarvestEntry, IdentifierScheme, ResumptionState, SchemaLocation, SetDescriptor,
};
use catalog_engine::{
    oai_dc_format, Catalog, CatalogSettings, DublinCoreRecordBuilder, HarvestExecutor,
    HarvestQuery, RecordBuilder, RecordBuilderKind, SnapshotHarvester, StoreError, StoreSession,
    OAI_DC_PREFIX,
};
use common::{
    article, catalog, collection, community, external, init_logging, repository_with, settings,
    stamp, thesis, HOST,
};
use pretty_assertions::assert_eq;

#[test]
fn get_record_renders_header_and_dublin_core() {
    init_logging();
    let repo = repository_with(3);
    let catalog = catalog(&repo, settings());

    let record = catalog.get_record(&external("1/1001"), "oai_dc").unwrap();
    assert_eq!(record.header.identifier, "oai:repo.example.org:1/1001");
    assert_eq!(record.header.datestamp, stamp(60));
    assert_eq!(
        record.header.set_specs.iter().collect::<Vec<_>>(),
        vec!["scope_1_2"]
    );
    assert!(!record.header.deleted);
    assert!(record.metadata.contains("<dc:title>Item 1/1001</dc:title>"));
    assert!(record.metadata.contains("<setSpec>scope_1_2</setSpec>"));
    assert!(record
        .metadata
        .contains("http://www.openarchives.org/OAI/2.0/oai_dc.xsd"));
}

#[test]
fn withdrawn_items_have_deleted_headers_and_no_formats() {
    let repo = repository_with(3);
    assert!(repo.withdraw("1/1001", stamp(3600)));
    let catalog = catalog(&repo, settings());
    let id = external("1/1001");

    assert_eq!(catalog.schema_locations(&id), Err(CatalogError::NoMetadataFormats));
    assert_eq!(
        catalog.list_metadata_formats(Some(&id)),
        Err(CatalogError::NoMetadataFormats)
    );

    let record = catalog.get_record(&id, "oai_dc").unwrap();
    assert!(record.header.deleted);
    assert_eq!(record.header.datestamp, stamp(3600));
    assert!(record.metadata.contains("<header status=\"deleted\">"));
    assert!(!record.metadata.contains("<metadata>"));

    // Withdrawals still show up in bulk harvests, as deleted headers.
    let page = catalog.list_identifiers(None, None, None, None).unwrap();
    let last = page.headers.last().unwrap();
    assert_eq!(last.identifier, id);
    assert!(last.deleted);
}

#[test]
fn unknown_identifiers_do_not_exist() {
    let repo = repository_with(3);
    repo.add_container(collection("1/7", Some("Other"), None));
    let catalog = catalog(&repo, settings());

    for id in [
        "oai:repo.example.org:9/9".to_string(),
        "oai:elsewhere.org:1/1001".to_string(),
        "oai:repo.example.org:".to_string(),
        "1/1001".to_string(),
        // Containers are not records.
        external("1/7"),
    ] {
        assert_eq!(
            catalog.get_record(&id, "oai_dc"),
            Err(CatalogError::IdDoesNotExist(id.clone()))
        );
        assert_eq!(
            catalog.schema_locations(&id),
            Err(CatalogError::IdDoesNotExist(id.clone()))
        );
    }
}

#[test]
fn unknown_prefix_cannot_be_disseminated() {
    let repo = repository_with(3);
    let catalog = catalog(&repo, settings());

    assert_eq!(
        catalog.get_record(&external("1/1000"), "marc21"),
        Err(CatalogError::CannotDisseminateFormat("marc21".into()))
    );
    assert_eq!(
        catalog.list_records(None, None, None, "marc21"),
        Err(CatalogError::CannotDisseminateFormat("marc21".into()))
    );
    assert_eq!(
        catalog.list_identifiers(None, None, None, Some("marc21")),
        Err(CatalogError::CannotDisseminateFormat("marc21".into()))
    );
}

#[test]
fn set_specs_must_name_known_scopes() {
    let repo = repository_with(3);
    let catalog = catalog(&repo, settings());

    for set in ["scope_", "badprefix_12", "scope_1_1000", "scope_12", "scope_1/2"] {
        let outcome = catalog.list_records(None, None, Some(set), "oai_dc");
        assert!(
            matches!(outcome, Err(CatalogError::BadArgument(_))),
            "{set}: {outcome:?}"
        );
        let outcome = catalog.list_identifiers(None, None, Some(set), None);
        assert!(
            matches!(outcome, Err(CatalogError::BadArgument(_))),
            "{set}: {outcome:?}"
        );
    }
}

#[test]
fn scope_without_separator_maps_to_a_flat_handle() {
    let repo = repository_with(0);
    repo.add_container(collection("12", Some("Flat"), None));
    repo.add_item(article("12/1", 0, &["12"]));
    let catalog = catalog(&repo, settings());

    let page = catalog
        .list_identifiers(None, None, Some("scope_12"), None)
        .unwrap();
    assert_eq!(page.headers.len(), 1);
    assert_eq!(
        page.headers[0].set_specs.iter().collect::<Vec<_>>(),
        vec!["scope_12"]
    );
}

#[test]
fn community_scope_covers_nested_collections() {
    let repo = repository_with(0);
    repo.add_container(community("1/1", Some("Faculty"), None));
    repo.add_container(community("1/3", Some("School"), Some("1/1")));
    repo.add_container(collection("1/4", Some("Papers"), Some("1/3")));
    repo.add_container(collection("1/5", Some("Elsewhere"), None));
    repo.add_item(article("1/40", 0, &["1/4"]));
    repo.add_item(article("1/50", 60, &["1/5"]));
    let catalog = catalog(&repo, settings());

    let page = catalog
        .list_records(None, None, Some("scope_1_1"), "oai_dc")
        .unwrap();
    let ids: Vec<_> = page.records.iter().map(|r| r.header.identifier.clone()).collect();
    assert_eq!(ids, vec![external("1/40")]);
}

#[test]
fn list_sets_lists_collections_with_possibly_empty_names() {
    let repo = repository_with(0);
    repo.add_container(collection("1/9", None, None));
    repo.add_container(community("1/1", Some("Faculty"), None));
    let catalog = catalog(&repo, settings());

    assert_eq!(
        catalog.list_sets().unwrap(),
        vec![
            SetDescriptor {
                spec: "scope_1_2".into(),
                name: "Articles".into(),
            },
            SetDescriptor {
                spec: "scope_1_9".into(),
                name: String::new(),
            },
        ]
    );

    let with_communities = common::catalog(
        &repo,
        CatalogSettings {
            list_community_sets: true,
            ..settings()
        },
    );
    let specs: Vec<_> = with_communities
        .list_sets()
        .unwrap()
        .into_iter()
        .map(|set| set.spec)
        .collect();
    assert_eq!(specs, vec!["scope_1_2", "scope_1_9", "scope_1_1"]);
}

#[test]
fn list_sets_without_containers_has_no_hierarchy() {
    let repo = catalog_engine::InMemoryRepository::new();
    repo.add_item(article("1/1", 0, &[]));
    let catalog = catalog(&repo, settings());
    assert_eq!(catalog.list_sets(), Err(CatalogError::NoSetHierarchy));
}

#[test]
fn list_sets_never_accepts_a_token() {
    let repo = repository_with(1);
    let catalog = catalog(&repo, settings());
    assert_eq!(
        catalog.list_sets_resume("////0"),
        Err(CatalogError::BadResumptionToken)
    );
}

#[test]
fn thesis_builder_skips_items_it_cannot_render() {
    let repo = repository_with(0);
    repo.add_item(article("1/1", 0, &["1/2"]));
    repo.add_item(thesis("1/2t", 60, &["1/2"]));
    repo.add_item(article("1/3", 120, &["1/2"]));
    let catalog = catalog(
        &repo,
        CatalogSettings {
            record_builder: RecordBuilderKind::Thesis,
            ..settings()
        },
    );

    let page = catalog.list_records(None, None, None, "uketd_dc").unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].header.identifier, external("1/2t"));
    assert!(page.records[0].metadata.contains("<dc:creator>Doe, Jane</dc:creator>"));
    assert_eq!(page.skipped, vec![external("1/1"), external("1/3")]);

    assert_eq!(
        catalog.get_record(&external("1/1"), "uketd_dc"),
        Err(CatalogError::CannotDisseminateFormat("uketd_dc".into()))
    );
    let all = catalog.list_records(None, None, None, "oai_dc").unwrap();
    assert_eq!(all.records.len(), 3);
    assert!(all.skipped.is_empty());

    let prefixes: Vec<_> = catalog
        .list_metadata_formats(Some(&external("1/2t")))
        .unwrap()
        .into_iter()
        .map(|format| format.prefix)
        .collect();
    assert_eq!(prefixes, vec!["oai_dc", "uketd_dc"]);
}

/// Refuses every item whose handle ends in an odd digit.
struct OddRefusingBuilder(DublinCoreRecordBuilder);

impl RecordBuilder for OddRefusingBuilder {
    fn identifiers(&self) -> &IdentifierScheme {
        self.0.identifiers()
    }

    fn build_record(
        &self,
        entry: &HarvestEntry,
        schema_url: &str,
        metadata_prefix: &str,
    ) -> Result<String, CatalogError> {
        let odd = entry
            .handle
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .is_some_and(|d| d % 2 == 1);
        if odd {
            return Err(CatalogError::CannotDisseminateFormat(metadata_prefix.into()));
        }
        self.0.build_record(entry, schema_url, metadata_prefix)
    }

    fn schema_locations_for(
        &self,
        entry: &HarvestEntry,
    ) -> Result<Vec<SchemaLocation>, CatalogError> {
        self.0.schema_locations_for(entry)
    }
}

#[test]
fn skipped_items_still_advance_the_page() {
    let repo = repository_with(10);
    let catalog = catalog(
        &repo,
        CatalogSettings {
            max_page_size: 4,
            ..settings()
        },
    )
    .with_record_builder(Arc::new(OddRefusingBuilder(DublinCoreRecordBuilder::new(
        IdentifierScheme::for_host(HOST),
    ))));

    let first = catalog.list_records(None, None, None, "oai_dc").unwrap();
    assert_eq!(first.records.len(), 2);
    assert_eq!(first.skipped.len(), 2);
    let token = first.resumption_token.expect("a page of four was harvested");

    let second = catalog.list_records_resume(token.as_str()).unwrap();
    assert_eq!(
        second
            .records
            .iter()
            .map(|r| r.header.identifier.clone())
            .collect::<Vec<_>>(),
        vec![external("1/1004"), external("1/1006")]
    );
}

#[test]
fn one_unrenderable_item_is_left_out_of_an_otherwise_full_answer() {
    let repo = repository_with(3);
    let catalog = catalog(&repo, settings()).with_record_builder(Arc::new(OddRefusingBuilder(
        DublinCoreRecordBuilder::new(IdentifierScheme::for_host(HOST)),
    )));

    let page = catalog.list_records(None, None, None, "oai_dc").unwrap();
    assert_eq!(
        page.records
            .iter()
            .map(|r| r.header.identifier.clone())
            .collect::<Vec<_>>(),
        vec![external("1/1000"), external("1/1002")]
    );
    assert_eq!(page.skipped, vec![external("1/1001")]);
    assert!(page.resumption_token.is_none());
}

fn thesis_settings(max_page_size: usize) -> CatalogSettings {
    CatalogSettings {
        record_builder: RecordBuilderKind::Thesis,
        max_page_size,
        ..settings()
    }
}

#[test]
fn nothing_renderable_means_no_items_match() {
    let repo = repository_with(0);
    repo.add_item(article("1/1", 0, &["1/2"]));
    repo.add_item(article("1/3", 60, &["1/2"]));
    let catalog = catalog(&repo, thesis_settings(100));

    assert_eq!(
        catalog.list_records(None, None, None, "uketd_dc"),
        Err(CatalogError::NoItemsMatch)
    );
    assert_eq!(repo.open_sessions(), 0);
}

#[test]
fn fully_skipped_pages_give_way_to_the_next_renderable_item() {
    let repo = repository_with(0);
    repo.add_item(article("1/1", 0, &["1/2"]));
    repo.add_item(article("1/3", 60, &["1/2"]));
    repo.add_item(thesis("1/4t", 120, &["1/2"]));
    repo.add_item(article("1/5", 180, &["1/2"]));
    let catalog = catalog(&repo, thesis_settings(2));

    let page = catalog.list_records(None, None, None, "uketd_dc").unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].header.identifier, external("1/4t"));
    assert_eq!(
        page.skipped,
        vec![external("1/1"), external("1/3"), external("1/5")]
    );
    let token = page.resumption_token.expect("second executor page was full");
    assert_eq!(ResumptionState::decode(token.as_str()).unwrap().offset, 4);
    assert_eq!(
        catalog.list_records_resume(token.as_str()),
        Err(CatalogError::NoItemsMatch)
    );
}

#[test]
fn default_catalog_only_advertises_formats_it_can_render() {
    let repo = repository_with(2);
    let catalog = catalog(&repo, settings());

    let advertised = catalog.list_metadata_formats(None).unwrap();
    assert_eq!(
        advertised.iter().map(|f| f.prefix.as_str()).collect::<Vec<_>>(),
        vec![OAI_DC_PREFIX]
    );
    for format in &advertised {
        let page = catalog.list_records(None, None, None, &format.prefix).unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(page.skipped.is_empty());
    }
    assert_eq!(
        catalog.list_records(None, None, None, "uketd_dc"),
        Err(CatalogError::CannotDisseminateFormat("uketd_dc".into()))
    );
}

#[test]
fn verbs_refuse_to_block_inside_an_async_runtime() {
    let repo = repository_with(2);
    let catalog = catalog(&repo, settings());
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

    let outcome = runtime.block_on(async { catalog.list_records(None, None, None, "oai_dc") });
    assert!(matches!(outcome, Err(CatalogError::InternalServerError(_))));
    assert_eq!(repo.open_sessions(), 0);

    // The same catalog still answers once back in synchronous code.
    assert!(catalog.list_records(None, None, None, "oai_dc").is_ok());
}

#[test]
fn schema_locations_and_formats_of_a_live_item() {
    let repo = repository_with(1);
    let catalog = catalog(&repo, settings());
    let id = external("1/1000");

    assert_eq!(
        catalog.schema_locations(&id).unwrap(),
        vec![oai_dc_format().schema_location()]
    );
    let all: Vec<_> = catalog
        .list_metadata_formats(None)
        .unwrap()
        .into_iter()
        .map(|format| format.prefix)
        .collect();
    assert_eq!(all, vec!["oai_dc"]);
    let for_item: Vec<_> = catalog
        .list_metadata_formats(Some(&id))
        .unwrap()
        .into_iter()
        .map(|format| format.prefix)
        .collect();
    assert_eq!(for_item, vec![OAI_DC_PREFIX]);
}

#[test]
fn identify_reports_the_earliest_datestamp() {
    let repo = repository_with(3);
    repo.add_item(article("1/0", -600, &["1/2"]));
    repo.withdraw("1/0", stamp(-1200));
    let catalog = catalog(&repo, settings());

    let identity = catalog.identify().unwrap();
    assert_eq!(identity.earliest_datestamp, stamp(-1200));
    assert_eq!(identity.protocol_version, "2.0");
    assert_eq!(identity.deleted_record, "persistent");

    let empty = catalog_engine::InMemoryRepository::new();
    let identity = common::catalog(&empty, settings()).identify().unwrap();
    assert_eq!(identity.earliest_datestamp.to_string(), "1970-01-01T00:00:00Z");
}

#[test]
fn sessions_are_released_on_every_outcome() {
    let repo = repository_with(5);
    let catalog = catalog(&repo, settings());

    let _ = catalog.get_record(&external("1/1000"), "oai_dc");
    let _ = catalog.get_record(&external("9/9"), "oai_dc");
    let _ = catalog.list_records(None, None, Some("scope_9_9"), "oai_dc");
    let _ = catalog.list_records(Some("2030-01-01"), None, None, "oai_dc");
    let _ = catalog.list_records_resume("////x");
    let _ = catalog.list_sets();
    assert_eq!(repo.open_sessions(), 0);

    repo.set_failing(true);
    assert!(matches!(
        catalog.list_records(None, None, None, "oai_dc"),
        Err(CatalogError::InternalServerError(_))
    ));
    assert!(matches!(
        catalog.get_record(&external("1/1000"), "oai_dc"),
        Err(CatalogError::InternalServerError(_))
    ));
    assert!(matches!(catalog.list_sets(), Err(CatalogError::InternalServerError(_))));
    assert_eq!(repo.open_sessions(), 0);

    repo.set_failing(false);
    assert!(catalog.list_records(None, None, None, "oai_dc").is_ok());
}

/// Delegates to [`SnapshotHarvester`] after sleeping.
struct SlowHarvester(Duration);

#[async_trait::async_trait]
impl HarvestExecutor for SlowHarvester {
    async fn harvest(
        &self,
        session: &dyn StoreSession,
        query: &HarvestQuery,
    ) -> Result<Vec<HarvestEntry>, StoreError> {
        tokio::time::sleep(self.0).await;
        SnapshotHarvester.harvest(session, query).await
    }

    async fn single(
        &self,
        session: &dyn StoreSession,
        handle: &str,
        include_items: bool,
    ) -> Result<Option<HarvestEntry>, StoreError> {
        tokio::time::sleep(self.0).await;
        SnapshotHarvester.single(session, handle, include_items).await
    }
}

#[test]
fn slow_harvests_time_out_as_internal_errors() {
    let repo = repository_with(3);
    let catalog = Catalog::new(
        CatalogSettings {
            harvest_timeout_secs: 1,
            ..settings()
        },
        Arc::new(repo.clone()),
        Arc::new(SlowHarvester(Duration::from_secs(5))),
    )
    .unwrap();

    assert!(matches!(
        catalog.list_records(None, None, None, "oai_dc"),
        Err(CatalogError::InternalServerError(_))
    ));
    assert!(matches!(
        catalog.get_record(&external("1/1000"), "oai_dc"),
        Err(CatalogError::InternalServerError(_))
    ));
    assert_eq!(repo.open_sessions(), 0);
}

#[test]
fn invalid_settings_refuse_to_build() {
    let repo = repository_with(0);
    let built = Catalog::new(
        CatalogSettings {
            max_page_size: 0,
            ..settings()
        },
        Arc::new(repo),
        Arc::new(SnapshotHarvester),
    );
    assert!(matches!(built, Err(catalog_engine::BuildError::Settings(_))));
}
