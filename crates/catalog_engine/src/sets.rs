use catalog_core::{
    encode_set_spec, parse_set_spec, CatalogError, ScopeContainer, ScopeKind, SetDescriptor,
};
use catalog_logging::{catalog_info, log_header};

use crate::store::{StoreSession, StoredObject};

/// Maps set specs to scope containers and lists the repository's sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetResolver {
    list_communities: bool,
}

impl SetResolver {
    /// With `list_communities`, communities are listed as sets after the collections.
    pub fn new(list_communities: bool) -> Self {
        Self { list_communities }
    }

    /// `None` means no scoping. Specs outside the grammar, unknown handles and
    /// handles of plain items are all `BadArgument`.
    pub fn resolve(
        &self,
        session: &dyn StoreSession,
        set_spec: Option<&str>,
    ) -> Result<Option<ScopeContainer>, CatalogError> {
        let Some(spec) = set_spec else {
            return Ok(None);
        };
        let container_id = parse_set_spec(spec)?;
        match session.resolve(&container_id)? {
            Some(StoredObject::Container(container)) => Ok(Some(container)),
            Some(StoredObject::Item(_)) => Err(CatalogError::BadArgument(format!(
                "set spec '{spec}' names an item, not a scope"
            ))),
            None => Err(CatalogError::BadArgument(format!(
                "set spec '{spec}' names no known scope"
            ))),
        }
    }

    pub fn list_all_sets(&self, session: &dyn StoreSession) -> Result<Vec<SetDescriptor>, CatalogError> {
        let mut containers = session.containers()?;
        containers.sort_by(|a, b| a.id.cmp(&b.id));

        let collections = containers.iter().filter(|c| c.kind == ScopeKind::Collection);
        let communities = containers
            .iter()
            .filter(|c| self.list_communities && c.kind == ScopeKind::Community);

        Ok(collections.chain(communities).map(describe).collect())
    }
}

fn describe(container: &ScopeContainer) -> SetDescriptor {
    let name = match &container.name {
        Some(name) => name.clone(),
        None => {
            catalog_info!(
                "{}",
                log_header("oai_error", &[("null_set_name_for_set_id", Some(container.id.as_str()))])
            );
            String::new()
        }
    };
    SetDescriptor {
        spec: encode_set_spec(&container.id),
        name,
    }
}
