use crate::CatalogError;

/// Literal prefix every set spec starts with.
pub const SET_SPEC_PREFIX: &str = "scope_";
const PATH_SEPARATOR: char = '/';
const SAFE_DELIMITER: char = '_';

/// Set spec naming the container `container_id`, e.g. `1/2` becomes `scope_1_2`.
pub fn encode_set_spec(container_id: &str) -> String {
    let mut spec = String::with_capacity(SET_SPEC_PREFIX.len() + container_id.len());
    spec.push_str(SET_SPEC_PREFIX);
    spec.extend(container_id.chars().map(|c| {
        if c == PATH_SEPARATOR {
            SAFE_DELIMITER
        } else {
            c
        }
    }));
    spec
}

/// Container id named by `spec`. Whether the container exists is decided by the store.
pub fn parse_set_spec(spec: &str) -> Result<String, CatalogError> {
    let encoded = spec
        .strip_prefix(SET_SPEC_PREFIX)
        .ok_or_else(|| CatalogError::BadArgument(format!("set spec '{spec}' has no scope prefix")))?;
    if encoded.is_empty() {
        return Err(CatalogError::BadArgument(format!("set spec '{spec}' names no scope")));
    }
    // A literal separator would give two spellings for one container.
    if encoded.contains(PATH_SEPARATOR) || encoded.chars().any(char::is_whitespace) {
        return Err(CatalogError::BadArgument(format!(
            "set spec '{spec}' contains reserved characters"
        )));
    }
    Ok(encoded.replace(SAFE_DELIMITER, "/"))
}
