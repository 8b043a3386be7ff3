/// Builds and strips the `oai:{hostname}:` prefix of external identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierScheme {
    prefix: String,
}

impl IdentifierScheme {
    pub fn for_host(hostname: &str) -> Self {
        Self {
            prefix: format!("oai:{hostname}:"),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn external_id(&self, handle: &str) -> String {
        format!("{}{handle}", self.prefix)
    }

    /// Returns the local handle, or `None` when the identifier is outside this scheme.
    pub fn local_id<'a>(&self, external: &'a str) -> Option<&'a str> {
        external
            .strip_prefix(self.prefix.as_str())
            .filter(|handle| !handle.is_empty())
    }
}
