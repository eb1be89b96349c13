//! Normalized search parameters

/// The parameters every adapter receives, already normalized by the
/// orchestrator: the free-text term is trimmed and the limit is clamped.
/// Adapters ignore the facets their upstream cannot express (e.g. podcast
/// directories ignore `country` and `tag`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text term. May be empty for browse/filter-only queries.
    pub text: String,
    pub country: Option<String>,
    pub language: Option<String>,
    /// Genre tag filter (stations only).
    pub tag: Option<String>,
    /// Maximum items the provider should return.
    pub limit: u32,
}

impl SearchQuery {
    /// Plain free-text query, mostly for tests.
    pub fn term(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: 20,
            ..Self::default()
        }
    }

    /// True when any search facet at all was supplied.
    pub fn has_facet(&self) -> bool {
        !self.text.is_empty()
            || self.country.is_some()
            || self.language.is_some()
            || self.tag.is_some()
    }
}
