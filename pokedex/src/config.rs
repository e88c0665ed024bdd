use std::time::Duration;

use crate::api::TransportKind;

pub const DEFAULT_REST_BASE: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_GRAPHQL_URL: &str = "https://graphql.pokeapi.co/v1beta2";
pub const DEFAULT_LISTING_LIMIT: usize = 500;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogConfig {
    pub rest_base: String,
    pub graphql_url: String,
    pub listing_limit: usize,
    pub cache_ttl: Duration,
    pub transport: TransportKind,
    /// Reject team moves the creature cannot learn.
    pub strict_moves: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            rest_base: DEFAULT_REST_BASE.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            listing_limit: DEFAULT_LISTING_LIMIT,
            cache_ttl: DEFAULT_CACHE_TTL,
            transport: TransportKind::Rest,
            strict_moves: false,
        }
    }
}

impl CatalogConfig {
    pub(crate) fn rest_base(&self) -> &str {
        self.rest_base.trim_end_matches('/')
    }
}
