//! Upstream transports for PokeAPI.

mod graphql;
mod rest;

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::state::{CreatureDetail, Listing, MoveDetail, SpeciesDetail};

pub use graphql::GraphqlTransport;
pub use rest::RestTransport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Rest,
    Graphql,
}

impl TransportKind {
    pub fn toggled(self) -> Self {
        match self {
            TransportKind::Rest => TransportKind::Graphql,
            TransportKind::Graphql => TransportKind::Rest,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Rest => write!(f, "rest"),
            TransportKind::Graphql => write!(f, "graphql"),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// One upstream call returning up to `limit` creatures.
    async fn fetch_listing(&self, limit: usize) -> Result<Listing, CatalogError>;

    async fn fetch_detail(&self, name: &str) -> Result<CreatureDetail, CatalogError>;

    async fn fetch_species(&self, species_url: &str) -> Result<SpeciesDetail, CatalogError>;

    async fn fetch_move(&self, name: &str) -> Result<MoveDetail, CatalogError>;
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    subject: &str,
) -> Result<T, CatalogError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| CatalogError::Network(err.to_string()))?;
    decode_response(response, subject).await
}

pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
) -> Result<T, CatalogError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|err| CatalogError::Network(err.to_string()))?;
    decode_response(response, url).await
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
    subject: &str,
) -> Result<T, CatalogError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(CatalogError::NotFound(subject.to_string()));
    }
    let response = response
        .error_for_status()
        .map_err(|err| CatalogError::Network(err.to_string()))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|err| CatalogError::Network(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| CatalogError::Parse(err.to_string()))
}

/// Model invariants every transport must satisfy: 1-2 types, at least one ability.
pub(crate) fn check_detail(detail: CreatureDetail) -> Result<CreatureDetail, CatalogError> {
    if detail.types.is_empty() || detail.types.len() > 2 {
        return Err(CatalogError::UpstreamData(format!(
            "{} has {} types",
            detail.name,
            detail.types.len()
        )));
    }
    if detail.abilities.is_empty() {
        return Err(CatalogError::UpstreamData(format!(
            "{} has no abilities",
            detail.name
        )));
    }
    Ok(detail)
}
