//! Pokemon catalog over PokeAPI with a team builder.
//!
//! [`catalog::Catalog`] hides whether data comes from the REST or the GraphQL
//! endpoint and caches the listing; [`team::TeamBuilder`] assembles a team of
//! up to six members.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod state;
pub mod team;

pub use api::{Transport, TransportKind};
pub use catalog::Catalog;
pub use config::CatalogConfig;
pub use error::{CatalogError, TeamRejection};
pub use team::{TeamBuilder, TeamUpdate};
