use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::api::TransportKind;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureSummary {
    pub id: u32,
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatureDetail {
    pub id: u32,
    pub name: String,
    pub height: u32,
    pub weight: u32,
    pub base_experience: Option<u32>,
    pub abilities: Vec<AbilityEntry>,
    pub stats: Vec<StatEntry>,
    pub types: Vec<TypeEntry>,
    pub moves: Vec<MoveEntry>,
    pub species: SpeciesRef,
    pub sprites: SpriteSet,
    pub species_details: Option<SpeciesDetail>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityEntry {
    pub name: String,
    pub is_hidden: bool,
    pub slot: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub name: String,
    pub base_stat: u16,
    pub effort: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub slot: u8,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEntry {
    pub name: String,
    pub learned_by: Vec<MoveLearn>,
}

/// How and where a move is learned. Empty for GraphQL, which does not
/// request version group details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveLearn {
    pub method: String,
    pub level_learned_at: u16,
    pub version_group: String,
}

/// A move looked up on its own, e.g. to choose a team member's moves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDetail {
    pub id: u32,
    pub name: String,
    pub type_name: String,
    pub power: Option<u16>,
    pub accuracy: Option<u16>,
    pub pp: Option<u16>,
    pub damage_class: String,
    /// English effect text.
    pub effect: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesRef {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSet {
    pub front_default: Option<String>,
    pub front_shiny: Option<String>,
    pub back_default: Option<String>,
    pub back_shiny: Option<String>,
    pub official_artwork: Option<String>,
    pub animated_front_default: Option<String>,
    pub animated_front_shiny: Option<String>,
}

impl SpriteSet {
    pub fn from_value(sprites: &serde_json::Value) -> Self {
        Self {
            front_default: pointer_string(sprites, "/front_default"),
            front_shiny: pointer_string(sprites, "/front_shiny"),
            back_default: pointer_string(sprites, "/back_default"),
            back_shiny: pointer_string(sprites, "/back_shiny"),
            official_artwork: pointer_string(sprites, "/other/official-artwork/front_default"),
            animated_front_default: pointer_string(
                sprites,
                "/versions/generation-v/black-white/animated/front_default",
            ),
            animated_front_shiny: pointer_string(
                sprites,
                "/versions/generation-v/black-white/animated/front_shiny",
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDetail {
    pub id: u32,
    pub name: String,
    pub flavor_text_entries: Vec<FlavorText>,
    pub is_legendary: bool,
    pub is_mythical: bool,
    pub is_baby: bool,
    pub capture_rate: u16,
    pub base_happiness: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorText {
    pub text: String,
    pub language: String,
    pub version: Option<String>,
}

impl SpeciesDetail {
    pub fn flavor_text(&self, language: &str) -> Option<String> {
        self.flavor_text_entries
            .iter()
            .find(|entry| entry.language == language)
            .map(|entry| sanitize_text(&entry.text))
    }
}

impl CreatureDetail {
    pub fn type_names(&self) -> Vec<String> {
        self.types.iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn move_names(&self) -> Vec<String> {
        self.moves.iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn ability_names(&self) -> Vec<String> {
        self.abilities.iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn stat(&self, name: &str) -> Option<u16> {
        self.stats
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.base_stat)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.iter().any(|entry| entry.name == name)
    }

    pub fn summary(&self, rest_base: &str) -> CreatureSummary {
        CreatureSummary {
            id: self.id,
            name: self.name.clone(),
            url: format!("{rest_base}/pokemon/{}/", self.id),
        }
    }
}

/// Listing shape chosen by the transport that produced it.
#[derive(Clone, Debug, PartialEq)]
pub enum Listing {
    Summary {
        results: Vec<CreatureSummary>,
        count: usize,
    },
    SummaryWithDetail {
        results: Vec<CreatureSummary>,
        count: usize,
        details: Vec<CreatureDetail>,
    },
}

impl Listing {
    pub fn results(&self) -> &[CreatureSummary] {
        match self {
            Listing::Summary { results, .. } | Listing::SummaryWithDetail { results, .. } => {
                results
            }
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Listing::Summary { count, .. } | Listing::SummaryWithDetail { count, .. } => *count,
        }
    }

    pub fn details(&self) -> Option<&[CreatureDetail]> {
        match self {
            Listing::Summary { .. } => None,
            Listing::SummaryWithDetail { details, .. } => Some(details),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CachedPayload {
    pub transport: TransportKind,
    pub listing: Listing,
    pub fetched_at: Instant,
}

impl CachedPayload {
    pub fn new(transport: TransportKind, listing: Listing) -> Self {
        Self {
            transport,
            listing,
            fetched_at: Instant::now(),
        }
    }

    pub fn results(&self) -> &[CreatureSummary] {
        self.listing.results()
    }

    pub fn count(&self) -> usize {
        self.listing.count()
    }

    pub fn full_data(&self) -> Option<&[CreatureDetail]> {
        self.listing.details()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }

    pub fn find_detail(&self, name: &str) -> Option<&CreatureDetail> {
        let name = name.to_lowercase();
        self.full_data()?.iter().find(|detail| detail.name == name)
    }
}

/// Numeric id from the last non-empty path segment, e.g.
/// `https://pokeapi.co/api/v2/pokemon-species/25/` -> 25.
pub fn trailing_id(url: &str) -> Option<u32> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}

pub(crate) fn sanitize_text(text: &str) -> String {
    text.replace(['\n', '\u{000C}'], " ")
}

/// Long effect text, falling back to the short one.
pub(crate) fn effect_text(effect: &str, short_effect: &str) -> Option<String> {
    [effect, short_effect]
        .into_iter()
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(sanitize_text)
}

pub(crate) fn pointer_string(value: &serde_json::Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
}
