use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::api::{check_detail, get_json, Transport, TransportKind};
use crate::error::CatalogError;
use crate::state::{
    effect_text, trailing_id, AbilityEntry, CreatureDetail, CreatureSummary, FlavorText, Listing,
    MoveDetail, MoveEntry, MoveLearn, SpeciesDetail, SpeciesRef, SpriteSet, StatEntry, TypeEntry,
};

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct NamedResource {
    name: String,
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ListResponse {
    count: usize,
    results: Vec<NamedResource>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct PokemonResponse {
    id: u32,
    name: String,
    height: u32,
    weight: u32,
    base_experience: Option<u32>,
    types: Vec<PokemonTypeSlot>,
    stats: Vec<PokemonStatSlot>,
    abilities: Vec<PokemonAbilitySlot>,
    moves: Vec<PokemonMoveSlot>,
    species: NamedResource,
    sprites: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonTypeSlot {
    slot: u8,
    #[serde(rename = "type")]
    type_info: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonStatSlot {
    base_stat: u16,
    effort: u8,
    stat: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonAbilitySlot {
    ability: NamedResource,
    is_hidden: bool,
    slot: u8,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonMoveSlot {
    #[serde(rename = "move")]
    move_info: NamedResource,
    #[serde(default)]
    version_group_details: Vec<VersionGroupDetail>,
}

#[derive(Clone, Debug, Deserialize)]
struct VersionGroupDetail {
    level_learned_at: u16,
    move_learn_method: NamedResource,
    version_group: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct PokemonSpeciesResponse {
    id: u32,
    name: String,
    flavor_text_entries: Vec<FlavorTextEntry>,
    is_legendary: bool,
    is_mythical: bool,
    is_baby: bool,
    capture_rate: u16,
    base_happiness: Option<u16>,
}

#[derive(Clone, Debug, Deserialize)]
struct FlavorTextEntry {
    flavor_text: String,
    language: NamedResource,
    version: Option<NamedResource>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct MoveDetailResponse {
    id: u32,
    name: String,
    power: Option<u16>,
    accuracy: Option<u16>,
    pp: Option<u16>,
    #[serde(rename = "type")]
    type_info: NamedResource,
    damage_class: Option<NamedResource>,
    #[serde(default)]
    effect_entries: Vec<EffectEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct EffectEntry {
    #[serde(default)]
    effect: String,
    #[serde(default)]
    short_effect: String,
    language: NamedResource,
}

/// PokeAPI over plain REST: one list call, then one call per detail.
pub struct RestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl RestTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }
}

#[async_trait]
impl Transport for RestTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Rest
    }

    async fn fetch_listing(&self, limit: usize) -> Result<Listing, CatalogError> {
        let url = format!("{}/pokemon?limit={limit}&offset=0", self.base_url);
        debug!(%url, "fetching rest listing");
        let response: ListResponse = get_json(&self.client, &url, "pokemon listing").await?;
        Ok(listing_from_response(response))
    }

    async fn fetch_detail(&self, name: &str) -> Result<CreatureDetail, CatalogError> {
        let name = name.trim().to_lowercase();
        let url = format!("{}/pokemon/{name}", self.base_url);
        let response: PokemonResponse = get_json(&self.client, &url, &name).await?;
        detail_from_response(response)
    }

    async fn fetch_species(&self, species_url: &str) -> Result<SpeciesDetail, CatalogError> {
        let response: PokemonSpeciesResponse =
            get_json(&self.client, species_url, species_url).await?;
        Ok(species_from_response(response))
    }

    async fn fetch_move(&self, name: &str) -> Result<MoveDetail, CatalogError> {
        let name = name.trim().to_lowercase();
        let url = format!("{}/move/{name}", self.base_url);
        let response: MoveDetailResponse =
            get_json(&self.client, &url, &format!("move {name}")).await?;
        Ok(move_from_response(response))
    }
}

pub(crate) fn listing_from_response(response: ListResponse) -> Listing {
    let mut results: Vec<CreatureSummary> = response
        .results
        .into_iter()
        .filter_map(|entry| {
            let id = trailing_id(&entry.url)?;
            Some(CreatureSummary {
                id,
                name: entry.name,
                url: entry.url,
            })
        })
        .collect();
    results.sort_by_key(|summary| summary.id);
    Listing::Summary {
        results,
        count: response.count,
    }
}

pub(crate) fn detail_from_response(
    response: PokemonResponse,
) -> Result<CreatureDetail, CatalogError> {
    let mut types: Vec<TypeEntry> = response
        .types
        .into_iter()
        .map(|slot| TypeEntry {
            slot: slot.slot,
            name: slot.type_info.name,
        })
        .collect();
    types.sort_by_key(|entry| entry.slot);

    let mut abilities: Vec<AbilityEntry> = response
        .abilities
        .into_iter()
        .map(|slot| AbilityEntry {
            name: slot.ability.name,
            is_hidden: slot.is_hidden,
            slot: slot.slot,
        })
        .collect();
    abilities.sort_by_key(|entry| entry.slot);

    let stats = response
        .stats
        .into_iter()
        .map(|slot| StatEntry {
            name: slot.stat.name,
            base_stat: slot.base_stat,
            effort: slot.effort,
        })
        .collect();
    let moves = response
        .moves
        .into_iter()
        .map(|slot| MoveEntry {
            name: slot.move_info.name,
            learned_by: slot
                .version_group_details
                .into_iter()
                .map(|detail| MoveLearn {
                    method: detail.move_learn_method.name,
                    level_learned_at: detail.level_learned_at,
                    version_group: detail.version_group.name,
                })
                .collect(),
        })
        .collect();

    check_detail(CreatureDetail {
        id: response.id,
        name: response.name,
        height: response.height,
        weight: response.weight,
        base_experience: response.base_experience,
        abilities,
        stats,
        types,
        moves,
        species: SpeciesRef {
            name: response.species.name,
            url: response.species.url,
        },
        sprites: SpriteSet::from_value(&response.sprites),
        species_details: None,
    })
}

pub(crate) fn species_from_response(response: PokemonSpeciesResponse) -> SpeciesDetail {
    SpeciesDetail {
        id: response.id,
        name: response.name,
        flavor_text_entries: response
            .flavor_text_entries
            .into_iter()
            .map(|entry| FlavorText {
                text: entry.flavor_text,
                language: entry.language.name,
                version: entry.version.map(|version| version.name),
            })
            .collect(),
        is_legendary: response.is_legendary,
        is_mythical: response.is_mythical,
        is_baby: response.is_baby,
        capture_rate: response.capture_rate,
        base_happiness: response.base_happiness,
    }
}

pub(crate) fn move_from_response(response: MoveDetailResponse) -> MoveDetail {
    let effect = response
        .effect_entries
        .iter()
        .find(|entry| entry.language.name == "en")
        .and_then(|entry| effect_text(&entry.effect, &entry.short_effect));
    MoveDetail {
        id: response.id,
        name: response.name,
        type_name: response.type_info.name,
        power: response.power,
        accuracy: response.accuracy,
        pp: response.pp,
        damage_class: response
            .damage_class
            .map(|class| class.name)
            .unwrap_or_default(),
        effect,
    }
}
