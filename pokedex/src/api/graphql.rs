use std::collections::HashSet;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{check_detail, post_json, Transport, TransportKind};
use crate::error::CatalogError;
use crate::state::{
    effect_text, trailing_id, AbilityEntry, CreatureDetail, FlavorText, Listing, MoveDetail,
    MoveEntry, SpeciesDetail, SpeciesRef, SpriteSet, StatEntry, TypeEntry,
};

const POKEMON_FIELDS: &str = r#"
    id
    name
    height
    weight
    base_experience
    pokemonsprites {
      sprites
    }
    pokemonabilities {
      is_hidden
      slot
      ability {
        name
      }
    }
    pokemonstats {
      base_stat
      effort
      stat {
        name
      }
    }
    pokemontypes {
      slot
      type {
        name
      }
    }
    pokemonmoves {
      move {
        name
      }
    }
    pokemonspecy {
      id
      name
      base_happiness
      capture_rate
      is_baby
      is_legendary
      is_mythical
      pokemonspeciesflavortexts(where: {language: {name: {_eq: "en"}}}, limit: 1) {
        flavor_text
        language {
          name
        }
      }
    }
"#;

const SPECIES_QUERY: &str = r#"
  query GetSpeciesData($id: Int!) {
    pokemonspecies(where: {id: {_eq: $id}}) {
      id
      name
      base_happiness
      capture_rate
      is_baby
      is_legendary
      is_mythical
      pokemonspeciesflavortexts(where: {language: {name: {_eq: "en"}}}) {
        flavor_text
        language {
          name
        }
      }
    }
  }
"#;

const MOVE_QUERY: &str = r#"
  query GetMoveDetail($name: String!) {
    move(where: {name: {_eq: $name}}) {
      id
      name
      power
      accuracy
      pp
      type {
        name
      }
      movedamageclass {
        name
      }
      moveeffect {
        moveeffecteffecttexts(where: {language: {name: {_eq: "en"}}}, limit: 1) {
          effect
          short_effect
        }
      }
    }
  }
"#;

fn list_query() -> String {
    format!(
        "query GetPokemonList($limit: Int!, $offset: Int!) {{\n  pokemon(limit: $limit, offset: $offset, order_by: {{id: asc}}) {{{POKEMON_FIELDS}  }}\n}}"
    )
}

fn detail_query() -> String {
    format!(
        "query GetPokemonDetail($name: String!) {{\n  pokemon(where: {{name: {{_eq: $name}}}}) {{{POKEMON_FIELDS}  }}\n}}"
    )
}

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphqlErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PokemonData {
    pokemon: Vec<GqlPokemon>,
}

#[derive(Debug, Deserialize)]
struct SpeciesData {
    pokemonspecies: Vec<GqlSpecies>,
}

#[derive(Debug, Deserialize)]
struct MoveData {
    #[serde(rename = "move")]
    moves: Vec<GqlMoveDetail>,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlName {
    name: String,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlPokemon {
    id: u32,
    name: String,
    height: Option<u32>,
    weight: Option<u32>,
    base_experience: Option<u32>,
    #[serde(default)]
    pokemonsprites: Vec<GqlSprites>,
    #[serde(default)]
    pokemonabilities: Vec<GqlAbility>,
    #[serde(default)]
    pokemonstats: Vec<GqlStat>,
    #[serde(default)]
    pokemontypes: Vec<GqlType>,
    #[serde(default)]
    pokemonmoves: Vec<GqlMove>,
    pokemonspecy: GqlSpecies,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlSprites {
    sprites: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlAbility {
    is_hidden: bool,
    slot: u8,
    ability: Option<GqlName>,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlStat {
    base_stat: u16,
    effort: u8,
    stat: Option<GqlName>,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlType {
    slot: u8,
    #[serde(rename = "type")]
    type_info: Option<GqlName>,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlMove {
    #[serde(rename = "move")]
    move_info: Option<GqlName>,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlMoveDetail {
    id: u32,
    name: String,
    power: Option<u16>,
    accuracy: Option<u16>,
    pp: Option<u16>,
    #[serde(rename = "type")]
    type_info: Option<GqlName>,
    movedamageclass: Option<GqlName>,
    moveeffect: Option<GqlMoveEffect>,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlMoveEffect {
    #[serde(default)]
    moveeffecteffecttexts: Vec<GqlEffectText>,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlEffectText {
    #[serde(default)]
    effect: String,
    #[serde(default)]
    short_effect: String,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlSpecies {
    id: u32,
    name: String,
    base_happiness: Option<u16>,
    capture_rate: Option<u16>,
    is_baby: bool,
    is_legendary: bool,
    is_mythical: bool,
    #[serde(default)]
    pokemonspeciesflavortexts: Vec<GqlFlavorText>,
}

#[derive(Clone, Debug, Deserialize)]
struct GqlFlavorText {
    flavor_text: String,
    language: Option<GqlName>,
}

/// PokeAPI's GraphQL endpoint: the whole listing, nested details included,
/// in one round trip.
pub struct GraphqlTransport {
    client: reqwest::Client,
    endpoint: String,
    rest_base: String,
}

impl GraphqlTransport {
    /// `rest_base` is used to synthesize REST-style resource URLs so records
    /// look the same whichever transport produced them.
    pub fn new(endpoint: impl Into<String>, rest_base: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, rest_base)
    }

    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        rest_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            rest_base: rest_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, CatalogError> {
        let request = GraphqlRequest { query, variables };
        let response: GraphqlResponse<T> = post_json(&self.client, &self.endpoint, &request).await?;
        unwrap_response(response)
    }
}

#[async_trait]
impl Transport for GraphqlTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Graphql
    }

    async fn fetch_listing(&self, limit: usize) -> Result<Listing, CatalogError> {
        debug!(endpoint = %self.endpoint, limit, "fetching graphql listing");
        let data: PokemonData = self
            .query(
                &list_query(),
                serde_json::json!({ "limit": limit, "offset": 0 }),
            )
            .await?;
        Ok(listing_from_data(data, &self.rest_base))
    }

    async fn fetch_detail(&self, name: &str) -> Result<CreatureDetail, CatalogError> {
        let name = name.trim().to_lowercase();
        let data: PokemonData = self
            .query(&detail_query(), serde_json::json!({ "name": name }))
            .await?;
        let pokemon = data
            .pokemon
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(name.clone()))?;
        normalize_pokemon(pokemon, &self.rest_base)
    }

    async fn fetch_species(&self, species_url: &str) -> Result<SpeciesDetail, CatalogError> {
        let id = trailing_id(species_url)
            .ok_or_else(|| CatalogError::InvalidReference(species_url.to_string()))?;
        let data: SpeciesData = self
            .query(SPECIES_QUERY, serde_json::json!({ "id": id }))
            .await?;
        data.pokemonspecies
            .into_iter()
            .next()
            .map(species_from_gql)
            .ok_or_else(|| CatalogError::NotFound(format!("species {id}")))
    }

    async fn fetch_move(&self, name: &str) -> Result<MoveDetail, CatalogError> {
        let name = name.trim().to_lowercase();
        let data: MoveData = self
            .query(MOVE_QUERY, serde_json::json!({ "name": name }))
            .await?;
        let record = data
            .moves
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(format!("move {name}")))?;
        move_from_gql(record)
    }
}

fn unwrap_response<T>(response: GraphqlResponse<T>) -> Result<T, CatalogError> {
    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        let messages: Vec<String> = errors.into_iter().map(|error| error.message).collect();
        return Err(CatalogError::UpstreamData(format!(
            "GraphQL errors: {}",
            messages.join(", ")
        )));
    }
    response
        .data
        .ok_or_else(|| CatalogError::UpstreamData("GraphQL response has no data".to_string()))
}

fn listing_from_data(data: PokemonData, rest_base: &str) -> Listing {
    let mut details: Vec<CreatureDetail> = data
        .pokemon
        .into_iter()
        .filter_map(|pokemon| {
            let name = pokemon.name.clone();
            match normalize_pokemon(pokemon, rest_base) {
                Ok(detail) => Some(detail),
                Err(err) => {
                    warn!(%name, error = %err, "skipping malformed graphql record");
                    None
                }
            }
        })
        .collect();
    details.sort_by_key(|detail| detail.id);
    let results: Vec<_> = details
        .iter()
        .map(|detail| detail.summary(rest_base))
        .collect();
    Listing::SummaryWithDetail {
        count: results.len(),
        results,
        details,
    }
}

/// Flattens a nested GraphQL record into the REST-shaped detail.
fn normalize_pokemon(pokemon: GqlPokemon, rest_base: &str) -> Result<CreatureDetail, CatalogError> {
    let mut types: Vec<TypeEntry> = pokemon
        .pokemontypes
        .into_iter()
        .filter_map(|entry| {
            Some(TypeEntry {
                slot: entry.slot,
                name: entry.type_info?.name,
            })
        })
        .collect();
    types.sort_by_key(|entry| entry.slot);

    let mut abilities: Vec<AbilityEntry> = pokemon
        .pokemonabilities
        .into_iter()
        .filter_map(|entry| {
            Some(AbilityEntry {
                name: entry.ability?.name,
                is_hidden: entry.is_hidden,
                slot: entry.slot,
            })
        })
        .collect();
    abilities.sort_by_key(|entry| entry.slot);

    let stats = pokemon
        .pokemonstats
        .into_iter()
        .filter_map(|entry| {
            Some(StatEntry {
                name: entry.stat?.name,
                base_stat: entry.base_stat,
                effort: entry.effort,
            })
        })
        .collect();

    // One row per version group upstream; REST lists each move once.
    let mut seen = HashSet::new();
    let moves = pokemon
        .pokemonmoves
        .into_iter()
        .filter_map(|entry| entry.move_info.map(|info| info.name))
        .filter(|name| seen.insert(name.clone()))
        .map(|name| MoveEntry {
            name,
            learned_by: Vec::new(),
        })
        .collect();

    let sprites = sprite_value(&pokemon.pokemonsprites);
    let species = SpeciesRef {
        name: pokemon.pokemonspecy.name.clone(),
        url: format!("{rest_base}/pokemon-species/{}/", pokemon.pokemonspecy.id),
    };

    check_detail(CreatureDetail {
        id: pokemon.id,
        name: pokemon.name,
        height: pokemon.height.unwrap_or_default(),
        weight: pokemon.weight.unwrap_or_default(),
        base_experience: pokemon.base_experience,
        abilities,
        stats,
        types,
        moves,
        species,
        sprites: SpriteSet::from_value(&sprites),
        species_details: Some(species_from_gql(pokemon.pokemonspecy)),
    })
}

/// The sprites column arrives either as a JSON object or as a JSON-encoded string.
fn sprite_value(rows: &[GqlSprites]) -> serde_json::Value {
    match rows.first().map(|row| &row.sprites) {
        Some(serde_json::Value::String(raw)) => {
            serde_json::from_str(raw).unwrap_or(serde_json::Value::Null)
        }
        Some(value) => value.clone(),
        None => serde_json::Value::Null,
    }
}

fn species_from_gql(species: GqlSpecies) -> SpeciesDetail {
    SpeciesDetail {
        id: species.id,
        name: species.name,
        flavor_text_entries: species
            .pokemonspeciesflavortexts
            .into_iter()
            .map(|entry| FlavorText {
                text: entry.flavor_text,
                language: entry.language.map(|language| language.name).unwrap_or_default(),
                version: None,
            })
            .collect(),
        is_legendary: species.is_legendary,
        is_mythical: species.is_mythical,
        is_baby: species.is_baby,
        capture_rate: species.capture_rate.unwrap_or_default(),
        base_happiness: species.base_happiness,
    }
}

fn move_from_gql(record: GqlMoveDetail) -> Result<MoveDetail, CatalogError> {
    let type_name = record
        .type_info
        .map(|info| info.name)
        .ok_or_else(|| CatalogError::UpstreamData(format!("move {} has no type", record.name)))?;
    let effect = record
        .moveeffect
        .and_then(|effect| effect.moveeffecteffecttexts.into_iter().next())
        .and_then(|text| effect_text(&text.effect, &text.short_effect));
    Ok(MoveDetail {
        id: record.id,
        name: record.name,
        type_name,
        power: record.power,
        accuracy: record.accuracy,
        pp: record.pp,
        damage_class: record
            .movedamageclass
            .map(|class| class.name)
            .unwrap_or_default(),
        effect,
    })
}
