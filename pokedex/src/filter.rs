use std::collections::{BTreeSet, HashMap};

use crate::state::{CachedPayload, CreatureDetail, CreatureSummary, MoveDetail};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub search: Option<String>,
    pub type_name: Option<String>,
}

impl ListingFilter {
    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.type_name.is_none()
    }

    /// Filters a cached listing, using its full data for type matching.
    pub fn apply<'a>(&self, payload: &'a CachedPayload) -> Vec<&'a CreatureSummary> {
        self.apply_with_details(payload.results(), payload.full_data().unwrap_or_default())
    }

    /// Summaries whose detail is missing never match a type filter.
    pub fn apply_with_details<'a>(
        &self,
        summaries: &'a [CreatureSummary],
        details: &[CreatureDetail],
    ) -> Vec<&'a CreatureSummary> {
        let query = self
            .search
            .as_deref()
            .map(|query| query.trim().to_lowercase())
            .unwrap_or_default();
        let type_name = self.type_name.as_deref().map(str::to_lowercase);
        let by_id: HashMap<u32, &CreatureDetail> =
            details.iter().map(|detail| (detail.id, detail)).collect();

        summaries
            .iter()
            .filter(|summary| {
                let matches_query = query.is_empty()
                    || summary.name.to_lowercase().contains(&query)
                    || summary.id.to_string().contains(&query);
                let matches_type = match &type_name {
                    Some(type_name) => by_id
                        .get(&summary.id)
                        .is_some_and(|detail| detail.has_type(type_name)),
                    None => true,
                };
                matches_query && matches_type
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MoveSort {
    #[default]
    Name,
    Power,
    Accuracy,
    Pp,
}

/// Search, type filter and ordering over a creature's learnable moves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveFilter {
    /// Matched against name, type and effect text.
    pub search: Option<String>,
    pub type_name: Option<String>,
    pub sort: MoveSort,
    pub descending: bool,
}

impl MoveFilter {
    pub fn apply<'a>(&self, moves: &'a [MoveDetail]) -> Vec<&'a MoveDetail> {
        let query = self
            .search
            .as_deref()
            .map(|query| query.trim().to_lowercase())
            .unwrap_or_default();
        let type_name = self.type_name.as_deref().map(str::to_lowercase);

        let mut found: Vec<&MoveDetail> = moves
            .iter()
            .filter(|found| {
                query.is_empty()
                    || found.name.to_lowercase().contains(&query)
                    || found.type_name.to_lowercase().contains(&query)
                    || found
                        .effect
                        .as_deref()
                        .is_some_and(|effect| effect.to_lowercase().contains(&query))
            })
            .filter(|found| {
                type_name
                    .as_deref()
                    .map_or(true, |type_name| found.type_name == type_name)
            })
            .collect();

        // Unknown power or accuracy sorts below every known value.
        found.sort_by(|a, b| {
            let ordering = match self.sort {
                MoveSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                MoveSort::Power => a.power.cmp(&b.power),
                MoveSort::Accuracy => a.accuracy.cmp(&b.accuracy),
                MoveSort::Pp => a.pp.cmp(&b.pp),
            };
            if self.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        found
    }
}

/// Distinct move types, sorted.
pub fn move_types(moves: &[MoveDetail]) -> Vec<String> {
    moves
        .iter()
        .map(|found| found.type_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TransportKind;
    use crate::state::{AbilityEntry, Listing, SpeciesRef, SpriteSet, TypeEntry};

    fn detail(id: u32, name: &str, types: &[&str]) -> CreatureDetail {
        CreatureDetail {
            id,
            name: name.to_string(),
            height: 1,
            weight: 1,
            base_experience: None,
            abilities: vec![AbilityEntry {
                name: "overgrow".into(),
                is_hidden: false,
                slot: 1,
            }],
            stats: Vec::new(),
            types: types
                .iter()
                .enumerate()
                .map(|(idx, name)| TypeEntry {
                    slot: idx as u8 + 1,
                    name: name.to_string(),
                })
                .collect(),
            moves: Vec::new(),
            species: SpeciesRef {
                name: name.to_string(),
                url: String::new(),
            },
            sprites: SpriteSet::default(),
            species_details: None,
        }
    }

    fn payload() -> CachedPayload {
        let details = vec![
            detail(1, "bulbasaur", &["grass", "poison"]),
            detail(4, "charmander", &["fire"]),
            detail(25, "pikachu", &["electric"]),
            detail(125, "electabuzz", &["electric"]),
        ];
        let results = details
            .iter()
            .map(|detail| detail.summary("https://pokeapi.co/api/v2"))
            .collect::<Vec<_>>();
        CachedPayload::new(
            TransportKind::Graphql,
            Listing::SummaryWithDetail {
                count: results.len(),
                results,
                details,
            },
        )
    }

    fn names(found: Vec<&CreatureSummary>) -> Vec<String> {
        found.into_iter().map(|summary| summary.name.clone()).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let payload = payload();
        let filter = ListingFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&payload).len(), 4);
    }

    #[test]
    fn search_matches_name_or_id() {
        let payload = payload();
        let by_name = ListingFilter {
            search: Some(" CHAR ".into()),
            type_name: None,
        };
        assert_eq!(names(by_name.apply(&payload)), vec!["charmander"]);

        let by_id = ListingFilter {
            search: Some("25".into()),
            type_name: None,
        };
        assert_eq!(names(by_id.apply(&payload)), vec!["pikachu", "electabuzz"]);
    }

    #[test]
    fn type_and_search_combine() {
        let payload = payload();
        let filter = ListingFilter {
            search: Some("elect".into()),
            type_name: Some("Electric".into()),
        };
        assert_eq!(names(filter.apply(&payload)), vec!["electabuzz"]);
    }

    #[test]
    fn type_filter_without_details_matches_nothing() {
        let payload = payload();
        let filter = ListingFilter {
            search: None,
            type_name: Some("fire".into()),
        };
        assert!(filter
            .apply_with_details(payload.results(), &[])
            .is_empty());
    }

    fn move_detail(name: &str, type_name: &str, power: Option<u16>, effect: &str) -> MoveDetail {
        MoveDetail {
            id: 0,
            name: name.to_string(),
            type_name: type_name.to_string(),
            power,
            accuracy: Some(100),
            pp: Some(10),
            damage_class: "special".into(),
            effect: Some(effect.to_string()),
        }
    }

    fn moves() -> Vec<MoveDetail> {
        vec![
            move_detail("thunderbolt", "electric", Some(90), "May paralyze the target."),
            move_detail("growl", "normal", None, "Lowers the target's Attack."),
            move_detail("Quick-Attack", "normal", Some(40), "Strikes first."),
            move_detail("thunder-wave", "electric", None, "Paralyzes the target."),
        ]
    }

    fn move_names(found: Vec<&MoveDetail>) -> Vec<&str> {
        found.into_iter().map(|found| found.name.as_str()).collect()
    }

    #[test]
    fn moves_sort_by_name_ignoring_case() {
        let moves = moves();
        assert_eq!(
            move_names(MoveFilter::default().apply(&moves)),
            vec!["growl", "Quick-Attack", "thunder-wave", "thunderbolt"]
        );
    }

    #[test]
    fn move_search_reads_effect_text() {
        let moves = moves();
        let filter = MoveFilter {
            search: Some("PARALY".into()),
            ..MoveFilter::default()
        };
        assert_eq!(
            move_names(filter.apply(&moves)),
            vec!["thunder-wave", "thunderbolt"]
        );
    }

    #[test]
    fn moves_by_power_put_unknown_last_when_descending() {
        let moves = moves();
        let filter = MoveFilter {
            type_name: None,
            sort: MoveSort::Power,
            descending: true,
            ..MoveFilter::default()
        };
        assert_eq!(
            move_names(filter.apply(&moves)),
            vec!["thunderbolt", "Quick-Attack", "growl", "thunder-wave"]
        );
    }

    #[test]
    fn move_type_filter_and_types() {
        let moves = moves();
        let filter = MoveFilter {
            type_name: Some("Electric".into()),
            sort: MoveSort::Power,
            ..MoveFilter::default()
        };
        assert_eq!(
            move_names(filter.apply(&moves)),
            vec!["thunder-wave", "thunderbolt"]
        );
        assert_eq!(move_types(&moves), vec!["electric", "normal"]);
    }
}
