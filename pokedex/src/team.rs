//! The in-progress team.
//!
//! Every change replaces the whole `Team` behind a fresh `Arc`, so holders of
//! an older snapshot can detect changes with `Arc::ptr_eq`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::TeamRejection;
use crate::state::CreatureDetail;

pub const MAX_TEAM_SIZE: usize = 6;
pub const MAX_MOVES: usize = 4;

const DEFAULT_TEAM_NAME: &str = "New Team";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: u32,
    pub name: String,
    pub detail: CreatureDetail,
    pub selected_moves: Vec<String>,
    pub max_moves: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub members: Vec<TeamMember>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: generate_team_id(),
            name: DEFAULT_TEAM_NAME.to_string(),
            members: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn member(&self, id: u32) -> Option<&TeamMember> {
        self.members.iter().find(|member| member.id == id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStats {
    pub total_members: usize,
    pub total_moves_selected: usize,
    pub completion_percentage: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TeamUpdate {
    Applied,
    Unchanged,
    Rejected(TeamRejection),
}

impl TeamUpdate {
    pub fn is_applied(&self) -> bool {
        matches!(self, TeamUpdate::Applied)
    }
}

pub struct TeamBuilder {
    current: watch::Sender<Arc<Team>>,
    /// Learnable move names per member id, captured when the member joined.
    available_moves: Arc<HashMap<u32, Vec<String>>>,
    strict_moves: bool,
}

impl Default for TeamBuilder {
    fn default() -> Self {
        Self::new(false)
    }
}

impl TeamBuilder {
    /// With `strict_moves`, only moves the creature can learn may be selected.
    pub fn new(strict_moves: bool) -> Self {
        let (current, _) = watch::channel(Arc::new(Team::new()));
        Self {
            current,
            available_moves: Arc::new(HashMap::new()),
            strict_moves,
        }
    }

    pub fn team(&self) -> Arc<Team> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Team>> {
        self.current.subscribe()
    }

    pub fn add_member(&mut self, detail: CreatureDetail) -> TeamUpdate {
        let team = self.team();
        if team.members.len() >= MAX_TEAM_SIZE {
            return self.reject(TeamRejection::TeamFull);
        }
        if team.member(detail.id).is_some() {
            return self.reject(TeamRejection::AlreadyInTeam(detail.name));
        }

        let mut available = HashMap::clone(&self.available_moves);
        available.insert(detail.id, detail.move_names());
        self.available_moves = Arc::new(available);

        let mut next = Team::clone(&team);
        next.members.push(TeamMember {
            id: detail.id,
            name: detail.name.clone(),
            detail,
            selected_moves: Vec::new(),
            max_moves: MAX_MOVES,
        });
        self.replace(next)
    }

    pub fn remove_member(&mut self, id: u32) -> TeamUpdate {
        let team = self.team();
        if team.member(id).is_none() {
            return TeamUpdate::Unchanged;
        }

        let mut available = HashMap::clone(&self.available_moves);
        available.remove(&id);
        self.available_moves = Arc::new(available);

        let mut next = Team::clone(&team);
        next.members.retain(|member| member.id != id);
        self.replace(next)
    }

    pub fn select_move(&mut self, member_id: u32, move_name: &str) -> TeamUpdate {
        let team = self.team();
        let Some(member) = team.member(member_id) else {
            return TeamUpdate::Unchanged;
        };
        if member.selected_moves.iter().any(|name| name == move_name) {
            return TeamUpdate::Unchanged;
        }
        if member.selected_moves.len() >= member.max_moves {
            return self.reject(TeamRejection::MoveLimitReached(member.name.clone()));
        }
        let learnable = self
            .available_moves(member_id)
            .iter()
            .any(|name| name == move_name);
        if self.strict_moves && !learnable {
            return self.reject(TeamRejection::MoveNotLearnable {
                member: member.name.clone(),
                move_name: move_name.to_string(),
            });
        }

        let mut next = Team::clone(&team);
        if let Some(member) = next.members.iter_mut().find(|member| member.id == member_id) {
            member.selected_moves.push(move_name.to_string());
        }
        self.replace(next)
    }

    pub fn deselect_move(&mut self, member_id: u32, move_name: &str) -> TeamUpdate {
        let team = self.team();
        let selected = team
            .member(member_id)
            .is_some_and(|member| member.selected_moves.iter().any(|name| name == move_name));
        if !selected {
            return TeamUpdate::Unchanged;
        }

        let mut next = Team::clone(&team);
        if let Some(member) = next.members.iter_mut().find(|member| member.id == member_id) {
            member.selected_moves.retain(|name| name != move_name);
        }
        self.replace(next)
    }

    /// Always publishes a new snapshot, even when the name is unchanged.
    pub fn rename(&mut self, name: &str) -> TeamUpdate {
        let mut next = Team::clone(&self.team());
        next.name = name.to_string();
        self.replace(next)
    }

    /// Starts over with an empty team under a new id.
    pub fn clear(&mut self) -> TeamUpdate {
        self.available_moves = Arc::new(HashMap::new());
        self.current.send_replace(Arc::new(Team::new()));
        debug!(team = %self.team().id, "team cleared");
        TeamUpdate::Applied
    }

    pub fn stats(&self) -> TeamStats {
        let team = self.team();
        let total_members = team.members.len();
        let total_moves_selected: usize = team
            .members
            .iter()
            .map(|member| member.selected_moves.len())
            .sum();
        let max_possible = total_members * MAX_MOVES;
        let completion_percentage = if max_possible == 0 {
            0
        } else {
            (100.0 * total_moves_selected as f64 / max_possible as f64).round() as u8
        };
        TeamStats {
            total_members,
            total_moves_selected,
            completion_percentage,
        }
    }

    pub fn available_moves(&self, member_id: u32) -> Vec<String> {
        self.available_moves
            .get(&member_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn selected_moves(&self, member_id: u32) -> Vec<String> {
        self.team()
            .member(member_id)
            .map(|member| member.selected_moves.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, member_id: u32) -> bool {
        self.team().member(member_id).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.team().members.len() >= MAX_TEAM_SIZE
    }

    fn replace(&mut self, mut next: Team) -> TeamUpdate {
        next.updated_at = Utc::now();
        self.current.send_replace(Arc::new(next));
        TeamUpdate::Applied
    }

    fn reject(&self, rejection: TeamRejection) -> TeamUpdate {
        warn!(team = %self.team().id, %rejection, "team change ignored");
        TeamUpdate::Rejected(rejection)
    }
}

fn generate_team_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("team_{}_{}", Utc::now().timestamp_millis(), &suffix[..9])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AbilityEntry, MoveEntry, SpeciesRef, SpriteSet, TypeEntry};
    use pretty_assertions::assert_eq;

    fn creature(id: u32, name: &str) -> CreatureDetail {
        CreatureDetail {
            id,
            name: name.to_string(),
            height: 4,
            weight: 60,
            base_experience: Some(112),
            abilities: vec![AbilityEntry {
                name: "static".into(),
                is_hidden: false,
                slot: 1,
            }],
            stats: Vec::new(),
            types: vec![TypeEntry {
                slot: 1,
                name: "electric".into(),
            }],
            moves: ["thunderbolt", "quick-attack", "thunder-wave", "iron-tail", "surf"]
                .iter()
                .map(|name| MoveEntry {
                    name: name.to_string(),
                    learned_by: Vec::new(),
                })
                .collect(),
            species: SpeciesRef {
                name: name.to_string(),
                url: format!("https://pokeapi.co/api/v2/pokemon-species/{id}/"),
            },
            sprites: SpriteSet::default(),
            species_details: None,
        }
    }

    #[test]
    fn seventh_member_is_rejected() {
        let mut builder = TeamBuilder::default();
        for id in 1..=6 {
            assert!(builder.add_member(creature(id, "mon")).is_applied());
        }
        assert!(builder.is_full());

        let update = builder.add_member(creature(7, "extra"));
        assert_eq!(update, TeamUpdate::Rejected(TeamRejection::TeamFull));
        assert_eq!(builder.team().members.len(), 6);
        assert!(!builder.contains(7));
    }

    #[test]
    fn team_never_exceeds_six() {
        let mut builder = TeamBuilder::default();
        for id in 1..=20 {
            let _ = builder.add_member(creature(id, "mon"));
        }
        assert_eq!(builder.team().members.len(), MAX_TEAM_SIZE);
    }

    #[test]
    fn duplicate_member_is_kept_once() {
        let mut builder = TeamBuilder::default();
        assert!(builder.add_member(creature(25, "pikachu")).is_applied());
        let update = builder.add_member(creature(25, "pikachu"));
        assert_eq!(
            update,
            TeamUpdate::Rejected(TeamRejection::AlreadyInTeam("pikachu".into()))
        );
        assert_eq!(builder.team().members.len(), 1);
    }

    #[test]
    fn added_member_starts_empty_and_records_moves() {
        let mut builder = TeamBuilder::default();
        builder.add_member(creature(25, "pikachu"));
        let team = builder.team();
        let member = team.member(25).unwrap();
        assert!(member.selected_moves.is_empty());
        assert_eq!(member.max_moves, 4);
        assert_eq!(builder.available_moves(25).len(), 5);
    }

    #[test]
    fn move_selection_caps_at_four() {
        let mut builder = TeamBuilder::default();
        builder.add_member(creature(25, "pikachu"));
        for name in ["thunderbolt", "quick-attack", "thunder-wave", "iron-tail"] {
            assert!(builder.select_move(25, name).is_applied());
        }
        let update = builder.select_move(25, "surf");
        assert_eq!(
            update,
            TeamUpdate::Rejected(TeamRejection::MoveLimitReached("pikachu".into()))
        );
        assert_eq!(builder.selected_moves(25).len(), 4);
    }

    #[test]
    fn duplicate_move_is_noop() {
        let mut builder = TeamBuilder::default();
        builder.add_member(creature(25, "pikachu"));
        builder.select_move(25, "thunderbolt");
        let before = builder.team();

        assert_eq!(builder.select_move(25, "thunderbolt"), TeamUpdate::Unchanged);
        assert!(Arc::ptr_eq(&before, &builder.team()));
        assert_eq!(builder.selected_moves(25), vec!["thunderbolt".to_string()]);
    }

    #[test]
    fn unknown_member_is_ignored() {
        let mut builder = TeamBuilder::default();
        assert_eq!(builder.select_move(1, "tackle"), TeamUpdate::Unchanged);
        assert_eq!(builder.deselect_move(1, "tackle"), TeamUpdate::Unchanged);
        assert_eq!(builder.remove_member(1), TeamUpdate::Unchanged);
    }

    #[test]
    fn unlearnable_moves_are_allowed_unless_strict() {
        let mut lenient = TeamBuilder::default();
        lenient.add_member(creature(25, "pikachu"));
        assert!(lenient.select_move(25, "hydro-pump").is_applied());

        let mut strict = TeamBuilder::new(true);
        strict.add_member(creature(25, "pikachu"));
        assert_eq!(
            strict.select_move(25, "hydro-pump"),
            TeamUpdate::Rejected(TeamRejection::MoveNotLearnable {
                member: "pikachu".into(),
                move_name: "hydro-pump".into(),
            })
        );
        assert!(strict.select_move(25, "surf").is_applied());
    }

    #[test]
    fn deselect_removes_only_that_move() {
        let mut builder = TeamBuilder::default();
        builder.add_member(creature(25, "pikachu"));
        builder.select_move(25, "thunderbolt");
        builder.select_move(25, "surf");

        assert!(builder.deselect_move(25, "thunderbolt").is_applied());
        assert_eq!(builder.selected_moves(25), vec!["surf".to_string()]);
        assert_eq!(builder.deselect_move(25, "thunderbolt"), TeamUpdate::Unchanged);
    }

    #[test]
    fn remove_drops_move_table_entry() {
        let mut builder = TeamBuilder::default();
        builder.add_member(creature(25, "pikachu"));
        builder.add_member(creature(1, "bulbasaur"));

        assert!(builder.remove_member(25).is_applied());
        assert!(!builder.contains(25));
        assert!(builder.available_moves(25).is_empty());
        assert_eq!(builder.available_moves(1).len(), 5);
    }

    #[test]
    fn every_change_replaces_the_snapshot() {
        let mut builder = TeamBuilder::default();
        let mut updates = builder.subscribe();
        let before = builder.team();

        builder.add_member(creature(25, "pikachu"));
        let after = builder.team();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(before.members.is_empty());
        assert!(after.updated_at >= before.updated_at);
        assert!(updates.has_changed().unwrap());
        let _ = updates.borrow_and_update();

        let _ = builder.add_member(creature(25, "pikachu"));
        assert!(Arc::ptr_eq(&after, &builder.team()));
        assert!(!updates.has_changed().unwrap());
    }

    #[test]
    fn rename_updates_name() {
        let mut builder = TeamBuilder::default();
        assert_eq!(builder.team().name, "New Team");
        assert!(builder.rename("Sparks").is_applied());
        assert_eq!(builder.team().name, "Sparks");
    }

    #[test]
    fn rename_to_same_name_still_touches_team() {
        let mut builder = TeamBuilder::default();
        let _ = builder.rename("Sparks");
        let before = builder.team();
        let mut updates = builder.subscribe();
        let _ = updates.borrow_and_update();

        assert!(builder.rename("Sparks").is_applied());
        let after = builder.team();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.name, "Sparks");
        assert!(updates.has_changed().unwrap());
    }

    #[test]
    fn clear_starts_a_fresh_team() {
        let mut builder = TeamBuilder::default();
        builder.add_member(creature(25, "pikachu"));
        builder.rename("Sparks");
        let old_id = builder.team().id.clone();

        builder.clear();
        let team = builder.team();
        assert!(team.members.is_empty());
        assert_eq!(team.name, "New Team");
        assert_ne!(team.id, old_id);
        assert!(team.id.starts_with("team_"));
        assert!(builder.available_moves(25).is_empty());
    }

    #[test]
    fn stats_round_completion() {
        let mut builder = TeamBuilder::default();
        assert_eq!(
            builder.stats(),
            TeamStats {
                total_members: 0,
                total_moves_selected: 0,
                completion_percentage: 0,
            }
        );

        builder.add_member(creature(1, "bulbasaur"));
        builder.add_member(creature(2, "ivysaur"));
        builder.add_member(creature(3, "venusaur"));
        builder.select_move(1, "surf");
        // 1 of 12
        assert_eq!(builder.stats().completion_percentage, 8);

        builder.remove_member(3);
        builder.select_move(1, "thunderbolt");
        builder.select_move(2, "surf");
        // 3 of 8
        let stats = builder.stats();
        assert_eq!(stats.total_members, 2);
        assert_eq!(stats.total_moves_selected, 3);
        assert_eq!(stats.completion_percentage, 38);
    }
}
