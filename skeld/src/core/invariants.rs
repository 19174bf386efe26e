//! Structural invariants of the world and of a whole game state.

use std::collections::HashSet;

use crate::core::state::{DISCUSSION_ROUNDS, GameState};
use crate::core::types::Phase;
use crate::core::world::Player;

/// Check roster invariants:
/// - exactly one impostor
/// - the impostor holds no tasks
/// - unique ids and unique display names
/// - task assignments are disjoint across players
pub fn validate_roster(players: &[Player]) -> Vec<String> {
    let mut errors = Vec::new();

    let impostors = players.iter().filter(|p| p.is_impostor()).count();
    if impostors != 1 {
        errors.push(format!(
            "expected exactly one impostor, found {impostors}"
        ));
    }

    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    let mut tasks = HashSet::new();
    for player in players {
        if !ids.insert(player.id.as_str()) {
            errors.push(format!("duplicate player id '{}'", player.id));
        }
        if !names.insert(player.name.as_str()) {
            errors.push(format!("duplicate player name '{}'", player.name));
        }
        if player.is_impostor() && !player.tasks.is_empty() {
            errors.push(format!("impostor '{}' must not hold tasks", player.id));
        }
        for task in &player.tasks {
            if !tasks.insert(task.name.as_str()) {
                errors.push(format!(
                    "task '{}' assigned more than once (at '{}')",
                    task.name, player.id
                ));
            }
        }
    }

    errors
}

/// Check whole-state invariants on top of the roster checks:
/// - ejected players are not alive
/// - every body belongs to a killed player, at most one body per player
/// - an action phase starts with no bodies and no kill cooldown
/// - meeting state is empty outside a meeting
pub fn validate_state(state: &GameState) -> Vec<String> {
    let mut errors = validate_roster(state.world.players());

    for player in state.world.players() {
        if player.ejected && player.alive {
            errors.push(format!("{}: ejected but alive", player.id));
        }
    }

    let mut bodies = HashSet::new();
    for body in &state.world.bodies {
        if !bodies.insert(body.player_id.as_str()) {
            errors.push(format!("duplicate body for '{}'", body.player_id));
        }
        match state.world.player(&body.player_id) {
            Some(player) if player.was_killed() => {}
            Some(_) => errors.push(format!("body for '{}' who was not killed", body.player_id)),
            None => errors.push(format!("body for unknown player '{}'", body.player_id)),
        }
    }

    if state.round == 0 {
        errors.push("round must start at 1".to_string());
    }
    if state.discussion_round > DISCUSSION_ROUNDS {
        errors.push(format!(
            "discussion round {} exceeds {DISCUSSION_ROUNDS}",
            state.discussion_round
        ));
    }

    if state.phase == Phase::Action {
        if !state.world.bodies.is_empty() {
            errors.push("bodies left over at the start of an action phase".to_string());
        }
        if state.world.kill_cooldown {
            errors.push("kill cooldown not reset at the start of an action phase".to_string());
        }
    }
    if matches!(state.phase, Phase::Action | Phase::Discovery)
        && (!state.discussion.is_empty() || !state.votes.is_empty() || state.meeting.is_some())
    {
        errors.push(format!(
            "meeting state present during {} phase",
            state.phase
        ));
    }

    errors
}
