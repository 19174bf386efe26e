//! Spectator snapshots.
//!
//! A snapshot is an omniscient view: roles are visible to observers. It is
//! a plain serializable copy, detached from the live game.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::state::{DiscussionEntry, GameState, VoteRecord};
use crate::core::types::{Phase, Role, Room, WinReason, Winner};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    pub name: String,
    pub room: Room,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub team: String,
    pub team_display: String,
    pub color: String,
    pub role: Role,
    pub alive: bool,
    pub ejected: bool,
    pub location: Room,
    pub tasks: Vec<TaskView>,
    pub tasks_completed: usize,
    pub reasoning: String,
    pub last_secs: f64,
    pub total_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyView {
    pub player_id: String,
    pub name: String,
    pub room: Room,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub round: u32,
    pub phase: Phase,
    pub discussion_round: u8,
    pub players: Vec<PlayerView>,
    pub tasks_done: usize,
    pub tasks_needed: usize,
    pub kill_cooldown: bool,
    pub bodies: Vec<BodyView>,
    pub rooms: BTreeMap<Room, Vec<String>>,
    pub discussion: Vec<DiscussionEntry>,
    pub votes: Vec<VoteRecord>,
    pub meeting_triggered: bool,
    pub meeting_reason: Option<String>,
    /// Name of the player ejected this round, if any.
    pub ejected_this_round: Option<String>,
    /// The most recent events, oldest first.
    pub events: Vec<String>,
    pub total_events: usize,
    pub game_over: bool,
    pub winner: Option<Winner>,
    pub win_reason: Option<WinReason>,
}

impl GameSnapshot {
    pub fn capture(state: &GameState, teams: &BTreeMap<String, String>, event_tail: usize) -> Self {
        let players = state
            .world
            .players()
            .iter()
            .map(|player| {
                let trace = state.traces.get(&player.id).cloned().unwrap_or_default();
                PlayerView {
                    id: player.id.clone(),
                    name: player.name.clone(),
                    team: player.team.clone(),
                    team_display: teams
                        .get(&player.team)
                        .cloned()
                        .unwrap_or_else(|| player.team.clone()),
                    color: player.color.clone(),
                    role: player.role(),
                    alive: player.alive,
                    ejected: player.ejected,
                    location: player.location,
                    tasks: player
                        .tasks
                        .iter()
                        .map(|task| TaskView {
                            name: task.name.clone(),
                            room: task.room,
                            done: task.done,
                        })
                        .collect(),
                    tasks_completed: player.tasks_done(),
                    reasoning: trace.reasoning,
                    last_secs: trace.last_secs,
                    total_secs: trace.total_secs,
                }
            })
            .collect();

        Self {
            round: state.round,
            phase: state.phase,
            discussion_round: state.discussion_round,
            players,
            tasks_done: state.world.tasks_done(),
            tasks_needed: state.world.tasks_needed(),
            kill_cooldown: state.world.kill_cooldown,
            bodies: state
                .world
                .bodies
                .iter()
                .map(|body| BodyView {
                    player_id: body.player_id.clone(),
                    name: state.name_of(&body.player_id).to_string(),
                    room: body.room,
                })
                .collect(),
            rooms: state.world.room_occupancy(),
            discussion: state.discussion.clone(),
            votes: state.votes.clone(),
            meeting_triggered: state.meeting.is_some(),
            meeting_reason: state.meeting.as_ref().map(|meeting| meeting.reason.clone()),
            ejected_this_round: state
                .ejected_this_round
                .as_deref()
                .map(|id| state.name_of(id).to_string()),
            events: state.events.tail(event_tail).to_vec(),
            total_events: state.events.len(),
            game_over: state.is_over(),
            winner: state.outcome.map(|outcome| outcome.winner),
            win_reason: state.outcome.map(|outcome| outcome.reason),
        }
    }

    pub fn player(&self, id: &str) -> Option<&PlayerView> {
        self.players.iter().find(|player| player.id == id)
    }
}
