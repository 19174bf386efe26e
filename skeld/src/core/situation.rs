//! Read-only projection of the game handed to an oracle.
//!
//! A situation holds only what the player could know: their own role, room
//! and tasks, who they can see, public history and meeting state.

use serde::Serialize;

use crate::core::state::{DISCUSSION_ROUNDS, GameState};
use crate::core::types::{DecisionKind, Role, Room};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    pub name: String,
    pub room: Room,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementView {
    pub player: String,
    pub statement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Situation {
    pub kind: DecisionKind,
    pub player_id: String,
    pub name: String,
    pub role: Role,
    pub round: u32,
    pub location: Room,
    /// Other living players in the same room.
    pub co_located: Vec<String>,
    /// Every other living player, in roster order.
    pub others_alive: Vec<String>,
    pub rooms: Vec<Room>,
    pub remaining_tasks: Vec<TaskView>,
    pub tasks_done: usize,
    pub tasks_total: usize,
    pub kill_cooldown: bool,
    pub recent_events: Vec<String>,
    pub meeting_reason: Option<String>,
    /// Names of bodies lying in the player's room.
    pub bodies_here: Vec<String>,
    pub statements: Vec<StatementView>,
    /// 1-based index of the statement being requested.
    pub statement_index: u8,
    pub statement_count: u8,
}

impl Situation {
    /// Project `state` for `player_id`. Returns `None` for unknown players.
    pub fn for_player(
        state: &GameState,
        player_id: &str,
        kind: DecisionKind,
        event_window: usize,
    ) -> Option<Self> {
        let player = state.world.player(player_id)?;
        let others: Vec<_> = state
            .world
            .alive_players()
            .filter(|other| other.id != player.id)
            .collect();

        Some(Self {
            kind,
            player_id: player.id.clone(),
            name: player.name.clone(),
            role: player.role(),
            round: state.round,
            location: player.location,
            co_located: others
                .iter()
                .filter(|other| other.location == player.location)
                .map(|other| other.name.clone())
                .collect(),
            others_alive: others.iter().map(|other| other.name.clone()).collect(),
            rooms: Room::ALL.to_vec(),
            remaining_tasks: player
                .incomplete_tasks()
                .map(|task| TaskView {
                    name: task.name.clone(),
                    room: task.room,
                })
                .collect(),
            tasks_done: player.tasks_done(),
            tasks_total: player.tasks.len(),
            kill_cooldown: state.world.kill_cooldown,
            recent_events: state.events.tail(event_window).to_vec(),
            meeting_reason: state.meeting.as_ref().map(|meeting| meeting.reason.clone()),
            bodies_here: state
                .world
                .bodies
                .iter()
                .filter(|body| body.room == player.location)
                .map(|body| state.name_of(&body.player_id).to_string())
                .collect(),
            statements: state
                .discussion
                .iter()
                .map(|entry| StatementView {
                    player: entry.player.clone(),
                    statement: entry.statement.clone(),
                })
                .collect(),
            statement_index: state.discussion_round + 1,
            statement_count: DISCUSSION_ROUNDS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::world::Body;
    use crate::test_support::four_player_world;

    #[test]
    fn situation_shows_only_own_knowledge() {
        let mut world = four_player_world();
        world.player_mut("blue").expect("blue").location = Room::Reactor;
        world.player_mut("green").expect("green").alive = false;
        world.bodies.push(Body {
            player_id: "green".to_string(),
            room: Room::Cafeteria,
        });
        let mut state = GameState::new(world);
        for i in 0..15 {
            state.events.record(1, format!("event {i}"));
        }

        let situation =
            Situation::for_player(&state, "red", DecisionKind::Action, 10).expect("red");

        assert_eq!(situation.role, Role::Crewmate);
        assert_eq!(situation.co_located, vec!["IMP"]);
        assert_eq!(situation.others_alive, vec!["IMP", "BLUE"]);
        assert_eq!(situation.bodies_here, vec!["GREEN"]);
        assert_eq!(situation.recent_events.len(), 10);
        assert_eq!(situation.recent_events[0], "Round 1: event 5");
        assert_eq!(situation.remaining_tasks.len(), 2);
        assert_eq!(situation.statement_index, 1);
    }

    #[test]
    fn unknown_player_has_no_situation() {
        let state = GameState::new(four_player_world());
        assert!(Situation::for_player(&state, "nobody", DecisionKind::Vote, 10).is_none());
    }
}
