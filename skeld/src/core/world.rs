//! Entities of the game world: players, tasks, bodies and rooms.
//!
//! The world is only ever mutated by the phase engine. Roles are fixed at
//! construction, so [`World::impostor`] cannot fail once a world exists.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::core::invariants::validate_roster;
use crate::core::types::{Role, Room};

/// Roster violations detected while constructing a [`World`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid roster:\n- {}", .0.join("\n- "))]
pub struct RosterError(pub Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub name: String,
    pub room: Room,
    pub done: bool,
}

impl Task {
    pub fn new(name: impl Into<String>, room: Room) -> Self {
        Self {
            name: name.into(),
            room,
            done: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub name: String,
    /// Cosmetic: selects the oracle backend, never consulted by game rules.
    pub team: String,
    pub color: String,
    role: Role,
    pub alive: bool,
    pub ejected: bool,
    pub location: Room,
    /// Assigned tasks in assignment order.
    pub tasks: Vec<Task>,
}

impl Player {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        team: impl Into<String>,
        color: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            team: team.into(),
            color: color.into(),
            role,
            alive: true,
            ejected: false,
            location: Room::DEFAULT,
            tasks: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_impostor(&self) -> bool {
        self.role == Role::Impostor
    }

    /// Alive and not ejected.
    pub fn in_play(&self) -> bool {
        self.alive && !self.ejected
    }

    /// Out of play without having been voted out.
    pub fn was_killed(&self) -> bool {
        !self.alive && !self.ejected
    }

    pub fn tasks_done(&self) -> usize {
        self.tasks.iter().filter(|task| task.done).count()
    }

    pub fn incomplete_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| !task.done)
    }
}

/// Remains of a killed player, cleared at the next round boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Body {
    pub player_id: String,
    pub room: Room,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct World {
    players: Vec<Player>,
    impostor: usize,
    pub bodies: Vec<Body>,
    pub kill_cooldown: bool,
}

impl World {
    /// Build a world from a roster. Fails unless exactly one player is the
    /// impostor and the roster is otherwise consistent.
    pub fn new(players: Vec<Player>) -> Result<Self, RosterError> {
        let errors = validate_roster(&players);
        if !errors.is_empty() {
            return Err(RosterError(errors));
        }
        let impostor = players
            .iter()
            .position(Player::is_impostor)
            .ok_or_else(|| RosterError(vec!["no impostor assigned".to_string()]))?;
        Ok(Self {
            players,
            impostor,
            bodies: Vec::new(),
            kill_cooldown: false,
        })
    }

    /// All players in roster order, including dead and ejected ones.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Players still in play, in roster order.
    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|player| player.in_play())
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    pub fn impostor(&self) -> &Player {
        &self.players[self.impostor]
    }

    /// Alive player names per room; every room is present, possibly empty.
    pub fn room_occupancy(&self) -> BTreeMap<Room, Vec<String>> {
        let mut by_room: BTreeMap<Room, Vec<String>> =
            Room::ALL.into_iter().map(|room| (room, Vec::new())).collect();
        for player in self.alive_players() {
            by_room
                .entry(player.location)
                .or_default()
                .push(player.name.clone());
        }
        by_room
    }

    pub fn tasks_needed(&self) -> usize {
        self.players.iter().map(|player| player.tasks.len()).sum()
    }

    pub fn tasks_done(&self) -> usize {
        self.players.iter().map(Player::tasks_done).sum()
    }

    pub fn alive_crewmates(&self) -> usize {
        self.alive_players()
            .filter(|player| player.role() == Role::Crewmate)
            .count()
    }
}
