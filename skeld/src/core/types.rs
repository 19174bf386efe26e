//! Shared deterministic types for the game core.
//!
//! These types define stable contracts between the phase engine, the oracle
//! boundary and spectator snapshots. They carry no I/O and serialize
//! deterministically.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed set of rooms on the ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Room {
    Cafeteria,
    Electrical,
    MedBay,
    Navigation,
    Reactor,
}

impl Room {
    pub const ALL: [Room; 5] = [
        Room::Cafeteria,
        Room::Electrical,
        Room::MedBay,
        Room::Navigation,
        Room::Reactor,
    ];

    /// Starting room, and the substitute for any room name outside the fixed set.
    pub const DEFAULT: Room = Room::Cafeteria;

    pub fn as_str(self) -> &'static str {
        match self {
            Room::Cafeteria => "Cafeteria",
            Room::Electrical => "Electrical",
            Room::MedBay => "MedBay",
            Room::Navigation => "Navigation",
            Room::Reactor => "Reactor",
        }
    }

    /// Trimmed, case-insensitive lookup against the fixed room set.
    pub fn parse_lenient(raw: &str) -> Option<Room> {
        let raw = raw.trim();
        Room::ALL
            .into_iter()
            .find(|room| room.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hidden role, assigned once at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Crewmate,
    Impostor,
}

/// Phase cursor of the round state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Action,
    Discovery,
    Discussion,
    Voting,
    Results,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Action => "action",
            Phase::Discovery => "discovery",
            Phase::Discussion => "discussion",
            Phase::Voting => "voting",
            Phase::Results => "results",
        };
        f.write_str(name)
    }
}

/// What a player declares alongside their movement in the action phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    DoTask,
    FakeTask,
    Kill,
    Wait,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::DoTask => "do_task",
            ActionKind::FakeTask => "fake_task",
            ActionKind::Kill => "kill",
            ActionKind::Wait => "wait",
        }
    }

    pub fn parse(raw: &str) -> Option<ActionKind> {
        let raw = raw.trim();
        [
            ActionKind::DoTask,
            ActionKind::FakeTask,
            ActionKind::Kill,
            ActionKind::Wait,
        ]
        .into_iter()
        .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
    }

    /// Crewmates may `do_task` or `wait`; the impostor may `fake_task`, `kill` or `wait`.
    pub fn allowed_for(self, role: Role) -> bool {
        match role {
            Role::Crewmate => matches!(self, ActionKind::DoTask | ActionKind::Wait),
            Role::Impostor => matches!(
                self,
                ActionKind::FakeTask | ActionKind::Kill | ActionKind::Wait
            ),
        }
    }
}

/// Decision shape requested from an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Action,
    Discussion,
    Vote,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecisionKind::Action => "action",
            DecisionKind::Discussion => "discussion",
            DecisionKind::Vote => "vote",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Crewmates,
    Impostor,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Crewmates => f.write_str("crewmates"),
            Winner::Impostor => f.write_str("impostor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    ImpostorEjected,
    ImpostorDead,
    TasksCompleted,
    ImpostorKills,
    MaxRounds,
}

impl fmt::Display for WinReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            WinReason::ImpostorEjected => "impostor ejected",
            WinReason::ImpostorDead => "impostor dead",
            WinReason::TasksCompleted => "tasks completed",
            WinReason::ImpostorKills => "impostor kills",
            WinReason::MaxRounds => "max rounds",
        };
        f.write_str(reason)
    }
}

/// Terminal result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub winner: Winner,
    pub reason: WinReason,
}

/// Action decision as returned by an oracle, before field-level validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub room: String,
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Discussion statement as returned by an oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionResponse {
    pub statement: String,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Vote as returned by an oracle: a player name or `"skip"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    pub vote: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Action decision after validation against the room set and the player's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDecision {
    pub room: Room,
    pub action: ActionKind,
    /// Only ever present for `kill`.
    pub target: Option<String>,
}

/// Resolved vote target. Unrecognized names collapse into `Skip`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "player_id")]
pub enum VoteTarget {
    Player(String),
    Skip,
}
