//! Complete in-memory game state: world, phase cursor, meeting and narrative.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::events::EventLog;
use crate::core::types::{GameOutcome, Phase, Room, VoteTarget};
use crate::core::world::World;

/// Number of discussion sub-rounds per meeting.
pub const DISCUSSION_ROUNDS: u8 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscussionEntry {
    pub player_id: String,
    pub player: String,
    pub statement: String,
    /// Sub-round (0 or 1) the statement was made in.
    pub round: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteRecord {
    pub voter_id: String,
    pub voter: String,
    /// The name the voter gave, as given.
    pub vote: String,
    pub target: VoteTarget,
    pub reason: String,
}

/// Emergency meeting triggered by a body discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Meeting {
    pub reporter_id: String,
    pub victim_id: String,
    pub room: Room,
    pub reason: String,
}

/// Latest reasoning trace and oracle latency for one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerTrace {
    pub reasoning: String,
    pub last_secs: f64,
    pub total_secs: f64,
}

impl PlayerTrace {
    pub fn record(&mut self, reasoning: String, elapsed_secs: f64) {
        self.reasoning = reasoning;
        self.last_secs = round_hundredths(elapsed_secs);
        self.total_secs = round_hundredths(self.total_secs + elapsed_secs);
    }
}

fn round_hundredths(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub world: World,
    /// 1-based, monotonically increasing.
    pub round: u32,
    pub phase: Phase,
    /// Discussion sub-rounds completed in the current meeting.
    pub discussion_round: u8,
    pub discussion: Vec<DiscussionEntry>,
    pub votes: Vec<VoteRecord>,
    pub meeting: Option<Meeting>,
    pub ejected_this_round: Option<String>,
    pub events: EventLog,
    pub outcome: Option<GameOutcome>,
    pub traces: BTreeMap<String, PlayerTrace>,
}

impl GameState {
    pub fn new(world: World) -> Self {
        Self {
            world,
            round: 1,
            phase: Phase::Action,
            discussion_round: 0,
            discussion: Vec::new(),
            votes: Vec::new(),
            meeting: None,
            ejected_this_round: None,
            events: EventLog::default(),
            outcome: None,
            traces: BTreeMap::new(),
        }
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Display name for a player id, falling back to the id itself.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.world
            .player(id)
            .map(|player| player.name.as_str())
            .unwrap_or(id)
    }

    /// Reset per-meeting state at the start of a new meeting.
    pub fn open_meeting(&mut self, meeting: Meeting) {
        self.discussion.clear();
        self.discussion_round = 0;
        self.votes.clear();
        self.meeting = Some(meeting);
    }

    /// Round boundary: clear bodies and meeting state, reset the cooldown and
    /// return to the action phase of the next round.
    pub fn close_round(&mut self) {
        self.round += 1;
        self.phase = Phase::Action;
        self.world.kill_cooldown = false;
        self.world.bodies.clear();
        self.discussion.clear();
        self.discussion_round = 0;
        self.votes.clear();
        self.meeting = None;
        self.ejected_this_round = None;
    }
}
