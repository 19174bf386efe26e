//! Test-only helpers: world builders and a scripted oracle.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::core::types::{DecisionKind, Role, Room};
use crate::core::world::{Player, Task, World};
use crate::io::oracle::{Oracle, OracleError, OracleRequest};

/// A crewmate named after its id in upper case, with two tasks unique to it
/// (one in Electrical, one in MedBay).
pub fn crewmate(id: &str, room: Room) -> Player {
    let mut player = Player::new(id, id.to_uppercase(), "test", "#ffffff", Role::Crewmate);
    player.location = room;
    player.tasks = vec![
        Task::new(format!("{id} wiring"), Room::Electrical),
        Task::new(format!("{id} scan"), Room::MedBay),
    ];
    player
}

pub fn impostor(id: &str, room: Room) -> Player {
    let mut player = Player::new(id, id.to_uppercase(), "test", "#000000", Role::Impostor);
    player.location = room;
    player
}

/// `imp`, `red`, `blue` and `green`, all in the Cafeteria.
pub fn four_player_world() -> World {
    World::new(vec![
        impostor("imp", Room::Cafeteria),
        crewmate("red", Room::Cafeteria),
        crewmate("blue", Room::Cafeteria),
        crewmate("green", Room::Cafeteria),
    ])
    .expect("four player world")
}

pub fn action_json(room: &str, action: &str, target: Option<&str>) -> String {
    serde_json::json!({ "room": room, "action": action, "target": target }).to_string()
}

pub fn statement_json(statement: &str) -> String {
    serde_json::json!({ "statement": statement }).to_string()
}

pub fn vote_json(vote: &str) -> String {
    serde_json::json!({ "vote": vote, "reason": "scripted" }).to_string()
}

type Key = (String, DecisionKind);

/// Oracle returning canned replies keyed by player id and decision kind.
///
/// Queued replies are consumed first, then the per-kind `always` reply. A
/// query with neither fails with a transport error. Every request is kept
/// for inspection.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    queued: Mutex<HashMap<Key, VecDeque<Result<String, OracleError>>>>,
    always: HashMap<DecisionKind, String>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one reply for `player` and `kind`.
    pub fn reply(self, player: &str, kind: DecisionKind, raw: impl Into<String>) -> Self {
        self.push(player, kind, Ok(raw.into()))
    }

    /// Queue one failure for `player` and `kind`.
    pub fn fail(self, player: &str, kind: DecisionKind, err: OracleError) -> Self {
        self.push(player, kind, Err(err))
    }

    /// Reply for every player once their queue for `kind` is empty.
    pub fn always(mut self, kind: DecisionKind, raw: impl Into<String>) -> Self {
        self.always.insert(kind, raw.into());
        self
    }

    fn push(self, player: &str, kind: DecisionKind, reply: Result<String, OracleError>) -> Self {
        self.queued
            .lock()
            .expect("queue lock")
            .entry((player.to_string(), kind))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn requests_for(&self, player: &str, kind: DecisionKind) -> Vec<OracleRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.player_id == player && request.kind == kind)
            .collect()
    }
}

impl Oracle for ScriptedOracle {
    fn query(&self, request: &OracleRequest) -> Result<String, OracleError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        let queued = self
            .queued
            .lock()
            .expect("queue lock")
            .get_mut(&(request.player_id.clone(), request.kind))
            .and_then(VecDeque::pop_front);
        match queued {
            Some(reply) => reply,
            None => self.always.get(&request.kind).cloned().ok_or_else(|| {
                OracleError::Transport(format!(
                    "no scripted {} reply for '{}'",
                    request.kind, request.player_id
                ))
            }),
        }
    }
}
