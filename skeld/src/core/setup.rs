//! Game setup: the task catalogue and role/task assignment.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::core::types::{Role, Room};
use crate::core::world::{Player, RosterError, Task, World};

/// Every task on the ship and the room it must be done in.
pub const TASK_CATALOG: [(&str, Room); 12] = [
    ("Fix Wiring", Room::Electrical),
    ("Submit Scan", Room::MedBay),
    ("Chart Course", Room::Navigation),
    ("Start Reactor", Room::Reactor),
    ("Swipe Card", Room::Cafeteria),
    ("Align Engine", Room::Reactor),
    ("Calibrate Distributor", Room::Electrical),
    ("Prime Shields", Room::Navigation),
    ("Inspect Sample", Room::MedBay),
    ("Clean O2 Filter", Room::Cafeteria),
    ("Reset Breakers", Room::Electrical),
    ("Stabilize Steering", Room::Navigation),
];

pub const TASKS_PER_CREWMATE: usize = 2;

pub const MIN_PLAYERS: usize = 3;

/// One impostor plus as many crewmates as the catalogue can supply tasks for.
pub const MAX_PLAYERS: usize = TASK_CATALOG.len() / TASKS_PER_CREWMATE + 1;

/// A seat at the table before roles are dealt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    pub team: String,
    pub color: String,
}

/// Pick one impostor uniformly at random, then hand each crewmate, in roster
/// order, the next two tasks of a shuffled catalogue.
pub fn deal<R: Rng + ?Sized>(roster: &[RosterEntry], rng: &mut R) -> Result<World, RosterError> {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&roster.len()) {
        return Err(RosterError(vec![format!(
            "roster must have {MIN_PLAYERS}..={MAX_PLAYERS} players, got {}",
            roster.len()
        )]));
    }

    let impostor = rng.gen_range(0..roster.len());
    let mut catalog = TASK_CATALOG.to_vec();
    catalog.shuffle(rng);
    let mut pending = catalog.into_iter();

    let players = roster
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let role = if idx == impostor {
                Role::Impostor
            } else {
                Role::Crewmate
            };
            let mut player = Player::new(
                entry.id.clone(),
                entry.name.clone(),
                entry.team.clone(),
                entry.color.clone(),
                role,
            );
            if role == Role::Crewmate {
                player.tasks = pending
                    .by_ref()
                    .take(TASKS_PER_CREWMATE)
                    .map(|(name, room)| Task::new(name, room))
                    .collect();
            }
            player
        })
        .collect();

    World::new(players)
}
