//! Win evaluation.

use crate::core::types::{GameOutcome, WinReason, Winner};
use crate::core::world::World;

/// Safety ceiling on the number of rounds; a stalemate favours the crew.
pub const MAX_ROUNDS: u32 = 10;

/// Evaluate termination. Conditions are checked in a fixed priority order and
/// the first one that holds decides the game.
pub fn evaluate(world: &World, round: u32) -> Option<GameOutcome> {
    let impostor = world.impostor();
    let crewmates = |reason| GameOutcome {
        winner: Winner::Crewmates,
        reason,
    };

    if impostor.ejected {
        return Some(crewmates(WinReason::ImpostorEjected));
    }
    if !impostor.alive {
        return Some(crewmates(WinReason::ImpostorDead));
    }
    if world.tasks_done() >= world.tasks_needed() {
        return Some(crewmates(WinReason::TasksCompleted));
    }
    if world.alive_crewmates() <= 1 {
        return Some(GameOutcome {
            winner: Winner::Impostor,
            reason: WinReason::ImpostorKills,
        });
    }
    if round > MAX_ROUNDS {
        return Some(crewmates(WinReason::MaxRounds));
    }
    None
}
