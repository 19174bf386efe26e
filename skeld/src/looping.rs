//! Drive a game to completion.

use tracing::info;

use crate::core::types::GameOutcome;
use crate::engine::{EngineError, Game, PhaseAdvance};

/// Summary of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    pub outcome: GameOutcome,
    pub phases_advanced: u32,
    pub final_round: u32,
}

/// Advance `game` until it is over, calling `on_phase` after every advance.
///
/// Always terminates: the round ceiling ends every game. Stops immediately on
/// any refused advance.
pub fn run_game<F: FnMut(&PhaseAdvance)>(
    game: &mut Game,
    mut on_phase: F,
) -> Result<LoopOutcome, EngineError> {
    let mut phases_advanced = 0u32;
    loop {
        if let Some(outcome) = game.state().outcome {
            info!(
                winner = %outcome.winner,
                reason = %outcome.reason,
                phases_advanced,
                "game finished"
            );
            return Ok(LoopOutcome {
                outcome,
                phases_advanced,
                final_round: game.state().round,
            });
        }

        let advance = game.advance_phase()?;
        phases_advanced += 1;
        on_phase(&advance);
    }
}
