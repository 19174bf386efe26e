//! Phase state machine: action, discovery, discussion, voting, results.
//!
//! [`advance`] applies one phase's already-collected decisions. It assumes the
//! caller has checked that the game is not over; the engine runs it on a copy
//! of the state and commits only after invariants hold.

use serde::Serialize;
use thiserror::Error;

use crate::core::resolve::{self, ActionSummary, VoteOutcome};
use crate::core::state::{DISCUSSION_ROUNDS, DiscussionEntry, GameState, Meeting};
use crate::core::types::{ActionDecision, Phase, VoteResponse};
use crate::core::win;

/// Decisions collected for the current phase, keyed by player id.
#[derive(Debug, Clone)]
pub enum PhaseInput {
    Action(Vec<(String, ActionDecision)>),
    Discovery,
    Discussion(Vec<(String, String)>),
    Voting(Vec<(String, VoteResponse)>),
    Results,
}

impl PhaseInput {
    pub fn phase(&self) -> Phase {
        match self {
            PhaseInput::Action(_) => Phase::Action,
            PhaseInput::Discovery => Phase::Discovery,
            PhaseInput::Discussion(_) => Phase::Discussion,
            PhaseInput::Voting(_) => Phase::Voting,
            PhaseInput::Results => Phase::Results,
        }
    }
}

/// Phase-specific summary of one advance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum PhaseResult {
    Action(ActionSummary),
    Discovery {
        meeting: Option<Meeting>,
    },
    Discussion {
        sub_round: u8,
        statements: Vec<DiscussionEntry>,
    },
    Voting(VoteOutcome),
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    #[error("expected decisions for the {expected} phase, got {got}")]
    Mismatch { expected: Phase, got: Phase },
}

/// Resolve the current phase, move the cursor and re-evaluate the outcome.
pub fn advance(state: &mut GameState, input: PhaseInput) -> Result<PhaseResult, PhaseError> {
    if input.phase() != state.phase {
        return Err(PhaseError::Mismatch {
            expected: state.phase,
            got: input.phase(),
        });
    }

    let result = match input {
        PhaseInput::Action(decisions) => {
            let summary = resolve::resolve_action(state, &decisions);
            state.phase = Phase::Discovery;
            PhaseResult::Action(summary)
        }
        PhaseInput::Discovery => {
            let meeting = resolve::discover(state);
            match &meeting {
                Some(meeting) => {
                    state.open_meeting(meeting.clone());
                    state.phase = Phase::Discussion;
                }
                None => state.close_round(),
            }
            PhaseResult::Discovery { meeting }
        }
        PhaseInput::Discussion(statements) => {
            let sub_round = state.discussion_round;
            let statements = resolve::record_statements(state, sub_round, &statements);
            state.discussion_round += 1;
            if state.discussion_round >= DISCUSSION_ROUNDS {
                state.phase = Phase::Voting;
            }
            PhaseResult::Discussion {
                sub_round,
                statements,
            }
        }
        PhaseInput::Voting(votes) => {
            let outcome = resolve::resolve_votes(state, &votes);
            state.phase = Phase::Results;
            PhaseResult::Voting(outcome)
        }
        PhaseInput::Results => {
            state.close_round();
            PhaseResult::Results
        }
    };

    state.outcome = win::evaluate(&state.world, state.round);
    Ok(result)
}
