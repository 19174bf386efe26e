//! Default decisions substituted when an oracle fails.
//!
//! Every phase has exactly one safe default. The table is keyed by phase and
//! failure kind so that resolution code never branches on failures itself.

use std::fmt;

use serde::Serialize;

use crate::core::types::{ActionResponse, DiscussionResponse, Room, VoteResponse};

/// Statement recorded for a player with nothing to contribute.
pub const FILLER_STATEMENT: &str = "I don't have anything to say right now.";

pub const SKIP: &str = "skip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Transport,
    Malformed,
}

impl FailureKind {
    pub fn describe(self) -> &'static str {
        match self {
            FailureKind::Timeout => "oracle timed out",
            FailureKind::Transport => "oracle unavailable",
            FailureKind::Malformed => "oracle returned a malformed decision",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Stay in the default room and wait.
pub fn action(failure: FailureKind) -> ActionResponse {
    ActionResponse {
        room: Room::DEFAULT.as_str().to_string(),
        action: "wait".to_string(),
        target: None,
        reasoning: Some(format!("default action: {failure}")),
    }
}

pub fn discussion(failure: FailureKind) -> DiscussionResponse {
    DiscussionResponse {
        statement: FILLER_STATEMENT.to_string(),
        reasoning: Some(format!("default statement: {failure}")),
    }
}

pub fn vote(failure: FailureKind) -> VoteResponse {
    VoteResponse {
        vote: SKIP.to_string(),
        reason: Some(format!("Error occurred: {failure}")),
        reasoning: Some(format!("default vote: {failure}")),
    }
}
