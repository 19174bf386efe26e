//! Field-level validation of oracle decisions.
//!
//! Decoding guarantees the shape of a response; this module checks its
//! content against the room set, the player's role and the living roster. An
//! invalid field falls back to its safe default without touching the rest of
//! the decision.

use crate::core::defaults::{FILLER_STATEMENT, SKIP};
use crate::core::types::{
    ActionDecision, ActionKind, ActionResponse, DiscussionResponse, Role, Room, VoteTarget,
};
use crate::core::world::World;

pub fn action(response: &ActionResponse, role: Role) -> ActionDecision {
    let room = Room::parse_lenient(&response.room).unwrap_or(Room::DEFAULT);
    let mut action = ActionKind::parse(&response.action)
        .filter(|kind| kind.allowed_for(role))
        .unwrap_or(ActionKind::Wait);

    let target = response
        .target
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    if action == ActionKind::Kill && target.is_none() {
        action = ActionKind::Wait;
    }

    ActionDecision {
        room,
        action,
        target: if action == ActionKind::Kill { target } else { None },
    }
}

pub fn statement(response: &DiscussionResponse) -> String {
    let text = response.statement.trim();
    if text.is_empty() {
        FILLER_STATEMENT.to_string()
    } else {
        text.to_string()
    }
}

/// Resolve a vote name against the players still in play. Anything that is
/// not a living player's name counts as a skip.
pub fn vote_target(world: &World, raw: &str) -> VoteTarget {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case(SKIP) {
        return VoteTarget::Skip;
    }
    world
        .alive_players()
        .find(|player| player.name.eq_ignore_ascii_case(raw))
        .map(|player| VoteTarget::Player(player.id.clone()))
        .unwrap_or(VoteTarget::Skip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::four_player_world;

    fn response(room: &str, action: &str, target: Option<&str>) -> ActionResponse {
        ActionResponse {
            room: room.to_string(),
            action: action.to_string(),
            target: target.map(str::to_string),
            reasoning: None,
        }
    }

    #[test]
    fn unknown_room_falls_back_to_default_only() {
        let decision = action(&response("Storage", "do_task", None), Role::Crewmate);
        assert_eq!(decision.room, Room::Cafeteria);
        assert_eq!(decision.action, ActionKind::DoTask);
    }

    #[test]
    fn role_inconsistent_action_becomes_wait() {
        let decision = action(&response("Reactor", "kill", Some("RED")), Role::Crewmate);
        assert_eq!(decision.room, Room::Reactor);
        assert_eq!(decision.action, ActionKind::Wait);
        assert_eq!(decision.target, None);

        let decision = action(&response("Reactor", "do_task", None), Role::Impostor);
        assert_eq!(decision.action, ActionKind::Wait);
    }

    #[test]
    fn kill_without_target_becomes_wait() {
        let decision = action(&response("MedBay", "kill", Some("  ")), Role::Impostor);
        assert_eq!(decision.action, ActionKind::Wait);
        assert_eq!(decision.target, None);

        let decision = action(&response("MedBay", "kill", Some(" RED ")), Role::Impostor);
        assert_eq!(decision.action, ActionKind::Kill);
        assert_eq!(decision.target.as_deref(), Some("RED"));
    }

    #[test]
    fn target_is_dropped_for_non_kill_actions() {
        let decision = action(&response("MedBay", "fake_task", Some("RED")), Role::Impostor);
        assert_eq!(decision.action, ActionKind::FakeTask);
        assert_eq!(decision.target, None);
    }

    #[test]
    fn blank_statement_uses_filler() {
        let blank = DiscussionResponse {
            statement: "   ".to_string(),
            reasoning: None,
        };
        assert_eq!(statement(&blank), FILLER_STATEMENT);
    }

    #[test]
    fn vote_names_resolve_case_insensitively() {
        let mut world = four_player_world();
        assert_eq!(vote_target(&world, "red"), VoteTarget::Player("red".to_string()));
        assert_eq!(vote_target(&world, "SKIP"), VoteTarget::Skip);
        assert_eq!(vote_target(&world, "Mallory"), VoteTarget::Skip);

        world.player_mut("red").expect("red").alive = false;
        assert_eq!(vote_target(&world, "RED"), VoteTarget::Skip);
    }
}
