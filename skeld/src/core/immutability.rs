//! Transition checks between consecutive game states.

use crate::core::state::GameState;

/// Validate that `next` is a legal successor of `prev`.
///
/// For every advance, this check enforces:
/// - The roster (ids, order and roles) is unchanged.
/// - Nobody is revived or un-ejected.
/// - Completed tasks stay completed; the task total never shrinks.
/// - The round counter never decreases.
/// - The event log only grows, keeping `prev`'s entries as a prefix.
/// - No kill happens while the cooldown was already set.
///
/// Returns a list of stable error messages in roster order.
pub fn check_transition(prev: &GameState, next: &GameState) -> Vec<String> {
    let mut errors = Vec::new();
    let before = prev.world.players();
    let after = next.world.players();

    if before.len() != after.len() {
        errors.push(format!(
            "roster size changed from {} to {}",
            before.len(),
            after.len()
        ));
    }

    for (old, new) in before.iter().zip(after) {
        if old.id != new.id {
            errors.push(format!("roster slot '{}' replaced by '{}'", old.id, new.id));
            continue;
        }
        if old.role() != new.role() {
            errors.push(format!("'{}' changed role", old.id));
        }
        if !old.alive && new.alive {
            errors.push(format!("'{}' was revived", old.id));
        }
        if old.ejected && !new.ejected {
            errors.push(format!("'{}' was un-ejected", old.id));
        }
        for task in old.tasks.iter().filter(|task| task.done) {
            let still_done = new
                .tasks
                .iter()
                .any(|candidate| candidate.name == task.name && candidate.done);
            if !still_done {
                errors.push(format!("'{}' lost completed task '{}'", old.id, task.name));
            }
        }
    }

    if next.world.tasks_needed() < prev.world.tasks_needed() {
        errors.push("task total decreased".to_string());
    }
    if next.world.tasks_done() > next.world.tasks_needed() {
        errors.push("more tasks completed than assigned".to_string());
    }
    if next.round < prev.round {
        errors.push(format!("round went back from {} to {}", prev.round, next.round));
    }

    let kept = prev.events.entries();
    if next.events.len() < kept.len() || next.events.entries()[..kept.len()] != *kept {
        errors.push("event log was rewritten".to_string());
    }

    if prev.world.kill_cooldown && next.world.bodies.len() > prev.world.bodies.len() {
        errors.push("kill happened during cooldown".to_string());
    }

    errors
}
