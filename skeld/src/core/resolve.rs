//! Per-phase resolution of collected decisions into the next game state.
//!
//! Every function here iterates the roster in its fixed order and looks
//! decisions up by player id, so the order in which decisions arrived never
//! influences the outcome.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::core::normalize;
use crate::core::state::{DiscussionEntry, GameState, Meeting, VoteRecord};
use crate::core::types::{ActionDecision, ActionKind, Role, Room, VoteResponse, VoteTarget};
use crate::core::world::Body;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movement {
    pub player_id: String,
    pub from: Room,
    pub to: Room,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskCompletion {
    pub player_id: String,
    pub task: String,
    pub room: Room,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kill {
    pub victim_id: String,
    pub victim: String,
    pub room: Room,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionSummary {
    pub movements: Vec<Movement>,
    pub tasks_completed: Vec<TaskCompletion>,
    pub kill: Option<Kill>,
}

/// Resolve the action phase: all movements, then crewmate tasks, then the
/// impostor's action.
pub fn resolve_action(state: &mut GameState, decisions: &[(String, ActionDecision)]) -> ActionSummary {
    let by_player: HashMap<&str, &ActionDecision> = decisions
        .iter()
        .map(|(id, decision)| (id.as_str(), decision))
        .collect();
    let acting: Vec<String> = state
        .world
        .alive_players()
        .map(|player| player.id.clone())
        .collect();
    let round = state.round;
    let mut summary = ActionSummary::default();

    for id in &acting {
        let Some(decision) = by_player.get(id.as_str()) else {
            continue;
        };
        let Some(player) = state.world.player_mut(id) else {
            continue;
        };
        if player.location == decision.room {
            continue;
        }
        let from = player.location;
        player.location = decision.room;
        state.events.record(
            round,
            format!("{} moved from {from} to {}", player.name, decision.room),
        );
        summary.movements.push(Movement {
            player_id: id.clone(),
            from,
            to: decision.room,
        });
    }

    for id in &acting {
        let Some(decision) = by_player.get(id.as_str()) else {
            continue;
        };
        if decision.action != ActionKind::DoTask {
            continue;
        }
        let Some(player) = state.world.player_mut(id) else {
            continue;
        };
        if player.role() != Role::Crewmate {
            continue;
        }
        let location = player.location;
        let Some(task) = player
            .tasks
            .iter_mut()
            .find(|task| !task.done && task.room == location)
        else {
            continue;
        };
        task.done = true;
        let task_name = task.name.clone();
        state.events.record(
            round,
            format!("{} completed '{task_name}' in {location}", player.name),
        );
        summary.tasks_completed.push(TaskCompletion {
            player_id: id.clone(),
            task: task_name,
            room: location,
        });
    }

    summary.kill = resolve_impostor(state, &by_player);
    summary
}

fn resolve_impostor(
    state: &mut GameState,
    by_player: &HashMap<&str, &ActionDecision>,
) -> Option<Kill> {
    let impostor = state.world.impostor();
    if !impostor.in_play() {
        return None;
    }
    let decision = by_player.get(impostor.id.as_str())?;
    let impostor_id = impostor.id.clone();
    let impostor_name = impostor.name.clone();
    let room = impostor.location;

    match decision.action {
        ActionKind::FakeTask => {
            state
                .events
                .record(state.round, format!("{impostor_name} completed a task in {room}"));
            None
        }
        ActionKind::Kill => {
            if state.world.kill_cooldown {
                debug!(round = state.round, "kill refused: cooldown active");
                return None;
            }
            let target = decision.target.as_deref()?;
            let co_located: Vec<_> = state
                .world
                .alive_players()
                .filter(|player| player.location == room && player.id != impostor_id)
                .collect();
            let victim = co_located
                .iter()
                .find(|player| player.name == target)
                .or_else(|| {
                    co_located
                        .iter()
                        .find(|player| player.role() == Role::Crewmate)
                })
                .map(|player| player.id.clone());
            let Some(victim_id) = victim else {
                debug!(round = state.round, %room, "kill refused: nobody co-located");
                return None;
            };

            let victim = state.world.player_mut(&victim_id)?;
            victim.alive = false;
            let victim_name = victim.name.clone();
            state.world.bodies.push(Body {
                player_id: victim_id.clone(),
                room,
            });
            state.world.kill_cooldown = true;
            state
                .events
                .record(state.round, format!("{victim_name} was killed in {room}!"));
            Some(Kill {
                victim_id,
                victim: victim_name,
                room,
            })
        }
        ActionKind::DoTask | ActionKind::Wait => None,
    }
}

/// First player in roster order standing in a room with a body reports it.
pub fn discover(state: &mut GameState) -> Option<Meeting> {
    let (reporter, body) = state.world.alive_players().find_map(|player| {
        state
            .world
            .bodies
            .iter()
            .find(|body| body.room == player.location)
            .map(|body| (player, body))
    })?;

    let reason = format!(
        "{} found {}'s body in {}!",
        reporter.name,
        state.name_of(&body.player_id),
        body.room
    );
    let meeting = Meeting {
        reporter_id: reporter.id.clone(),
        victim_id: body.player_id.clone(),
        room: body.room,
        reason,
    };
    state
        .events
        .record(state.round, format!("EMERGENCY! {}", meeting.reason));
    Some(meeting)
}

/// Append one discussion sub-round's statements in roster order.
pub fn record_statements(
    state: &mut GameState,
    sub_round: u8,
    statements: &[(String, String)],
) -> Vec<DiscussionEntry> {
    let by_player: HashMap<&str, &str> = statements
        .iter()
        .map(|(id, text)| (id.as_str(), text.as_str()))
        .collect();
    let entries: Vec<DiscussionEntry> = state
        .world
        .alive_players()
        .filter_map(|player| {
            let statement = by_player.get(player.id.as_str())?;
            Some(DiscussionEntry {
                player_id: player.id.clone(),
                player: player.name.clone(),
                statement: (*statement).to_string(),
                round: sub_round,
            })
        })
        .collect();

    for entry in &entries {
        state.events.record(
            state.round,
            format!("{} says: \"{}\"", entry.player, entry.statement),
        );
    }
    state.discussion.extend(entries.iter().cloned());
    entries
}

/// Vote counts keyed by target; the skip bucket is [`VoteTarget::Skip`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    counts: BTreeMap<VoteTarget, u32>,
}

impl Tally {
    pub fn add(&mut self, target: VoteTarget) {
        *self.counts.entry(target).or_default() += 1;
    }

    pub fn count(&self, target: &VoteTarget) -> u32 {
        self.counts.get(target).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VoteTarget, u32)> {
        self.counts.iter().map(|(target, count)| (target, *count))
    }

    /// The player to eject: the unique maximum, not the skip bucket, with
    /// more than one vote.
    pub fn ejection(&self) -> Option<&str> {
        let max = self.counts.values().copied().max()?;
        let mut leaders = self.counts.iter().filter(|(_, count)| **count == max);
        let (leader, _) = leaders.next()?;
        if leaders.next().is_some() || max <= 1 {
            return None;
        }
        match leader {
            VoteTarget::Player(id) => Some(id.as_str()),
            VoteTarget::Skip => None,
        }
    }
}

impl FromIterator<VoteTarget> for Tally {
    fn from_iter<I: IntoIterator<Item = VoteTarget>>(iter: I) -> Self {
        let mut tally = Tally::default();
        for target in iter {
            tally.add(target);
        }
        tally
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ejection {
    pub player_id: String,
    pub name: String,
    pub was_impostor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyEntry {
    pub label: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub ejected: Option<Ejection>,
    pub tally: Vec<TallyEntry>,
}

/// Record every vote, tally them and eject the unique leader if any.
pub fn resolve_votes(state: &mut GameState, votes: &[(String, VoteResponse)]) -> VoteOutcome {
    let by_player: HashMap<&str, &VoteResponse> = votes
        .iter()
        .map(|(id, vote)| (id.as_str(), vote))
        .collect();
    let records: Vec<VoteRecord> = state
        .world
        .alive_players()
        .filter_map(|player| {
            let response = by_player.get(player.id.as_str())?;
            Some(VoteRecord {
                voter_id: player.id.clone(),
                voter: player.name.clone(),
                vote: response.vote.trim().to_string(),
                target: normalize::vote_target(&state.world, &response.vote),
                reason: response
                    .reason
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect();

    for record in &records {
        let line = if record.reason.is_empty() {
            format!("{} voted for {}", record.voter, record.vote)
        } else {
            format!("{} voted for {} ({})", record.voter, record.vote, record.reason)
        };
        state.events.record(state.round, line);
    }

    let tally: Tally = records.iter().map(|record| record.target.clone()).collect();
    let tally_entries = tally
        .iter()
        .map(|(target, count)| TallyEntry {
            label: match target {
                VoteTarget::Player(id) => state.name_of(id).to_string(),
                VoteTarget::Skip => "Skip".to_string(),
            },
            count,
        })
        .collect();
    state.votes = records;

    let ejected = tally.ejection().and_then(|id| {
        let player = state.world.player_mut(id)?;
        player.ejected = true;
        player.alive = false;
        Some(Ejection {
            player_id: player.id.clone(),
            name: player.name.clone(),
            was_impostor: player.is_impostor(),
        })
    });

    match &ejected {
        Some(ejection) => {
            let verdict = if ejection.was_impostor {
                "They WERE the impostor!"
            } else {
                "They were NOT the impostor."
            };
            state
                .events
                .record(state.round, format!("{} was ejected. {verdict}", ejection.name));
            state.ejected_this_round = Some(ejection.player_id.clone());
        }
        None => {
            state
                .events
                .record(state.round, "No one was ejected (tie or skip majority).");
        }
    }

    VoteOutcome {
        ejected,
        tally: tally_entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{crewmate, four_player_world, impostor};
    use crate::core::world::World;

    fn decision(room: Room, action: ActionKind, target: Option<&str>) -> ActionDecision {
        ActionDecision {
            room,
            action,
            target: target.map(str::to_string),
        }
    }

    fn vote(name: &str) -> VoteResponse {
        VoteResponse {
            vote: name.to_string(),
            reason: Some("sus".to_string()),
            reasoning: None,
        }
    }

    fn player(id: &str) -> VoteTarget {
        VoteTarget::Player(id.to_string())
    }

    #[test]
    fn impostor_kills_named_crewmate_in_shared_room() {
        let world = World::new(vec![
            impostor("imp", Room::MedBay),
            crewmate("red", Room::MedBay),
            crewmate("blue", Room::Reactor),
            crewmate("green", Room::Navigation),
        ])
        .expect("world");
        let mut state = GameState::new(world);
        let decisions = vec![
            ("imp".to_string(), decision(Room::MedBay, ActionKind::Kill, Some("RED"))),
            ("red".to_string(), decision(Room::MedBay, ActionKind::Wait, None)),
            ("blue".to_string(), decision(Room::Reactor, ActionKind::Wait, None)),
            ("green".to_string(), decision(Room::Navigation, ActionKind::Wait, None)),
        ];

        let summary = resolve_action(&mut state, &decisions);

        let red = state.world.player("red").expect("red");
        assert!(!red.alive);
        assert!(!red.ejected);
        assert_eq!(
            state.world.bodies,
            vec![Body {
                player_id: "red".to_string(),
                room: Room::MedBay,
            }]
        );
        assert!(state.world.kill_cooldown);
        assert_eq!(summary.kill.expect("kill").victim_id, "red");
        assert!(
            state
                .events
                .entries()
                .contains(&"Round 1: RED was killed in MedBay!".to_string())
        );
    }

    #[test]
    fn kill_uses_post_move_rooms_and_substitutes_victim() {
        let world = World::new(vec![
            impostor("imp", Room::Cafeteria),
            crewmate("red", Room::Reactor),
            crewmate("blue", Room::Cafeteria),
            crewmate("green", Room::Cafeteria),
        ])
        .expect("world");
        let mut state = GameState::new(world);
        let decisions = vec![
            ("imp".to_string(), decision(Room::Reactor, ActionKind::Kill, Some("BLUE"))),
            ("red".to_string(), decision(Room::Reactor, ActionKind::Wait, None)),
            ("blue".to_string(), decision(Room::Cafeteria, ActionKind::Wait, None)),
            ("green".to_string(), decision(Room::Reactor, ActionKind::Wait, None)),
        ];

        let summary = resolve_action(&mut state, &decisions);

        let kill = summary.kill.expect("kill");
        assert_eq!(kill.victim_id, "red");
        assert_eq!(kill.room, Room::Reactor);
        assert!(state.world.player("blue").expect("blue").alive);
        assert_eq!(summary.movements.len(), 2);
    }

    #[test]
    fn kill_on_cooldown_has_no_effect() {
        let mut state = GameState::new(four_player_world());
        state.world.kill_cooldown = true;
        let decisions = vec![(
            "imp".to_string(),
            decision(Room::Cafeteria, ActionKind::Kill, Some("RED")),
        )];

        let summary = resolve_action(&mut state, &decisions);

        assert_eq!(summary.kill, None);
        assert!(state.world.bodies.is_empty());
        assert_eq!(state.world.alive_crewmates(), 3);
    }

    #[test]
    fn do_task_completes_first_matching_task_only() {
        let mut red = crewmate("red", Room::Cafeteria);
        red.tasks = vec![
            crate::core::world::Task::new("Fix Wiring", Room::Electrical),
            crate::core::world::Task::new("Reset Breakers", Room::Electrical),
        ];
        let world = World::new(vec![impostor("imp", Room::Cafeteria), red]).expect("world");
        let mut state = GameState::new(world);
        let decisions = vec![(
            "red".to_string(),
            decision(Room::Electrical, ActionKind::DoTask, None),
        )];

        let summary = resolve_action(&mut state, &decisions);

        let red = state.world.player("red").expect("red");
        assert!(red.tasks[0].done);
        assert!(!red.tasks[1].done);
        assert_eq!(summary.tasks_completed.len(), 1);
        assert_eq!(
            state.events.entries(),
            &[
                "Round 1: RED moved from Cafeteria to Electrical".to_string(),
                "Round 1: RED completed 'Fix Wiring' in Electrical".to_string(),
            ]
        );
    }

    #[test]
    fn fake_task_is_narrative_only() {
        let mut state = GameState::new(four_player_world());
        let before = state.world.clone();
        let decisions = vec![(
            "imp".to_string(),
            decision(Room::Cafeteria, ActionKind::FakeTask, None),
        )];

        resolve_action(&mut state, &decisions);

        assert_eq!(state.world, before);
        assert_eq!(
            state.events.entries(),
            &["Round 1: IMP completed a task in Cafeteria".to_string()]
        );
    }

    #[test]
    fn discovery_triggers_once_for_first_player_in_roster_order() {
        let mut world = World::new(vec![
            impostor("imp", Room::Navigation),
            crewmate("red", Room::MedBay),
            crewmate("blue", Room::Reactor),
            crewmate("green", Room::Electrical),
            crewmate("pink", Room::Cafeteria),
        ])
        .expect("world");
        for (id, room) in [("green", Room::Electrical), ("pink", Room::Cafeteria)] {
            world.player_mut(id).expect("victim").alive = false;
            world.bodies.push(Body {
                player_id: id.to_string(),
                room,
            });
        }
        world.player_mut("red").expect("red").location = Room::Cafeteria;
        world.player_mut("blue").expect("blue").location = Room::Electrical;
        let mut state = GameState::new(world);
        state.phase = crate::core::types::Phase::Discovery;

        let meeting = discover(&mut state).expect("meeting");

        assert_eq!(meeting.reporter_id, "red");
        assert_eq!(meeting.victim_id, "pink");
        assert_eq!(meeting.reason, "RED found PINK's body in Cafeteria!");
        assert_eq!(state.events.len(), 1);
    }

    #[test]
    fn discovery_without_co_located_body_is_none() {
        let mut state = GameState::new(four_player_world());
        assert_eq!(discover(&mut state), None);
        assert!(state.events.is_empty());
    }

    #[test]
    fn tally_ejection_rule() {
        let tally: Tally = [player("a"), player("a"), player("b"), VoteTarget::Skip]
            .into_iter()
            .collect();
        assert_eq!(tally.ejection(), Some("a"));

        let tally: Tally = [player("a"), player("a"), player("b"), player("b")]
            .into_iter()
            .collect();
        assert_eq!(tally.ejection(), None);

        let tally: Tally = [player("a"), VoteTarget::Skip, VoteTarget::Skip, VoteTarget::Skip]
            .into_iter()
            .collect();
        assert_eq!(tally.ejection(), None);

        let tally: Tally = [player("a"), player("b")].into_iter().collect();
        assert_eq!(tally.ejection(), None);

        let tally: Tally = [player("a"), player("a"), VoteTarget::Skip, VoteTarget::Skip]
            .into_iter()
            .collect();
        assert_eq!(tally.ejection(), None);
    }

    #[test]
    fn votes_eject_impostor_and_label_tally() {
        let mut state = GameState::new(four_player_world());
        let votes = vec![
            ("imp".to_string(), vote("RED")),
            ("red".to_string(), vote("imp")),
            ("blue".to_string(), vote("IMP")),
            ("green".to_string(), vote("nobody")),
        ];

        let outcome = resolve_votes(&mut state, &votes);

        let ejected = outcome.ejected.expect("ejected");
        assert_eq!(ejected.player_id, "imp");
        assert!(ejected.was_impostor);
        let imp = state.world.player("imp").expect("imp");
        assert!(imp.ejected && !imp.alive);
        assert_eq!(state.ejected_this_round.as_deref(), Some("imp"));
        assert_eq!(
            outcome.tally,
            vec![
                TallyEntry {
                    label: "IMP".to_string(),
                    count: 2,
                },
                TallyEntry {
                    label: "RED".to_string(),
                    count: 1,
                },
                TallyEntry {
                    label: "Skip".to_string(),
                    count: 1,
                },
            ]
        );
        assert_eq!(state.votes[3].target, VoteTarget::Skip);
        assert_eq!(
            state.events.entries().last().map(String::as_str),
            Some("Round 1: IMP was ejected. They WERE the impostor!")
        );
    }

    #[test]
    fn split_vote_ejects_nobody() {
        let mut state = GameState::new(four_player_world());
        let votes = vec![
            ("imp".to_string(), vote("RED")),
            ("red".to_string(), vote("BLUE")),
            ("blue".to_string(), vote("skip")),
            ("green".to_string(), vote("skip")),
        ];

        let outcome = resolve_votes(&mut state, &votes);

        assert_eq!(outcome.ejected, None);
        assert_eq!(state.world.alive_players().count(), 4);
        assert_eq!(
            state.events.entries().last().map(String::as_str),
            Some("Round 1: No one was ejected (tie or skip majority).")
        );
    }

    #[test]
    fn statements_are_recorded_in_roster_order() {
        let mut state = GameState::new(four_player_world());
        let statements = vec![
            ("green".to_string(), "I was in Cafeteria".to_string()),
            ("imp".to_string(), "Not me".to_string()),
        ];

        let entries = record_statements(&mut state, 1, &statements);

        let speakers: Vec<&str> = entries.iter().map(|e| e.player_id.as_str()).collect();
        assert_eq!(speakers, vec!["imp", "green"]);
        assert!(entries.iter().all(|e| e.round == 1));
        assert_eq!(state.discussion.len(), 2);
        assert_eq!(state.events.entries()[0], "Round 1: IMP says: \"Not me\"");
    }
}
