use std::collections::BTreeMap;
use std::sync::Arc;

use skeld::core::phase::PhaseResult;
use skeld::core::types::{DecisionKind, Phase, Role, Room, VoteTarget, WinReason, Winner};
use skeld::engine::{EngineError, EngineSettings, Game};
use skeld::io::config::GameConfig;
use skeld::io::oracle::{Oracle, OracleError, OracleRequest, OracleSet};
use skeld::looping::run_game;
use skeld::sessions::Sessions;
use skeld::test_support::{
    ScriptedOracle, action_json, four_player_world, statement_json, vote_json,
};

fn game_with(oracle: ScriptedOracle) -> (Game, Arc<ScriptedOracle>) {
    let oracle = Arc::new(oracle);
    let game = Game::from_world(
        four_player_world(),
        OracleSet::uniform(oracle.clone()),
        EngineSettings::default(),
        BTreeMap::new(),
    )
    .expect("game");
    (game, oracle)
}

/// Panics for one player's action, otherwise defers to a scripted oracle.
struct PanicsFor {
    player: &'static str,
    inner: ScriptedOracle,
}

impl Oracle for PanicsFor {
    fn query(&self, request: &OracleRequest) -> Result<String, OracleError> {
        if request.player_id == self.player && request.kind == DecisionKind::Action {
            panic!("backend crashed for {}", request.player_id);
        }
        self.inner.query(request)
    }
}

fn wait_in(room: &str) -> String {
    action_json(room, "wait", None)
}

#[test]
fn kill_meeting_and_failed_vote_complete_the_round() {
    let oracle = ScriptedOracle::new()
        .reply(
            "imp",
            DecisionKind::Action,
            action_json("Cafeteria", "kill", Some("RED")),
        )
        .always(DecisionKind::Action, wait_in("Cafeteria"))
        .always(DecisionKind::Discussion, statement_json("Where were you?"))
        .reply("imp", DecisionKind::Vote, vote_json("BLUE"))
        .reply("green", DecisionKind::Vote, vote_json("IMP"))
        .fail(
            "blue",
            DecisionKind::Vote,
            OracleError::Transport("connection reset".to_string()),
        );
    let (mut game, oracle) = game_with(oracle);

    let action = game.advance_phase().expect("action");
    let PhaseResult::Action(summary) = action.result else {
        panic!("expected an action summary");
    };
    let kill = summary.kill.expect("kill");
    assert_eq!(kill.victim, "RED");
    assert_eq!(kill.room, Room::Cafeteria);
    assert_eq!(
        action.new_events,
        vec!["Round 1: RED was killed in Cafeteria!".to_string()]
    );
    assert!(game.state().world.kill_cooldown);
    assert!(!action.snapshot.player("red").expect("red").alive);

    let discovery = game.advance_phase().expect("discovery");
    assert_eq!(discovery.phase, Phase::Discussion);
    assert_eq!(
        discovery.new_events,
        vec!["Round 1: EMERGENCY! IMP found RED's body in Cafeteria!".to_string()]
    );
    assert!(discovery.snapshot.meeting_triggered);

    game.advance_phase().expect("discussion 1");
    let second = game.advance_phase().expect("discussion 2");
    assert_eq!(second.phase, Phase::Voting);
    assert_eq!(game.state().discussion.len(), 6);
    // dead players are not consulted
    assert!(oracle.requests_for("red", DecisionKind::Discussion).is_empty());

    let voting = game.advance_phase().expect("voting");
    let PhaseResult::Voting(outcome) = voting.result else {
        panic!("expected a vote outcome");
    };
    assert_eq!(outcome.ejected, None);
    let blue = game
        .state()
        .votes
        .iter()
        .find(|record| record.voter_id == "blue")
        .expect("blue vote recorded");
    assert_eq!(blue.target, VoteTarget::Skip);
    assert!(blue.reason.starts_with("Error occurred"));
    assert_eq!(
        voting.new_events.last().map(String::as_str),
        Some("Round 1: No one was ejected (tie or skip majority).")
    );

    let results = game.advance_phase().expect("results");
    assert_eq!(results.phase, Phase::Action);
    assert_eq!(game.state().round, 2);
    assert!(game.state().world.bodies.is_empty());
    assert!(!game.state().world.kill_cooldown);
    assert!(!game.is_over());
}

#[test]
fn impostor_wins_when_one_crewmate_is_left() {
    let oracle = ScriptedOracle::new()
        .reply(
            "imp",
            DecisionKind::Action,
            action_json("Cafeteria", "kill", Some("RED")),
        )
        .reply(
            "imp",
            DecisionKind::Action,
            action_json("Cafeteria", "kill", Some("BLUE")),
        )
        .always(DecisionKind::Action, wait_in("Cafeteria"))
        .always(DecisionKind::Discussion, statement_json("No idea."))
        .always(DecisionKind::Vote, vote_json("skip"));
    let (mut game, _) = game_with(oracle);

    let finished = run_game(&mut game, |_| {}).expect("run");

    assert_eq!(finished.outcome.winner, Winner::Impostor);
    assert_eq!(finished.outcome.reason, WinReason::ImpostorKills);
    assert_eq!(finished.final_round, 2);
    let snapshot = game.snapshot();
    assert!(snapshot.game_over);
    assert_eq!(snapshot.win_reason, Some(WinReason::ImpostorKills));

    let before = game.state().clone();
    let err = game.advance_phase().expect_err("game over");
    assert!(matches!(err, EngineError::GameOver(_)));
    assert_eq!(game.state(), &before);
}

#[test]
fn crew_wins_by_completing_every_task() {
    let mut oracle = ScriptedOracle::new();
    for id in ["red", "blue", "green"] {
        oracle = oracle
            .reply(id, DecisionKind::Action, action_json("Electrical", "do_task", None))
            .reply(id, DecisionKind::Action, action_json("MedBay", "do_task", None));
    }
    let oracle = oracle
        .reply(
            "imp",
            DecisionKind::Action,
            action_json("Electrical", "do_task", None),
        )
        .always(DecisionKind::Action, wait_in("Cafeteria"));
    let (mut game, _) = game_with(oracle);

    let mut events = Vec::new();
    let finished = run_game(&mut game, |advance| events.extend(advance.new_events.clone()))
        .expect("run");

    assert_eq!(finished.outcome.winner, Winner::Crewmates);
    assert_eq!(finished.outcome.reason, WinReason::TasksCompleted);
    assert_eq!(finished.final_round, 2);
    assert_eq!(game.state().world.tasks_done(), 6);
    // the impostor's do_task is downgraded to a wait
    assert!(
        events
            .iter()
            .all(|event| !event.contains("IMP completed"))
    );
    assert!(events.contains(&"Round 2: RED completed 'red scan' in MedBay".to_string()));
}

#[test]
fn sessions_play_seeded_games_deterministically() {
    let config = GameConfig {
        seed: Some(11),
        concurrency: 2,
        ..GameConfig::default()
    };
    let oracles = || {
        OracleSet::uniform(Arc::new(
            ScriptedOracle::new().always(DecisionKind::Action, wait_in("Cafeteria")),
        ))
    };

    let mut sessions = Sessions::new();
    let (a, first) = sessions.start_game(&config, oracles()).expect("start a");
    let (b, second) = sessions.start_game(&config, oracles()).expect("start b");

    let impostors = |snapshot: &skeld::snapshot::GameSnapshot| -> Vec<String> {
        snapshot
            .players
            .iter()
            .filter(|player| player.role == Role::Impostor)
            .map(|player| player.id.clone())
            .collect()
    };
    assert_eq!(impostors(&first).len(), 1);
    assert_eq!(impostors(&first), impostors(&second));
    assert_eq!(first.players, second.players);

    while !sessions.get_state(a).expect("a").game_over {
        sessions.advance_phase(a).expect("advance a");
    }
    let done = sessions.end_game(a).expect("end a");
    assert_eq!(done.win_reason, Some(WinReason::MaxRounds));
    assert_eq!(sessions.get_state(b).expect("b").round, 1);
    assert_eq!(sessions.len(), 1);
}

#[test]
fn panicking_oracle_falls_back_to_the_default_action() {
    let oracle = PanicsFor {
        player: "blue",
        inner: ScriptedOracle::new().always(DecisionKind::Action, wait_in("MedBay")),
    };
    let mut game = Game::from_world(
        four_player_world(),
        OracleSet::uniform(Arc::new(oracle)),
        EngineSettings::default(),
        BTreeMap::new(),
    )
    .expect("game");

    let advance = game.advance_phase().expect("advance despite panic");

    assert_eq!(advance.phase, Phase::Discovery);
    let world = &game.state().world;
    assert_eq!(world.player("blue").expect("blue").location, Room::Cafeteria);
    assert_eq!(world.player("red").expect("red").location, Room::MedBay);
    assert_eq!(world.player("green").expect("green").location, Room::MedBay);
    let trace = &game.state().traces["blue"];
    assert!(
        trace.reasoning.contains("oracle panicked: backend crashed for blue"),
        "unexpected trace: {}",
        trace.reasoning
    );
}

#[test]
fn prompts_see_the_state_before_the_phase_and_earlier_statements() {
    let oracle = ScriptedOracle::new()
        .reply("red", DecisionKind::Action, action_json("MedBay", "wait", None))
        .reply(
            "imp",
            DecisionKind::Action,
            action_json("Cafeteria", "kill", Some("BLUE")),
        )
        .always(DecisionKind::Action, wait_in("Cafeteria"));
    let oracle = ["imp", "red", "green"].into_iter().fold(oracle, |oracle, id| {
        oracle
            .reply(id, DecisionKind::Discussion, statement_json(&format!("{id} opening")))
            .reply(id, DecisionKind::Discussion, statement_json(&format!("{id} follow-up")))
    });
    let (mut game, oracle) = game_with(oracle);

    game.advance_phase().expect("action");
    // green comes after red in the roster but still sees red in the Cafeteria
    let green_action = oracle.requests_for("green", DecisionKind::Action);
    assert_eq!(green_action.len(), 1);
    assert!(green_action[0].prompt.contains("With you: IMP, RED, BLUE."));
    assert_eq!(
        game.state().world.player("red").expect("red").location,
        Room::MedBay
    );

    game.advance_phase().expect("discovery");
    game.advance_phase().expect("discussion 1");
    game.advance_phase().expect("discussion 2");
    assert_eq!(game.state().phase, Phase::Voting);

    for id in ["imp", "red", "green"] {
        let prompts = oracle.requests_for(id, DecisionKind::Discussion);
        assert_eq!(prompts.len(), 2, "{id} asked once per sub-round");
        let (first, second) = (&prompts[0].prompt, &prompts[1].prompt);

        assert!(first.contains("Nobody has spoken yet."), "{id}: {first}");
        for other in ["imp", "red", "green"] {
            assert!(!first.contains(&format!("{other} opening")));
            assert!(second.contains(&format!("{other} opening")), "{id}: {second}");
            assert!(!second.contains(&format!("{other} follow-up")));
        }
    }
}
