//! The game-instance handle: advance one phase at a time.
//!
//! Each advance queries every living player's oracle, concurrently on a
//! bounded pool, against the state as it was before the phase. Replies are
//! collected in roster order, resolved on a copy of the state, and the copy is
//! committed only if every structural check holds.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::core::defaults::FailureKind;
use crate::core::immutability::check_transition;
use crate::core::invariants::validate_state;
use crate::core::normalize;
use crate::core::phase::{self, PhaseInput, PhaseResult};
use crate::core::setup;
use crate::core::situation::Situation;
use crate::core::state::GameState;
use crate::core::types::{
    ActionResponse, DecisionKind, DiscussionResponse, GameOutcome, Phase, VoteResponse,
};
use crate::core::world::{Player, World};
use crate::io::config::GameConfig;
use crate::io::oracle::{DecisionShape, OracleError, OracleRequest, OracleSet, decide};
use crate::io::prompt::PromptBuilder;
use crate::snapshot::GameSnapshot;

/// Requests refused at the driver boundary. A refused request leaves the
/// game untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown game '{0}'")]
    UnknownGame(String),
    #[error("game is already over: {} won ({})", .0.winner, .0.reason)]
    GameOver(GameOutcome),
    #[error("invariant violation:\n- {}", .0.join("\n- "))]
    InvariantViolation(Vec<String>),
    #[error("game setup failed: {0}")]
    Setup(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub event_window: usize,
    pub snapshot_event_tail: usize,
    pub prompt_budget_bytes: usize,
    pub concurrency: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            event_window: config.event_window,
            snapshot_event_tail: config.snapshot_event_tail,
            prompt_budget_bytes: config.prompt_budget_bytes,
            concurrency: config.concurrency,
        }
    }
}

/// Result of one [`Game::advance_phase`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseAdvance {
    /// The phase that was resolved.
    pub resolved: Phase,
    /// The phase the game is now in.
    pub phase: Phase,
    pub result: PhaseResult,
    /// Event-log lines appended by this advance.
    pub new_events: Vec<String>,
    pub snapshot: GameSnapshot,
}

/// One player's reply (or default) for the current phase.
struct Collected<T> {
    player_id: String,
    decision: T,
    reasoning: String,
    elapsed_secs: f64,
}

pub struct Game {
    state: GameState,
    oracles: OracleSet,
    settings: EngineSettings,
    teams: BTreeMap<String, String>,
    prompts: PromptBuilder,
    pool: Option<rayon::ThreadPool>,
}

impl Game {
    /// Deal roles and tasks from `config` and start at round 1, action phase.
    #[instrument(skip_all, fields(seed = ?config.seed, players = config.players.len()))]
    pub fn start(config: &GameConfig, oracles: OracleSet) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|err| EngineError::Setup(format!("{err:#}")))?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let world = setup::deal(&config.roster(), &mut rng)
            .map_err(|err| EngineError::Setup(err.to_string()))?;
        debug!(impostor = %world.impostor().id, "game dealt");
        Self::from_world(
            world,
            oracles,
            EngineSettings::from_config(config),
            config.team_display_names(),
        )
    }

    /// Start from a prepared world. Used by tests and custom setups.
    pub fn from_world(
        world: World,
        oracles: OracleSet,
        settings: EngineSettings,
        teams: BTreeMap<String, String>,
    ) -> Result<Self, EngineError> {
        let pool = if settings.concurrency > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(settings.concurrency)
                .thread_name(|idx| format!("skeld-oracle-{idx}"))
                .build()
                .map_err(|err| EngineError::Setup(format!("build oracle pool: {err}")))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self {
            state: GameState::new(world),
            oracles,
            prompts: PromptBuilder::new(settings.prompt_budget_bytes),
            settings,
            teams,
            pool,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::capture(&self.state, &self.teams, self.settings.snapshot_event_tail)
    }

    /// Resolve the current phase and move to the next one.
    ///
    /// Refused with [`EngineError::GameOver`] once the game has ended, and
    /// with [`EngineError::InvariantViolation`] if resolution would break a
    /// structural invariant. In both cases the state is unchanged.
    #[instrument(skip_all, fields(round = self.state.round, phase = %self.state.phase))]
    pub fn advance_phase(&mut self) -> Result<PhaseAdvance, EngineError> {
        if let Some(outcome) = self.state.outcome {
            return Err(EngineError::GameOver(outcome));
        }

        let resolved = self.state.phase;
        let mut next = self.state.clone();
        let input = match resolved {
            Phase::Action => {
                let replies = self.collect::<ActionResponse>();
                let decisions = replies
                    .iter()
                    .filter_map(|reply| {
                        let role = self.state.world.player(&reply.player_id).map(Player::role)?;
                        Some((
                            reply.player_id.clone(),
                            normalize::action(&reply.decision, role),
                        ))
                    })
                    .collect();
                record_traces(&mut next, &replies);
                PhaseInput::Action(decisions)
            }
            Phase::Discovery => PhaseInput::Discovery,
            Phase::Discussion => {
                let replies = self.collect::<DiscussionResponse>();
                let statements = replies
                    .iter()
                    .map(|reply| {
                        (
                            reply.player_id.clone(),
                            normalize::statement(&reply.decision),
                        )
                    })
                    .collect();
                record_traces(&mut next, &replies);
                PhaseInput::Discussion(statements)
            }
            Phase::Voting => {
                let replies = self.collect::<VoteResponse>();
                record_traces(&mut next, &replies);
                PhaseInput::Voting(
                    replies
                        .into_iter()
                        .map(|reply| (reply.player_id, reply.decision))
                        .collect(),
                )
            }
            Phase::Results => PhaseInput::Results,
        };

        let result = phase::advance(&mut next, input)
            .map_err(|err| EngineError::InvariantViolation(vec![err.to_string()]))?;

        let mut errors = validate_state(&next);
        errors.extend(check_transition(&self.state, &next));
        if !errors.is_empty() {
            error!(errors = ?errors, "refusing phase advance");
            return Err(EngineError::InvariantViolation(errors));
        }

        let new_events = next.events.since(self.state.events.len()).to_vec();
        self.state = next;
        info!(
            next_phase = %self.state.phase,
            new_events = new_events.len(),
            over = self.state.is_over(),
            "phase advanced"
        );
        if let Some(outcome) = self.state.outcome {
            info!(winner = %outcome.winner, reason = %outcome.reason, "game over");
        }

        Ok(PhaseAdvance {
            resolved,
            phase: self.state.phase,
            result,
            new_events,
            snapshot: self.snapshot(),
        })
    }

    /// Query every living player, in roster order, for a `T` decision.
    fn collect<T: DecisionShape>(&self) -> Vec<Collected<T>> {
        let planned: Vec<(String, Result<OracleRequest, OracleError>)> = self
            .state
            .world
            .alive_players()
            .map(|player| (player.id.clone(), self.request_for(player, T::KIND)))
            .collect();
        debug!(kind = %T::KIND, players = planned.len(), "collecting decisions");

        match &self.pool {
            Some(pool) if planned.len() > 1 => pool.install(|| {
                planned
                    .into_par_iter()
                    .map(|(player_id, request)| self.ask::<T>(player_id, request))
                    .collect()
            }),
            _ => planned
                .into_iter()
                .map(|(player_id, request)| self.ask::<T>(player_id, request))
                .collect(),
        }
    }

    fn request_for(
        &self,
        player: &Player,
        kind: DecisionKind,
    ) -> Result<OracleRequest, OracleError> {
        let situation =
            Situation::for_player(&self.state, &player.id, kind, self.settings.event_window)
                .ok_or_else(|| OracleError::Transport(format!("unknown player '{}'", player.id)))?;
        let prompt = self
            .prompts
            .build(&situation)
            .map_err(|err| OracleError::Transport(format!("render prompt: {err:#}")))?;
        Ok(OracleRequest {
            player_id: player.id.clone(),
            team: player.team.clone(),
            kind,
            prompt,
            schema: schema_for(kind),
        })
    }

    fn ask<T: DecisionShape>(
        &self,
        player_id: String,
        request: Result<OracleRequest, OracleError>,
    ) -> Collected<T> {
        let started = Instant::now();
        let reply = request.and_then(|request| {
            let oracle = self.oracles.get(&request.team).ok_or_else(|| {
                OracleError::Transport(format!("no oracle for team '{}'", request.team))
            })?;
            panic::catch_unwind(AssertUnwindSafe(|| decide::<T>(oracle.as_ref(), &request)))
                .unwrap_or_else(|payload| {
                    Err(OracleError::Transport(format!(
                        "oracle panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                })
        });
        let elapsed_secs = started.elapsed().as_secs_f64();

        match reply {
            Ok(decision) => Collected {
                reasoning: decision.reasoning().unwrap_or_default().to_string(),
                player_id,
                decision,
                elapsed_secs,
            },
            Err(err) => {
                let failure: FailureKind = err.failure_kind();
                warn!(
                    player = %player_id,
                    kind = %T::KIND,
                    failure = ?failure,
                    err = %err,
                    "oracle failed, using default decision"
                );
                Collected {
                    reasoning: format!("oracle error: {err}"),
                    decision: T::fallback(failure),
                    player_id,
                    elapsed_secs,
                }
            }
        }
    }
}

fn schema_for(kind: DecisionKind) -> &'static str {
    match kind {
        DecisionKind::Action => ActionResponse::SCHEMA,
        DecisionKind::Discussion => DiscussionResponse::SCHEMA,
        DecisionKind::Vote => VoteResponse::SCHEMA,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn record_traces<T>(state: &mut GameState, replies: &[Collected<T>]) {
    for reply in replies {
        state
            .traces
            .entry(reply.player_id.clone())
            .or_default()
            .record(reply.reasoning.clone(), reply.elapsed_secs);
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("round", &self.state.round)
            .field("phase", &self.state.phase)
            .field("oracles", &self.oracles)
            .field("settings", &self.settings)
            .finish()
    }
}
