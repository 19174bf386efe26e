//! Driver boundary over any number of concurrent games.
//!
//! Each game is an independent [`Game`] handle addressed by a [`GameId`];
//! nothing is shared between games. Callers serialize requests per game by
//! holding `&mut Sessions`.

use std::collections::BTreeMap;
use std::fmt;

use tracing::info;

use crate::engine::{EngineError, Game, PhaseAdvance};
use crate::io::config::GameConfig;
use crate::io::oracle::OracleSet;
use crate::snapshot::GameSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameId(u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "game-{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct Sessions {
    next_id: u64,
    games: BTreeMap<GameId, Game>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deal a new game and return its id with the initial snapshot.
    pub fn start_game(
        &mut self,
        config: &GameConfig,
        oracles: OracleSet,
    ) -> Result<(GameId, GameSnapshot), EngineError> {
        let game = Game::start(config, oracles)?;
        Ok(self.insert(game))
    }

    /// Register an already constructed game.
    pub fn insert(&mut self, game: Game) -> (GameId, GameSnapshot) {
        self.next_id += 1;
        let id = GameId(self.next_id);
        let snapshot = game.snapshot();
        self.games.insert(id, game);
        info!(game = %id, "game started");
        (id, snapshot)
    }

    pub fn advance_phase(&mut self, id: GameId) -> Result<PhaseAdvance, EngineError> {
        self.games
            .get_mut(&id)
            .ok_or_else(|| EngineError::UnknownGame(id.to_string()))?
            .advance_phase()
    }

    pub fn get_state(&self, id: GameId) -> Result<GameSnapshot, EngineError> {
        self.games
            .get(&id)
            .map(Game::snapshot)
            .ok_or_else(|| EngineError::UnknownGame(id.to_string()))
    }

    /// Drop a game, returning its final snapshot.
    pub fn end_game(&mut self, id: GameId) -> Result<GameSnapshot, EngineError> {
        let game = self
            .games
            .remove(&id)
            .ok_or_else(|| EngineError::UnknownGame(id.to_string()))?;
        info!(game = %id, "game ended");
        Ok(game.snapshot())
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::types::{DecisionKind, Phase};
    use crate::test_support::{ScriptedOracle, action_json};

    fn oracles() -> OracleSet {
        OracleSet::uniform(Arc::new(
            ScriptedOracle::new().always(DecisionKind::Action, action_json("Reactor", "wait", None)),
        ))
    }

    fn seeded(seed: u64) -> GameConfig {
        GameConfig {
            seed: Some(seed),
            ..GameConfig::default()
        }
    }

    #[test]
    fn games_are_independent() {
        let mut sessions = Sessions::new();
        let (a, initial) = sessions.start_game(&seeded(1), oracles()).expect("start a");
        let (b, _) = sessions.start_game(&seeded(2), oracles()).expect("start b");
        assert_ne!(a, b);
        assert_eq!(initial.round, 1);
        assert_eq!(initial.phase, Phase::Action);
        assert_eq!(initial.players.len(), 6);

        let advance = sessions.advance_phase(a).expect("advance a");
        assert_eq!(advance.phase, Phase::Discovery);
        assert_eq!(sessions.get_state(a).expect("a").phase, Phase::Discovery);
        assert_eq!(sessions.get_state(b).expect("b").phase, Phase::Action);
    }

    #[test]
    fn unknown_games_are_refused() {
        let mut sessions = Sessions::new();
        let (id, _) = sessions.start_game(&seeded(3), oracles()).expect("start");
        sessions.end_game(id).expect("end");
        assert!(sessions.is_empty());

        let err = sessions.advance_phase(id).expect_err("unknown");
        assert_eq!(err, EngineError::UnknownGame("game-1".to_string()));
        assert!(sessions.get_state(id).is_err());
    }

    #[test]
    fn invalid_config_is_a_setup_error() {
        let mut sessions = Sessions::new();
        let mut config = seeded(4);
        config.players.truncate(1);
        let err = sessions.start_game(&config, oracles()).expect_err("setup");
        assert!(matches!(err, EngineError::Setup(_)));
        assert!(sessions.is_empty());
    }
}
