//! Game configuration stored as TOML (default `skeld.toml`).

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::setup::{MAX_PLAYERS, MIN_PLAYERS, RosterEntry};

pub const DEFAULT_CONFIG_PATH: &str = "skeld.toml";

/// Game configuration (TOML).
///
/// Intended to be edited by hand. Missing fields take the defaults of a
/// six-player game between two teams.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for impostor and task assignment; random when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Recent event-log entries shown to each oracle.
    pub event_window: usize,

    /// Event-log entries included in a snapshot.
    pub snapshot_event_tail: usize,

    /// Upper bound on a rendered prompt; droppable sections go first.
    pub prompt_budget_bytes: usize,

    /// Worker threads for per-phase oracle queries.
    pub concurrency: usize,

    pub oracle: OracleConfig,

    pub teams: BTreeMap<String, TeamConfig>,

    pub players: Vec<PlayerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleConfig {
    /// Wall-clock limit for one oracle call.
    pub timeout_secs: u64,

    /// Truncate captured oracle stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Total tries when the reply is malformed.
    pub attempts: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            output_limit_bytes: 100_000,
            attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamConfig {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Program and arguments; `{schema}`, `{output}` and `{model}` are substituted.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerConfig {
    pub id: String,
    pub name: String,
    pub team: String,
    pub color: String,
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

fn default_teams() -> BTreeMap<String, TeamConfig> {
    BTreeMap::from([
        (
            "openai".to_string(),
            TeamConfig {
                display_name: "GPT 5.1".to_string(),
                model: Some("gpt-5.1".to_string()),
                command: args(&[
                    "codex",
                    "exec",
                    "--skip-git-repo-check",
                    "--model",
                    "{model}",
                    "--output-schema",
                    "{schema}",
                    "--output-last-message",
                    "{output}",
                    "-",
                ]),
            },
        ),
        (
            "anthropic".to_string(),
            TeamConfig {
                display_name: "Claude Haiku 4.5".to_string(),
                model: Some("claude-haiku-4-5".to_string()),
                command: args(&["claude", "-p", "--model", "{model}", "--output-format", "text"]),
            },
        ),
    ])
}

fn default_players() -> Vec<PlayerConfig> {
    let seats = [
        ("gpt-1", "GPT-1", "openai", "#c51111"),
        ("gpt-2", "GPT-2", "openai", "#132ed1"),
        ("gpt-3", "GPT-3", "openai", "#38fedc"),
        ("claude-1", "Claude-1", "anthropic", "#117f2d"),
        ("claude-2", "Claude-2", "anthropic", "#f5f557"),
        ("claude-3", "Claude-3", "anthropic", "#ee7621"),
    ];
    seats
        .into_iter()
        .map(|(id, name, team, color)| PlayerConfig {
            id: id.to_string(),
            name: name.to_string(),
            team: team.to_string(),
            color: color.to_string(),
        })
        .collect()
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: None,
            event_window: 10,
            snapshot_event_tail: 20,
            prompt_budget_bytes: 16_000,
            concurrency: 6,
            oracle: OracleConfig::default(),
            teams: default_teams(),
            players: default_players(),
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<()> {
        if self.event_window == 0 {
            bail!("event_window must be > 0");
        }
        if self.snapshot_event_tail == 0 {
            bail!("snapshot_event_tail must be > 0");
        }
        if self.prompt_budget_bytes == 0 {
            bail!("prompt_budget_bytes must be > 0");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be > 0");
        }
        if self.oracle.timeout_secs == 0 {
            bail!("oracle.timeout_secs must be > 0");
        }
        if self.oracle.output_limit_bytes == 0 {
            bail!("oracle.output_limit_bytes must be > 0");
        }
        if self.oracle.attempts == 0 {
            bail!("oracle.attempts must be > 0");
        }

        for (name, team) in &self.teams {
            if team.command.first().is_none_or(|program| program.trim().is_empty()) {
                bail!("teams.{name}.command must be a non-empty array");
            }
            if team.model.is_none() && team.command.iter().any(|arg| arg.contains("{model}")) {
                bail!("teams.{name}.command uses {{model}} but no model is set");
            }
        }

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players.len()) {
            bail!(
                "players must list {MIN_PLAYERS}..={MAX_PLAYERS} entries, got {}",
                self.players.len()
            );
        }
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for player in &self.players {
            if player.id.trim().is_empty() || player.name.trim().is_empty() {
                bail!("players need a non-empty id and name");
            }
            if !ids.insert(player.id.as_str()) {
                bail!("duplicate player id '{}'", player.id);
            }
            if !names.insert(player.name.to_lowercase()) {
                bail!("duplicate player name '{}'", player.name);
            }
            if !self.teams.contains_key(&player.team) {
                bail!("player '{}' uses unknown team '{}'", player.id, player.team);
            }
        }
        Ok(())
    }

    /// Seats in configured order.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.players
            .iter()
            .map(|player| RosterEntry {
                id: player.id.clone(),
                name: player.name.clone(),
                team: player.team.clone(),
                color: player.color.clone(),
            })
            .collect()
    }

    pub fn team_display_names(&self) -> BTreeMap<String, String> {
        self.teams
            .iter()
            .map(|(name, team)| (name.clone(), team.display_name.clone()))
            .collect()
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GameConfig::default()`.
pub fn load_config(path: &Path) -> Result<GameConfig> {
    if !path.exists() {
        let cfg = GameConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GameConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &GameConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf).with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
