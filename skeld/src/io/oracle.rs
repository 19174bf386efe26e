//! Decision oracles: the seam between the engine and whatever makes decisions.
//!
//! An [`Oracle`] turns a rendered prompt into raw text. [`decide`] owns the
//! rest of the boundary: it extracts the JSON object from the reply, validates
//! it against the phase's JSON Schema and deserializes it, retrying malformed
//! replies as many times as the oracle allows. Backends never see game state.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use jsonschema::Draft;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::defaults::{self, FailureKind};
use crate::core::types::{ActionResponse, DecisionKind, DiscussionResponse, VoteResponse};
use crate::io::config::{GameConfig, OracleConfig, TeamConfig};
use crate::io::process::run_with_timeout;

const ACTION_SCHEMA: &str = include_str!("../../schemas/action_decision.schema.json");
const DISCUSSION_SCHEMA: &str = include_str!("../../schemas/discussion_decision.schema.json");
const VOTE_SCHEMA: &str = include_str!("../../schemas/vote_decision.schema.json");

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed decision: {0}")]
    Malformed(String),
}

impl OracleError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            OracleError::Timeout(_) => FailureKind::Timeout,
            OracleError::Transport(_) => FailureKind::Transport,
            OracleError::Malformed(_) => FailureKind::Malformed,
        }
    }
}

/// One decision request for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    pub player_id: String,
    pub team: String,
    pub kind: DecisionKind,
    pub prompt: String,
    /// JSON Schema the reply must satisfy.
    pub schema: &'static str,
}

/// Abstraction over decision backends.
///
/// Implementations must be bounded in time: every call returns, with a reply
/// or an error, after a finite wait.
pub trait Oracle: Send + Sync {
    /// Return the raw reply text for `request`.
    fn query(&self, request: &OracleRequest) -> Result<String, OracleError>;

    /// Total tries allowed when replies are malformed.
    fn attempts(&self) -> u32 {
        1
    }
}

/// Wire shape of one phase's decision.
pub trait DecisionShape: DeserializeOwned + Send {
    const KIND: DecisionKind;
    const SCHEMA: &'static str;

    fn reasoning(&self) -> Option<&str>;

    /// The safe default substituted when the oracle fails.
    fn fallback(failure: FailureKind) -> Self;
}

impl DecisionShape for ActionResponse {
    const KIND: DecisionKind = DecisionKind::Action;
    const SCHEMA: &'static str = ACTION_SCHEMA;

    fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    fn fallback(failure: FailureKind) -> Self {
        defaults::action(failure)
    }
}

impl DecisionShape for DiscussionResponse {
    const KIND: DecisionKind = DecisionKind::Discussion;
    const SCHEMA: &'static str = DISCUSSION_SCHEMA;

    fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    fn fallback(failure: FailureKind) -> Self {
        defaults::discussion(failure)
    }
}

impl DecisionShape for VoteResponse {
    const KIND: DecisionKind = DecisionKind::Vote;
    const SCHEMA: &'static str = VOTE_SCHEMA;

    fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    fn fallback(failure: FailureKind) -> Self {
        defaults::vote(failure)
    }
}

/// Query `oracle` and decode its reply as `T`.
///
/// Malformed replies are retried up to [`Oracle::attempts`] total tries;
/// timeouts and transport errors are returned immediately.
#[instrument(skip_all, fields(player = %request.player_id, kind = %request.kind))]
pub fn decide<T: DecisionShape>(oracle: &dyn Oracle, request: &OracleRequest) -> Result<T, OracleError> {
    let attempts = oracle.attempts().max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        match oracle.query(request).and_then(|raw| decode::<T>(&raw)) {
            Ok(decision) => {
                debug!(attempt, "decision decoded");
                return Ok(decision);
            }
            Err(err @ OracleError::Malformed(_)) => {
                warn!(attempt, attempts, err = %err, "malformed decision");
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_error.unwrap_or_else(|| OracleError::Malformed("no attempts made".to_string())))
}

/// Extract, validate and deserialize a decision from raw reply text.
pub fn decode<T: DecisionShape>(raw: &str) -> Result<T, OracleError> {
    let value = parse_reply(raw)
        .ok_or_else(|| OracleError::Malformed(format!("no JSON object in reply: {}", preview(raw))))?;
    validate_schema(&value, T::SCHEMA)?;
    serde_json::from_value(value).map_err(|err| OracleError::Malformed(err.to_string()))
}

/// The reply itself if it is a JSON object, else the last JSON object in it.
fn parse_reply(raw: &str) -> Option<Value> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(raw.trim()) {
        return Some(value);
    }

    let mut found = None;
    let mut pos = 0;
    while let Some(offset) = raw[pos..].find('{') {
        let start = pos + offset;
        let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value @ Value::Object(_))) => {
                found = Some(value);
                pos = start + stream.byte_offset();
            }
            _ => pos = start + 1,
        }
    }
    found
}

/// Validate a JSON instance against a JSON Schema (Draft 2020-12).
fn validate_schema(instance: &Value, schema_raw: &str) -> Result<(), OracleError> {
    let schema: Value = serde_json::from_str(schema_raw)
        .map_err(|err| OracleError::Malformed(format!("parse schema: {err}")))?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| OracleError::Malformed(format!("compile schema: {err}")))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(OracleError::Malformed(format!(
            "schema validation failed: {}",
            messages.join("; ")
        )));
    }
    Ok(())
}

fn preview(raw: &str) -> String {
    const MAX: usize = 200;
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Oracle that runs an external program per decision.
///
/// The prompt goes to stdin. `{schema}`, `{output}` and `{model}` in the argv
/// are replaced with the schema file, the reply file and the model name. The
/// reply is read from `{output}` when the command mentions it, else stdout.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    command: Vec<String>,
    model: Option<String>,
    timeout: Duration,
    output_limit_bytes: usize,
    attempts: u32,
}

impl CommandOracle {
    pub fn new(team: &TeamConfig, oracle: &OracleConfig) -> Self {
        Self {
            command: team.command.clone(),
            model: team.model.clone(),
            timeout: Duration::from_secs(oracle.timeout_secs),
            output_limit_bytes: oracle.output_limit_bytes,
            attempts: oracle.attempts,
        }
    }

    fn argv(&self, schema_path: &Path, output_path: &Path) -> Vec<String> {
        let schema = schema_path.display().to_string();
        let output = output_path.display().to_string();
        let model = self.model.as_deref().unwrap_or_default();
        self.command
            .iter()
            .map(|arg| {
                arg.replace("{schema}", &schema)
                    .replace("{output}", &output)
                    .replace("{model}", model)
            })
            .collect()
    }
}

impl Oracle for CommandOracle {
    #[instrument(skip_all, fields(player = %request.player_id, team = %request.team, kind = %request.kind))]
    fn query(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let transport = |context: &str, err: &dyn std::fmt::Display| {
            OracleError::Transport(format!("{context}: {err}"))
        };

        let dir = tempfile::tempdir().map_err(|err| transport("create temp dir", &err))?;
        let schema_path = dir.path().join("schema.json");
        let output_path = dir.path().join("output.json");
        fs::write(&schema_path, request.schema).map_err(|err| transport("write schema", &err))?;

        let argv = self.argv(&schema_path, &output_path);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| OracleError::Transport("empty oracle command".to_string()))?;
        let mut cmd = Command::new(program);
        cmd.args(args);

        let output = run_with_timeout(
            cmd,
            Some(request.prompt.clone().into_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .map_err(|err| OracleError::Transport(format!("{err:#}")))?;

        if output.timed_out {
            return Err(OracleError::Timeout(self.timeout));
        }
        if !output.status.success() {
            return Err(OracleError::Transport(format!(
                "{program} exited with {:?}: {}",
                output.status.code(),
                output.stderr_tail(400)
            )));
        }

        if self.command.iter().any(|arg| arg.contains("{output}")) {
            fs::read_to_string(&output_path).map_err(|err| {
                OracleError::Malformed(format!("read {}: {err}", output_path.display()))
            })
        } else {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Oracles per team, with an optional fallback for teams not listed.
#[derive(Clone, Default)]
pub struct OracleSet {
    by_team: BTreeMap<String, Arc<dyn Oracle>>,
    fallback: Option<Arc<dyn Oracle>>,
}

impl OracleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// One oracle for every team.
    pub fn uniform(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            by_team: BTreeMap::new(),
            fallback: Some(oracle),
        }
    }

    pub fn with_team(mut self, team: impl Into<String>, oracle: Arc<dyn Oracle>) -> Self {
        self.by_team.insert(team.into(), oracle);
        self
    }

    pub fn get(&self, team: &str) -> Option<&Arc<dyn Oracle>> {
        self.by_team.get(team).or(self.fallback.as_ref())
    }

    /// A [`CommandOracle`] per configured team.
    pub fn from_config(config: &GameConfig) -> Self {
        config
            .teams
            .iter()
            .fold(Self::new(), |set, (name, team)| {
                set.with_team(name.clone(), Arc::new(CommandOracle::new(team, &config.oracle)))
            })
    }
}

impl std::fmt::Debug for OracleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleSet")
            .field("teams", &self.by_team.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
