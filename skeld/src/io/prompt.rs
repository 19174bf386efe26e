//! Prompt rendering for oracle requests.
//!
//! Templates emit sections delimited by `<!-- section:KEY required|droppable -->`
//! markers. When a rendered prompt exceeds the byte budget, droppable
//! sections are removed in a fixed order and the last remaining section is
//! truncated as a last resort.

use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use minijinja::{Environment, context};
use regex::Regex;
use tracing::debug;

use crate::core::situation::Situation;
use crate::core::types::{DecisionKind, Role};

const ACTION_CREWMATE_TEMPLATE: &str = include_str!("prompts/action_crewmate.md");
const ACTION_IMPOSTOR_TEMPLATE: &str = include_str!("prompts/action_impostor.md");
const DISCUSSION_TEMPLATE: &str = include_str!("prompts/discussion.md");
const VOTE_TEMPLATE: &str = include_str!("prompts/vote.md");

/// Least valuable first.
const DROP_ORDER: [&str; 2] = ["history", "statements"];

const TRUNCATION_MARK: &str = "\n[truncated]";

static SECTION_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"<!--\s*section:(\w+)\s+(required|droppable)\s*-->"));

fn template_name(situation: &Situation) -> &'static str {
    match (situation.kind, situation.role) {
        (DecisionKind::Action, Role::Crewmate) => "action_crewmate",
        (DecisionKind::Action, Role::Impostor) => "action_impostor",
        (DecisionKind::Discussion, _) => "discussion",
        (DecisionKind::Vote, _) => "vote",
    }
}

fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("action_crewmate", ACTION_CREWMATE_TEMPLATE)
        .context("load action_crewmate template")?;
    env.add_template("action_impostor", ACTION_IMPOSTOR_TEMPLATE)
        .context("load action_impostor template")?;
    env.add_template("discussion", DISCUSSION_TEMPLATE)
        .context("load discussion template")?;
    env.add_template("vote", VOTE_TEMPLATE)
        .context("load vote template")?;
    Ok(env)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    key: String,
    required: bool,
    content: String,
}

fn parse_sections(rendered: &str) -> Result<Vec<Section>> {
    let re = SECTION_RE
        .as_ref()
        .map_err(|err| anyhow!("section marker pattern: {err}"))?;
    let markers: Vec<_> = re.captures_iter(rendered).collect();

    let mut sections = Vec::new();
    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(key), Some(kind)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(rendered.len(), |next| next.start());
        let required = kind.as_str() == "required";
        let content = rendered[whole.end()..end].trim().to_string();
        if !content.is_empty() || required {
            sections.push(Section {
                key: key.as_str().to_string(),
                required,
                content,
            });
        }
    }
    Ok(sections)
}

fn rendered_len(sections: &[Section]) -> usize {
    let separators = sections.len().saturating_sub(1) * 2;
    sections.iter().map(|s| s.content.len()).sum::<usize>() + separators
}

/// Cut `text` to at most `max` bytes on a char boundary.
fn truncate_to(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

fn apply_budget(sections: &mut Vec<Section>, budget: usize) {
    for key in DROP_ORDER {
        if rendered_len(sections) <= budget {
            return;
        }
        if let Some(idx) = sections.iter().position(|s| s.key == key && !s.required) {
            debug!(
                section = key,
                bytes_dropped = sections[idx].content.len(),
                "dropped section for budget"
            );
            sections.remove(idx);
        }
    }

    let total = rendered_len(sections);
    if total <= budget {
        return;
    }
    let Some(last) = sections.last_mut() else {
        return;
    };
    let allowed = last.content.len().saturating_sub(total - budget);
    let before_len = last.content.len();
    if allowed > TRUNCATION_MARK.len() {
        truncate_to(&mut last.content, allowed - TRUNCATION_MARK.len());
        last.content.push_str(TRUNCATION_MARK);
    } else {
        truncate_to(&mut last.content, allowed);
    }
    debug!(
        section = %last.key,
        before_len,
        after_len = last.content.len(),
        "truncated section for budget"
    );
}

fn render_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Renders situations into prompts within a byte budget.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    budget_bytes: usize,
}

impl PromptBuilder {
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    pub fn build(&self, situation: &Situation) -> Result<String> {
        let env = environment()?;
        let name = template_name(situation);
        let rendered = env
            .get_template(name)?
            .render(context! { s => situation })
            .with_context(|| format!("render {name} prompt"))?;
        let mut sections = parse_sections(&rendered)?;
        apply_budget(&mut sections, self.budget_bytes);
        Ok(render_sections(&sections))
    }
}
