//! System prompt assembly.
//!
//! The prompt is a persona prefix (rendered from `PREFIX_TEMPLATE`) followed by
//! a base template that describes how to converse and use tools.

use crate::persona::Persona;
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const PREFIX_TEMPLATE: &str = r#"You are "{{ companion_name }}", a virtual AI Girlfriend. Your personality is as follows: {{ persona }}

General Rules:
{% for rule in rules -%}
{{ loop.index }}.  {{ rule }}
{% endfor %}
{{ tool_guidance }}"#;

/// Base template used when no remote template is configured.
pub const DEFAULT_BASE_TEMPLATE: &str = "\
You are having an ongoing conversation with the user. Earlier turns of the \
conversation are included before the latest message, so refer back to them \
when they are relevant.

You have access to tools. When a question depends on current events, facts \
you are unsure of, or anything you cannot know from the conversation, call \
the `web_search` tool instead of guessing. Call tools only when they help; \
for ordinary chat, answer directly.

When you have everything you need, reply to the user in plain conversational \
text. Never mention tool names, function calls, or raw search results in the \
reply itself.";

pub const DEFAULT_RULES: [&str; 4] = [
    "**Role Rule: You are the user's girlfriend (female). The user is your boyfriend (male). Always maintain this dynamic in your responses.**",
    "Language Rule: Detect the language the user is speaking and ALWAYS respond in that same language.",
    "Always remember details from the previous conversation to show you are paying attention.",
    "You are an AI, do not lie about being human.",
];

pub const DEFAULT_TOOL_GUIDANCE: &str = "IMPORTANT: After using a tool and getting information (Observation), DO NOT just state the fact.\n\
You MUST rephrase that information into a natural, warm, and supportive response that fits your personality.";

pub const DEFAULT_GREETING: &str =
    "Greet me warmly and introduce yourself for the first time, according to your personality.";

/// Configurable prompt text shared by every persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptRules {
    /// Numbered general rules.
    pub rules: Vec<String>,
    /// How to present tool results.
    pub tool_guidance: String,
    /// Instruction sent as the first turn of every new conversation.
    pub greeting: String,
}

impl Default for PromptRules {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.iter().map(ToString::to_string).collect(),
            tool_guidance: DEFAULT_TOOL_GUIDANCE.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to fetch base template from {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Base template at {0} is empty")]
    EmptyTemplate(String),

    #[error("Failed to render prompt: {0}")]
    Render(#[from] minijinja::Error),
}

/// Where the base template comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateSource {
    #[default]
    BuiltIn,
    /// Plain text fetched with HTTP GET on every agent build.
    Remote(String),
}

impl TemplateSource {
    /// Remote when a non-blank URL is given.
    #[must_use]
    pub fn from_url(url: Option<&str>) -> Self {
        match url.map(str::trim) {
            Some(url) if !url.is_empty() => Self::Remote(url.to_string()),
            _ => Self::BuiltIn,
        }
    }

    pub async fn load(&self) -> Result<String, PromptError> {
        match self {
            Self::BuiltIn => Ok(DEFAULT_BASE_TEMPLATE.to_string()),
            Self::Remote(url) => fetch_template(url).await,
        }
    }
}

async fn fetch_template(url: &str) -> Result<String, PromptError> {
    let fetch_err = |message: String| PromptError::Fetch {
        url: url.to_string(),
        message,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fetch_err(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(fetch_err(format!("HTTP {}", status.as_u16())));
    }
    let text = response.text().await.map_err(|e| fetch_err(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(PromptError::EmptyTemplate(url.to_string()));
    }
    tracing::debug!(url, bytes = text.len(), "Fetched base template");
    Ok(text)
}

/// Render the persona prefix and join it with the base template.
pub fn build_system_prompt(
    companion_name: &str,
    persona: Persona,
    rules: &PromptRules,
    base_template: &str,
) -> Result<String, PromptError> {
    let mut env = Environment::new();
    env.add_template("prefix", PREFIX_TEMPLATE)?;

    let prefix = env.get_template("prefix")?.render(context! {
        companion_name => companion_name,
        persona => persona.instructions(),
        rules => &rules.rules,
        tool_guidance => &rules.tool_guidance,
    })?;

    Ok(format!("{}\n\n{}", prefix.trim(), base_template.trim()))
}
