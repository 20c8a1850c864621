pub mod memory;
pub mod prompt;
mod retry;

pub use memory::ConversationMemory;
pub use prompt::{PromptError, PromptRules, TemplateSource};

use crate::persona::Persona;
use crate::provider::{
    ChatRequest, Connector, ContentBlock, Credential, LlmApi, Message, Role, ToolCallEvent,
};
use crate::tool::{ToolContext, ToolRegistry};
use anyhow::Result;
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Model parameters shared by every agent a factory builds.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    /// Model calls allowed per invocation before giving up.
    pub max_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.7,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// A persona-bound conversational agent with tools and memory.
pub struct Agent {
    provider: Arc<dyn LlmApi>,
    tools: ToolRegistry,
    system_prompt: String,
    memory: ConversationMemory,
    settings: AgentSettings,
    tool_context: ToolContext,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn LlmApi>,
        tools: ToolRegistry,
        system_prompt: String,
        settings: AgentSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            system_prompt,
            memory: ConversationMemory::new(),
            settings,
            tool_context: ToolContext {
                session_id: String::new(),
            },
        }
    }

    /// Tag tool calls with the owning session.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.tool_context.session_id = session_id.into();
        self
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    #[must_use]
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one user input to a final reply, calling tools as the model asks.
    ///
    /// On success the exchange is added to memory. The reply may be empty.
    pub async fn invoke(&mut self, input: &str) -> Result<String> {
        let mut messages = self.memory.messages();
        messages.push(Message::text(Role::User, input));

        let system: Cow<'static, str> = Cow::Owned(self.system_prompt.clone());
        let tools = Arc::new(self.tools.definitions());

        for iteration in 1..=self.settings.max_iterations {
            let request = ChatRequest {
                model: self.settings.model.clone(),
                messages: Arc::new(messages.clone()),
                system: Some(system.clone()),
                tools: tools.clone(),
                max_tokens: None,
                temperature: Some(self.settings.temperature),
            };

            let response = retry::complete_with_retry(&self.provider, &request).await?;
            debug!(
                iteration,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Model responded"
            );

            let tool_calls = response.message.tool_calls();
            if tool_calls.is_empty() {
                let reply = response.message.joined_text().trim().to_string();
                self.memory.record(input, reply.clone());
                return Ok(reply);
            }

            messages.push(response.message);
            let results = self.execute_tools(tool_calls).await;
            messages.push(Message {
                role: Role::ToolResult,
                content: Arc::new(results),
            });
        }

        anyhow::bail!(
            "Agent stopped after {} iterations without a final answer",
            self.settings.max_iterations
        )
    }

    /// Execute tool calls in order. Failures become error results.
    async fn execute_tools(&self, tool_calls: Vec<ToolCallEvent>) -> Vec<ContentBlock> {
        let mut results = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            debug!(tool = %call.name, id = %call.id, "Calling tool");
            let block = match self
                .tools
                .call_tool(&call.name, call.arguments, &self.tool_context)
                .await
            {
                Ok(res) => {
                    debug!(tool = %call.name, is_error = res.is_error, metadata = ?res.metadata, "Tool finished");
                    ContentBlock::ToolResult {
                        tool_call_id: call.id,
                        content: res.content,
                        is_error: res.is_error,
                    }
                }
                Err(e) => {
                    warn!(tool = %call.name, "Tool failed: {e}");
                    ContentBlock::ToolResult {
                        tool_call_id: call.id,
                        content: e.to_string(),
                        is_error: true,
                    }
                }
            };
            results.push(block);
        }
        results
    }
}

/// Why an agent could not be built.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Connect(#[from] crate::provider::Error),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Builds agents for a credential and persona.
pub struct AgentFactory {
    connector: Arc<dyn Connector>,
    tools: ToolRegistry,
    settings: AgentSettings,
    companion_name: String,
    rules: PromptRules,
    template: TemplateSource,
}

impl AgentFactory {
    pub fn new(connector: Arc<dyn Connector>, tools: ToolRegistry) -> Self {
        Self {
            connector,
            tools,
            settings: AgentSettings::default(),
            companion_name: "Aura".to_string(),
            rules: PromptRules::default(),
            template: TemplateSource::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_companion_name(mut self, name: impl Into<String>) -> Self {
        self.companion_name = name.into();
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: PromptRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: TemplateSource) -> Self {
        self.template = template;
        self
    }

    #[must_use]
    pub fn companion_name(&self) -> &str {
        &self.companion_name
    }

    /// Instruction sent as the first turn of a new conversation.
    #[must_use]
    pub fn greeting(&self) -> &str {
        &self.rules.greeting
    }

    /// Connect, attach tools and assemble the system prompt.
    pub async fn build(
        &self,
        credential: &Credential,
        persona: Persona,
    ) -> std::result::Result<Agent, BuildError> {
        info!(
            persona = persona.id(),
            model = %self.settings.model,
            "Building companion agent"
        );

        let provider = self
            .connector
            .connect(credential, &self.settings.model)
            .await?;
        let base_template = self.template.load().await?;
        let system_prompt = prompt::build_system_prompt(
            &self.companion_name,
            persona,
            &self.rules,
            &base_template,
        )?;

        Ok(Agent::new(
            provider,
            self.tools.clone(),
            system_prompt,
            self.settings.clone(),
        ))
    }
}
