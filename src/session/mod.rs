//! Chat sessions: one agent and one transcript per user conversation.
//!
//! A session is `Uninitialized` until `ensure_agent` succeeds, then `Ready`
//! with the configuration it was built for. Any configuration change rebuilds
//! the agent and clears the transcript together.

mod store;
mod transcript;

#[cfg(test)]
mod tests;

pub use store::{SessionStore, SessionStoreError};
pub use transcript::{Transcript, Turn, TurnRole};

use crate::agent::{Agent, AgentFactory, BuildError};
use crate::persona::Persona;
use crate::provider::Credential;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub type SessionId = String;

/// Shown when the model returns no text.
pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a response.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No API key provided")]
    MissingCredential,

    #[error("Invalid API key: {0}")]
    Authentication(String),

    #[error("Could not reach the model service: {0}")]
    Connection(String),

    #[error("Could not load prompt template: {0}")]
    Template(String),

    #[error("Could not start the conversation: {0}")]
    Startup(String),

    #[error("Message is empty")]
    EmptyTurn,

    #[error("No agent is ready; provide an API key and persona first")]
    NotReady,
}

impl SessionError {
    /// Whether interaction must stop until the user corrects their input.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential | Self::Authentication(_) | Self::Connection(_) | Self::Template(_)
        )
    }
}

impl From<BuildError> for SessionError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Connect(e) if e.is_authentication() => Self::Authentication(e.to_string()),
            BuildError::Connect(e) => Self::Connection(e.to_string()),
            BuildError::Prompt(e) => Self::Template(e.to_string()),
        }
    }
}

/// What the agent was built for. Compared by value to detect changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub credential: Credential,
    pub persona: Persona,
}

pub enum AgentState {
    Uninitialized,
    Ready {
        config: SessionConfig,
        agent: Box<Agent>,
    },
}

/// Outcome of a successful `ensure_agent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    /// Configuration unchanged, existing agent kept.
    Reused,
    /// A new agent was built and greeted the user.
    Rebuilt,
}

pub struct ChatSession {
    id: SessionId,
    factory: Arc<AgentFactory>,
    state: AgentState,
    transcript: Transcript,
}

impl ChatSession {
    pub fn new(factory: Arc<AgentFactory>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            factory,
            state: AgentState::Uninitialized,
            transcript: Transcript::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub fn state(&self) -> &AgentState {
        &self.state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, AgentState::Ready { .. })
    }

    /// Persona of the current agent, if any.
    #[must_use]
    pub fn persona(&self) -> Option<Persona> {
        match &self.state {
            AgentState::Ready { config, .. } => Some(config.persona),
            AgentState::Uninitialized => None,
        }
    }

    #[must_use]
    pub fn companion_name(&self) -> &str {
        self.factory.companion_name()
    }

    /// Make sure an agent exists for this credential and persona.
    ///
    /// A blank credential leaves the session untouched. An unchanged
    /// configuration reuses the agent. Otherwise the old agent and transcript
    /// are dropped, a new agent is built and asked for a greeting.
    pub async fn ensure_agent(
        &mut self,
        credential: &str,
        persona: Persona,
    ) -> Result<AgentStatus, SessionError> {
        let credential = Credential::new(credential).ok_or(SessionError::MissingCredential)?;
        let config = SessionConfig {
            credential,
            persona,
        };

        if let AgentState::Ready { config: current, .. } = &self.state
            && *current == config
        {
            return Ok(AgentStatus::Reused);
        }

        self.reset();
        info!(session = %self.id, persona = persona.id(), "Rebuilding agent");

        let agent = self
            .factory
            .build(&config.credential, config.persona)
            .await?
            .with_session_id(self.id.clone());
        self.state = AgentState::Ready {
            config,
            agent: Box::new(agent),
        };

        self.greet().await?;
        Ok(AgentStatus::Rebuilt)
    }

    /// Ask the fresh agent to introduce itself.
    async fn greet(&mut self) -> Result<(), SessionError> {
        let AgentState::Ready { agent, .. } = &mut self.state else {
            return Err(SessionError::NotReady);
        };

        match agent.invoke(self.factory.greeting()).await {
            Ok(reply) => {
                self.transcript.push(TurnRole::Assistant, non_empty(reply));
                Ok(())
            }
            Err(e) => {
                warn!(session = %self.id, "Greeting failed: {e:#}");
                Err(SessionError::Startup(e.to_string()))
            }
        }
    }

    /// Send a user message and record the reply.
    ///
    /// Invocation failures are recorded as an assistant turn rather than
    /// returned. Returns the assistant turn.
    pub async fn send(&mut self, text: &str) -> Result<&Turn, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyTurn);
        }
        let AgentState::Ready { agent, .. } = &mut self.state else {
            return Err(SessionError::NotReady);
        };

        self.transcript.push(TurnRole::Human, text);

        let answer = match agent.invoke(text).await {
            Ok(reply) => non_empty(reply),
            Err(e) => {
                warn!(session = %self.id, "Agent invocation failed: {e:#}");
                format!("An error occurred: {e}")
            }
        };

        Ok(self.transcript.push(TurnRole::Assistant, answer))
    }

    /// Drop the agent and clear the transcript.
    pub fn reset(&mut self) {
        self.state = AgentState::Uninitialized;
        self.transcript.clear();
    }
}

fn non_empty(reply: String) -> String {
    if reply.trim().is_empty() {
        EMPTY_REPLY.to_string()
    } else {
        reply
    }
}
