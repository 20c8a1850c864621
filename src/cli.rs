//! Command-line interface: argument parsing, one-shot mode and config commands.

use crate::agent::{AgentFactory, TemplateSource};
use crate::config::{self, Config, KEYS};
use crate::persona::Persona;
use crate::provider::{Credential, GOOGLE_API_KEY_VARS, GeminiConnector};
use crate::render::Renderer;
use crate::session::{ChatSession, SessionError, Turn, TurnRole};
use crate::tool::ToolRegistry;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, Read};
use std::process::ExitCode;
use std::sync::Arc;

/// Chat with Aura, a persona-driven AI companion
#[derive(Parser, Debug)]
#[command(name = "aura", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Persona id or name (e.g. "calm", "Tsundere")
    #[arg(short, long, global = true)]
    pub persona: Option<Persona>,

    /// Google AI API key (overrides env and config)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Gemini model to use
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Log to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one message and print the reply (non-interactive)
    Run(RunArgs),
    /// List available personas
    Personas,
    /// View or modify configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Key to get (see `aura config` for the list)
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Key to set
        key: String,
        /// Value to set (empty clears optional keys)
        value: String,
    },
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// The message to send (use "-" to read from stdin)
    #[arg(required = true)]
    pub prompt: String,

    /// Leave the greeting out of the output
    #[arg(long)]
    pub no_greeting: bool,

    /// Output format
    #[arg(short = 'o', long, default_value = "text", value_enum)]
    pub output_format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// JSON output of `run -o json`.
#[derive(Serialize)]
struct RunOutput<'a> {
    session_id: &'a str,
    persona: &'static str,
    companion_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    turns: &'a [Turn],
}

impl Cli {
    /// Persona from the flag, else the config file.
    #[must_use]
    pub fn resolve_persona(&self, config: &Config) -> Persona {
        self.persona.unwrap_or(config.persona)
    }

    /// API key from the flag, else env vars, else the config file.
    #[must_use]
    pub fn resolve_credential(&self, config: &Config) -> Option<Credential> {
        self.api_key
            .as_deref()
            .and_then(Credential::new)
            .or_else(|| config.api_key())
    }
}

/// Initialize tracing.
///
/// `AURA_LOG` writes debug logs to `aura.log` so they don't interleave with
/// the chat. `--verbose` or `RUST_LOG` log to stderr.
pub fn init_logging(verbose: bool) {
    if std::env::var("AURA_LOG").is_ok() {
        use std::fs::File;
        use tracing_subscriber::prelude::*;
        match File::create("aura.log") {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false);
                let filter = tracing_subscriber::EnvFilter::new("aura=debug");
                let _ = tracing_subscriber::registry()
                    .with(file_layer.with_filter(filter))
                    .try_init();
            }
            Err(err) => {
                eprintln!("Failed to create log file: {err}");
            }
        }
    } else if verbose {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("aura=debug"))
            .with_writer(std::io::stderr)
            .try_init();
    } else if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Agent factory for the Gemini backend, configured from file and flags.
#[must_use]
pub fn build_factory(config: &Config, model: Option<&str>) -> AgentFactory {
    let mut settings = config.agent_settings();
    if let Some(model) = model {
        settings.model = model.to_string();
    }

    AgentFactory::new(
        Arc::new(GeminiConnector::default()),
        ToolRegistry::companion(config.search_max_results),
    )
    .with_settings(settings)
    .with_companion_name(config.companion_name.clone())
    .with_rules(config.prompt.clone())
    .with_template(TemplateSource::from_url(config.base_template_url.as_deref()))
}

/// Notice shown while no API key is available.
#[must_use]
pub fn missing_key_notice() -> String {
    format!(
        "Please add your Google AI API key to start chatting: set {}, run `aura config set google_api_key <key>`, or pass --api-key.",
        GOOGLE_API_KEY_VARS.join(" or ")
    )
}

/// Run the one-shot mode.
pub async fn run(cli: &Cli, args: &RunArgs) -> ExitCode {
    match run_inner(cli, args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run_inner(cli: &Cli, args: &RunArgs) -> Result<ExitCode> {
    let config = Config::load().context("Failed to load config")?;

    let prompt = if args.prompt == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer.trim().to_string()
    } else {
        args.prompt.clone()
    };
    if prompt.trim().is_empty() {
        anyhow::bail!("Empty prompt");
    }

    let Some(credential) = cli.resolve_credential(&config) else {
        anyhow::bail!(missing_key_notice());
    };
    let persona = cli.resolve_persona(&config);

    let factory = Arc::new(build_factory(&config, cli.model.as_deref()));
    let mut session = ChatSession::new(factory);
    let renderer = Renderer::new(config.companion_name.clone());

    if args.output_format == OutputFormat::Text {
        eprintln!("{}", renderer.waking_up());
    }

    let mut startup_error = None;
    match session.ensure_agent(credential.expose(), persona).await {
        Ok(_) => {}
        Err(e @ SessionError::Startup(_)) => {
            eprintln!("{}", renderer.error(&e.to_string()));
            startup_error = Some(e.to_string());
        }
        Err(e) => return Err(crate::error::Error::from(e).into()),
    }

    session.send(&prompt).await?;

    // The greeting is the first turn unless it failed.
    let skip = usize::from(args.no_greeting && startup_error.is_none());
    let turns = &session.transcript().turns()[skip..];

    match args.output_format {
        OutputFormat::Text => {
            for turn in turns.iter().filter(|t| t.role == TurnRole::Assistant) {
                println!("{}\n", renderer.turn(turn));
            }
        }
        OutputFormat::Json => {
            let output = RunOutput {
                session_id: session.id(),
                persona: persona.id(),
                companion_name: session.companion_name(),
                error: startup_error,
                turns,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Print every persona.
pub fn personas(cli: &Cli) -> ExitCode {
    let active = cli
        .persona
        .or_else(|| Config::load().ok().map(|c| c.persona));
    println!("{}", Renderer::new("Aura").persona_list(active));
    ExitCode::SUCCESS
}

/// Handle `aura config`.
pub fn config(args: &ConfigArgs) -> ExitCode {
    match config_inner(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

fn config_inner(args: &ConfigArgs) -> crate::error::Result<()> {
    let path = config::config_path();
    match &args.action {
        None => {
            let config = Config::load_from(&path)?;
            println!("Config file: {}", path.display());
            for key in KEYS {
                println!("{key} = {}", config.get(key)?);
            }
        }
        Some(ConfigAction::Path) => println!("{}", path.display()),
        Some(ConfigAction::Get { key }) => {
            let config = Config::load_from(&path)?;
            println!("{}", config.get(key)?);
        }
        Some(ConfigAction::Set { key, value }) => {
            let mut config = Config::load()?;
            config.set(key, value)?;
            config.save()?;
            println!("Set {key} in {}", path.display());
        }
    }
    Ok(())
}
