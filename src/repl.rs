//! Interactive chat loop.

use crate::cli::{Cli, build_factory, missing_key_notice};
use crate::config::Config;
use crate::persona::Persona;
use crate::provider::Credential;
use crate::render::Renderer;
use crate::session::{AgentStatus, ChatSession};
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  /persona [name]  Show or switch persona (starts a new conversation)
  /personas        List personas
  /key <value>     Set the API key for this session
  /reset           Clear the conversation and start over
  /transcript      Print the whole conversation
  /help            Show this help
  /quit            Exit";

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Message(String),
    Persona(Option<String>),
    Personas,
    Key(String),
    Reset,
    Transcript,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ReplCommand::Message(line.to_string());
    };

    let (cmd, arg) = match rest.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (rest, ""),
    };
    match cmd {
        "persona" => ReplCommand::Persona((!arg.is_empty()).then(|| arg.to_string())),
        "personas" => ReplCommand::Personas,
        "key" => ReplCommand::Key(arg.to_string()),
        "reset" => ReplCommand::Reset,
        "transcript" => ReplCommand::Transcript,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(cmd.to_string()),
    }
}

/// Run the interactive chat until `/quit` or end of input.
pub async fn run(cli: &Cli) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let renderer = Renderer::new(config.companion_name.clone());
    let factory = Arc::new(build_factory(&config, cli.model.as_deref()));

    let mut session = ChatSession::new(factory);
    let mut persona = cli.resolve_persona(&config);
    let mut credential = cli.resolve_credential(&config);
    let mut rebuild = true;

    println!("{}", renderer.status("Type /help for commands."));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if rebuild {
            rebuild = false;
            ensure(&mut session, credential.as_ref(), persona, &renderer).await;
        }

        print!("{}", renderer.prompt(persona));
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_line(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Personas => println!("{}", renderer.persona_list(Some(persona))),
            ReplCommand::Persona(None) => println!("{}", persona.label()),
            ReplCommand::Persona(Some(name)) => match Persona::from_name(&name) {
                Some(p) => {
                    persona = p;
                    rebuild = true;
                }
                None => eprintln!(
                    "{}",
                    renderer.error(&format!(
                        "Unknown persona '{name}'. Known: {}",
                        Persona::known_ids()
                    ))
                ),
            },
            ReplCommand::Key(value) => match Credential::new(&value) {
                Some(c) => {
                    credential = Some(c);
                    rebuild = true;
                }
                None => eprintln!("{}", renderer.error("Usage: /key <value>")),
            },
            ReplCommand::Reset => {
                session.reset();
                rebuild = true;
            }
            ReplCommand::Transcript => println!("{}\n", renderer.transcript(session.transcript())),
            ReplCommand::Unknown(cmd) => eprintln!(
                "{}",
                renderer.error(&format!("Unknown command /{cmd}. Type /help for commands."))
            ),
            ReplCommand::Message(text) => match session.send(&text).await {
                Ok(turn) => println!("{}\n", renderer.turn(turn)),
                Err(e) => eprintln!("{}", renderer.error(&e.to_string())),
            },
        }
    }

    Ok(())
}

/// Build or reuse the agent, printing the greeting or the reason it failed.
async fn ensure(
    session: &mut ChatSession,
    credential: Option<&Credential>,
    persona: Persona,
    renderer: &Renderer,
) {
    let Some(credential) = credential else {
        println!("{}", renderer.status(&missing_key_notice()));
        return;
    };

    println!("{}", renderer.waking_up());
    match session.ensure_agent(credential.expose(), persona).await {
        Ok(AgentStatus::Rebuilt) => {
            if let Some(greeting) = session.transcript().last() {
                println!("{}\n", renderer.turn(greeting));
            }
        }
        Ok(AgentStatus::Reused) => {}
        Err(e) => {
            eprintln!("{}", renderer.error(&e.to_string()));
            if e.is_blocking() {
                eprintln!(
                    "{}",
                    renderer.status("Fix the problem, then use /key, /persona or /reset to retry.")
                );
            }
        }
    }
}
