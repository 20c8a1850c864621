//! Terminal rendering of chat turns and status lines.

use crate::persona::Persona;
use crate::session::{Transcript, Turn, TurnRole};
use crossterm::style::Stylize;
use std::io::IsTerminal;

#[derive(Debug, Clone)]
pub struct Renderer {
    companion_name: String,
    styled: bool,
}

impl Renderer {
    /// Styled when stdout is a terminal and `NO_COLOR` is unset.
    pub fn new(companion_name: impl Into<String>) -> Self {
        let styled = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self::with_style(companion_name, styled)
    }

    pub fn with_style(companion_name: impl Into<String>, styled: bool) -> Self {
        Self {
            companion_name: companion_name.into(),
            styled,
        }
    }

    pub fn turn(&self, turn: &Turn) -> String {
        let label = match turn.role {
            TurnRole::Human => "You".to_string(),
            TurnRole::Assistant => self.companion_name.clone(),
        };
        if !self.styled {
            return format!("{label}: {}", turn.content);
        }
        let label = match turn.role {
            TurnRole::Human => label.bold().cyan().to_string(),
            TurnRole::Assistant => label.bold().magenta().to_string(),
        };
        format!("{label}: {}", turn.content)
    }

    pub fn transcript(&self, transcript: &Transcript) -> String {
        transcript
            .turns()
            .iter()
            .map(|t| self.turn(t))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Dim progress line, e.g. while the agent starts.
    pub fn status(&self, message: &str) -> String {
        if self.styled {
            message.dim().italic().to_string()
        } else {
            message.to_string()
        }
    }

    pub fn error(&self, message: &str) -> String {
        if self.styled {
            format!("{} {message}", "error:".red().bold())
        } else {
            format!("error: {message}")
        }
    }

    /// One line per persona, marking the active one.
    pub fn persona_list(&self, active: Option<Persona>) -> String {
        Persona::ALL
            .iter()
            .map(|p| {
                let marker = if Some(*p) == active { "*" } else { " " };
                let id = format!("{:<13}", p.id());
                let id = if self.styled {
                    id.bold().to_string()
                } else {
                    id
                };
                format!("{marker} {id} {}", p.label())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn waking_up(&self) -> String {
        self.status(&format!("{} is waking up...", self.companion_name))
    }

    pub fn prompt(&self, persona: Persona) -> String {
        let text = format!("[{}] > ", persona.id());
        if self.styled {
            text.dark_grey().to_string()
        } else {
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Renderer {
        Renderer::with_style("Aura", false)
    }

    #[test]
    fn test_plain_turns() {
        let r = plain();
        assert_eq!(r.turn(&Turn::new(TurnRole::Human, "Hello")), "You: Hello");
        assert_eq!(
            r.turn(&Turn::new(TurnRole::Assistant, "Breathe.")),
            "Aura: Breathe."
        );
    }

    #[test]
    fn test_styled_turn_keeps_content() {
        let r = Renderer::with_style("Aura", true);
        let line = r.turn(&Turn::new(TurnRole::Assistant, "Hi"));
        assert!(line.contains("\u{1b}["));
        assert!(line.ends_with(": Hi"));
    }

    #[test]
    fn test_status_lines() {
        let r = plain();
        assert_eq!(r.waking_up(), "Aura is waking up...");
        assert_eq!(r.error("boom"), "error: boom");
        assert_eq!(r.prompt(Persona::Calm), "[calm] > ");
    }

    #[test]
    fn test_persona_list_marks_active() {
        let list = plain().persona_list(Some(Persona::Kuudere));
        let lines: Vec<_> = list.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[5].starts_with("* kuudere"));
        assert!(lines[5].ends_with("Kuudere (Cold & Logical)"));
        assert!(lines[0].starts_with("  cheerful"));
    }
}
