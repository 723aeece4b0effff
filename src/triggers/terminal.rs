//! Hidden terminal: a line-oriented command interpreter with a display log.

use serde::Serialize;

use crate::bus::EggEvent;
use crate::eggs::{self, AchievementManager};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    System,
    Command,
    Response,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TerminalEntry {
    pub kind: EntryKind,
    pub content: String,
}

impl TerminalEntry {
    fn new(kind: EntryKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

/// What the host should do after a submit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalAction {
    Continue,
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    About,
    Skills,
    Projects,
    Contact,
    Clear,
    Exit,
    Surprise,
    Matrix,
    Empty,
    Unknown,
}

impl Command {
    /// Total over all input: anything unrecognised is `Unknown`.
    pub fn parse(input: &str) -> Command {
        match input.trim().to_lowercase().as_str() {
            "" => Command::Empty,
            "help" => Command::Help,
            "about" => Command::About,
            "skills" => Command::Skills,
            "projects" => Command::Projects,
            "contact" => Command::Contact,
            "clear" => Command::Clear,
            "exit" => Command::Exit,
            "surprise" | "party" => Command::Surprise,
            "matrix" => Command::Matrix,
            _ => Command::Unknown,
        }
    }
}

fn help_text(owner: &str) -> String {
    format!(
        "Available commands:
- help: Show this help message
- about: Learn about {owner}
- skills: List technical skills
- clear: Clear terminal
- projects: List featured projects
- contact: Contact information
- exit: Close terminal

Secret commands:
- There might be some hidden commands... try to discover them!"
    )
}

const SKILLS_TEXT: &str = "Technical Skills:
• JavaScript, TypeScript, React, Vue.js
• HTML5, CSS3, Tailwind CSS
• Unity3D, C#
• After Effects, Figma
• API Design, WebSocket";

const PROJECTS_TEXT: &str = "Featured Projects:
• Cryptocurrency Price Widget
• Football Match Tracker
• Sports Content Center
• Design System (100+ Components)
• Parking Reservation System";

const CONTACT_TEXT: &str = "Contact Information:
• Email: ken@kensamonte.com
• Location: Quezon City, Philippines
• LinkedIn: linkedin.com/in/kensamonte/";

pub const CLEARED_TEXT: &str = "Terminal cleared";

pub struct Terminal {
    owner: String,
    log: Vec<TerminalEntry>,
    input: String,
}

impl Terminal {
    pub fn new(owner: impl Into<String>) -> Self {
        let owner = owner.into();
        let log = vec![
            TerminalEntry::new(EntryKind::System, format!("Welcome to {owner}'s Portfolio Terminal")),
            TerminalEntry::new(EntryKind::System, "Type 'help' for available commands"),
        ];
        Self {
            owner,
            log,
            input: String::new(),
        }
    }

    pub fn entries(&self) -> &[TerminalEntry] {
        &self.log
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Run the buffered input. The buffer is empty afterwards.
    pub fn submit(&mut self, eggs: &AchievementManager) -> TerminalAction {
        let raw = std::mem::take(&mut self.input);
        self.log.push(TerminalEntry::new(EntryKind::Command, raw.clone()));

        let command = Command::parse(&raw);
        tracing::debug!(?command, "terminal command");
        match command {
            Command::Help => {
                let help = help_text(&self.owner);
                self.respond(help);
            }
            Command::About => {
                let about = format!(
                    "{} is a front-end developer with 10 years of experience building websites and applications, including 5 years in a product development environment. Currently preparing for the JLPT N3 in Japanese.",
                    self.owner
                );
                self.respond(about);
            }
            Command::Skills => self.respond(SKILLS_TEXT),
            Command::Projects => self.respond(PROJECTS_TEXT),
            Command::Contact => self.respond(CONTACT_TEXT),
            Command::Clear => {
                self.log = vec![TerminalEntry::new(EntryKind::System, CLEARED_TEXT)];
            }
            Command::Exit => return TerminalAction::Close,
            Command::Empty => {}
            Command::Surprise => {
                self.respond("🎉 Surprise activated! Enjoy the show!");
                self.secret(eggs, "surprise", eggs::SURPRISE);
            }
            Command::Matrix => {
                self.respond("Entering the Matrix... Follow the white rabbit.");
                self.secret(eggs, "matrix", eggs::MATRIX);
            }
            Command::Unknown => {
                self.log.push(TerminalEntry::new(
                    EntryKind::Error,
                    format!("Command not found: {raw}. Type 'help' for available commands."),
                ));
            }
        }
        TerminalAction::Continue
    }

    /// Convenience for hosts that do not keep a live input buffer.
    pub fn execute(&mut self, line: &str, eggs: &AchievementManager) -> TerminalAction {
        self.set_input(line);
        self.submit(eggs)
    }

    fn respond(&mut self, text: impl Into<String>) {
        self.log.push(TerminalEntry::new(EntryKind::Response, text));
    }

    fn secret(&self, eggs: &AchievementManager, command: &str, egg_id: &str) {
        eggs.bus().publish(&EggEvent::SecretCommandTriggered {
            command: command.to_string(),
        });
        eggs.discover(egg_id);
    }
}
