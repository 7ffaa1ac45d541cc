//! Line-oriented presentation layer: renders store snapshots, parses input.

use murmur::chat::{ExchangeEvent, Message, MessageId, Snapshot};
use murmur::settings::ProviderSettings;
use murmur_llm::Role;

/// Prints only what changed between snapshots.
#[derive(Default)]
pub struct TranscriptRenderer {
    rendered: Vec<MessageId>,
    thinking_shown: bool,
}

impl TranscriptRenderer {
    pub fn render(&mut self, snapshot: &Snapshot) {
        let settled = snapshot
            .iter()
            .filter(|message| !message.is_loading())
            .collect::<Vec<_>>();

        let keeps_prefix = self.rendered.len() <= settled.len()
            && self
                .rendered
                .iter()
                .zip(&settled)
                .all(|(rendered, message)| *rendered == message.id);
        if !keeps_prefix {
            println!("\n──── new chat ────");
            self.rendered.clear();
        }

        for message in &settled[self.rendered.len()..] {
            print_message(message);
            self.rendered.push(message.id);
            self.thinking_shown = false;
        }

        let loading = snapshot.iter().any(Message::is_loading);
        if loading && !self.thinking_shown {
            println!("assistant › …thinking");
        }
        self.thinking_shown = loading;
    }
}

fn print_message(message: &Message) {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    println!("{speaker} › {}", message.content);
}

pub fn describe_event(event: ExchangeEvent) -> Option<&'static str> {
    match event {
        ExchangeEvent::SubmitRejected { .. } => {
            Some("(still waiting for the previous reply; message not sent)")
        }
        ExchangeEvent::InputCleared
        | ExchangeEvent::TurnStarted(_)
        | ExchangeEvent::TurnSettled { .. }
        | ExchangeEvent::ConversationReset => None,
    }
}

pub fn print_settings(settings: &ProviderSettings) {
    println!("base url : {}", settings.base_url);
    println!("model    : {}", settings.model_name);
    println!("api key  : {}", mask_key(&settings.api_key));
}

fn mask_key(key: &str) -> String {
    let visible = key.chars().rev().take(4).collect::<Vec<_>>();
    if key.chars().count() <= 4 {
        return "****".to_string();
    }
    format!("****{}", visible.into_iter().rev().collect::<String>())
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    NewChat,
    ShowSettings,
    SetModel(String),
    SetBaseUrl(String),
    SetApiKey(String),
    ResetSettings,
    Quit,
    Help,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(command) = trimmed.strip_prefix('/') else {
            return Self::Send(line.to_string());
        };

        let (name, argument) = command
            .split_once(char::is_whitespace)
            .map(|(name, argument)| (name, argument.trim()))
            .unwrap_or((command, ""));

        match (name, argument) {
            ("new", _) => Self::NewChat,
            ("settings", _) => Self::ShowSettings,
            ("model", value) if !value.is_empty() => Self::SetModel(value.to_string()),
            ("url", value) if !value.is_empty() => Self::SetBaseUrl(value.to_string()),
            ("key", value) if !value.is_empty() => Self::SetApiKey(value.to_string()),
            ("reset-settings", _) => Self::ResetSettings,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Help,
        }
    }
}

pub const HELP: &str = "commands: /new  /settings  /model <name>  /url <base url>  /key <api key>  /reset-settings  /quit";
