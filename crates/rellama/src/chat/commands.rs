//! In-band commands recognized inside an interactive session.

use crate::api::{ChatMessage, ModelList};

/// Summary printed by `/help` and `/?`.
pub const HELP_TEXT: &str = "\
Available commands:
  /set            Set session variables (reserved)
  /show           Show information for the current model
  /load <model>   Switch to a different model
  /save <name>    Build a model definition from this session
  /clear          Clear session context
  /bye            Exit the session
  /help, /?       Show this help";

/// A slash command entered at the session prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Reserved; accepted without effect.
    Set,
    Show,
    Load(Option<String>),
    Save(Option<String>),
    Clear,
    Exit,
    Help,
    Unknown(String),
}

impl SessionCommand {
    /// Classify an input line. Returns `None` for plain chat input.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with('/') {
            return None;
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or(line);
        let arg = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        Some(match command {
            "/set" => Self::Set,
            "/show" => Self::Show,
            "/load" => Self::Load(arg),
            "/save" => Self::Save(arg),
            "/clear" => Self::Clear,
            "/bye" | "/exit" | "/quit" => Self::Exit,
            "/help" | "/?" => Self::Help,
            other => Self::Unknown(other.to_string()),
        })
    }
}

/// Resolve a requested model name against the backend's tag listing.
///
/// Exact matches win; otherwise the first case-insensitive name-prefix match
/// is taken, so `/load qwen` finds `qwen2.5:7b`. Returns the full
/// backend-reported name.
pub fn match_model_name<'a>(models: &'a ModelList, requested: &str) -> Option<&'a str> {
    let lowered = requested.to_lowercase();
    models
        .models
        .iter()
        .map(|m| m.name.as_str())
        .find(|name| name.to_lowercase() == lowered)
        .or_else(|| {
            models
                .models
                .iter()
                .map(|m| m.name.as_str())
                .find(|name| name.to_lowercase().starts_with(&lowered))
        })
}

/// Build a model definition document from a session's message history.
pub fn build_modelfile(base_model: &str, history: &[ChatMessage]) -> String {
    let mut doc = format!("FROM {base_model}\n");
    for message in history {
        doc.push_str(&format!(
            "MESSAGE {} \"\"\"{}\"\"\"\n",
            message.role.as_str(),
            message.content
        ));
    }
    doc
}
