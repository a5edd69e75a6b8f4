mod commands;
mod session;

pub use commands::{HELP_TEXT, SessionCommand, build_modelfile, match_model_name};
pub use session::InteractiveChatSession;
