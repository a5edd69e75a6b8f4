pub mod commands;
pub mod error;
pub mod output;

pub use commands::{
    ListCommand, PsCommand, PullCommand, RedirectCommand, RmCommand, RunCommand, ServeCommand,
    SetUrlCommand, ShowCommand, VersionCommand,
};
pub use error::{CliError, CliResult};
pub use output::{format_relative, format_size, short_digest};
