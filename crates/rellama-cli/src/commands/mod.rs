pub mod config;
pub mod model;
pub mod run;
pub mod serve;

pub use config::{RedirectCommand, SetUrlCommand};
pub use model::{ListCommand, PsCommand, PullCommand, RmCommand, ShowCommand, VersionCommand};
pub use run::RunCommand;
pub use serve::ServeCommand;
