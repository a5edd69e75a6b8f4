use clap::Parser;
use rellama::api::OllamaClient;
use rellama::config::ConfigStore;

use crate::commands::PullCommand;
use crate::error::CliResult;

#[derive(Parser)]
pub struct SetUrlCommand {
    #[clap(help = "Backend server URL, e.g. https://ollama.example.com")]
    pub url: String,
}

impl SetUrlCommand {
    pub async fn execute(&self, config: &ConfigStore) -> CliResult<()> {
        let normalized = config.set_url(&self.url)?;
        println!("Backend URL set to {normalized}");
        Ok(())
    }
}

#[derive(Parser)]
pub struct RedirectCommand {
    #[clap(help = "Model name clients ask for")]
    pub source: String,

    #[clap(help = "Model name the backend should serve instead")]
    pub destination: String,
}

impl RedirectCommand {
    pub async fn execute(&self, config: &ConfigStore, client: &OllamaClient) -> CliResult<()> {
        config.set_redirect(&self.source, &self.destination)?;
        println!(
            "Redirecting '{}' to '{}'",
            self.source, self.destination
        );

        // Make sure the destination actually exists on the backend. The
        // redirect stays saved either way; a failed pull is only reported.
        let pull = PullCommand {
            model: self.destination.clone(),
        };
        if let Err(e) = pull.execute(client).await {
            eprintln!("Warning: could not pull '{}': {e}", self.destination);
        }
        Ok(())
    }
}
