use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use rellama::api::OllamaClient;
use rellama::config::ConfigStore;
use rellama_cli::commands::{
    ListCommand, PsCommand, PullCommand, RedirectCommand, RmCommand, RunCommand, ServeCommand,
    SetUrlCommand, ShowCommand, VersionCommand,
};
use rellama_cli::error::CliResult;

#[derive(Parser)]
#[command(name = "rellama")]
#[command(about = "Local CLI front end and reverse proxy for a remote Ollama server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Start the reverse proxy on the standard local port")]
    Serve(ServeCommand),

    #[clap(about = "Run a model: one-shot with a prompt, interactive without")]
    Run(RunCommand),

    #[clap(about = "List models available on the backend")]
    List(ListCommand),

    #[clap(about = "List models currently loaded on the backend")]
    Ps(PsCommand),

    #[clap(about = "Pull a model onto the backend")]
    Pull(PullCommand),

    #[clap(about = "Remove a model from the backend")]
    Rm(RmCommand),

    #[clap(about = "Show information for a model")]
    Show(ShowCommand),

    #[clap(about = "Show the backend server version")]
    Version(VersionCommand),

    #[clap(name = "set-url", about = "Set the backend server URL")]
    SetUrl(SetUrlCommand),

    #[clap(about = "Redirect one model name to another")]
    Redirect(RedirectCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Arc::new(ConfigStore::open_default());

    // Everything except set-url needs a backend to talk to.
    if let Command::SetUrl(cmd) = &cli.command {
        return cmd.execute(&config).await;
    }

    let url = config.url()?.ok_or(
        "No backend URL configured. Run 'rellama set-url <url>' first.",
    )?;

    match &cli.command {
        Command::Serve(cmd) => cmd.execute(config).await,
        Command::Run(cmd) => {
            let client = OllamaClient::new(url)?;
            cmd.execute(client, config).await
        }
        Command::Redirect(cmd) => {
            let client = OllamaClient::new(url)?;
            cmd.execute(&config, &client).await
        }
        Command::List(cmd) => cmd.execute(&OllamaClient::new(url)?).await,
        Command::Ps(cmd) => cmd.execute(&OllamaClient::new(url)?).await,
        Command::Pull(cmd) => cmd.execute(&OllamaClient::new(url)?).await,
        Command::Rm(cmd) => cmd.execute(&OllamaClient::new(url)?).await,
        Command::Show(cmd) => cmd.execute(&OllamaClient::new(url)?).await,
        Command::Version(cmd) => cmd.execute(&OllamaClient::new(url)?).await,
        Command::SetUrl(_) => unreachable!(),
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,rellama=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
