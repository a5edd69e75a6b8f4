use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use rellama::api::{GenerateRequest, OllamaClient, StreamStats};
use rellama::chat::InteractiveChatSession;
use rellama::config::ConfigStore;

use crate::error::CliResult;

#[derive(Parser)]
pub struct RunCommand {
    #[clap(help = "Model to run")]
    pub model: String,

    #[clap(help = "Prompt for a one-shot generation; omit to chat interactively")]
    pub prompt: Option<String>,

    #[clap(long, short, help = "Print timing statistics after the response")]
    pub verbose: bool,
}

impl RunCommand {
    pub async fn execute(&self, client: OllamaClient, config: Arc<ConfigStore>) -> CliResult<()> {
        match &self.prompt {
            Some(prompt) => self.generate_once(&client, &config, prompt).await,
            None => {
                let mut session = InteractiveChatSession::new(client, config, &self.model);
                session.run().await?;
                Ok(())
            }
        }
    }

    async fn generate_once(
        &self,
        client: &OllamaClient,
        config: &ConfigStore,
        prompt: &str,
    ) -> CliResult<()> {
        let request = GenerateRequest {
            model: config.resolve_model(&self.model),
            prompt: prompt.to_string(),
            keep_alive: None,
            format: None,
        };

        let mut stream = client.generate(&request).await?;
        let mut final_stats = None;
        while let Some(chunk) = stream.next_record().await {
            let chunk = chunk?;
            print!("{}", chunk.response);
            std::io::stdout().flush()?;
            if chunk.done {
                final_stats = Some(chunk.stats);
            }
        }
        println!();

        if self.verbose {
            if let Some(stats) = final_stats {
                print_stats(&stats);
            }
        }
        Ok(())
    }
}

fn print_stats(stats: &StreamStats) {
    let seconds = |nanos: u64| nanos as f64 / 1e9;

    if let Some(total) = stats.total_duration {
        eprintln!("total duration:       {:.2}s", seconds(total));
    }
    if let Some(load) = stats.load_duration {
        eprintln!("load duration:        {:.2}s", seconds(load));
    }
    if let Some(count) = stats.prompt_eval_count {
        eprintln!("prompt eval count:    {count} token(s)");
    }
    if let (Some(count), Some(duration)) = (stats.eval_count, stats.eval_duration) {
        eprintln!("eval count:           {count} token(s)");
        if duration > 0 {
            eprintln!(
                "eval rate:            {:.2} tokens/s",
                count as f64 / seconds(duration)
            );
        }
    }
}
