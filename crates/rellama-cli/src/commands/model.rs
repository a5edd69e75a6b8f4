use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use indicatif::{ProgressBar, ProgressStyle};
use rellama::api::{ModelSummary, OllamaClient};

use crate::error::CliResult;
use crate::output::{format_relative, format_size, short_digest};

#[derive(Parser)]
pub struct ListCommand;

impl ListCommand {
    pub async fn execute(&self, client: &OllamaClient) -> CliResult<()> {
        let list = client.tags().await?;
        if list.models.is_empty() {
            println!("No models found.");
            return Ok(());
        }

        let mut table = model_table(["NAME", "ID", "SIZE", "MODIFIED"]);
        for model in &list.models {
            table.add_row([
                model.name.clone(),
                short_digest(&model.digest).to_string(),
                format_size(model.size),
                model
                    .modified_at
                    .as_ref()
                    .map(format_relative)
                    .unwrap_or_default(),
            ]);
        }
        println!("{table}");
        Ok(())
    }
}

#[derive(Parser)]
pub struct PsCommand;

impl PsCommand {
    pub async fn execute(&self, client: &OllamaClient) -> CliResult<()> {
        let list = client.ps().await?;
        if list.models.is_empty() {
            println!("No models are currently loaded.");
            return Ok(());
        }

        let mut table = model_table(["NAME", "ID", "SIZE", "PROCESSOR", "UNTIL"]);
        for model in &list.models {
            table.add_row([
                model.name.clone(),
                short_digest(&model.digest).to_string(),
                format_size(model.size),
                processor_split(model),
                model
                    .expires_at
                    .as_ref()
                    .map(format_relative)
                    .unwrap_or_default(),
            ]);
        }
        println!("{table}");
        Ok(())
    }
}

#[derive(Parser)]
pub struct PullCommand {
    #[clap(help = "Model to pull")]
    pub model: String,
}

impl PullCommand {
    pub async fn execute(&self, client: &OllamaClient) -> CliResult<()> {
        let mut stream = client.pull(&self.model).await?;

        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template(
                "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut last_status = String::new();
        while let Some(record) = stream.next_record().await {
            let progress = record?;

            if progress.total > 0 {
                if bar.is_hidden() {
                    bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                }
                bar.set_length(progress.total);
                bar.set_position(progress.completed);
                bar.set_message(progress.status.clone());
            } else if progress.status != last_status {
                bar.println(&progress.status);
            }
            last_status = progress.status;
        }
        bar.finish_and_clear();

        println!("Pulled model '{}'", self.model);
        Ok(())
    }
}

#[derive(Parser)]
pub struct RmCommand {
    #[clap(help = "Model to remove")]
    pub model: String,
}

impl RmCommand {
    pub async fn execute(&self, client: &OllamaClient) -> CliResult<()> {
        client.delete(&self.model).await?;
        println!("Deleted '{}'", self.model);
        Ok(())
    }
}

#[derive(Parser)]
pub struct ShowCommand {
    #[clap(help = "Model to show")]
    pub model: String,

    #[clap(long, help = "Print the full modelfile")]
    pub modelfile: bool,
}

impl ShowCommand {
    pub async fn execute(&self, client: &OllamaClient) -> CliResult<()> {
        let info = client.show(&self.model).await?;

        if self.modelfile {
            if let Some(modelfile) = &info.modelfile {
                println!("{modelfile}");
            }
            return Ok(());
        }

        println!("Model: {}", self.model);
        if let Some(details) = &info.details {
            if let Some(family) = &details.family {
                println!("  family:        {family}");
            }
            if let Some(size) = &details.parameter_size {
                println!("  parameters:    {size}");
            }
            if let Some(quant) = &details.quantization_level {
                println!("  quantization:  {quant}");
            }
            if let Some(format) = &details.format {
                println!("  format:        {format}");
            }
        }
        if let Some(parameters) = &info.parameters {
            println!("\nParameters:\n{parameters}");
        }
        if let Some(template) = &info.template {
            println!("\nTemplate:\n{template}");
        }
        if let Some(system) = &info.system {
            println!("\nSystem:\n{system}");
        }
        Ok(())
    }
}

#[derive(Parser)]
pub struct VersionCommand;

impl VersionCommand {
    pub async fn execute(&self, client: &OllamaClient) -> CliResult<()> {
        let info = client.version().await?;
        println!("ollama version is {}", info.version);
        Ok(())
    }
}

fn model_table<const N: usize>(header: [&str; N]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// How much of the loaded model sits on the GPU versus main memory.
fn processor_split(model: &ModelSummary) -> String {
    if model.size == 0 || model.size_vram == 0 {
        "100% CPU".to_string()
    } else if model.size_vram >= model.size {
        "100% GPU".to_string()
    } else {
        let gpu = (model.size_vram as f64 / model.size as f64 * 100.0).round() as u64;
        format!("{}%/{}% CPU/GPU", 100 - gpu, gpu)
    }
}
