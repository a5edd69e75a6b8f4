//! Interactive multi-turn chat against the backend.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::{ChatChunk, ChatMessage, ChatRequest, GenerateRequest, OllamaClient};
use crate::config::ConfigStore;
use crate::error::{RellamaError, Result};

use super::commands::{HELP_TEXT, SessionCommand, build_modelfile, match_model_name};

/// REPL-style session holding the active model and the full message history.
///
/// Only one network call is ever in flight: the terminal read, the request,
/// and the incremental display are strictly sequential within a turn. A
/// failed turn is reported and the loop continues.
pub struct InteractiveChatSession {
    client: OllamaClient,
    config: Arc<ConfigStore>,
    model: String,
    history: Vec<ChatMessage>,
}

impl InteractiveChatSession {
    /// Create a session for `model`, applying the configured redirect once.
    pub fn new(client: OllamaClient, config: Arc<ConfigStore>, model: &str) -> Self {
        let model = config.resolve_model(model);
        Self {
            client,
            config,
            model,
            history: Vec::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Ask the backend to load the model by generating against an empty
    /// prompt. Run on entry and after each `/load` so the first real turn
    /// does not pay the model load time.
    pub async fn warm_up(&self) -> Result<()> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: String::new(),
            keep_alive: None,
            format: None,
        };
        self.client.generate(&request).await?.drain().await?;
        Ok(())
    }

    /// Run the input loop until `/bye` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        if let Err(e) = self.warm_up().await {
            tracing::warn!("Model warm-up failed: {e}");
            eprintln!("Warning: failed to load model '{}': {e}", self.model);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!(">>> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }

            match SessionCommand::parse(&line) {
                Some(SessionCommand::Exit) => break,
                Some(command) => {
                    if let Err(e) = self.dispatch(command).await {
                        tracing::warn!("Command failed: {e}");
                        eprintln!("Error: {e}");
                    }
                }
                None => {
                    if let Err(e) = self.chat_turn(&line).await {
                        tracing::warn!("Chat turn failed: {e}");
                        eprintln!("Error: {e}");
                    }
                }
            }
        }

        Ok(())
    }

    /// Execute one slash command.
    pub async fn dispatch(&mut self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::Set => {
                println!("Session variables are not supported yet.");
            }
            SessionCommand::Show => self.show_model().await?,
            SessionCommand::Load(None) => println!("Usage: /load <model>"),
            SessionCommand::Load(Some(name)) => self.load_model(&name).await?,
            SessionCommand::Save(name) => {
                let name = name.unwrap_or_else(|| format!("{}-session", self.model));
                let doc = build_modelfile(&self.model, &self.history);
                println!("Model definition for '{name}':\n{doc}");
            }
            SessionCommand::Clear => {
                self.history.clear();
                println!("Cleared session context");
            }
            SessionCommand::Help => println!("{HELP_TEXT}"),
            SessionCommand::Unknown(command) => {
                println!("Unknown command '{command}'. Type /? for help");
            }
            SessionCommand::Exit => {}
        }
        Ok(())
    }

    /// Switch the active model after validating the name against the
    /// backend's tag listing. No match leaves the session untouched.
    pub async fn load_model(&mut self, requested: &str) -> Result<()> {
        let tags = self.client.tags().await?;
        let Some(full_name) = match_model_name(&tags, requested) else {
            return Err(RellamaError::NotFound(format!("Model '{requested}'")));
        };

        self.model = self.config.resolve_model(full_name);
        println!("Loading model '{}'...", self.model);
        self.warm_up().await
    }

    async fn show_model(&self) -> Result<()> {
        let info = self.client.show(&self.model).await?;

        println!("Model: {}", self.model);
        if let Some(details) = &info.details {
            if let Some(family) = &details.family {
                println!("  family: {family}");
            }
            if let Some(size) = &details.parameter_size {
                println!("  parameters: {size}");
            }
            if let Some(quant) = &details.quantization_level {
                println!("  quantization: {quant}");
            }
            if let Some(format) = &details.format {
                println!("  format: {format}");
            }
        }
        if let Some(parameters) = &info.parameters {
            println!("  options:\n{parameters}");
        }
        Ok(())
    }

    /// Send one user turn carrying the entire accumulated history, printing
    /// each content delta as it arrives. On stream end the concatenated
    /// deltas are appended as a single assistant message.
    pub async fn chat_turn(&mut self, prompt: &str) -> Result<()> {
        self.history.push(ChatMessage::user(prompt));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: self.history.clone(),
            keep_alive: None,
            format: None,
        };

        let mut stream = self.client.chat(&request).await?;
        let mut reply = String::new();
        while let Some(record) = stream.next_record().await {
            let chunk: ChatChunk = record?;
            let delta = chunk.delta();
            if !delta.is_empty() {
                print!("{delta}");
                std::io::stdout().flush()?;
                reply.push_str(delta);
            }
        }
        println!();

        self.history.push(ChatMessage::assistant(reply));
        Ok(())
    }
}
