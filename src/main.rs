//! The `conductor` command-line interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use conductor::config::{self, ConductorConfig};
use conductor::logging::{init_logging, LogLevel};
use conductor::team::Team;
use conductor::trace::{ChunkKind, TraceEvent};
use futures::StreamExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file; defaults to the standard search paths
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level, unless RUST_LOG is set
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a task through the manager and its agents
    Run {
        /// The task; the configured default prompt when omitted
        #[arg(short, long)]
        prompt: Option<String>,

        /// Model id, e.g. cerebras/llama-3.3-70b
        #[arg(short, long)]
        model: Option<String>,

        /// API key; overrides the configured key and provider.api_key_env
        #[arg(long)]
        api_key: Option<String>,

        /// Print trace chunks and the result as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// List the catalogued models
    Models,
    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => config::from_path(path)?,
        None => config::load()?,
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    let _guard = init_logging(&config.logging)?;

    match cli.command {
        Command::Run {
            prompt,
            model,
            api_key,
            json,
        } => {
            if let Some(model) = model {
                config.provider.model = model;
            }
            if let Some(key) = api_key {
                config.provider.api_key = Some(key);
            }
            run(config, prompt, json).await
        }
        Command::Models => {
            for model in config::available_models() {
                println!("{:<42} {:<30} {:>12}  {}", model.id, model.name, model.params, model.speed);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::ShowConfig => {
            print!("{}", config.to_toml_redacted()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(config: ConductorConfig, prompt: Option<String>, json: bool) -> Result<ExitCode> {
    let team = Arc::new(Team::connect(&config).context("could not assemble the agent team")?);
    let task = prompt.unwrap_or_else(|| team.default_prompt().to_string());

    let mut streaming = Arc::clone(&team).run_streaming(task);
    let cancel = streaming.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    while let Some(event) = streaming.stream.next().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        if let TraceEvent::Chunk(chunk) = event {
            match chunk.kind {
                ChunkKind::Final if chunk.agent == team.manager().name() => {}
                ChunkKind::Error => eprintln!("[{}] {}", chunk.agent, chunk.text),
                _ => println!("[{}] {}", chunk.agent, chunk.text),
            }
        }
    }

    let result = streaming.handle.await.context("run task failed")?;
    if json {
        let summary = serde_json::json!({
            "run_id": result.run_id,
            "status": if result.is_success() { "completed" } else { "error" },
            "result": result.answer(),
            "error": result.error().map(ToString::to_string),
            "trajectory": result.trajectory,
        });
        println!("{summary}");
    } else {
        match &result.outcome {
            Ok(answer) => termimad::print_text(answer),
            Err(error) => eprintln!("no answer: {error}"),
        }
    }

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn api_key_comes_only_from_the_flag() {
        std::env::set_var("CEREBRAS_API_KEY", "csk-from-env");

        let cli = Cli::try_parse_from(["conductor", "run", "--prompt", "2+2"]).unwrap();
        let Command::Run { api_key, prompt, .. } = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(api_key, None);
        assert_eq!(prompt.as_deref(), Some("2+2"));

        let cli = Cli::try_parse_from(["conductor", "run", "--api-key", "csk-flag"]).unwrap();
        let Command::Run { api_key, .. } = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(api_key.as_deref(), Some("csk-flag"));
    }
}
