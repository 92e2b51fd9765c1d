//! `recall-chat` terminal client.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use recall_chat::config::{ChatConfig, MemoryMode, PipelineProfile};
use recall_chat::{build_controller, repl, telemetry, AppOptions};
use tokio::io::{self, BufReader};
use tracing::info;

/// Chat assistant that answers from memory before asking the model.
#[derive(Parser)]
#[command(name = "recall-chat", version, about)]
struct Cli {
    /// Pipeline profile (TOML). Built-in defaults are used when omitted.
    #[arg(long, env = "RECALL_CHAT_PROFILE")]
    profile: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `chat_kernel=trace`.
    #[arg(long)]
    log: Option<String>,

    /// Keep memory in-process instead of the hosted index.
    #[arg(long)]
    local_memory: bool,

    /// Chat model, overriding `CHAT_MODEL`.
    #[arg(long)]
    model: Option<String>,

    /// Disable the `/search` command.
    #[arg(long)]
    no_search: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log.as_deref())?;

    let mode = if cli.local_memory {
        MemoryMode::Local
    } else {
        MemoryMode::Hosted
    };
    let config = ChatConfig::from_env(mode).context("reading credentials")?;
    let profile = match &cli.profile {
        Some(path) => PipelineProfile::load(path)
            .with_context(|| format!("loading profile {}", path.display()))?,
        None => PipelineProfile::default(),
    };
    let options = AppOptions {
        model: cli.model,
        web_search: !cli.no_search,
    };
    let controller = build_controller(&config, &profile, &options)
        .await
        .context("starting chat pipeline")?;

    println!("{}", banner(profile.prompts.assistant_name()));

    let stdin = BufReader::new(io::stdin());
    let mut stdout = io::stdout();
    tokio::select! {
        finished = repl::run(&controller, stdin, &mut stdout) => {
            finished.context("terminal I/O failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
        }
    }
    Ok(())
}

fn banner(name: &str) -> String {
    format!("{name}. Type /help for commands, /quit to leave.\n")
}
