//! CLI command definitions and one-shot handlers.
//!
//! Commands:
//! - `generate`: Synthesize a persona from a description or URL
//! - `mint`: Upload avatar and metadata to 0G storage and mint the INFT
//! - `chat`: Send one in-character message to a persona
//! - `session`: Interactive workflow REPL
//! - `doctor`: Configuration and endpoint diagnostics

mod doctor;
mod session;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::app::App;
use crate::config::Config;
use crate::llm::Persona;
use crate::mint::EventSink;
use crate::storage::ImageSource;

pub use doctor::run_doctor_command;
pub use session::run_session;

#[derive(Parser, Debug)]
#[command(name = "persona-forge")]
#[command(about = "Generate AI personas, mint them as INFTs on 0G, and chat with them")]
#[command(version)]
pub struct Cli {
    /// TOML config file (defaults to ~/.persona-forge/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a persona from a description or character URL
    Generate {
        #[command(flatten)]
        source: SourceArgs,

        /// Write the persona JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Mint a generated persona as an INFT
    Mint {
        /// Persona JSON produced by `generate`
        #[arg(long)]
        persona: PathBuf,

        /// Avatar file path, http(s) URL, or base64/data URL
        #[arg(long)]
        image: String,
    },

    /// Send one message to a persona and print the reply
    Chat {
        #[arg(long)]
        persona: PathBuf,

        #[arg(long)]
        message: String,
    },

    /// Interactive session: generate, mint and chat
    Session,

    /// Check configuration and probe endpoints
    Doctor {
        /// Exit non-zero when any check fails
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Rough character description
    #[arg(long)]
    pub text: Option<String>,

    /// Character page URL (passed to the model as-is)
    #[arg(long)]
    pub url: Option<String>,
}

impl SourceArgs {
    fn source_text(&self) -> &str {
        self.text
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or_default()
    }
}

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::Doctor { strict } = cli.command {
        return run_doctor_command(cli.config.as_deref(), strict).await;
    }

    let config = Config::from_env_with_toml(cli.config.as_deref())?;
    let app = App::new(config);

    match cli.command {
        Command::Generate { source, out } => generate(&app, &source, out.as_deref()).await,
        Command::Mint { persona, image } => mint(&app, &persona, &image).await,
        Command::Chat { persona, message } => chat(&app, &persona, &message).await,
        Command::Session => run_session(&app).await,
        Command::Doctor { .. } => Ok(()),
    }
}

async fn generate(app: &App, source: &SourceArgs, out: Option<&Path>) -> anyhow::Result<()> {
    app.config().validate_for_generate()?;
    let persona = app.generator().generate(source.source_text()).await?;
    let json = serde_json::to_string_pretty(&persona)?;
    match out {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Persona '{}' written to {}", persona.name, path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn mint(app: &App, persona_path: &Path, image: &str) -> anyhow::Result<()> {
    let persona = load_persona(persona_path)?;
    let image = parse_image_arg(image)?;
    let orchestrator = app.orchestrator().await?;

    let (sink, mut events) = EventSink::channel();
    let attempt = async move {
        let result = orchestrator.mint(&persona, Some(&image), &sink).await;
        drop(sink);
        result
    };
    let progress = async {
        while let Some(event) = events.recv().await {
            eprintln!("{}", event.log_line());
        }
    };
    let (result, ()) = tokio::join!(attempt, progress);

    let receipt = result?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

async fn chat(app: &App, persona_path: &Path, message: &str) -> anyhow::Result<()> {
    app.config().validate_for_generate()?;
    let persona = load_persona(persona_path)?;
    let reply = app.relay().reply(&persona, message).await?;
    println!("{}: {reply}", persona.name);
    Ok(())
}

fn load_persona(path: &Path) -> anyhow::Result<Persona> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read persona file {}", path.display()))?;
    let persona: Persona = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a persona JSON document", path.display()))?;
    persona.validate()?;
    Ok(persona)
}

/// `http(s)://` → fetched, `data:` → inline base64, anything else → file path.
pub(crate) fn parse_image_arg(raw: &str) -> anyhow::Result<ImageSource> {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Ok(ImageSource::Url(raw.to_string()));
    }
    if raw.starts_with("data:") {
        return Ok(ImageSource::Base64(raw.to_string()));
    }
    let bytes =
        std::fs::read(raw).with_context(|| format!("failed to read image file {raw}"))?;
    Ok(ImageSource::Bytes(bytes))
}
