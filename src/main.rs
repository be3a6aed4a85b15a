//! commit-assist - CLI entry point.

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use commit_assist::diagnostics::{DIAGNOSTICS_TARGET, Diagnostics};
use commit_assist::git::staged_diff_at;
use commit_assist::provider::list_models;
use commit_assist::session::{run_structured_session, run_text_session};
use commit_assist::{GenerationEvent, Generator, Overrides, Settings};

/// Generate commit messages for staged changes with an AI provider.
#[derive(Parser, Debug)]
#[command(name = "commit-assist")]
#[command(about = "Generate commit messages for staged changes with an AI provider")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to <config dir>/commit-assist/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a commit message for the staged changes
    Generate(GenerateArgs),
    /// List the models offered by a provider
    Models(ProviderArgs),
}

#[derive(Args, Debug)]
struct ProviderArgs {
    /// Provider: openai, xai, openrouter, gemini or custom
    #[arg(long)]
    provider: Option<String>,

    /// API key for the provider
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL for OpenAI-compatible providers (required for custom)
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    provider: ProviderArgs,

    /// Model id
    #[arg(long)]
    model: Option<String>,

    /// Ask for a structured conventional commit (JSON) instead of free text
    #[arg(long)]
    structured: bool,

    /// Force the commit type (structured mode)
    #[arg(long = "type", value_name = "TYPE", requires = "structured")]
    commit_type: Option<String>,

    /// Language of the commit message
    #[arg(long)]
    language: Option<String>,

    /// Maximum length of the message in characters
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_length: Option<u32>,

    /// Dump requests and responses to the diagnostics log
    #[arg(long)]
    debug: bool,

    /// Append diagnostics as JSON lines to this file instead (implies --debug)
    #[arg(long, value_name = "PATH")]
    debug_log: Option<PathBuf>,
}

impl ProviderArgs {
    fn overrides(&self, model: Option<String>) -> Overrides {
        Overrides {
            provider: self.provider.clone(),
            api_key: self.api_key.clone(),
            model,
            base_url: self.base_url.clone(),
        }
        .or(Overrides::from_env())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Command::Generate(args) => {
            let debug = args.debug || args.debug_log.is_some() || settings.debug;
            init_tracing(cli.verbose, debug && args.debug_log.is_none());

            if let Some(language) = args.language {
                settings.language = language;
            }
            if let Some(max_length) = args.max_length {
                settings.max_length = max_length;
            }
            let overrides = args.provider.overrides(args.model);
            let mut generator = Generator::new();
            if let Some(path) = &args.debug_log {
                let diagnostics = Diagnostics::to_file(path).with_context(|| {
                    format!("Failed to open diagnostics log {}", path.display())
                })?;
                generator = generator.with_diagnostics(diagnostics);
            }
            generate(
                &generator,
                &settings,
                &overrides,
                args.structured,
                args.commit_type,
                debug,
            )
            .await
        }
        Command::Models(args) => {
            init_tracing(cli.verbose, false);
            models(&settings, &args.overrides(None)).await
        }
    }
}

async fn generate(
    generator: &Generator,
    settings: &Settings,
    overrides: &Overrides,
    structured: bool,
    commit_type: Option<String>,
    debug: bool,
) -> Result<()> {
    let creds = settings
        .credentials(overrides)
        .context("Provider is not configured")?;

    let cwd = env::current_dir().context("Failed to get current directory")?;
    let diff = staged_diff_at(&cwd).context("Failed to read staged changes")?;
    let request = settings.generation_request(diff, commit_type);

    eprintln!("Generating commit message with {} ({})...", creds.provider, creds.model);

    if structured {
        let message = run_structured_session(generator, &creds, &request, debug, |_| {})
            .await
            .context("Failed to generate commit message")?;
        println!("{}", serde_json::to_string_pretty(&message)?);
        return Ok(());
    }

    let mut writer = ChunkWriter::new(io::stdout());
    run_text_session(generator, &creds, &request, debug, |event| writer.handle(event))
        .await
        .context("Failed to generate commit message")?;

    writer.finish().context("Failed to write commit message")
}

/// Prints streamed chunks, keeping the first write error.
struct ChunkWriter<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> ChunkWriter<W> {
    fn new(out: W) -> Self {
        Self { out, error: None }
    }

    fn handle(&mut self, event: GenerationEvent) {
        if self.error.is_some() {
            return;
        }
        let result = match event {
            GenerationEvent::Chunk(text) => {
                write!(self.out, "{text}").and_then(|()| self.out.flush())
            }
            GenerationEvent::End => writeln!(self.out),
            // Errors are reported through the session result.
            _ => Ok(()),
        };
        if let Err(e) = result {
            self.error = Some(e);
        }
    }

    fn finish(self) -> io::Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn models(settings: &Settings, overrides: &Overrides) -> Result<()> {
    let provider = settings.active_provider(overrides)?;
    let api_key = settings.api_key(provider, overrides)?;
    let base_url = settings.base_url(provider, overrides);

    let models = list_models(provider, &api_key, base_url.as_deref())
        .await
        .with_context(|| format!("Failed to list models for {}", provider))?;

    if models.is_empty() {
        println!("No models found for {}.", provider);
        return Ok(());
    }

    for model in models {
        if model.id == model.name {
            println!("{}", model.id);
        } else {
            println!("{}\t{}", model.id, model.name);
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `-v` and `--debug`.
fn init_tracing(verbose: u8, debug: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let mut directives = format!("commit_assist={level}");
    if debug {
        directives.push_str(&format!(",{DIAGNOSTICS_TARGET}=info"));
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
