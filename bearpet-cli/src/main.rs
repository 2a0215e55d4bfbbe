//! bearpet CLI - a terminal front end for the ragdoll bear companion.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bearpet_core::{
    ClipSpec, Config, Error, Event, EventReceiver, HttpTransport, Pet, API_KEY_ENV,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// bearpet - chat with Ragdoll Bear Miyu from your terminal.
///
/// Type a question and press enter to ask it. Type `/tap` to poke the bear
/// and watch its reaction clips play, `/status` to print the current state,
/// and `/quit` to leave.
#[derive(Parser, Debug)]
#[command(name = "bearpet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Bearer credential for the chat endpoint.
    ///
    /// Also read from a `.env` file in the working directory.
    #[arg(long = "api-key", env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Chat-completions endpoint URL.
    #[arg(short = 'e', long = "endpoint", env = "BEARPET_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Model name sent with every request.
    #[arg(short = 'm', long = "model", env = "BEARPET_MODEL")]
    pub model: Option<String>,

    /// Persona prompt sent as the system message.
    #[arg(long = "persona")]
    pub persona: Option<String>,

    /// Sampling temperature.
    #[arg(long = "temperature")]
    pub temperature: Option<f64>,

    /// Nucleus sampling parameter.
    #[arg(long = "top-p")]
    pub top_p: Option<f64>,

    /// Request timeout in seconds.
    #[arg(short = 't', long = "timeout", default_value = "60")]
    pub timeout: u64,

    /// Path to a clip set JSON file.
    ///
    /// The file holds `{"idle": ..., "clips": [...], "durations": [...]}` with
    /// durations in seconds. Defaults to the built-in ragdoll bear clips.
    #[arg(short = 'c', long = "clips")]
    pub clips: Option<PathBuf>,

    /// Show replies to earlier questions even after a newer one was asked.
    #[arg(long = "keep-stale-responses")]
    pub keep_stale_responses: bool,

    /// Enable debug logging.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Convert CLI arguments to a Config.
    pub fn to_config(&self) -> bearpet_core::Result<Config> {
        let mut config = Config::new()
            .request_timeout_secs(self.timeout)
            .discard_stale_responses(!self.keep_stale_responses);

        if let Some(ref key) = self.api_key {
            config = config.api_key(key);
        }
        if let Some(ref endpoint) = self.endpoint {
            config = config.endpoint(endpoint);
        }
        if let Some(ref model) = self.model {
            config = config.model(model);
        }
        if let Some(ref persona) = self.persona {
            config = config.system_prompt(persona);
        }
        if let Some(temperature) = self.temperature {
            config = config.temperature(temperature);
        }
        if let Some(top_p) = self.top_p {
            config = config.top_p(top_p);
        }
        if let Some(ref path) = self.clips {
            config = config.clips(ClipSpec::load(path)?);
        }

        Ok(config)
    }
}

/// One line typed by the user.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Tap,
    Status,
    Help,
    Quit,
    Question(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "/tap" => Input::Tap,
            "/status" => Input::Status,
            "/help" => Input::Help,
            "/quit" | "/exit" => Input::Quit,
            _ => Input::Question(line),
        }
    }
}

fn print_help() {
    println!("Ask Miyu anything and press enter. Commands: /tap /status /help /quit");
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Print events until the loop stops.
async fn print_events(mut events: EventReceiver) {
    while let Some(event) = events.recv().await {
        match event {
            Event::Started { idle_clip } => {
                println!("[{}] Miyu is here ({})", timestamp(), idle_clip);
            }
            Event::ClipChanged { clip, index } => match index {
                Some(i) => println!("[{}] playing clip {}: {}", timestamp(), i + 1, clip),
                None => println!("[{}] back to idle: {}", timestamp(), clip),
            },
            Event::TapIgnored => println!("[{}] Miyu is still busy reacting", timestamp()),
            Event::InputRejected => print_help(),
            Event::Thinking { placeholder, .. } => {
                println!("[{}] Miyu: {}", timestamp(), placeholder);
            }
            Event::ResponseReady { outcome, text, .. } => {
                if outcome.is_reply() {
                    println!("[{}] Miyu: {}", timestamp(), text);
                } else {
                    eprintln!("[{}] {}", timestamp(), text);
                }
            }
            Event::Warning { message } => eprintln!("[{}] warning: {}", timestamp(), message),
            Event::Stopped => println!("[{}] bye!", timestamp()),
            other => debug!(?other, "event"),
        }
    }
}

/// Validate the config, naming the `--api-key` flag when the credential is missing.
fn check_config(config: &Config) -> anyhow::Result<()> {
    match config.validate() {
        Err(e @ Error::MissingCredential { .. }) => {
            Err(anyhow::Error::new(e).context("no API key: pass --api-key or use a .env file"))
        }
        other => other.context("invalid configuration"),
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "bearpet=debug,bearpet_core=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the credential may come from the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.to_config().context("failed to load clip set")?;
    check_config(&config)?;
    let transport = HttpTransport::new(&config).context("failed to set up chat transport")?;

    let (pet, events, handle) = Pet::new(config, Arc::new(transport));
    let pet_task = tokio::spawn(pet.run());
    let printer = tokio::spawn(print_events(events));

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match Input::parse(&line) {
            Input::Tap => handle.tap().await?,
            Input::Status => {
                let state = handle.snapshot().await?;
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
            Input::Help => print_help(),
            Input::Quit => break,
            Input::Question(text) => handle.submit(text).await?,
        }
    }

    handle.shutdown().await?;
    let final_state = pet_task.await.context("pet loop panicked")?;
    debug!(?final_state, "pet loop finished");
    printer.await.context("event printer panicked")?;

    Ok(())
}
