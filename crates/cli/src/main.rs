//! AgriShield CLI, the main entry point.
//!
//! Commands:
//! - `init`    Write the default config file
//! - `serve`   Start the HTTP gateway
//! - `chat`    Talk to the assistant in the terminal
//! - `prompt`  Print the compiled policy prompt

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "agrishield",
    about = "AgriShield: a multilingual farming assistant for flood-prone regions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration to ~/.agrishield/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the assistant
    Chat {
        #[command(flatten)]
        context: ContextArgs,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Print the policy prompt the backend would receive
    Prompt {
        #[command(flatten)]
        context: ContextArgs,
    },
}

/// Per-request context shared by `chat` and `prompt`.
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// Response language (English name, native name, or ISO code)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Approximate latitude
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Approximate longitude
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Current date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub date: Option<String>,
}

impl ContextArgs {
    pub fn location(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }

    pub fn date_or_today(&self) -> String {
        self.date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().date_naive().to_string())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { context, message } => commands::chat::run(context, message).await?,
        Commands::Prompt { context } => commands::prompt::run(context).await?,
    }

    Ok(())
}
