//! Aula CLI - chat with your academic PDFs
//!
//! A command-line front end for the Aula assistant: ask questions about
//! PDFs, summarize them, search scholarly literature and walk through
//! academic writing guides.

mod commands;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use aula_core::Config;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Aula - academic PDF chat assistant
#[derive(Parser)]
#[command(name = "aula")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Completion model to use (overrides config)
    #[arg(short, long, global = true, env = "AULA_MODEL")]
    model: Option<String>,

    /// Server port (overrides config)
    #[arg(long, global = true, env = "AULA_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AULA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Let the provider search the web for plain questions
    #[arg(long, global = true)]
    web_search: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a single question, optionally about some PDFs
    Ask {
        /// The question (or read from stdin if not provided)
        question: Option<String>,

        /// PDFs to load first (up to 5)
        #[arg(long = "pdf")]
        pdfs: Vec<PathBuf>,
    },

    /// Interactive chat session
    Chat {
        /// PDFs to load first (up to 5)
        #[arg(long = "pdf")]
        pdfs: Vec<PathBuf>,
    },

    /// Summarize a PDF
    Summarize {
        /// The PDF file
        pdf: PathBuf,
    },

    /// Build a consistency matrix for a PDF
    Matrix {
        /// The PDF file
        pdf: PathBuf,
    },

    /// Recommend journals and articles related to a PDF
    References {
        /// The PDF file
        pdf: PathBuf,
    },

    /// Search Google Scholar for a topic
    Search {
        /// The topic to search for
        #[arg(required = true)]
        topic: Vec<String>,

        /// Maximum number of articles
        #[arg(long)]
        max: Option<u32>,
    },

    /// Check whether a text looks AI-generated
    Detect {
        /// The text (or read from stdin if not provided)
        text: Option<String>,
    },

    /// Academic writing guides
    #[command(subcommand)]
    Guide(GuideCommands),

    /// Saved question/answer history
    #[command(subcommand)]
    History(HistoryCommands),

    /// Start the HTTP server for the browser front end
    Serve,

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum GuideCommands {
    /// List the available guides
    List,

    /// Walk through the sections of a guide
    Walk {
        /// Guide id (see `aula guide list`)
        id: String,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// Show saved questions and answers, newest first
    List {
        /// Number of recent entries to show
        #[arg(long)]
        last: Option<usize>,
    },

    /// Delete the whole history
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Initialize default configuration
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration; an unusable default file falls back to defaults + env
    let (mut config, load_error) = if let Some(path) = &cli.config {
        (Config::load_from_file(path)?, None)
    } else {
        match Config::load() {
            Ok(config) => (config, None),
            Err(e) => (Config::from_env(), Some(e)),
        }
    };

    // Apply CLI overrides
    if let Some(model) = &cli.model {
        config.completion.model = model.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.web_search {
        config.completion.web_search = true;
    }

    init_logging(&config.logging.level);
    if let Some(e) = load_error {
        warn!("Ignoring config file: {}", e);
    }

    Config::ensure_dirs()?;

    match cli.command {
        Commands::Ask { question, pdfs } => commands::ask::run(config, question, pdfs).await,
        Commands::Chat { pdfs } => commands::chat::run(config, pdfs).await,
        Commands::Summarize { pdf } => commands::docs::summarize(config, pdf).await,
        Commands::Matrix { pdf } => commands::docs::matrix(config, pdf).await,
        Commands::References { pdf } => commands::docs::references(config, pdf).await,
        Commands::Search { topic, max } => commands::search::run(config, topic.join(" "), max).await,
        Commands::Detect { text } => commands::detect::run(config, text).await,
        Commands::Guide(cmd) => match cmd {
            GuideCommands::List => commands::guide::list(config),
            GuideCommands::Walk { id } => commands::guide::walk(config, id).await,
        },
        Commands::History(cmd) => match cmd {
            HistoryCommands::List { last } => commands::history::list(last).await,
            HistoryCommands::Clear => commands::history::clear().await,
        },
        Commands::Serve => commands::serve::run(config).await,
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(config),
            ConfigCommands::Init { force } => commands::config::init(force),
        },
    }
}
