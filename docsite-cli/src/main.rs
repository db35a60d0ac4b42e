//! # docsite CLI
//!
//! Command-line interface for the docsite documentation server.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docsite")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "docsite.yml", env = "DOCSITE_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the navigation tree
    Tree {
        /// Emit JSON instead of an outline
        #[arg(long)]
        json: bool,
    },

    /// Resolve and render a single document
    Render {
        /// Route path, e.g. guides/setup
        route: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = RenderFormat::Json)]
        format: RenderFormat,
    },

    /// List tags, or the documents carrying one tag
    Tags {
        /// Show documents tagged with this tag
        #[arg(long)]
        tag: Option<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List glossary terms
    Glossary {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Export the tree, tags, glossary and every document as JSON
    Build,

    /// Serve the JSON API with live reload
    Serve {
        /// Server port (defaults to server.port from the config)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Copy, Clone, ValueEnum)]
pub enum RenderFormat {
    Json,
    Html,
    Toc,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Tree { json } => commands::show_tree(&cli.config, json),
        Commands::Render { route, format } => commands::render_doc(&cli.config, &route, format),
        Commands::Tags { tag, json } => commands::show_tags(&cli.config, tag.as_deref(), json),
        Commands::Glossary { json } => commands::show_glossary(&cli.config, json),
        Commands::Build => commands::build_export(&cli.config).map(|_| ()),
        Commands::Serve { port } => commands::serve(&cli.config, port).await,
    }
}
