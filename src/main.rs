//! CLI entry point for astro-rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "astro-rs")]
#[command(version)]
#[command(about = "Typed Markdown content collections for file-routed sites", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the items of one or all collections
    #[command(alias = "ls")]
    List {
        /// Collection to list (defaults to all)
        collection: Option<String>,
    },

    /// Render one Markdown file to HTML
    Render {
        /// File path, absolute or relative to the content directory
        file: PathBuf,
    },

    /// Load a collection and reload it when its files change
    #[command(alias = "w")]
    Watch {
        /// Collection to watch
        #[arg(default_value = "posts")]
        collection: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "astro_rs=debug,info"
    } else {
        "astro_rs=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to determine current directory")?,
    };

    match cli.command {
        Commands::List { collection } => {
            let site = astro_rs::Site::new(&base_dir)?;
            astro_rs::commands::list::run(&site, collection.as_deref())?;
        }

        Commands::Render { file } => {
            let site = astro_rs::Site::new(&base_dir)?;
            astro_rs::commands::render::run(&site, &file)?;
        }

        Commands::Watch { collection } => {
            let site = astro_rs::Site::new(&base_dir)?;
            astro_rs::commands::watch::run(&site, &collection).await?;
        }

        Commands::Version => {
            println!("astro-rs version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
