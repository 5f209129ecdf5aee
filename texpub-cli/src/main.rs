//! Texpub CLI - Build EPUB books from LaTeX course material

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse and validate jobs argument (must be at least 1)
fn parse_jobs(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if n < 1 {
        Err("jobs must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

#[derive(Parser)]
#[command(name = "texpub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an EPUB from a job configuration
    Build {
        /// Job configuration (JSON); prompted for when omitted
        config: Option<PathBuf>,

        /// Output file path (overrides the configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep intermediate markup and a decision log
        #[arg(long)]
        debug: bool,

        /// Extract and embed media referenced by the documents
        #[arg(long)]
        extract_media: bool,

        /// Number of documents converted in parallel (must be at least 1)
        #[arg(short, long, value_parser = parse_jobs)]
        jobs: Option<usize>,

        /// pandoc binary to use
        #[arg(long, default_value = "pandoc")]
        pandoc: PathBuf,

        /// pdftoppm binary to use
        #[arg(long, default_value = "pdftoppm")]
        pdftoppm: PathBuf,

        /// Image format for rasterized PDF pages (png, jpeg)
        #[arg(long, default_value = "png")]
        page_format: String,

        /// Directory for temporary files (defaults to the system temp dir)
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
    },

    /// Validate a job configuration without converting anything
    Validate {
        /// Job configuration (JSON)
        config: PathBuf,
    },

    /// Display information about a built EPUB
    Info {
        /// Input file path
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "texpub_cli=debug,texpub_core=debug"
    } else {
        "texpub_cli=info,texpub_core=warn"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Build {
            config,
            output,
            debug,
            extract_media,
            jobs,
            pandoc,
            pdftoppm,
            page_format,
            scratch_dir,
        } => {
            let options = commands::BuildOptions {
                output,
                debug,
                extract_media,
                jobs,
                pandoc,
                pdftoppm,
                page_format,
                scratch_dir,
            };
            commands::build(config, options).await
        }

        Commands::Validate { config } => commands::validate(&config),

        Commands::Info { input, json } => commands::info(&input, json),
    }
}
