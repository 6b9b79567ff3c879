use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use scraperboard::{render_flow_text, Extractor, Loader, LoaderOptions, Scraper, Selection, Source};

#[derive(Parser)]
#[command(name = "scraperboard", about = "Template-driven HTML scraper")]
struct Cli {
    /// Log every property, item and filter step
    #[arg(long)]
    debug: bool,
    /// User-Agent sent when fetching URLs
    #[arg(long)]
    user_agent: Option<String>,
    /// Fetch timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a page with an XML template and print JSON
    Scrape {
        /// Scraper template file
        #[arg(short, long)]
        template: PathBuf,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
        /// URL or file path
        source: String,
    },
    /// Render a page (or part of it) as flow text
    Markdown {
        /// Only render nodes matching this CSS selector
        #[arg(short, long)]
        selector: Option<String>,
        /// URL or file path
        source: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    let mut options = LoaderOptions {
        timeout_secs: cli.timeout,
        ..Default::default()
    };
    if let Some(user_agent) = cli.user_agent {
        options.user_agent = user_agent;
    }
    let loader = Loader::new(&options);

    match cli.command {
        Commands::Scrape {
            template,
            pretty,
            source,
        } => {
            let scraper = Scraper::from_file(&template)
                .with_context(|| format!("loading template {}", template.display()))?;
            let record = Extractor::new(&scraper)
                .with_debug(cli.debug)
                .scrape_source(&Source::from_arg(&source), &loader)
                .with_context(|| format!("scraping {}", source))?;
            info!(source = %source, fields = record.len(), "scrape finished");

            let json = if pretty {
                serde_json::to_string_pretty(&record)?
            } else {
                serde_json::to_string(&record)?
            };
            println!("{}", json);
        }
        Commands::Markdown { selector, source } => {
            let document = loader
                .load(&Source::from_arg(&source))
                .with_context(|| format!("loading {}", source))?;
            let root = Selection::document(&document);
            let selection = match selector.as_deref() {
                Some(selector) => root.find(selector)?,
                None => root,
            };
            println!("{}", render_flow_text(&selection));
        }
    }

    Ok(())
}
