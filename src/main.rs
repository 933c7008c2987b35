use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use scholar_harvest::config::{find_config_file, get_config, load_config, Config};
use scholar_harvest::models::{PaperSearchResult, SearchQuery};
use scholar_harvest::sources::{SourceCapabilities, SourceRegistry};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Scholar Harvest - Search academic engines and print normalized paper records
#[derive(Parser, Debug)]
#[command(name = "scholar-harvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search academic engines and print normalized paper records", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Give up on a search after this many seconds
    #[arg(long, global = true, default_value_t = 60)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON array of records
    Json,
}

/// Available search engines
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Engine {
    #[value(name = "google-scholar")]
    GoogleScholar,
    #[value(name = "semantic")]
    Semantic,
}

impl Engine {
    fn id(self) -> &'static str {
        match self {
            Engine::GoogleScholar => "google_scholar",
            Engine::Semantic => "semantic",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for papers by query string
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Engine to search
        #[arg(long, short, value_enum, default_value_t = Engine::GoogleScholar)]
        engine: Engine,

        /// Earliest publication year (inclusive)
        #[arg(long)]
        year_from: Option<i32>,

        /// Latest publication year (inclusive)
        #[arg(long)]
        year_to: Option<i32>,

        /// Number of results to skip
        #[arg(long)]
        offset: Option<usize>,

        /// Maximum number of results (ignored by engines that cannot honor it)
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// List the engines compiled into this build
    Engines,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let config = match &config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => get_config(),
    };

    // Initialize tracing based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => config.logging.level.as_str(),
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("scholar_harvest={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match cli.command {
        Commands::Search {
            query,
            engine,
            year_from,
            year_to,
            offset,
            limit,
        } => {
            let search_query = SearchQuery {
                query,
                year_from,
                year_to,
                offset,
                limit,
            };
            let papers = run_search(&config, engine, &search_query, cli.timeout).await?;
            output_papers(&papers, cli.format)?;
        }
        Commands::Engines => {
            let registry = SourceRegistry::from_config(&config)?;
            output_engines(&registry, cli.format)?;
        }
    }

    Ok(())
}

async fn run_search(
    config: &Config,
    engine: Engine,
    query: &SearchQuery,
    timeout_secs: u64,
) -> Result<Vec<PaperSearchResult>> {
    let registry = SourceRegistry::from_config(config)?;
    let engine = registry.get_required(engine.id())?;

    tracing::debug!("Searching {} for '{}'", engine.name(), query.query);
    let papers = tokio::time::timeout(Duration::from_secs(timeout_secs), engine.search(query))
        .await
        .with_context(|| format!("{} search timed out after {}s", engine.name(), timeout_secs))?
        .with_context(|| format!("{} search failed", engine.name()))?;

    Ok(papers)
}

fn output_papers(papers: &[PaperSearchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let records: Vec<serde_json::Value> = papers.iter().map(|p| p.to_value()).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Text => {
            if papers.is_empty() {
                println!("No results.");
            }
            for (index, paper) in papers.iter().enumerate() {
                print!("{}", format_paper(index + 1, paper));
            }
        }
    }
    Ok(())
}

fn format_paper(position: usize, paper: &PaperSearchResult) -> String {
    let mut out = format!("{}. {}\n", position, paper.title);

    if !paper.authors.is_empty() {
        out.push_str(&format!("   Authors: {}\n", paper.author_names().join(", ")));
    }

    let venue = match (&paper.venue_name, paper.year) {
        (Some(venue), Some(year)) => Some(format!("{}, {}", venue, year)),
        (Some(venue), None) => Some(venue.clone()),
        (None, Some(year)) => Some(year.to_string()),
        (None, None) => None,
    };
    if let Some(venue) = venue {
        out.push_str(&format!("   Venue: {}\n", venue));
    }

    if let Some(count) = paper.citation_count {
        out.push_str(&format!("   Cited by: {}\n", count));
    }
    if let Some(url) = &paper.venue_url {
        out.push_str(&format!("   URL: {}\n", url));
    }
    if let Some(link) = &paper.open_access_link {
        out.push_str(&format!("   Open access: {}\n", link));
    }
    if let Some(text) = &paper.r#abstract {
        out.push_str(&format!("   {}\n", text));
    }

    out.push('\n');
    out
}

fn output_engines(registry: &SourceRegistry, format: OutputFormat) -> Result<()> {
    let rows: Vec<(&str, &str, Vec<&'static str>)> = registry
        .ids()
        .into_iter()
        .filter_map(|id| registry.get(id))
        .map(|engine| {
            (
                engine.id(),
                engine.name(),
                capability_names(engine.capabilities()),
            )
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let engines: Vec<serde_json::Value> = rows
                .iter()
                .map(|(id, name, caps)| serde_json::json!({ "id": id, "name": name, "capabilities": caps }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&engines)?);
        }
        OutputFormat::Text => {
            for (id, name, caps) in rows {
                println!("{:<16} {:<18} {}", id, name, caps.join(", "));
            }
        }
    }
    Ok(())
}

fn capability_names(capabilities: SourceCapabilities) -> Vec<&'static str> {
    [
        (SourceCapabilities::SEARCH, "search"),
        (SourceCapabilities::YEAR_FILTER, "year-filter"),
        (SourceCapabilities::PAGINATION, "pagination"),
        (SourceCapabilities::LIMIT, "limit"),
        (SourceCapabilities::OPEN_ACCESS, "open-access"),
        (SourceCapabilities::CITATIONS, "citations"),
    ]
    .into_iter()
    .filter(|(flag, _)| capabilities.contains(*flag))
    .map(|(_, name)| name)
    .collect()
}
