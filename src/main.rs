mod config;
mod details;
mod display;
mod fetch;
mod http;
mod keys;
mod models;
mod omdb;
mod rating;
mod search;
mod session;
mod storage;
mod watchlist;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Configuration;
use details::{DetailFetcher, RatingCounter};
use display::DisplaySurface;
use fetch::FetchStatus;
use http::HttpClient;
use models::WatchedEntry;
use omdb::{MovieApi, OmdbClient};
use search::SearchFetcher;
use session::Session;
use std::sync::Arc;
use storage::{DurableStore, JsonFileStore};
use tracing::{error, info};
use watchlist::WatchlistStore;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// OMDb api key, overrides the configuration file
    #[arg(long)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive search and watchlist session (default)
    Interactive,
    /// Search titles
    Search { query: String },
    /// Show details for one title
    Show { id: String },
    /// Rate a title and add it to the watchlist
    Add { id: String, rating: u8 },
    /// Remove a title from the watchlist
    Remove { id: String },
    /// Show the watchlist and its summary
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout belongs to the view
    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting popcornlist v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Configuration::load_or_default(&cli.config)?;
    if let Some(key) = cli.api_key {
        config.set_api_key(key);
    }

    let store: Arc<dyn DurableStore> = Arc::new(JsonFileStore::new(config.storage_path()));
    let watchlist = WatchlistStore::open(
        store,
        config.storage_key(),
        config.duplicate_policy(),
        config.max_rating(),
    );

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Remove { id } => {
            let mut watchlist = watchlist;
            let removed = watchlist.remove(&id)?;
            println!("Removed {} entries", removed);
            print_watchlist(&watchlist);
        }
        Command::List => print_watchlist(&watchlist),
        command => {
            let api = movie_api(&config)?;
            run_online(command, &config, api, watchlist).await?;
        }
    }

    Ok(())
}

fn movie_api(config: &Configuration) -> Result<Arc<dyn MovieApi>> {
    let api_key = config
        .api_key()
        .context("an OMDb api key is required (omdb.apikey in the config or --api-key)")?;
    let http_client = HttpClient::new(config.request_timeout())?;
    Ok(Arc::new(OmdbClient::new(
        http_client,
        config.base_url(),
        api_key.to_string(),
    )?))
}

async fn run_online(
    command: Command,
    config: &Configuration,
    api: Arc<dyn MovieApi>,
    mut watchlist: WatchlistStore,
) -> Result<()> {
    match command {
        Command::Search { query } => {
            let mut search = SearchFetcher::new(api, config.min_query_length());
            search.observe(&query);
            let state = search.settled().await;
            if state.status == FetchStatus::Idle {
                println!(
                    "Queries need at least {} characters",
                    config.min_query_length()
                );
            } else {
                println!("{}", session::render_search(&state));
            }
        }
        Command::Show { id } => {
            let mut details = DetailFetcher::new(api);
            details.observe(Some(&id));
            let state = details.settled().await;
            match state.data {
                Some(detail) => {
                    let watched = watchlist.get(&detail.id);
                    let stars = session::rating_widget(
                        watchlist.max_rating(),
                        &config.rating_labels(),
                        watched,
                    );
                    println!("{}", session::render_detail(&detail, &stars, watched));
                }
                None => println!("😔 {}", state.error_message),
            }
        }
        Command::Add { id, rating } => {
            let title = add_to_watchlist(api, &mut watchlist, &id, rating).await?;
            println!("Added {}", title);
            print_watchlist(&watchlist);
        }
        _ => {
            let search = SearchFetcher::new(Arc::clone(&api), config.min_query_length());
            let details = DetailFetcher::new(api);
            let surface = DisplaySurface::new(config.default_title());
            let session = Session::new(search, details, watchlist, surface, std::io::stdout())
                .with_rating_labels(config.rating_labels());
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            session.run(stdin).await?;
        }
    }
    Ok(())
}

/// Fetches `id`, rates it and appends it. Fails when the title cannot be
/// loaded or the watchlist refuses the entry.
async fn add_to_watchlist(
    api: Arc<dyn MovieApi>,
    watchlist: &mut WatchlistStore,
    id: &str,
    rating: u8,
) -> Result<String> {
    let mut details = DetailFetcher::new(api);
    details.observe(Some(id));
    let state = details.settled().await;
    let Some(detail) = state.data else {
        error!("Failed to load {}: {}", id, state.error_message);
        anyhow::bail!("{}", state.error_message);
    };

    let mut counter = RatingCounter::default();
    counter.record(rating);
    let entry = WatchedEntry::from_detail(&detail, rating, counter.changes());
    watchlist.append(entry).map_err(|e| {
        error!("Failed to add {}: {}", id, e);
        anyhow::Error::from(e)
    })?;
    Ok(detail.title)
}

fn print_watchlist(watchlist: &WatchlistStore) {
    println!("{}", session::render_summary(&watchlist.summary()));
    let entries = session::render_watched(watchlist.entries());
    if !entries.is_empty() {
        println!("{}", entries);
    }
}
