//! Portal Notícias - Brazilian news headlines from the terminal
//!
//! A thin host over the library: it loads configuration, wires the news
//! service to a file-backed store and prints results. Logs go to stderr and
//! are controlled with `RUST_LOG`.

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use portal_noticias::cache::{FileStore, KeyValueStore, MemoryStore, NewsCache};
use portal_noticias::cli::{CacheCommand, Cli, Command, FavoritesCommand};
use portal_noticias::config::Config;
use portal_noticias::connectivity::{Connectivity, HttpProbe, StaticConnectivity};
use portal_noticias::data::{all_categories, Article, NewsApiClient};
use portal_noticias::favorites::Favorites;
use portal_noticias::feed::{FeedSession, FeedStatus};
use portal_noticias::news::{FetchSource, NewsService};
use portal_noticias::time_fmt::format_relative_time;

type AppResult = Result<(), Box<dyn std::error::Error>>;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portal_noticias=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the configured store file, or an in-memory store if there is no data directory
async fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>, Box<dyn std::error::Error>> {
    let store: Arc<dyn KeyValueStore> = match config.cache.store_path() {
        Some(path) => Arc::new(FileStore::open(path).await?),
        None => {
            warn!("no data directory available, cache will not persist");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

fn build_service(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    offline: bool,
) -> Result<NewsService, Box<dyn std::error::Error>> {
    let connectivity: Arc<dyn Connectivity> = if offline {
        Arc::new(StaticConnectivity::offline())
    } else {
        Arc::new(HttpProbe::new(&config.connectivity))
    };
    let cache = NewsCache::new(store, config.cache.namespace.clone())
        .with_retention_days(config.cache.retention_days);
    let client = NewsApiClient::new(&config.api)?;
    Ok(NewsService::new(client, cache, connectivity).with_lookback_days(config.feed.lookback_days))
}

fn print_article(index: usize, article: &Article) {
    println!("{:>3}. {}", index, article.title);
    println!(
        "     {} · {}",
        article.source.name,
        format_relative_time(&article.published_at, Utc::now())
    );
    println!("     {}", article.url);
}

async fn run_headlines(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    category: String,
    search: String,
    pages: Option<u32>,
    offline: bool,
) -> AppResult {
    if !offline && config.api.api_key.is_empty() {
        warn!("no API key configured, set NEWS_API_KEY or api.api_key");
    }
    let service = build_service(config, store, offline)?;
    let mut session = FeedSession::new(&config.feed);
    session.set_category(category);
    session.set_query(search);

    session.refresh(&service).await;
    let wanted = pages.unwrap_or(1).clamp(1, config.feed.max_pages);
    let mut loaded = 1;
    while loaded < wanted && session.state.status == FeedStatus::Loaded {
        if !session.load_more(&service).await {
            break;
        }
        loaded += 1;
    }

    if session.articles().is_empty() {
        if let Some(message) = &session.state.last_error {
            return Err(message.clone().into());
        }
        println!("Nenhuma notícia encontrada para \"{}\".", session.effective_query());
        return Ok(());
    }

    match session.last_source() {
        Some(FetchSource::Offline) => println!("Modo offline: exibindo notícias em cache.\n"),
        Some(FetchSource::CacheFallback) => {
            println!("Falha ao atualizar: exibindo notícias em cache.\n")
        }
        _ => {}
    }
    for (i, article) in session.articles().iter().enumerate() {
        print_article(i + 1, article);
    }
    if let Some(message) = &session.state.last_error {
        eprintln!("\nerror: {}", message);
    }
    Ok(())
}

async fn run_cache(config: &Config, store: Arc<dyn KeyValueStore>, command: CacheCommand) -> AppResult {
    let cache = NewsCache::new(store, config.cache.namespace.clone())
        .with_retention_days(config.cache.retention_days);
    match command {
        CacheCommand::List => {
            let records = cache.load_all().await?;
            if records.is_empty() {
                println!("Cache vazio.");
            }
            for record in records {
                println!(
                    "{}  {:<30}  {} artigos",
                    record.date,
                    record.query,
                    record.response.articles.len()
                );
            }
            if let Some(date) = cache.last_update().await? {
                println!("Última atualização: {}", date);
            }
        }
        CacheCommand::Clear => {
            cache.clear().await?;
            println!("Cache limpo.");
        }
    }
    Ok(())
}

async fn run_favorites(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    command: FavoritesCommand,
) -> AppResult {
    let favorites = Favorites::new(store.clone(), &config.cache.namespace);
    match command {
        FavoritesCommand::List => {
            let saved = favorites.list().await?;
            if saved.is_empty() {
                println!("Nenhum favorito salvo.");
            }
            for (i, article) in saved.iter().enumerate() {
                print_article(i + 1, article);
            }
        }
        FavoritesCommand::Add { url } => {
            let service = build_service(config, store, true)?;
            let article = service
                .all_cached_news()
                .await
                .into_iter()
                .flat_map(|response| response.articles)
                .find(|article| article.url == url)
                .ok_or_else(|| format!("article not found in cached news: {}", url))?;
            if favorites.add(&article).await? {
                println!("Artigo adicionado aos favoritos!");
            } else {
                println!("Artigo já está nos favoritos.");
            }
        }
        FavoritesCommand::Remove { id } => {
            if favorites.remove(&id).await? {
                println!("Artigo removido dos favoritos!");
            } else {
                println!("Nenhum favorito com id {}.", id);
            }
        }
        FavoritesCommand::Clear => {
            favorites.clear().await?;
            println!("Favoritos removidos.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> AppResult {
    let cli = Cli::parse();
    init_tracing();

    if cli.command == Command::Categories {
        for category in all_categories() {
            let keyword = if category.is_all() { "-" } else { category.keyword };
            println!("{:<14} {:<16} {}", category.id, category.label, keyword);
        }
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let store = open_store(&config).await?;

    match cli.command {
        Command::Headlines {
            category,
            search,
            pages,
            offline,
        } => run_headlines(&config, store, category, search, pages, offline).await,
        Command::Cache(command) => run_cache(&config, store, command).await,
        Command::Favorites(command) => run_favorites(&config, store, command).await,
        Command::Categories => Ok(()),
    }
}
