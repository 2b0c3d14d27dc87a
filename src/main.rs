//! card-search command line
//!
//! Searches the catalog and imports cards into a directory, standing in
//! for a host application.

use anyhow::Result;
use async_trait::async_trait;
use card_search::{
    config,
    import::{FileIngestor, ImportClient, ImportedFile},
    network::{HttpClient, StaticHeaders},
    search::{SearchProgress, SearchSession},
    SearchOutcome, SearchRequest, SortKey,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "card-search", version, about = "Search and import character cards")]
struct Cli {
    /// Path to a settings.yml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the catalog
    Search {
        /// Free-text search term
        term: Option<String>,
        /// Tags results must have
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Tags results must not have
        #[arg(short, long = "exclude")]
        exclude: Vec<String>,
        /// Include NSFW results
        #[arg(long)]
        nsfw: bool,
        /// Sort order
        #[arg(short, long, default_value_t = SortKey::DownloadCount)]
        sort: SortKey,
        /// Results per page
        #[arg(long)]
        find_count: Option<u32>,
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
    },
    /// Import a card by catalog URL or author/slug path
    Import {
        url: String,
        /// Directory that receives imported files
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

/// Writes ingested files into a directory
struct DirectoryIngestor {
    dir: PathBuf,
}

#[async_trait]
impl FileIngestor for DirectoryIngestor {
    async fn ingest(&self, file: ImportedFile) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&file.name);
        tokio::fs::write(&path, &file.bytes).await?;
        info!("Saved {} ({} bytes)", path.display(), file.bytes.len());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    info!("Starting card-search v{}", card_search::VERSION);

    let mut settings = config::load(cli.config.as_deref())?;
    let client = HttpClient::with_settings(&settings.outgoing)?;

    match cli.command {
        Command::Search {
            term,
            tags,
            exclude,
            nsfw,
            sort,
            find_count,
            pages,
        } => {
            if let Some(count) = find_count {
                settings.extension.find_count = count;
            }
            let session = SearchSession::new(client, &settings);
            let request = SearchRequest {
                search_term: term.unwrap_or_default(),
                include_tags: tags,
                exclude_tags: exclude,
                nsfw,
                sort: Some(sort),
                page: 1,
            };
            run_search(&session, &request, pages).await
        }
        Command::Import { url, out } => {
            let headers = Arc::new(StaticHeaders::new(settings.host.headers.clone()));
            let importer = ImportClient::new(client, &settings, headers, Default::default())?;
            let name = importer
                .import_by_url(&url, &DirectoryIngestor { dir: out })
                .await?;
            println!("Imported {}", name);
            Ok(())
        }
    }
}

async fn run_search(session: &SearchSession, request: &SearchRequest, pages: u32) -> Result<()> {
    let report = |progress: &SearchProgress<'_>| {
        println!(
            "page {} batch {}/{}: {} cards",
            progress.page,
            progress.batch + 1,
            progress.total_batches,
            progress.entities.len()
        );
    };

    let mut outcome = session.search(request, report).await?;
    for _ in 1..pages {
        if !session.state().has_more_results {
            break;
        }
        outcome = session.load_more(request, report).await?;
    }

    if let SearchOutcome::Completed { failures, .. } = outcome {
        if failures > 0 {
            println!("{} cards could not be fetched", failures);
        }
    }

    for entity in session.entities() {
        println!(
            "{:<40} {:<20} [{}]\n    {}",
            entity.name,
            entity.author,
            entity.tags.join(", "),
            entity.description
        );
    }

    let stats = session.metrics().endpoint_stats();
    for (endpoint, stat) in stats {
        info!(
            "{}: {} ok, {} failed, {:.0}% reliable",
            endpoint, stat.successes, stat.errors, stat.reliability
        );
    }

    Ok(())
}
