use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};
use kpcrawl::process::{crawl_movies, crawl_votes, CrawlConfig};
use kpcrawl::{info_time, Result, BASE_URL, DEFAULT_BATCH_SIZE, DEFAULT_MAX_PAGES, DEFAULT_OUT_DIR};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Resumable crawler for movie rating histories")]
struct Cli {
    /// Site root, without trailing slash.
    #[arg(long, env = "KP_BASE_URL", default_value = BASE_URL, global = true)]
    base_url: String,

    /// Directory holding the stores.
    #[arg(long, default_value = DEFAULT_OUT_DIR, global = true)]
    out_dir: PathBuf,

    /// Users or movies crawled concurrently before each write.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, global = true)]
    batch_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl profiles and vote lists of the listed users.
    Votes {
        /// File with one user id per line.
        #[arg(long)]
        users: PathBuf,

        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: usize,
    },
    /// Crawl movie pages of saved movies that have no details yet.
    Movies,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let start_time = Local::now();
    let cli = Cli::parse();
    let mut config = CrawlConfig {
        base_url: cli.base_url.trim_end_matches('/').to_string(),
        out_dir: cli.out_dir,
        batch_size: cli.batch_size,
        max_pages: DEFAULT_MAX_PAGES,
    };

    match cli.command {
        Command::Votes { users, max_pages } => {
            config.max_pages = max_pages;
            crawl_votes(&config, users).await?;
        }
        Command::Movies => {
            crawl_movies(&config).await?;
        }
    }
    info_time!(start_time, "Full program time:");

    Ok(())
}
