use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Local;
use tokio::{io::AsyncWriteExt, task::JoinSet};
use tracing::warn;

use crate::counter::ErrorCounter;
use crate::merge::merge_batch;
use crate::model::{MovieDetails, UserProfile, VoteItem};
use crate::movie::fetch_movie;
use crate::profile::fetch_profile;
use crate::request::{HttpSession, Transport};
use crate::resume::{load_movie_pairs, read_user_list, ResumeState};
use crate::store::{movie_details_line, open_store, VoteStores, MOVIES_EXTENDED_HEADER};
use crate::walk::walk_votes;
use crate::{info_time, Result, MOVIES_EXTENDED_FILE, MOVIES_FILE};

/// Settings shared by both crawls.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: String,
    pub out_dir: PathBuf,
    /// Users (or movies) crawled concurrently, then persisted together.
    pub batch_size: usize,
    pub max_pages: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlStats {
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Crawls profiles and vote histories for every listed user not crawled before.
pub async fn crawl_votes(config: &CrawlConfig, users_file: PathBuf) -> Result<CrawlStats> {
    crawl_votes_with(config, users_file, HttpSession::new).await
}

/// Same as `crawl_votes`, with a session factory: one fresh session per user.
pub async fn crawl_votes_with<T, F>(
    config: &CrawlConfig,
    users_file: PathBuf,
    new_session: F,
) -> Result<CrawlStats>
where
    T: Transport + 'static,
    F: Fn() -> Result<T>,
{
    let start_time = Local::now();
    let mut resume = ResumeState::load(&config.out_dir).await?;
    let users = read_user_list(&users_file).await?;
    let total = users.len();
    let pending: Vec<u64> = users
        .into_iter()
        .filter(|id| !resume.crawled_users.contains(id))
        .collect();
    info_time!(
        "{} users listed, {} pending, {} movies already saved",
        total,
        pending.len(),
        resume.saved_movies.len()
    );

    let mut stats = CrawlStats {
        skipped: total - pending.len(),
        ..Default::default()
    };
    let mut stores = VoteStores::open(&config.out_dir).await?;
    let mut counter = ErrorCounter::new();

    for (batch_n, chunk) in pending.chunks(config.batch_size.max(1)).enumerate() {
        let batch_time = Local::now();
        let mut tasks = JoinSet::new();
        for &user_id in chunk {
            let mut session = new_session()?;
            let base_url = config.base_url.clone();
            let max_pages = config.max_pages;
            tasks.spawn(async move {
                let mut counter = ErrorCounter::new();
                let res = crawl_user(&mut session, &base_url, user_id, max_pages, &mut counter).await;
                (user_id, res, counter)
            });
        }

        let mut results: HashMap<u64, (UserProfile, Vec<VoteItem>)> = HashMap::new();
        while let Some(task) = tasks.join_next().await {
            let (user_id, res, user_counter) = task?;
            counter.merge(user_counter);
            match res {
                Ok(crawled) => {
                    results.insert(user_id, crawled);
                }
                Err(err) => {
                    warn!(user_id, "Skipping user: {err}");
                    stats.failed += 1;
                }
            }
        }

        // Persist in list order, whatever order the tasks finished in.
        let crawled: Vec<_> = chunk.iter().filter_map(|id| results.remove(id)).collect();
        stats.done += crawled.len();
        let batch = merge_batch(crawled, &resume.saved_movies, &mut counter);
        stores.write_batch(&batch, &mut resume.saved_movies).await?;
        info_time!(
            batch_time,
            "Batch {}: {} users, {} votes, {} new movies",
            batch_n,
            batch.users.len(),
            batch.votes.len(),
            batch.movies.len()
        );
    }

    counter.log_summary();
    info_time!(
        start_time,
        "Vote crawl done: {} crawled, {} skipped, {} failed",
        stats.done,
        stats.skipped,
        stats.failed
    );
    Ok(stats)
}

async fn crawl_user<T: Transport>(
    session: &mut T,
    base_url: &str,
    user_id: u64,
    max_pages: usize,
    counter: &mut ErrorCounter,
) -> Result<(UserProfile, Vec<VoteItem>)> {
    let profile = fetch_profile(session, base_url, user_id, counter).await?;
    let votes = walk_votes(session, base_url, user_id, max_pages, counter).await?;
    Ok((profile, votes))
}

/// Fetches movie pages for every saved movie that has no extended record yet.
pub async fn crawl_movies(config: &CrawlConfig) -> Result<CrawlStats> {
    crawl_movies_with(config, HttpSession::new).await
}

pub async fn crawl_movies_with<T, F>(config: &CrawlConfig, new_session: F) -> Result<CrawlStats>
where
    T: Transport + 'static,
    F: Fn() -> Result<T>,
{
    let start_time = Local::now();
    let extended_path = config.out_dir.join(MOVIES_EXTENDED_FILE);
    let known = load_movie_pairs(&config.out_dir.join(MOVIES_FILE)).await?;
    let done = load_movie_pairs(&extended_path).await?;
    let total = known.len();
    let mut pending: Vec<(u64, String)> = known.difference(&done).cloned().collect();
    pending.sort_unstable();
    info_time!("{} movies saved, {} without details", total, pending.len());

    let mut stats = CrawlStats {
        skipped: total - pending.len(),
        ..Default::default()
    };
    tokio::fs::create_dir_all(&config.out_dir).await?;
    let mut store = open_store(&extended_path, MOVIES_EXTENDED_HEADER).await?;
    let mut counter = ErrorCounter::new();

    for chunk in pending.chunks(config.batch_size.max(1)) {
        let mut tasks = JoinSet::new();
        for (id, href) in chunk.iter().cloned() {
            let mut session = new_session()?;
            let base_url = config.base_url.clone();
            tasks.spawn(async move {
                let mut counter = ErrorCounter::new();
                let res = fetch_movie(&mut session, &base_url, id, &href, &mut counter).await;
                (id, res, counter)
            });
        }

        let mut results: HashMap<u64, MovieDetails> = HashMap::new();
        while let Some(task) = tasks.join_next().await {
            let (id, res, movie_counter) = task?;
            counter.merge(movie_counter);
            match res {
                Ok(movie) => {
                    results.insert(id, movie);
                }
                Err(err) => {
                    warn!(movie_id = id, "Skipping movie: {err}");
                    stats.failed += 1;
                }
            }
        }

        for (id, _) in chunk {
            if let Some(movie) = results.remove(id) {
                store.write_all(movie_details_line(&movie).as_bytes()).await?;
                stats.done += 1;
            }
        }
        store.flush().await?;
    }

    counter.log_summary();
    info_time!(
        start_time,
        "Movie crawl done: {} fetched, {} skipped, {} failed",
        stats.done,
        stats.skipped,
        stats.failed
    );
    Ok(stats)
}
