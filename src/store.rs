use std::fmt::Display;
use std::mem::take;
use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::merge::Batch;
use crate::model::{DedupSet, MovieDetails, MovieRef, UserProfile, VoteEdge};
use crate::{Result, SEP};

pub const USERS_HEADER: &str = "user_id;nickname;gender;country;city;birth_date";
pub const VOTES_HEADER: &str = "user_id;movie_id;vote;date";
pub const MOVIES_HEADER: &str =
    "movie_id;url_path;name_rus;name_eng;rating;rating_count;duration";
pub const MOVIES_EXTENDED_HEADER: &str = "movie_id;url_path;name_rus;name_eng;rating;rating_count;critics_rating;imdb_rating;imdb_rating_count;year;duration;genres;countries";

/* ---------------- Writing ---------------- */

/// Wraps values containing the separator in quotes. Embedded quotes are left alone.
pub fn escape(value: Option<&str>) -> String {
    match value {
        None => String::new(),
        Some(v) if v.contains(SEP) => format!("\"{v}\""),
        Some(v) => v.to_string(),
    }
}

fn join(cells: &[&dyn Display]) -> String {
    let mut line = cells
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(&SEP.to_string());
    line.push('\n');
    line
}

pub fn user_line(u: &UserProfile) -> String {
    join(&[
        &u.user_id,
        &escape(u.nickname.as_deref()),
        &u.gender,
        &escape(u.country.as_deref()),
        &escape(u.city.as_deref()),
        &u.birth_date.format("%Y-%m-%d"),
    ])
}

pub fn vote_line(v: &VoteEdge) -> String {
    join(&[&v.user_id, &v.movie_id, &v.vote, &escape(v.date.as_deref())])
}

pub fn movie_line(m: &MovieRef) -> String {
    join(&[
        &m.id,
        &escape(Some(&m.href)),
        &escape(m.name_rus.as_deref()),
        &escape(m.name_eng.as_deref()),
        &format!("{:?}", m.rating),
        &m.rating_count,
        &escape(m.duration.as_deref()),
    ])
}

pub fn movie_details_line(m: &MovieDetails) -> String {
    join(&[
        &m.id,
        &escape(Some(&m.href)),
        &escape(Some(&m.name_rus)),
        &escape(Some(&m.name_eng)),
        &format!("{:?}", m.rating),
        &m.rating_count,
        &m.critics_rating,
        &format!("{:?}", m.imdb_rating),
        &m.imdb_rating_count,
        &m.year,
        &m.duration,
        &escape(Some(&m.genres.join(","))),
        &escape(Some(&m.countries.join(","))),
    ])
}

/// Opens a store for appending, writing the header if the file is new or empty.
pub async fn open_store(path: &Path, header: &str) -> Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    if file.metadata().await?.len() == 0 {
        file.write_all(format!("{header}\n").as_bytes()).await?;
        file.flush().await?;
    }
    Ok(file)
}

/// The three append-only stores of a vote crawl.
pub struct VoteStores {
    users: File,
    votes: File,
    movies: File,
}

impl VoteStores {
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        Ok(Self {
            users: open_store(&dir.join(crate::USERS_FILE), USERS_HEADER).await?,
            votes: open_store(&dir.join(crate::VOTES_FILE), VOTES_HEADER).await?,
            movies: open_store(&dir.join(crate::MOVIES_FILE), MOVIES_HEADER).await?,
        })
    }

    /// Appends the batch. A movie id enters `saved` as soon as its line is written.
    /// A movie that is already in `saved` is not written again.
    pub async fn write_batch(&mut self, batch: &Batch, saved: &mut DedupSet) -> Result<()> {
        for user in &batch.users {
            self.users.write_all(user_line(user).as_bytes()).await?;
        }
        for vote in &batch.votes {
            self.votes.write_all(vote_line(vote).as_bytes()).await?;
        }
        for movie in &batch.movies {
            if saved.contains(movie.id) {
                continue;
            }
            self.movies.write_all(movie_line(movie).as_bytes()).await?;
            saved.insert(movie.id);
        }
        self.users.flush().await?;
        self.votes.flush().await?;
        self.movies.flush().await?;
        Ok(())
    }
}

/* ---------------- Reading ---------------- */

/// Splits one store line. `"` toggles quoting, quoted separators belong to the value.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    for ch in line.trim_end_matches(['\r', '\n']).chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == SEP && !in_quotes => fields.push(take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}
