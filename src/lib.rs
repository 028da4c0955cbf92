//! Resumable crawler for user vote histories and the movies they reference.
//!
//! A vote crawl walks every user's paginated vote list, extracts what it can from each entry
//! and appends users, votes and (at most once per movie) movie metadata to `;`-separated
//! stores. A restarted crawl reads the stores back and carries on where it stopped.

mod error;
mod macros;

pub mod counter;
pub mod merge;
pub mod model;
pub mod movie;
pub mod parse;
pub mod process;
pub mod profile;
pub mod request;
pub mod resume;
pub mod store;
pub mod walk;

pub use error::{Error, FieldError, Result};

pub const BASE_URL: &str = "https://www.kinopoisk.ru";
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";
const START_PAGE: usize = 1;
/// Field separator of every store.
pub const SEP: char = ';';

pub const USERS_FILE: &str = "users.csv";
pub const VOTES_FILE: &str = "votes.csv";
pub const MOVIES_FILE: &str = "movies.csv";
pub const MOVIES_EXTENDED_FILE: &str = "movies_extended.csv";

pub const DEFAULT_OUT_DIR: &str = "data";
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// A user with more pages than this is assumed to be a site loop.
pub const DEFAULT_MAX_PAGES: usize = 1000;
