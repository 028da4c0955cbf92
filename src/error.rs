use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The selector you are trying to scrape for is missing. Selector: {0}")]
    ParseMissingSelector(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid row in {}:{line}: {reason}", path.display())]
    InvalidStoreRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("User {user_id} still had votes after {pages} pages, giving up.")]
    PageLimit { user_id: u64, pages: usize },
}

/// Why a single field could not be recovered from a node.
/// The `Display` output is what ends up in the `ErrorCounter`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing node: {0}")]
    Missing(&'static str),

    #[error("not a number: {0:?}")]
    NotANumber(String),

    #[error("unexpected text: {0:?}")]
    NoMatch(String),
}
