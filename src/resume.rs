use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;

use crate::model::DedupSet;
use crate::store::split_record;
use crate::{Error, Result};

/// What earlier runs already wrote.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResumeState {
    pub crawled_users: HashSet<u64>,
    pub saved_movies: DedupSet,
    pub movie_pairs: HashSet<(u64, String)>,
}

impl ResumeState {
    pub async fn load(dir: &Path) -> Result<Self> {
        let crawled_users = load_user_ids(&dir.join(crate::USERS_FILE)).await?;
        let movie_pairs = load_movie_pairs(&dir.join(crate::MOVIES_FILE)).await?;
        let saved_movies = movie_pairs.iter().map(|(id, _)| *id).collect();
        Ok(Self {
            crawled_users,
            saved_movies,
            movie_pairs,
        })
    }
}

/// Data rows of a store, header skipped. A missing store has no rows.
async fn read_rows(path: &Path) -> Result<Vec<(usize, Vec<String>)>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    Ok(text
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, split_record(line)))
        .collect())
}

fn parse_id(path: &Path, line: usize, cell: Option<&String>) -> Result<u64> {
    let cell = cell.map(|c| c.trim()).unwrap_or_default();
    cell.parse().map_err(|_| Error::InvalidStoreRow {
        path: path.to_path_buf(),
        line,
        reason: format!("id {cell:?} is not a number"),
    })
}

pub async fn load_user_ids(path: &Path) -> Result<HashSet<u64>> {
    read_rows(path)
        .await?
        .into_iter()
        .map(|(line, row)| parse_id(path, line, row.first()))
        .collect()
}

/// `(movie_id, url_path)` pairs of the movies or extended movies store.
pub async fn load_movie_pairs(path: &Path) -> Result<HashSet<(u64, String)>> {
    read_rows(path)
        .await?
        .into_iter()
        .map(|(line, row)| {
            let id = parse_id(path, line, row.first())?;
            Ok((id, row.get(1).cloned().unwrap_or_default()))
        })
        .collect()
}

/// Reads the list of users to crawl, one id per line. Repeated ids keep their first position.
pub async fn read_user_list(path: &Path) -> Result<Vec<u64>> {
    let text = tokio::fs::read_to_string(path).await?;
    let mut seen = HashSet::new();
    let mut users = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let id = parse_id(path, i + 1, Some(&line.to_string()))?;
        if seen.insert(id) {
            users.push(id);
        }
    }
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MOVIES_HEADER, USERS_HEADER};

    #[tokio::test]
    async fn missing_stores_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = ResumeState::load(dir.path()).await.unwrap();
        assert_eq!(state, ResumeState::default());
    }

    #[tokio::test]
    async fn loads_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join(crate::USERS_FILE),
            format!("{USERS_HEADER}\n5;\"a;b\";male;;;1900-01-01\n\n6;;unknown;;;1900-01-01\n"),
        )
        .await
        .unwrap();
        tokio::fs::write(
            dir.path().join(crate::MOVIES_FILE),
            format!("{MOVIES_HEADER}\n10;/film/a-10/;\"x;y\";;-1.0;-1;\n20;/film/b-20/;;;7.5;100;\n"),
        )
        .await
        .unwrap();

        let first = ResumeState::load(dir.path()).await.unwrap();
        let second = ResumeState::load(dir.path()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.crawled_users, HashSet::from([5, 6]));
        assert!(first.saved_movies.contains(10) && first.saved_movies.contains(20));
        assert_eq!(first.saved_movies.len(), 2);
        assert!(first.movie_pairs.contains(&(10, "/film/a-10/".to_string())));
    }

    #[tokio::test]
    async fn bad_id_names_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        tokio::fs::write(&path, format!("{USERS_HEADER}\n1;;;;;\nabc;;;;;\n"))
            .await
            .unwrap();

        let err = load_user_ids(&path).await.unwrap_err();
        assert!(matches!(err, Error::InvalidStoreRow { line: 3, .. }));
    }

    #[tokio::test]
    async fn user_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        tokio::fs::write(&path, "991122\n\n 4913930 \n").await.unwrap();
        assert_eq!(read_user_list(&path).await.unwrap(), vec![991122, 4913930]);
    }

    #[tokio::test]
    async fn user_list_drops_repeated_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        tokio::fs::write(&path, "3\n1\n3\n2\n1\n").await.unwrap();
        assert_eq!(read_user_list(&path).await.unwrap(), vec![3, 1, 2]);
    }
}
