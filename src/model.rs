//! Records flowing between the walker, the merger and the stores.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;

use crate::error::FieldError;

pub const UNKNOWN_RATING: f64 = -1.0;
pub const UNKNOWN_COUNT: i64 = -1;

/// Fallback for users that don't publish their birthday.
pub fn unknown_birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// One entry of a user's vote list, as far as it could be recovered.
/// `href` and `vote` are always present, everything else is best effort.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VoteItem {
    pub href: String,
    pub vote: u8,
    pub name_rus: Option<String>,
    pub name_eng: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub duration: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: u64,
    pub nickname: Option<String>,
    pub gender: Gender,
    pub country: Option<String>,
    pub city: Option<String>,
    pub birth_date: NaiveDate,
}

impl UserProfile {
    pub fn unknown(user_id: u64) -> Self {
        Self {
            user_id,
            nickname: None,
            gender: Gender::Unknown,
            country: None,
            city: None,
            birth_date: unknown_birth_date(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteEdge {
    pub user_id: u64,
    pub movie_id: u64,
    pub vote: u8,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovieRef {
    pub id: u64,
    pub href: String,
    pub name_rus: Option<String>,
    pub name_eng: Option<String>,
    pub rating: f64,
    pub rating_count: i64,
    pub duration: Option<String>,
}

impl MovieRef {
    pub fn from_item(id: u64, item: &VoteItem) -> Self {
        Self {
            id,
            href: item.href.clone(),
            name_rus: item.name_rus.clone(),
            name_eng: item.name_eng.clone(),
            rating: item.rating.unwrap_or(UNKNOWN_RATING),
            rating_count: item.rating_count.unwrap_or(UNKNOWN_COUNT),
            duration: item.duration.clone(),
        }
    }
}

/// Everything the movie page itself tells about a movie.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieDetails {
    pub id: u64,
    pub href: String,
    pub name_rus: String,
    pub name_eng: String,
    pub rating: f64,
    pub rating_count: i64,
    pub critics_rating: i64,
    pub imdb_rating: f64,
    pub imdb_rating_count: i64,
    pub year: i32,
    /// Minutes, -1 when unknown.
    pub duration: i64,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
}

impl MovieDetails {
    pub fn unknown(id: u64, href: &str) -> Self {
        Self {
            id,
            href: href.to_string(),
            name_rus: String::new(),
            name_eng: String::new(),
            rating: UNKNOWN_RATING,
            rating_count: UNKNOWN_COUNT,
            critics_rating: UNKNOWN_COUNT,
            imdb_rating: UNKNOWN_RATING,
            imdb_rating_count: 0,
            year: 1900,
            duration: UNKNOWN_COUNT,
            genres: Vec::new(),
            countries: Vec::new(),
        }
    }
}

/// Ids of movies that already have a line in the movies store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DedupSet(HashSet<u64>);

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.0.contains(&id)
    }

    pub fn insert(&mut self, id: u64) -> bool {
        self.0.insert(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<u64> for DedupSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// `/film/vam-i-ne-snilos-1980-45660/` -> `45660`.
pub fn movie_id_from_href(href: &str) -> Result<u64, FieldError> {
    let slug = href
        .rsplit('/')
        .nth(1)
        .ok_or(FieldError::NoMatch(href.to_string()))?;
    let token = slug.rsplit('-').next().unwrap_or(slug);
    token
        .parse()
        .map_err(|_| FieldError::NotANumber(token.to_string()))
}

/// Parses a number rendered with spaces between thousands groups ("46 370").
pub fn parse_spaced<T: std::str::FromStr>(text: &str) -> Result<T, FieldError> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    digits
        .parse()
        .map_err(|_| FieldError::NotANumber(text.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_id_is_trailing_number() {
        let href = "/film/vam-i-ne-snilos-1980-45660/";
        assert_eq!(movie_id_from_href(href), Ok(45660));
        assert_eq!(movie_id_from_href(href), movie_id_from_href(href));
        assert_eq!(movie_id_from_href("/film/326/"), Ok(326));
    }

    #[test]
    fn movie_id_rejects_garbage() {
        assert!(movie_id_from_href("/film/no-id-here/").is_err());
        assert!(movie_id_from_href("").is_err());
    }

    #[test]
    fn spaced_numbers() {
        assert_eq!(parse_spaced::<i64>("46 370"), Ok(46370));
        assert_eq!(parse_spaced::<i64>("1\u{a0}234\u{a0}567"), Ok(1234567));
        assert!(parse_spaced::<i64>("n/a").is_err());
    }

    #[test]
    fn sentinels() {
        let item = VoteItem {
            href: "/film/x-1/".into(),
            vote: 5,
            ..Default::default()
        };
        let movie = MovieRef::from_item(1, &item);
        assert_eq!(movie.rating, -1.0);
        assert_eq!(movie.rating_count, -1);
        assert_eq!(
            UserProfile::unknown(3).birth_date,
            NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()
        );
    }
}
