use std::collections::BTreeSet;

use scraper::{ElementRef, Html, Selector};

use crate::counter::ErrorCounter;
use crate::error::FieldError;
use crate::model::{parse_spaced, MovieDetails};
use crate::parse::{create_selector, own_text};
use crate::request::{movie_url, Transport};
use crate::Result;

struct MovieSelectors {
    name_eng: Selector,
    name_rus: Selector,
    rating: Selector,
    rating_count: Selector,
    critics: Selector,
    imdb: Selector,
    info_row: Selector,
    genre: Selector,
    link: Selector,
}

impl MovieSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            name_eng: create_selector(r#"span[itemprop="alternativeHeadline"]"#)?,
            name_rus: create_selector("h1.moviename-big")?,
            rating: create_selector("span.rating_ball")?,
            rating_count: create_selector("span.ratingCount")?,
            critics: create_selector(
                "div.criticsRating div.ratingNum > span.num, div.criticsRatingDouble div.ratingNum > span.num",
            )?,
            imdb: create_selector("div.block_2 > div")?,
            info_row: create_selector("table.info tr")?,
            genre: create_selector(r#"table.info span[itemprop="genre"] a"#)?,
            link: create_selector("a")?,
        })
    }
}

pub async fn fetch_movie<T: Transport>(
    transport: &mut T,
    base_url: &str,
    id: u64,
    href: &str,
    counter: &mut ErrorCounter,
) -> Result<MovieDetails> {
    let html = transport.fetch(&movie_url(base_url, href)).await?;
    parse_movie(id, href, &html, counter)
}

pub fn parse_movie(
    id: u64,
    href: &str,
    html: &str,
    counter: &mut ErrorCounter,
) -> Result<MovieDetails> {
    let sel = MovieSelectors::new()?;
    let doc = Html::parse_document(html);
    let first_text = |s: &Selector, what: &'static str| {
        doc.select(s)
            .next()
            .map(|el| own_text(el).trim().to_string())
            .ok_or(FieldError::Missing(what))
    };

    let mut movie = MovieDetails::unknown(id, href);

    if let Some(name) = counter.absorb("name_eng", first_text(&sel.name_eng, "alternativeHeadline")) {
        movie.name_eng = name;
    }
    if let Some(name) = counter.absorb("name_rus", first_text(&sel.name_rus, "h1.moviename-big")) {
        movie.name_rus = name;
    }
    let rating = first_text(&sel.rating, "span.rating_ball").and_then(|t| parse_spaced(&t));
    if let Some(rating) = counter.absorb("rating", rating) {
        movie.rating = rating;
    }
    let count = first_text(&sel.rating_count, "span.ratingCount").and_then(|t| parse_spaced(&t));
    if let Some(count) = counter.absorb("rating_count", count) {
        movie.rating_count = count;
    }
    let critics = first_text(&sel.critics, "criticsRating span.num").and_then(|t| parse_spaced(&t));
    if let Some(critics) = counter.absorb("critics_rating", critics) {
        movie.critics_rating = critics;
    }

    let imdb = doc
        .select(&sel.imdb)
        .map(own_text)
        .find(|t| t.contains("IMDb:"))
        .ok_or(FieldError::Missing("IMDb block"))
        .and_then(|t| imdb_rating(&t));
    if let Some((rating, count)) = counter.absorb("imdb_rating", imdb) {
        movie.imdb_rating = rating;
        movie.imdb_rating_count = count;
    }

    let year = info_value(&doc, &sel, "год")
        .and_then(|td| td.select(&sel.link).next())
        .ok_or(FieldError::Missing("year row"))
        .and_then(|a| parse_spaced(&own_text(a)));
    if let Some(year) = counter.absorb("year", year) {
        movie.year = year;
    }

    let duration = info_value(&doc, &sel, "время")
        .ok_or(FieldError::Missing("duration row"))
        .and_then(|td| {
            let text = own_text(td);
            let minutes = text.split_whitespace().next().unwrap_or_default();
            minutes
                .parse::<i64>()
                .map_err(|_| FieldError::NotANumber(text.trim().to_string()))
        });
    if let Some(duration) = counter.absorb("duration", duration) {
        movie.duration = duration;
    }

    movie.genres = doc
        .select(&sel.genre)
        .map(|a| own_text(a).trim().to_string())
        .filter(|g| !g.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    movie.countries = info_value(&doc, &sel, "страна")
        .map(|td| {
            td.select(&sel.link)
                .map(|a| own_text(a).trim().to_string())
                .filter(|c| !c.is_empty())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
        .unwrap_or_default();

    Ok(movie)
}

/// The cell following the `td.type` cell whose label contains `label`.
fn info_value<'a>(doc: &'a Html, sel: &MovieSelectors, label: &str) -> Option<ElementRef<'a>> {
    doc.select(&sel.info_row).find_map(|row| {
        let mut cells = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| c.value().name() == "td");
        cells.find(|td| td.value().attr("class") == Some("type") && own_text(*td).contains(label))?;
        cells.next()
    })
}

/// `IMDb: 7.50 (1 234)` -> `(7.5, 1234)`.
fn imdb_rating(text: &str) -> core::result::Result<(f64, i64), FieldError> {
    let no_match = || FieldError::NoMatch(text.trim().to_string());
    let rating = text.split_whitespace().nth(1).ok_or_else(no_match)?;
    let rating = rating
        .parse()
        .map_err(|_| FieldError::NotANumber(rating.to_string()))?;
    let (_, count) = text.split_once('(').ok_or_else(no_match)?;
    let count = parse_spaced(&count.replace(')', ""))?;
    Ok((rating, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <h1 class="moviename-big">Вам и не снилось...</h1>
        <span itemprop="alternativeHeadline">Not in your dreams</span>
        <span class="rating_ball">8.191</span>
        <span class="ratingCount">46&nbsp;370</span>
        <div class="criticsRating"><div class="ratingNum"><span class="num">80</span></div></div>
        <div class="block_2"><div>IMDb: 7.50 (1 234)</div></div>
        <table class="info">
            <tr><td class="type">год</td><td><div><a href="/lists/m_act[year]/1980/">1980</a></div></td></tr>
            <tr><td class="type">страна</td><td><div><a href="/c/1/">СССР</a></div></td></tr>
            <tr><td class="type">жанр</td><td><span itemprop="genre"><a href="/g/1/">мелодрама</a>, <a href="/g/2/">драма</a></span></td></tr>
            <tr><td class="type">время</td><td class="time">86 мин.<br>01:26</td></tr>
        </table>
    </body></html>"#;

    #[test]
    fn full_movie_page() {
        let mut counter = ErrorCounter::new();
        let movie = parse_movie(45660, "/film/x-45660/", PAGE, &mut counter).unwrap();

        assert!(counter.is_empty(), "{counter:?}");
        assert_eq!(movie.name_rus, "Вам и не снилось...");
        assert_eq!(movie.name_eng, "Not in your dreams");
        assert_eq!(movie.rating, 8.191);
        assert_eq!(movie.rating_count, 46370);
        assert_eq!(movie.critics_rating, 80);
        assert_eq!((movie.imdb_rating, movie.imdb_rating_count), (7.5, 1234));
        assert_eq!(movie.year, 1980);
        assert_eq!(movie.duration, 86);
        assert_eq!(movie.genres, vec!["драма", "мелодрама"]);
        assert_eq!(movie.countries, vec!["СССР"]);
    }

    #[test]
    fn empty_page_keeps_sentinels() {
        let mut counter = ErrorCounter::new();
        let movie = parse_movie(1, "/film/x-1/", "<html></html>", &mut counter).unwrap();

        assert_eq!(movie, MovieDetails::unknown(1, "/film/x-1/"));
        assert!(counter.total() > 0);
    }
}
