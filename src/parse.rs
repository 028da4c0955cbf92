use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::counter::ErrorCounter;
use crate::error::FieldError;
use crate::model::{parse_spaced, VoteItem};
use crate::{Error, Result};

/// Key under which unusable items (no href or no vote) are counted.
pub const REQUIRED_FIELDS: &str = "href+vote";

/// What one vote list page yielded.
#[derive(Debug, Default)]
pub struct VotePage {
    /// Number of item nodes on the page, usable or not.
    pub item_nodes: usize,
    pub items: Vec<VoteItem>,
    /// Raw text after "из" in the "1—50 из 46" indicator.
    pub total: Option<String>,
}

impl VotePage {
    /// The indicator, if it is a plain integer.
    pub fn total_votes(&self) -> Option<usize> {
        let total = self.total.as_deref()?;
        if !total.is_empty() && total.chars().all(|c| c.is_ascii_digit()) {
            total.parse().ok()
        } else {
            None
        }
    }
}

/// Selectors and patterns used on a vote list page.
pub(crate) struct VoteSelectors {
    item: Selector,
    pages_from_to: Selector,
    count_votes: Regex,
}

impl VoteSelectors {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            item: create_selector("div.profileFilmsList div.item")?,
            pages_from_to: create_selector("div.pagesFromTo")?,
            count_votes: Regex::new(r"^\((\d[\d\s]*)\)$")
                .map_err(|_| Error::ParseMissingSelector("count votes pattern".into()))?,
        })
    }
}

/// Parses a whole vote list page. Html isn't `Send`, so it never outlives this call.
pub fn parse_vote_page(html: &str, counter: &mut ErrorCounter) -> Result<VotePage> {
    let sel = VoteSelectors::new()?;
    let doc = Html::parse_document(html);

    let total = doc
        .select(&sel.pages_from_to)
        .next()
        .and_then(|el| own_text(el).split("из").nth(1).map(|s| s.trim().to_string()));

    let mut page = VotePage {
        total,
        ..Default::default()
    };
    for node in doc.select(&sel.item) {
        page.item_nodes += 1;
        if let Some(item) = extract_item(node, &sel, counter) {
            page.items.push(item);
        }
    }
    Ok(page)
}

/// Recovers everything it can from one item node.
/// Returns `None` only when the href or the vote is unusable.
pub(crate) fn extract_item(
    film: ElementRef<'_>,
    sel: &VoteSelectors,
    counter: &mut ErrorCounter,
) -> Option<VoteItem> {
    let (info, href, vote) = match required_fields(film) {
        Ok(required) => required,
        Err(err) => {
            counter.record(REQUIRED_FIELDS, &err);
            return None;
        }
    };

    let rating_spans: Vec<(String, bool)> = child(info, "div", "rating")
        .map(|rating| {
            children(rating, "span", "text-grey")
                .map(|span| {
                    let text = own_text(span).trim().to_string();
                    let parenthesized = text.contains('(') && text.contains(')');
                    (text, parenthesized)
                })
                .collect()
        })
        .unwrap_or_default();

    Some(VoteItem {
        href,
        vote,
        name_eng: counter.absorb("name_eng", name_eng(info)),
        name_rus: counter.absorb("name_rus", name_rus(info)),
        rating: counter.absorb("rating", rating(info)),
        rating_count: counter.absorb("count_votes", count_votes(&rating_spans, &sel.count_votes)),
        duration: counter.absorb("duration", duration(&rating_spans)),
        date: counter.absorb("date", date(film)),
    })
}

fn required_fields(film: ElementRef<'_>) -> core::result::Result<(ElementRef<'_>, String, u8), FieldError> {
    let info = child(film, "div", "info").ok_or(FieldError::Missing("div.info"))?;
    let href = child(info, "div", "nameRus")
        .and_then(|name| child_tag(name, "a"))
        .and_then(|a| a.value().attr("href"))
        .ok_or(FieldError::Missing("div.nameRus > a[href]"))?
        .trim()
        .to_string();
    let vote_text = child(film, "div", "vote").ok_or(FieldError::Missing("div.vote"))?;
    let vote_text = own_text(vote_text);
    let vote: u8 = vote_text
        .trim()
        .parse()
        .map_err(|_| FieldError::NotANumber(vote_text.trim().to_string()))?;
    if !(1..=10).contains(&vote) {
        return Err(FieldError::NoMatch(vote.to_string()));
    }
    Ok((info, href, vote))
}

fn name_eng(info: ElementRef<'_>) -> core::result::Result<String, FieldError> {
    child(info, "div", "nameEng")
        .map(|el| own_text(el).trim().to_string())
        .ok_or(FieldError::Missing("div.nameEng"))
}

fn name_rus(info: ElementRef<'_>) -> core::result::Result<String, FieldError> {
    child(info, "div", "nameRus")
        .and_then(|name| child_tag(name, "a"))
        .map(|a| own_text(a).trim().to_string())
        .ok_or(FieldError::Missing("div.nameRus > a"))
}

fn rating(info: ElementRef<'_>) -> core::result::Result<f64, FieldError> {
    let b = child(info, "div", "rating")
        .and_then(|rating| child_tag(rating, "b"))
        .ok_or(FieldError::Missing("div.rating > b"))?;
    parse_spaced(&own_text(b))
}

fn count_votes(spans: &[(String, bool)], pattern: &Regex) -> core::result::Result<i64, FieldError> {
    let text = spans
        .iter()
        .find(|(_, parenthesized)| *parenthesized)
        .map(|(text, _)| text)
        .ok_or(FieldError::Missing("span.text-grey (count)"))?;
    let caps = pattern
        .captures(text)
        .ok_or_else(|| FieldError::NoMatch(text.clone()))?;
    parse_spaced(&caps[1])
}

fn duration(spans: &[(String, bool)]) -> core::result::Result<String, FieldError> {
    spans
        .iter()
        .find(|(_, parenthesized)| !*parenthesized)
        .map(|(text, _)| text.clone())
        .ok_or(FieldError::Missing("span.text-grey (duration)"))
}

fn date(film: ElementRef<'_>) -> core::result::Result<String, FieldError> {
    child(film, "div", "date")
        .map(|el| own_text(el).trim().to_string())
        .ok_or(FieldError::Missing("div.date"))
}

/* ---------------- Document query helpers ---------------- */

#[inline]
pub(crate) fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseMissingSelector(sel_str.into()))
}

/// Direct children with this tag and exactly this class attribute.
pub(crate) fn children<'a>(
    el: ElementRef<'a>,
    tag: &'a str,
    class: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |c| c.value().name() == tag && c.value().attr("class") == Some(class))
}

pub(crate) fn child<'a>(el: ElementRef<'a>, tag: &'a str, class: &'a str) -> Option<ElementRef<'a>> {
    children(el, tag, class).next()
}

pub(crate) fn child_tag<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .find(|c| c.value().name() == tag)
}

/// Text of the element's own text nodes, ignoring nested elements.
pub(crate) fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .collect()
}
