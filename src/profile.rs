use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use crate::counter::ErrorCounter;
use crate::error::FieldError;
use crate::model::{Gender, UserProfile};
use crate::parse::{create_selector, own_text};
use crate::request::{user_url, Transport};
use crate::Result;

struct ProfileSelectors {
    nickname: Selector,
    female: Selector,
    male: Selector,
    location: Selector,
}

impl ProfileSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            nickname: create_selector(r#"div.nick_name[itemprop="name"]"#)?,
            female: create_selector("span.sex_female")?,
            male: create_selector("span.sex_male")?,
            location: create_selector(r#"a[itemprop="homeLocation"]"#)?,
        })
    }
}

pub async fn fetch_profile<T: Transport>(
    transport: &mut T,
    base_url: &str,
    user_id: u64,
    counter: &mut ErrorCounter,
) -> Result<UserProfile> {
    let html = transport.fetch(&user_url(base_url, user_id)).await?;
    parse_profile(user_id, &html, counter)
}

/// Reads whatever the user chose to publish. Every field falls back on its own.
pub fn parse_profile(user_id: u64, html: &str, counter: &mut ErrorCounter) -> Result<UserProfile> {
    let sel = ProfileSelectors::new()?;
    let doc = Html::parse_document(html);

    let gender = if doc.select(&sel.female).next().is_some() {
        Gender::Female
    } else if doc.select(&sel.male).next().is_some() {
        Gender::Male
    } else {
        Gender::Unknown
    };

    let nickname = doc
        .select(&sel.nickname)
        .next()
        .map(|el| own_text(el).trim().to_string());
    let location = |part: &str| {
        doc.select(&sel.location).find(|a: &ElementRef| {
            a.value()
                .attr("href")
                .is_some_and(|href| href.contains(&format!("community/{part}")))
        })
    };
    let country = location("country").map(|a| own_text(a).trim().to_string());
    let city = location("city").map(|a| own_text(a).trim().to_string());

    let mut profile = UserProfile {
        nickname,
        gender,
        country,
        city,
        ..UserProfile::unknown(user_id)
    };

    let month_day = location("birth_day")
        .ok_or(FieldError::Missing("community/birth_day"))
        .and_then(|a| birth_month_day(a.value().attr("href").unwrap_or_default()));
    let year = location("birth_year")
        .ok_or(FieldError::Missing("community/birth_year"))
        .and_then(|a| {
            let text = own_text(a);
            text.trim()
                .parse::<i32>()
                .map_err(|_| FieldError::NotANumber(text.trim().to_string()))
        });
    let month_day = counter.absorb("birth_day", month_day);
    let year = counter.absorb("birth_year", year);

    let (month, day) = month_day.unwrap_or((1, 1));
    let year = year.unwrap_or(1900);
    if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
        profile.birth_date = date;
    } else {
        counter.record(
            "birth_date",
            &FieldError::NoMatch(format!("{year}-{month}-{day}")),
        );
    }

    Ok(profile)
}

/// `/community/birth_day/03-21/` -> `(3, 21)`.
fn birth_month_day(href: &str) -> core::result::Result<(u32, u32), FieldError> {
    let part = href
        .rsplit('/')
        .nth(1)
        .ok_or_else(|| FieldError::NoMatch(href.to_string()))?;
    let (month, day) = part
        .split_once('-')
        .ok_or_else(|| FieldError::NoMatch(part.to_string()))?;
    let num = |s: &str| s.parse::<u32>().map_err(|_| FieldError::NotANumber(s.to_string()));
    Ok((num(month)?, num(day)?))
}
