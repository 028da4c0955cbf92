use std::collections::HashMap;

use chrono::Local;
use tracing::debug;

use crate::counter::ErrorCounter;
use crate::model::VoteItem;
use crate::parse::parse_vote_page;
use crate::request::{votes_url, Transport};
use crate::{info_time, Error, Result, START_PAGE};

/// Walks a user's vote list page by page, in order, until it runs out.
///
/// Stops on the first page without items, or as soon as the total announced on the first page
/// has been seen, counting malformed items too. A total that isn't a plain integer is ignored.
/// Any failed fetch aborts the walk and nothing collected so far is returned.
///
/// Items come back in site order (most recent vote first). A url that shows up twice keeps
/// its first position and its last value.
pub async fn walk_votes<T: Transport>(
    transport: &mut T,
    base_url: &str,
    user_id: u64,
    max_pages: usize,
    counter: &mut ErrorCounter,
) -> Result<Vec<VoteItem>> {
    let start_time = Local::now();
    let mut collected: Vec<VoteItem> = Vec::new();
    // Every item node counts towards the announced total, usable or not.
    let mut seen_nodes = 0;
    let mut expected = None;
    let mut page_num = START_PAGE;

    loop {
        if page_num - START_PAGE >= max_pages {
            return Err(Error::PageLimit {
                user_id,
                pages: max_pages,
            });
        }

        let url = votes_url(base_url, user_id, page_num);
        let html = transport.fetch(&url).await?;
        let page = parse_vote_page(&html, counter)?;

        if page_num == START_PAGE {
            expected = page.total_votes();
            debug!(user_id, total = ?page.total, "First vote page");
        }
        if page.item_nodes == 0 {
            break;
        }

        seen_nodes += page.item_nodes;
        collected.extend(page.items);
        if expected.is_some_and(|total| seen_nodes >= total) {
            break;
        }

        transport.set_referer(url);
        page_num += 1;
    }

    info_time!(
        start_time,
        "Walked {} vote pages of user {}, {} votes",
        page_num - START_PAGE + 1,
        user_id,
        collected.len()
    );
    Ok(dedup_by_href(collected))
}

fn dedup_by_href(items: Vec<VoteItem>) -> Vec<VoteItem> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<VoteItem> = Vec::with_capacity(items.len());
    for item in items {
        match index.get(&item.href) {
            Some(&i) => out[i] = item,
            None => {
                index.insert(item.href.clone(), out.len());
                out.push(item);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::tests::{item_html, page_html};
    use crate::request::fake::FakeTransport;

    const BASE: &str = "http://kp.test";

    fn items(from: usize, n: usize) -> Vec<String> {
        (from..from + n)
            .map(|i| item_html(&format!("/film/movie-{i}/"), "7"))
            .collect()
    }

    #[tokio::test]
    async fn stops_when_total_is_reached() {
        let mut transport = FakeTransport::default()
            .with_page(votes_url(BASE, 1, 1), page_html(Some("46"), &items(0, 20)))
            .with_page(votes_url(BASE, 1, 2), page_html(Some("46"), &items(20, 20)))
            .with_page(votes_url(BASE, 1, 3), page_html(Some("46"), &items(40, 6)))
            .with_page(votes_url(BASE, 1, 4), page_html(Some("46"), &items(46, 20)));
        let mut counter = ErrorCounter::new();

        let votes = walk_votes(&mut transport, BASE, 1, 100, &mut counter)
            .await
            .unwrap();

        assert_eq!(votes.len(), 46);
        assert_eq!(transport.requests.len(), 3);
        assert_eq!(votes[0].href, "/film/movie-0/");
        assert_eq!(votes[45].href, "/film/movie-45/");
    }

    #[tokio::test]
    async fn non_numeric_total_walks_until_empty_page() {
        let mut transport = FakeTransport::default()
            .with_page(votes_url(BASE, 2, 1), page_html(Some("?"), &items(0, 20)))
            .with_page(votes_url(BASE, 2, 2), page_html(Some("?"), &items(20, 20)))
            .with_page(votes_url(BASE, 2, 3), page_html(Some("?"), &[]));
        let mut counter = ErrorCounter::new();

        let votes = walk_votes(&mut transport, BASE, 2, 100, &mut counter)
            .await
            .unwrap();

        assert_eq!(votes.len(), 40);
        assert_eq!(transport.requests.len(), 3);
    }

    #[tokio::test]
    async fn referer_points_at_previous_page() {
        let mut transport = FakeTransport::default()
            .with_page(votes_url(BASE, 3, 1), page_html(None, &items(0, 2)))
            .with_page(votes_url(BASE, 3, 2), page_html(None, &[]));

        walk_votes(&mut transport, BASE, 3, 100, &mut ErrorCounter::new())
            .await
            .unwrap();

        assert_eq!(transport.requests[0].1, None);
        assert_eq!(transport.requests[1].1, Some(votes_url(BASE, 3, 1)));
    }

    #[tokio::test]
    async fn failed_fetch_returns_nothing() {
        let mut transport = FakeTransport::default()
            .with_page(votes_url(BASE, 4, 1), page_html(Some("40"), &items(0, 20)));

        let res = walk_votes(&mut transport, BASE, 4, 100, &mut ErrorCounter::new()).await;

        assert!(res.is_err());
        assert_eq!(transport.requests.len(), 2);
    }

    #[tokio::test]
    async fn malformed_items_are_excluded() {
        let mut page = items(0, 2);
        page.push(item_html("/film/broken-9/", "x"));
        let mut transport = FakeTransport::default()
            .with_page(votes_url(BASE, 5, 1), page_html(None, &page))
            .with_page(votes_url(BASE, 5, 2), page_html(None, &[]));
        let mut counter = ErrorCounter::new();

        let votes = walk_votes(&mut transport, BASE, 5, 100, &mut counter)
            .await
            .unwrap();

        assert_eq!(votes.len(), 2);
        assert_eq!(counter.total(), 1);
    }

    #[tokio::test]
    async fn malformed_item_on_last_page_still_counts_towards_total() {
        let mut page = items(0, 2);
        page.push(item_html("/film/broken-9/", "x"));
        let mut transport = FakeTransport::default()
            .with_page(votes_url(BASE, 7, 1), page_html(Some("3"), &page));
        let mut counter = ErrorCounter::new();

        let votes = walk_votes(&mut transport, BASE, 7, 100, &mut counter)
            .await
            .unwrap();

        assert_eq!(votes.len(), 2);
        assert_eq!(transport.requests.len(), 1);
        assert_eq!(counter.total(), 1);
    }

    #[tokio::test]
    async fn page_limit_is_a_hard_failure() {
        let mut transport = FakeTransport::default()
            .with_page(votes_url(BASE, 6, 1), page_html(None, &items(0, 1)))
            .with_page(votes_url(BASE, 6, 2), page_html(None, &items(0, 1)));

        let res = walk_votes(&mut transport, BASE, 6, 2, &mut ErrorCounter::new()).await;

        assert!(matches!(res, Err(Error::PageLimit { user_id: 6, pages: 2 })));
    }

    #[test]
    fn duplicate_href_keeps_first_position() {
        let a = VoteItem {
            href: "/film/a-1/".into(),
            vote: 1,
            ..Default::default()
        };
        let b = VoteItem {
            href: "/film/b-2/".into(),
            vote: 2,
            ..Default::default()
        };
        let a2 = VoteItem { vote: 9, ..a.clone() };

        let out = dedup_by_href(vec![a, b, a2]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].vote, 9);
        assert_eq!(out[1].vote, 2);
    }
}
