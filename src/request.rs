use std::future::Future;

use reqwest::{header, Client};

use crate::{info_time, Result};

/// Fetches pages for one crawl unit (a user's walk, a movie page).
/// Every unit owns its own session, so the referer never leaks between users.
pub trait Transport: Send {
    fn fetch(&mut self, url: &str) -> impl Future<Output = Result<String>> + Send;

    /// The page the next request claims to come from.
    fn set_referer(&mut self, url: String);
}

/// `reqwest` backed session with its own cookie jar and referer.
pub struct HttpSession {
    client: Client,
    referer: Option<String>,
}

impl HttpSession {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            referer: None,
        })
    }
}

impl Transport for HttpSession {
    async fn fetch(&mut self, url: &str) -> Result<String> {
        info_time!("Requesting page: {url}");
        let mut req = self.client.get(url);
        if let Some(referer) = &self.referer {
            req = req.header(header::REFERER, referer);
        }
        let res = req.send().await?.error_for_status()?;
        let html = res.text().await?;
        Ok(html)
    }

    fn set_referer(&mut self, url: String) {
        self.referer = Some(url);
    }
}

/// Cookies are kept, the user agent looks like a browser.
fn build_client() -> Result<Client> {
    let client = Client::builder()
        .cookie_store(true)
        .user_agent(crate::USER_AGENT)
        .build()?;
    Ok(client)
}

pub fn user_url(base_url: &str, user_id: u64) -> String {
    format!("{base_url}/user/{user_id}/")
}

pub fn votes_url(base_url: &str, user_id: u64, page: usize) -> String {
    format!("{base_url}/user/{user_id}/votes/list/ord/date/vs/vote/page/{page}/#list")
}

pub fn movie_url(base_url: &str, href: &str) -> String {
    format!("{base_url}{href}")
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;

    use super::Transport;
    use crate::{Error, Result};

    /// Serves canned pages and remembers what was asked, and with which referer.
    #[derive(Default)]
    pub struct FakeTransport {
        pub pages: HashMap<String, String>,
        pub requests: Vec<(String, Option<String>)>,
        referer: Option<String>,
    }

    impl FakeTransport {
        pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
            self.pages.insert(url.into(), html.into());
            self
        }
    }

    impl Transport for FakeTransport {
        async fn fetch(&mut self, url: &str) -> Result<String> {
            self.requests.push((url.to_string(), self.referer.clone()));
            self.pages.get(url).cloned().ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no page for {url}"),
                ))
            })
        }

        fn set_referer(&mut self, url: String) {
            self.referer = Some(url);
        }
    }
}
