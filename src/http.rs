//! HTTP adapter
//!
//! Maps an incoming request URL to the page that should be scraped, scrapes it
//! and builds the reply. The adapter is server-agnostic: plug `handle` into
//! whatever accepts requests and write the returned status, content type and
//! body back out.

use tracing::{info, warn};
use url::Url;

use crate::error::Result;
use crate::loader::{Loader, Source};
use crate::template::Scraper;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpReply {
    fn json(body: String) -> Self {
        Self {
            status: 200,
            content_type: JSON_CONTENT_TYPE,
            body,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            status: 500,
            content_type: TEXT_CONTENT_TYPE,
            body: message,
        }
    }
}

/// Exposes a template as a JSON endpoint
pub struct ScrapeHandler<F> {
    scraper: Scraper,
    loader: Loader,
    target: F,
}

impl<F> ScrapeHandler<F>
where
    F: Fn(&Url) -> String,
{
    /// `target` picks the page to scrape for each request, e.g. from a query
    /// parameter. URLs are fetched; anything else is read as a file path.
    pub fn new(scraper: Scraper, loader: Loader, target: F) -> Self {
        Self {
            scraper,
            loader,
            target,
        }
    }

    pub fn handle(&self, request: &Url) -> HttpReply {
        let target = (self.target)(request);
        info!(request = %request, target = %target, "scrape requested");

        match self.scrape(&target) {
            Ok(body) => HttpReply::json(body),
            Err(err) => {
                warn!(target = %target, error = %err, "scrape failed");
                HttpReply::failure(err.to_string())
            }
        }
    }

    fn scrape(&self, target: &str) -> Result<String> {
        let record = self
            .scraper
            .scrape_source(&Source::from_arg(target), &self.loader)?;
        Ok(serde_json::to_string(&record)?)
    }
}
