//! Document acquisition
//!
//! Fetches and parses HTML from a URL, a file, a reader or a string. Timeouts
//! belong here; the extraction engine never blocks.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use scraper::Html;
use tracing::debug;

use crate::error::{Result, ScrapeError};

/// Where a document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
    /// HTML already in memory
    Markup(String),
}

impl Source {
    /// `http://` and `https://` arguments are URLs, anything else a path
    pub fn from_arg(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            Source::Url(arg.to_string())
        } else {
            Source::File(PathBuf::from(arg))
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("scraperboard/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }
}

/// Blocking document loader
#[derive(Clone)]
pub struct Loader {
    agent: ureq::Agent,
}

impl Loader {
    pub fn new(options: &LoaderOptions) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(Duration::from_secs(options.timeout_secs)))
                .user_agent(options.user_agent.as_str())
                .build(),
        );
        Self { agent }
    }

    pub fn load(&self, source: &Source) -> Result<Html> {
        match source {
            Source::Url(url) => self.fetch(url),
            Source::File(path) => {
                debug!(path = %path.display(), "reading document");
                let html = fs::read_to_string(path)?;
                Ok(Html::parse_document(&html))
            }
            Source::Markup(html) => Ok(Html::parse_document(html)),
        }
    }

    pub fn fetch(&self, url: &str) -> Result<Html> {
        debug!(url, "fetching document");
        let fail = |reason: String| ScrapeError::Fetch {
            url: url.to_string(),
            reason,
        };

        let resp = self.agent.get(url).call().map_err(|e| fail(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(fail(format!("HTTP {}", resp.status())));
        }

        let html = resp
            .into_body()
            .read_to_string()
            .map_err(|e| fail(e.to_string()))?;
        Ok(Html::parse_document(&html))
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(&LoaderOptions::default())
    }
}

/// Parse HTML read from `reader`
pub fn load_reader<R: Read>(mut reader: R) -> Result<Html> {
    let mut html = String::new();
    reader.read_to_string(&mut html)?;
    Ok(Html::parse_document(&html))
}
