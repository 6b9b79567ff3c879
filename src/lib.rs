//! Template-driven HTML extraction
//!
//! A [`Scraper`] template names what to pull out of a page:
//! - `Property`: one scalar per selector, shaped by a filter chain
//! - `ArrayProperty`: one scalar per match
//! - `Each`: one record per matched item, built from nested properties
//!
//! Filters (`first`, `text`, `attr`, `regex`, `parseDate`, ...) are typed and
//! checked as the chain runs. Flow-text rendering (`markdown`) turns a subtree
//! into readable paragraphs, headings and links.
//!
//! Also provides an FFI interface, an HTTP adapter and the `scraperboard` CLI.

pub mod engine;
pub mod error;
pub mod ffi;
pub mod filters;
pub mod http;
pub mod loader;
pub mod markdown;
pub mod selection;
pub mod template;
pub mod value;

pub use engine::Extractor;
pub use error::{ErrorKind, Result, ScrapeError};
pub use ffi::*;
pub use filters::{parse_date, Filter, FilterChain, FilterSpec, Intermediate, Shape};
pub use http::{HttpReply, ScrapeHandler};
pub use loader::{load_reader, Loader, LoaderOptions, Source};
pub use markdown::{markdownify_html, markdownify_reader, render_flow_text};
pub use selection::Selection;
pub use template::{ArrayProperty, Each, Property, Scraper};
pub use value::{Record, Value};
