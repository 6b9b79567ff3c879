//! Template evaluation
//!
//! The extractor walks a [`Scraper`] template against a document. Properties
//! narrow the current selection with their selector and run their filter
//! chain; `Each` repeats its children once per matched item.
//!
//! Inside an `Each`, a field that fails for one item is logged and left out of
//! that item's record. Everywhere else the first error aborts the scrape.
//! Contract violations (wrong value shapes, broken selectors or patterns)
//! always abort.

use std::io::Read;

use scraper::Html;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::error::{ErrorKind, Result, ScrapeError};
use crate::filters::{Filter, FilterChain, FilterSpec, Intermediate};
use crate::loader::{load_reader, Loader, Source};
use crate::selection::Selection;
use crate::template::{ArrayProperty, Each, Property, Scraper};
use crate::value::{Record, Value};

/// Per-instance progress logging, off by default
macro_rules! verbose {
    ($extractor:expr, $($arg:tt)+) => {
        if $extractor.debug {
            debug!($($arg)+);
        }
    };
}

/// Evaluates one template. Cheap to build; holds no document state.
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'t> {
    template: &'t Scraper,
    debug: bool,
}

impl<'t> Extractor<'t> {
    pub fn new(template: &'t Scraper) -> Self {
        Self {
            template,
            debug: false,
        }
    }

    /// Emit debug events for every property, item and array element
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Run the whole template against a parsed document
    pub fn scrape(&self, document: &Html) -> Result<Record> {
        let root = Selection::document(document);
        let scope = match self.template.selector.as_deref() {
            Some(selector) if !selector.is_empty() => root.find(selector)?,
            _ => root,
        };

        let mut record = Record::new();
        for each in &self.template.each {
            let (key, value) = self.each(each, &scope)?;
            record.insert(key, value);
        }
        for property in &self.template.properties {
            let (key, value) = self.property(property, &scope)?;
            record.insert(key, value);
        }
        for property in &self.template.array_properties {
            let (key, value) = self.array_property(property, &scope)?;
            record.insert(key, value);
        }

        match self.template.name.as_deref() {
            Some(name) if !name.is_empty() => {
                let mut wrapped = Record::new();
                wrapped.insert(name.to_string(), Value::Map(record));
                Ok(wrapped)
            }
            _ => Ok(record),
        }
    }

    pub fn scrape_source(&self, source: &Source, loader: &Loader) -> Result<Record> {
        let document = loader.load(source)?;
        self.scrape(&document)
    }

    /// Evaluate a property. No match is a null value, not an error.
    pub fn property(&self, node: &Property, selection: &Selection<'_>) -> Result<(String, Value)> {
        let matches = selection.find(&node.selector)?;
        verbose!(self, property = %node.name, matches = matches.len(), "property matched");

        if matches.is_empty() {
            verbose!(self, selector = %node.selector, "no matches");
            return Ok((node.name.clone(), Value::Null));
        }

        let value = FilterChain::resolve(&node.filters)
            .and_then(|chain| scalar(&chain, matches))
            .map_err(|e| self.report(&node.name, &node.selector, e))?;
        verbose!(self, property = %node.name, value = ?value, "property extracted");

        Ok((node.name.clone(), value))
    }

    /// Evaluate an array property: one scalar per match, in document order
    pub fn array_property(
        &self,
        node: &ArrayProperty,
        selection: &Selection<'_>,
    ) -> Result<(String, Value)> {
        let matches = selection.find(&node.selector)?;
        if matches.is_empty() {
            return Ok((node.name.clone(), Value::List(vec![])));
        }

        let total = matches.len();
        let values = FilterChain::resolve(&node.filters)
            .and_then(|chain| {
                matches
                    .singletons()
                    .enumerate()
                    .map(|(index, item)| {
                        verbose!(self, property = %node.name, index, total, "array element");
                        scalar(&chain, item)
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .map_err(|e| self.report(&node.name, &node.selector, e))?;

        Ok((node.name.clone(), Value::List(values)))
    }

    /// Evaluate an `Each`: one record per matched item
    pub fn each(&self, node: &Each, selection: &Selection<'_>) -> Result<(String, Value)> {
        let items = selection.find(&node.selector)?;
        let mut records = Vec::with_capacity(items.len());

        for (index, item) in items.singletons().enumerate() {
            verbose!(self, each = %node.name, index, "processing item");
            let mut record = Record::new();

            for property in &node.properties {
                let field = self.property(property, &item);
                isolate(&mut record, &node.name, index, &property.name, field)?;
            }
            for property in &node.array_properties {
                let field = self.array_property(property, &item);
                isolate(&mut record, &node.name, index, &property.name, field)?;
            }

            records.push(record);
        }

        Ok((node.name.clone(), Value::Records(records)))
    }

    fn report(&self, property: &str, selector: &str, err: ScrapeError) -> ScrapeError {
        if err.kind() == ErrorKind::FilterType {
            error!(property, selector, error = %err, "filter chain does not fit the extracted data");
        }
        err
    }
}

/// Run a chain over a selection and insist on a scalar result
fn scalar(chain: &FilterChain, input: Selection<'_>) -> Result<Value> {
    chain
        .run(Intermediate::Selection(input))?
        .into_value()
        .map_err(|found| ScrapeError::FilterType {
            filter: chain.filters().last().map_or("chain", Filter::name),
            expected: "a scalar result",
            found: found.name(),
        })
}

/// Keep a field of an `Each` item, or log and drop it
fn isolate(
    record: &mut Record,
    each: &str,
    index: usize,
    field: &str,
    result: Result<(String, Value)>,
) -> Result<()> {
    match result {
        Ok((key, value)) => {
            record.insert(key, value);
            Ok(())
        }
        // FilterType was already reported at the property boundary
        Err(err) if err.kind() == ErrorKind::FilterType => Err(err),
        Err(err) if err.is_contract_violation() => {
            error!(each, index, field, error = %err, "each aborted");
            Err(err)
        }
        Err(err) => {
            warn!(each, index, field, error = %err, "field skipped");
            Ok(())
        }
    }
}

impl Scraper {
    /// Scrape an already parsed document
    pub fn scrape_document(&self, document: &Html) -> Result<Record> {
        Extractor::new(self).scrape(document)
    }

    /// Load `source` with `loader`, then scrape it
    pub fn scrape_source(&self, source: &Source, loader: &Loader) -> Result<Record> {
        Extractor::new(self).scrape_source(source, loader)
    }

    pub fn scrape_reader<R: Read>(&self, reader: R) -> Result<Record> {
        self.scrape_document(&load_reader(reader)?)
    }

    pub fn scrape_url(&self, url: &str) -> Result<Record> {
        self.scrape_source(&Source::Url(url.to_string()), &Loader::default())
    }

    /// Scrape and decode the result into `T`
    pub fn extract_document<T: DeserializeOwned>(&self, document: &Html) -> Result<T> {
        decode(self.scrape_document(document)?)
    }

    pub fn extract_url<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        decode(self.scrape_url(url)?)
    }
}

fn decode<T: DeserializeOwned>(record: Record) -> Result<T> {
    Ok(serde_json::from_value(serde_json::to_value(record)?)?)
}

/// Chain used when a template gives none, exposed for callers building
/// templates in code
pub fn default_filters() -> Vec<FilterSpec> {
    vec![FilterSpec::new("first", ""), FilterSpec::new("text", "")]
}
