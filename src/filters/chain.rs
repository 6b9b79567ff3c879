//! Ordered filter application

use tracing::trace;

use super::{Filter, FilterSpec, Intermediate};
use crate::error::Result;

/// Resolved, ordered sequence of filters
#[derive(Debug, Clone)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    /// Resolve every spec up front, so a bad kind fails wherever it sits in
    /// the chain. An empty list means `[first, text]`.
    pub fn resolve(specs: &[FilterSpec]) -> Result<Self> {
        if specs.is_empty() {
            return Ok(Self::default_chain());
        }

        let filters = specs.iter().map(Filter::resolve).collect::<Result<Vec<_>>>()?;
        Ok(Self { filters })
    }

    pub fn default_chain() -> Self {
        Self {
            filters: vec![Filter::First, Filter::Text],
        }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn run<'a>(&self, input: Intermediate<'a>) -> Result<Intermediate<'a>> {
        self.filters.iter().try_fold(input, |value, filter| {
            let output = filter.run(value)?;
            trace!(filter = filter.name(), shape = output.shape().name(), "filter applied");
            Ok(output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ScrapeError};
    use crate::selection::Selection;
    use scraper::Html;

    const PAGE: &str = r#"
    <div class="result"><h3><a href="/url?q=https://example.com/&amp;sa=U">Example</a></h3></div>
    <div class="result"><h3><a href="/url?q=https://example.org/&amp;sa=U">Other</a></h3></div>
    "#;

    #[test]
    fn test_empty_chain_is_first_text() {
        let chain = FilterChain::resolve(&[]).unwrap();
        let names: Vec<_> = chain.filters().iter().map(Filter::name).collect();
        assert_eq!(names, vec!["first", "text"]);

        let document = Html::parse_document(PAGE);
        let links = Selection::document(&document).find("h3 a").unwrap();

        let explicit = FilterChain::resolve(&[FilterSpec::new("first", ""), FilterSpec::new("text", "")])
            .unwrap()
            .run(Intermediate::Selection(links.clone()))
            .unwrap()
            .into_value()
            .unwrap();
        let implicit = chain
            .run(Intermediate::Selection(links))
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(implicit, explicit);
        assert_eq!(implicit.as_str(), Some("Example"));
    }

    #[test]
    fn test_chain_runs_left_to_right() {
        let specs = vec![
            FilterSpec::new("last", ""),
            FilterSpec::new("attr", "href"),
            FilterSpec::new("regex", "q=([^&]+)"),
        ];
        let document = Html::parse_document(PAGE);
        let links = Selection::document(&document).find("h3 a").unwrap();

        let value = FilterChain::resolve(&specs)
            .unwrap()
            .run(Intermediate::Selection(links))
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(value.as_str(), Some("https://example.org/"));
    }

    #[test]
    fn test_unknown_filter_fails_at_any_position() {
        for position in 0..3 {
            let mut specs = vec![FilterSpec::new("first", ""), FilterSpec::new("text", "")];
            specs.insert(position, FilterSpec::new("frobnicate", ""));

            let err = FilterChain::resolve(&specs).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            assert!(matches!(&err, ScrapeError::UnknownFilter(kind) if kind == "frobnicate"));
        }
    }

    #[test]
    fn test_failing_step_aborts_chain() {
        let specs = vec![
            FilterSpec::new("text", ""),
            FilterSpec::new("first", ""),
            FilterSpec::new("text", ""),
        ];
        let document = Html::parse_document(PAGE);
        let links = Selection::document(&document).find("a").unwrap();

        let err = FilterChain::resolve(&specs)
            .unwrap()
            .run(Intermediate::Selection(links))
            .unwrap_err();
        assert!(matches!(err, ScrapeError::FilterType { filter: "first", .. }));
    }
}
