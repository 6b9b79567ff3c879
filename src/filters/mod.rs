//! Filters shape the values extracted by a template property
//!
//! A filter takes one typed intermediate value and produces another. Filters
//! are written in templates by name (`FilterSpec`) and resolved to a typed
//! [`Filter`] only when a chain runs.

mod chain;
mod date;

pub use chain::*;
pub use date::parse_date;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::markdown::render_flow_text;
use crate::selection::Selection;
use crate::value::Value;

/// Filter as written in a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Filter name: first, last, text, markdown, attr, exists, html,
    /// queryParameter, regex, stringf, parseDate
    pub kind: String,
    /// Meaning depends on the kind; ignored by argument-less filters
    pub argument: String,
}

impl FilterSpec {
    pub fn new(kind: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            argument: argument.into(),
        }
    }
}

/// Value flowing between filters
#[derive(Debug, Clone)]
pub enum Intermediate<'a> {
    Selection(Selection<'a>),
    Text(String),
    Date(DateTime<FixedOffset>),
    /// A filter found nothing (e.g. a regex without a match)
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Selection,
    Text,
    Date,
    Absent,
}

impl Shape {
    pub fn name(self) -> &'static str {
        match self {
            Shape::Selection => "selection",
            Shape::Text => "text",
            Shape::Date => "date",
            Shape::Absent => "absent",
        }
    }
}

impl<'a> Intermediate<'a> {
    pub fn shape(&self) -> Shape {
        match self {
            Intermediate::Selection(_) => Shape::Selection,
            Intermediate::Text(_) => Shape::Text,
            Intermediate::Date(_) => Shape::Date,
            Intermediate::Absent => Shape::Absent,
        }
    }

    /// Convert a finished chain into a scalar result. Selections are not
    /// scalars and come back as `Err` with their shape.
    pub fn into_value(self) -> std::result::Result<Value, Shape> {
        match self {
            Intermediate::Text(text) => Ok(Value::String(text)),
            Intermediate::Date(date) => Ok(Value::DateTime(date)),
            Intermediate::Absent => Ok(Value::Null),
            Intermediate::Selection(_) => Err(Shape::Selection),
        }
    }
}

/// Resolved filter
#[derive(Debug, Clone)]
pub enum Filter {
    First,
    Last,
    Text,
    Markdown,
    Attr(String),
    Exists,
    Html,
    QueryParameter(String),
    Regex(Regex),
    Stringf(String),
    ParseDate(String),
}

impl Filter {
    /// Resolve a template filter. Unknown kinds and bad patterns are
    /// configuration errors.
    pub fn resolve(spec: &FilterSpec) -> Result<Self> {
        let filter = match spec.kind.as_str() {
            "first" => Filter::First,
            "last" => Filter::Last,
            "text" => Filter::Text,
            "markdown" => Filter::Markdown,
            "attr" => Filter::Attr(spec.argument.clone()),
            "exists" => Filter::Exists,
            "html" => Filter::Html,
            "queryParameter" => Filter::QueryParameter(spec.argument.clone()),
            "regex" => Filter::Regex(Regex::new(&spec.argument).map_err(|source| {
                ScrapeError::InvalidPattern {
                    pattern: spec.argument.clone(),
                    source,
                }
            })?),
            "stringf" => Filter::Stringf(spec.argument.clone()),
            "parseDate" => Filter::ParseDate(spec.argument.clone()),
            other => return Err(ScrapeError::UnknownFilter(other.to_string())),
        };
        Ok(filter)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::First => "first",
            Filter::Last => "last",
            Filter::Text => "text",
            Filter::Markdown => "markdown",
            Filter::Attr(_) => "attr",
            Filter::Exists => "exists",
            Filter::Html => "html",
            Filter::QueryParameter(_) => "queryParameter",
            Filter::Regex(_) => "regex",
            Filter::Stringf(_) => "stringf",
            Filter::ParseDate(_) => "parseDate",
        }
    }

    /// Shape this filter accepts
    pub fn input(&self) -> Shape {
        match self {
            Filter::First
            | Filter::Last
            | Filter::Text
            | Filter::Markdown
            | Filter::Attr(_)
            | Filter::Exists
            | Filter::Html => Shape::Selection,
            Filter::QueryParameter(_)
            | Filter::Regex(_)
            | Filter::Stringf(_)
            | Filter::ParseDate(_) => Shape::Text,
        }
    }

    pub fn run<'a>(&self, input: Intermediate<'a>) -> Result<Intermediate<'a>> {
        use Intermediate::{Absent, Selection, Text};

        let output = match (self, input) {
            (Filter::First, Selection(sel)) => Selection(sel.first()),
            (Filter::Last, Selection(sel)) => Selection(sel.last()),
            (Filter::Text, Selection(sel)) => Text(sel.text()),
            (Filter::Markdown, Selection(sel)) => Text(render_flow_text(&sel)),
            (Filter::Attr(name), Selection(sel)) => Text(sel.attr(name).unwrap_or_default()),
            (Filter::Exists, Selection(sel)) => Text((!sel.is_empty()).to_string()),
            (Filter::Html, Selection(sel)) => Text(sel.html()),
            (Filter::QueryParameter(name), Text(text)) => Text(query_parameter(&text, name)?),
            (Filter::Regex(re), Text(text)) => first_capture(re, &text).map_or(Absent, Text),
            (Filter::Stringf(template), Text(text)) => Text(stringf(template, &text)),
            (Filter::ParseDate(layout), Text(text)) => {
                Intermediate::Date(parse_date(&text, layout)?)
            }
            // Nothing found upstream stays nothing
            (filter, Absent) if filter.input() == Shape::Text => Absent,
            (filter, other) => {
                return Err(ScrapeError::FilterType {
                    filter: filter.name(),
                    expected: filter.input().name(),
                    found: other.shape().name(),
                })
            }
        };
        Ok(output)
    }
}

/// Value of a query parameter. Relative URLs are accepted; a missing
/// parameter is an empty string.
fn query_parameter(input: &str, name: &str) -> Result<String> {
    let url = match Url::parse(input) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse("http://localhost/").and_then(|base| base.join(input))
        }
        parsed => parsed,
    }
    .map_err(|source| ScrapeError::InvalidUrl {
        input: input.to_string(),
        source,
    })?;

    Ok(url
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default())
}

fn first_capture(re: &Regex, input: &str) -> Option<String> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Substitute the input for every `%s` / `%v`; `%%` is a literal percent
fn stringf(template: &str, input: &str) -> String {
    let mut out = String::with_capacity(template.len() + input.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') | Some('v') => {
                chars.next();
                out.push_str(input);
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use scraper::Html;

    fn run_one<'a>(kind: &str, argument: &str, input: Intermediate<'a>) -> Result<Intermediate<'a>> {
        Filter::resolve(&FilterSpec::new(kind, argument))?.run(input)
    }

    fn text(value: Result<Intermediate<'_>>) -> String {
        match value.unwrap() {
            Intermediate::Text(text) => text,
            other => panic!("expected text, got {:?}", other.shape()),
        }
    }

    #[test]
    fn test_selection_filters() {
        let html = r#"
        <ul>
            <li><a href="/a" class="item">A</a></li>
            <li><a href="/b" class="item">B</a></li>
        </ul>
        "#;
        let document = Html::parse_document(html);
        let items = Selection::document(&document).find("a.item").unwrap();
        let sel = || Intermediate::Selection(items.clone());

        assert_eq!(text(run_one("text", "", sel())), "AB");
        assert_eq!(text(run_one("attr", "href", sel())), "/a");
        assert_eq!(text(run_one("attr", "title", sel())), "");
        assert_eq!(text(run_one("exists", "", sel())), "true");
        assert_eq!(text(run_one("html", "", sel())), "A");

        match run_one("last", "", sel()).unwrap() {
            Intermediate::Selection(last) => assert_eq!(last.text(), "B"),
            other => panic!("expected selection, got {:?}", other.shape()),
        }

        let none = Selection::document(&document).find("table").unwrap();
        assert_eq!(
            text(run_one("exists", "", Intermediate::Selection(none))),
            "false"
        );
    }

    #[test]
    fn test_regex_first_capture() {
        let out = run_one(
            "regex",
            "q=([^&]+)",
            Intermediate::Text("/search?q=foo&hl=en".into()),
        );
        assert_eq!(text(out), "foo");

        let miss = run_one("regex", "q=([^&]+)", Intermediate::Text("/about".into())).unwrap();
        assert!(matches!(miss, Intermediate::Absent));

        // No capture group
        let bare = run_one("regex", "foo", Intermediate::Text("foo".into())).unwrap();
        assert!(matches!(bare, Intermediate::Absent));
    }

    #[test]
    fn test_invalid_regex_is_configuration_error() {
        let err = Filter::resolve(&FilterSpec::new("regex", "(")).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidPattern { .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_query_parameter() {
        let absolute = run_one(
            "queryParameter",
            "id",
            Intermediate::Text("https://example.com/item?id=42&ref=home".into()),
        );
        assert_eq!(text(absolute), "42");

        let relative = run_one(
            "queryParameter",
            "q",
            Intermediate::Text("/url?q=https://rust-lang.org/&sa=U".into()),
        );
        assert_eq!(text(relative), "https://rust-lang.org/");

        let missing = run_one(
            "queryParameter",
            "page",
            Intermediate::Text("/list?sort=asc".into()),
        );
        assert_eq!(text(missing), "");
    }

    #[test]
    fn test_unparseable_url_is_data_error() {
        let err = run_one(
            "queryParameter",
            "q",
            Intermediate::Text("http://[::1".into()),
        )
        .unwrap_err();
        assert!(matches!(&err, ScrapeError::InvalidUrl { input, .. } if input == "http://[::1"));
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(!err.is_contract_violation());
    }

    #[test]
    fn test_stringf() {
        assert_eq!(stringf("https://example.com%s", "/a"), "https://example.com/a");
        assert_eq!(stringf("%v: 100%%", "score"), "score: 100%");
        assert_eq!(stringf("no verb", "x"), "no verb");
        assert_eq!(stringf("%s and %s", "x"), "x and x");
    }

    #[test]
    fn test_parse_date_filter() {
        let out = run_one(
            "parseDate",
            "2006-01-02",
            Intermediate::Text("2014-08-15".into()),
        )
        .unwrap();
        match out {
            Intermediate::Date(date) => assert_eq!(date.to_rfc3339(), "2014-08-15T00:00:00+00:00"),
            other => panic!("expected date, got {:?}", other.shape()),
        }
    }

    #[test]
    fn test_unknown_filter() {
        let err = Filter::resolve(&FilterSpec::new("frobnicate", "")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("frobnicate"));
    }

    #[test]
    fn test_wrong_shape_is_filter_type_error() {
        let err = run_one("attr", "href", Intermediate::Text("/a".into())).unwrap_err();
        match err {
            ScrapeError::FilterType {
                filter,
                expected,
                found,
            } => {
                assert_eq!(filter, "attr");
                assert_eq!(expected, "selection");
                assert_eq!(found, "text");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = run_one("text", "", Intermediate::Absent).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FilterType);
    }

    #[test]
    fn test_absent_passes_through_text_filters() {
        let out = run_one("stringf", "x%s", Intermediate::Absent).unwrap();
        assert!(matches!(out, Intermediate::Absent));
    }
}
