//! Scraper templates
//!
//! A template is an XML document describing what to extract:
//!
//! ```xml
//! <Scraper name="page">
//!   <Property name="title" selector="title"/>
//!   <Each name="links" selector="ul li">
//!     <Property name="text" selector="a"/>
//!     <Property name="url" selector="a">
//!       <Filter type="first"/>
//!       <Filter type="attr" argument="href"/>
//!     </Property>
//!   </Each>
//! </Scraper>
//! ```
//!
//! Loading only checks structure. Filter kinds and selectors are resolved
//! when the template runs.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, ScrapeError};
use crate::filters::FilterSpec;

/// Template root
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scraper {
    /// Wraps the whole result under this key when set
    pub name: Option<String>,
    /// Narrows the document before any child runs
    pub selector: Option<String>,
    pub each: Vec<Each>,
    pub properties: Vec<Property>,
    pub array_properties: Vec<ArrayProperty>,
}

/// Repeated record: one map per element matching `selector`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Each {
    pub name: String,
    pub selector: String,
    /// Accepted for compatibility with existing templates; never applied
    pub sort_by: Option<String>,
    pub properties: Vec<Property>,
    pub array_properties: Vec<ArrayProperty>,
}

/// Single value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Property {
    pub name: String,
    pub selector: String,
    pub filters: Vec<FilterSpec>,
}

/// One scalar per element matching `selector`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayProperty {
    pub name: String,
    pub selector: String,
    pub filters: Vec<FilterSpec>,
}

impl Property {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            filters: vec![],
        }
    }

    pub fn filter(mut self, kind: &str, argument: &str) -> Self {
        self.filters.push(FilterSpec::new(kind, argument));
        self
    }
}

impl ArrayProperty {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            filters: vec![],
        }
    }

    pub fn filter(mut self, kind: &str, argument: &str) -> Self {
        self.filters.push(FilterSpec::new(kind, argument));
        self
    }
}

impl Each {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            ..Default::default()
        }
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn array_property(mut self, property: ArrayProperty) -> Self {
        self.array_properties.push(property);
        self
    }
}

impl Scraper {
    /// Load a template from an XML string
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        parse_template(Reader::from_str(xml))
    }

    /// Load a template from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        parse_template(Reader::from_reader(BufReader::new(reader)))
    }

    /// Load a template from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

/// Element being built while its children are read
enum Frame {
    Scraper(Scraper),
    Each(Each),
    Property(Property),
    ArrayProperty(ArrayProperty),
    Filter,
    /// Unknown element; its subtree is skipped
    Ignored,
}

fn parse_template<R: BufRead>(mut reader: Reader<R>) -> Result<Scraper> {
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Scraper> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let frame = open_element(&e, &mut stack, root.is_some())?;
                stack.push(frame);
            }
            Ok(Event::Empty(e)) => {
                let frame = open_element(&e, &mut stack, root.is_some())?;
                close_element(frame, &mut stack, &mut root);
            }
            Ok(Event::End(_)) => {
                if let Some(frame) = stack.pop() {
                    close_element(frame, &mut stack, &mut root);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ScrapeError::Template(format!(
                    "XML parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ScrapeError::Template("unexpected end of document".to_string()));
    }

    root.ok_or_else(|| ScrapeError::Template("missing <Scraper> root element".to_string()))
}

fn open_element(e: &BytesStart<'_>, stack: &mut [Frame], has_root: bool) -> Result<Frame> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let mut attrs = Attributes::read(e)?;

    let frame = match (stack.last_mut(), tag.as_str()) {
        (Some(Frame::Ignored), _) => Frame::Ignored,
        (None, "Scraper") if !has_root => Frame::Scraper(Scraper {
            name: attrs.take("name"),
            selector: attrs.take("selector"),
            ..Default::default()
        }),
        (None, _) => {
            return Err(ScrapeError::Template(format!(
                "expected a single <Scraper> root, found <{}>",
                tag
            )))
        }
        (Some(Frame::Scraper(_)), "Each") => Frame::Each(Each {
            name: attrs.take("name").unwrap_or_default(),
            selector: attrs.take("selector").unwrap_or_default(),
            sort_by: attrs.take("sortBy"),
            ..Default::default()
        }),
        (Some(Frame::Scraper(_) | Frame::Each(_)), "Property") => Frame::Property(Property {
            name: attrs.take("name").unwrap_or_default(),
            selector: attrs.take("selector").unwrap_or_default(),
            filters: vec![],
        }),
        (Some(Frame::Scraper(_) | Frame::Each(_)), "ArrayProperty") => {
            Frame::ArrayProperty(ArrayProperty {
                name: attrs.take("name").unwrap_or_default(),
                selector: attrs.take("selector").unwrap_or_default(),
                filters: vec![],
            })
        }
        (Some(Frame::Property(p)), "Filter") => {
            p.filters.push(attrs.filter_spec());
            Frame::Filter
        }
        (Some(Frame::ArrayProperty(p)), "Filter") => {
            p.filters.push(attrs.filter_spec());
            Frame::Filter
        }
        (Some(_), "Scraper" | "Each" | "Property" | "ArrayProperty" | "Filter") => {
            return Err(ScrapeError::Template(format!("<{}> is not allowed here", tag)))
        }
        (Some(_), _) => Frame::Ignored,
    };

    Ok(frame)
}

fn close_element(frame: Frame, stack: &mut [Frame], root: &mut Option<Scraper>) {
    match (frame, stack.last_mut()) {
        (Frame::Scraper(scraper), None) => *root = Some(scraper),
        (Frame::Each(each), Some(Frame::Scraper(parent))) => parent.each.push(each),
        (Frame::Property(p), Some(Frame::Scraper(parent))) => parent.properties.push(p),
        (Frame::Property(p), Some(Frame::Each(parent))) => parent.properties.push(p),
        (Frame::ArrayProperty(p), Some(Frame::Scraper(parent))) => parent.array_properties.push(p),
        (Frame::ArrayProperty(p), Some(Frame::Each(parent))) => parent.array_properties.push(p),
        // Filters are recorded on open; ignored elements have nothing to keep
        _ => {}
    }
}

/// Unescaped attributes of one element
struct Attributes(Vec<(String, String)>);

impl Attributes {
    fn read(e: &BytesStart<'_>) -> Result<Self> {
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| ScrapeError::Template(format!("bad attribute: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| ScrapeError::Template(format!("bad attribute {}: {}", key, e)))?
                .to_string();
            attrs.push((key, value));
        }
        Ok(Self(attrs))
    }

    fn take(&mut self, key: &str) -> Option<String> {
        let pos = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.swap_remove(pos).1)
    }

    fn filter_spec(&mut self) -> FilterSpec {
        FilterSpec {
            kind: self.take("type").unwrap_or_default(),
            argument: self.take("argument").unwrap_or_default(),
        }
    }
}
