//! Ordered node sets over a parsed document
//!
//! A selection always derives from another selection. `find` searches the
//! descendants of every node and keeps matches in document order.

use std::collections::HashSet;

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{Result, ScrapeError};

/// Immutable, ordered, deduplicated set of document nodes
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    nodes: Vec<NodeRef<'a, Node>>,
}

impl<'a> Selection<'a> {
    /// The whole document, rooted at the document node
    pub fn document(html: &'a Html) -> Self {
        Self {
            nodes: vec![html.tree.root()],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeRef<'a, Node>] {
        &self.nodes
    }

    /// Select descendants matching a CSS selector
    pub fn find(&self, selector: &str) -> Result<Selection<'a>> {
        let compiled = parse_selector(selector)?;
        Ok(self.find_compiled(&compiled))
    }

    fn find_compiled(&self, selector: &Selector) -> Selection<'a> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();

        // Roots are in document order, so a root nested inside an earlier one
        // only yields nodes that were already collected.
        for root in &self.nodes {
            for node in root.descendants().skip(1) {
                let Some(element) = ElementRef::wrap(node) else {
                    continue;
                };
                if selector.matches(&element) && seen.insert(node.id()) {
                    nodes.push(node);
                }
            }
        }

        Selection { nodes }
    }

    pub fn first(&self) -> Selection<'a> {
        Selection {
            nodes: self.nodes.first().copied().into_iter().collect(),
        }
    }

    pub fn last(&self) -> Selection<'a> {
        Selection {
            nodes: self.nodes.last().copied().into_iter().collect(),
        }
    }

    /// One single-node selection per node, in order
    pub fn singletons(&self) -> impl Iterator<Item = Selection<'a>> + '_ {
        self.nodes.iter().map(|node| Selection { nodes: vec![*node] })
    }

    /// Text content of every node, concatenated without normalization
    pub fn text(&self) -> String {
        self.nodes
            .iter()
            .flat_map(|node| node.descendants())
            .filter_map(|node| node.value().as_text().map(|text| &**text))
            .collect()
    }

    /// Inner HTML of the first node
    pub fn html(&self) -> String {
        let Some(node) = self.nodes.first() else {
            return String::new();
        };

        match ElementRef::wrap(*node) {
            Some(element) => element.inner_html(),
            None => node
                .children()
                .map(|child| match ElementRef::wrap(child) {
                    Some(element) => element.html(),
                    None => child
                        .value()
                        .as_text()
                        .map(|text| text.to_string())
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }

    /// Attribute of the first node
    pub fn attr(&self, name: &str) -> Option<String> {
        let element = ElementRef::wrap(*self.nodes.first()?)?;
        element.value().attr(name).map(String::from)
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScrapeError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}
