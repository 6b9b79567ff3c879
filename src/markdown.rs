//! Flow-text rendering
//!
//! Turns a document subtree into readable Markdown-like text: paragraphs and
//! headings become blocks separated by blank lines, links become
//! `[text](href)`, and whitespace inside text collapses to single spaces.
//! `<pre>` gets no special treatment.

use std::io::Read;
use std::sync::LazyLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{Html, Node};

use crate::error::Result;
use crate::selection::Selection;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[[:space:]]+").expect("whitespace pattern is valid"));

/// Render every node of the selection and trim the result
pub fn render_flow_text(selection: &Selection<'_>) -> String {
    let text: String = selection.nodes().iter().map(|node| node_text(*node)).collect();
    text.trim().to_string()
}

/// Render a whole HTML document
pub fn markdownify_html(html: &str) -> String {
    let document = Html::parse_document(html);
    render_flow_text(&Selection::document(&document))
}

/// Render a whole HTML document read from `reader`
pub fn markdownify_reader<R: Read>(mut reader: R) -> Result<String> {
    let mut html = String::new();
    reader.read_to_string(&mut html)?;
    Ok(markdownify_html(&html))
}

fn node_text(node: NodeRef<'_, Node>) -> String {
    if let Some(text) = node.value().as_text() {
        let next = node.next_sibling();
        let mut text = WHITESPACE.replace_all(text, " ").into_owned();

        if next.is_none() || is_block(next) {
            text.truncate(text.trim_end().len());
        }
        if is_block(next) {
            text.push_str("\n\n");
        }
        if is_block(node.prev_sibling()) {
            text = text.trim_start().to_string();
        }
        return text;
    }

    // Single <br> is a space, a pair is a paragraph break
    if tag_name(Some(node)) == Some("br") {
        if tag_name(node.next_sibling()) == Some("br") {
            return "\n\n".to_string();
        }
        if tag_name(node.prev_sibling()) == Some("br") {
            return String::new();
        }
        return " ".to_string();
    }

    let Some(first_child) = node.first_child() else {
        return String::new();
    };

    if tag_name(Some(node)) == Some("a") {
        let text = node_text(first_child);
        let href = node.value().as_element().and_then(|el| el.attr("href"));
        return match href {
            None => text,
            // Keep the gap an empty link leaves between words
            Some(_) if text.trim().is_empty() => " ".to_string(),
            Some(href) => format!("[{}]({})", text, href),
        };
    }

    let mut out = String::new();
    if is_heading(Some(node)) {
        out.push_str("# ");
    }
    for child in node.children() {
        out.push_str(&node_text(child));
    }
    if is_block(Some(node)) {
        out.push_str("\n\n");
    }
    out
}

fn tag_name<'a>(node: Option<NodeRef<'a, Node>>) -> Option<&'a str> {
    node?.value().as_element().map(|el| el.name())
}

fn is_block(node: Option<NodeRef<'_, Node>>) -> bool {
    tag_name(node) == Some("p") || is_heading(node)
}

/// Any two-letter `h?` tag except `<hr>`. All levels render as `# `.
fn is_heading(node: Option<NodeRef<'_, Node>>) -> bool {
    matches!(tag_name(node).map(str::as_bytes), Some([b'h', second]) if *second != b'r')
}
