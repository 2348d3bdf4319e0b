//! # Document Model
//!
//! The input representation for the reflow engine. A document is a tree of
//! nodes, each with a kind, an attribute map, and children. Text lives only
//! in text-run leaves. This is what the external DOCX/template extractor
//! hands us; we never see raw markup.
//!
//! Kinds are carried as the tag strings the extractor produces (`"p"`,
//! `"h2"`, `"tr"`, `"#text"`...). Tags we don't recognize survive as
//! [`NodeKind::Unknown`] so that pagination never changes what the caller
//! gave us, even when it doesn't understand it.

pub mod arena;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use arena::{Arena, Correlation, Element, NodeId, Watermark};

/// Attribute that binds an element to a template variable.
pub const VARIABLE_ATTRIBUTE: &str = "data-variable";

/// Attribute the host uses to key measured heights.
pub const ELEMENT_ID_ATTRIBUTE: &str = "data-element-id";

/// A complete document ready for pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The flowing content. Its own kind and attributes are repeated on
    /// every page container.
    pub root: Node,

    /// Page budget and estimator constants.
    #[serde(default)]
    pub page: PageConfig,

    /// Current values for template variables, by name.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Page budget and the constants of the height approximation.
///
/// Units are whatever the budget is expressed in; the defaults are CSS
/// pixels for an A4 sheet at 96 dpi.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    /// Maximum content height per page.
    #[serde(default = "default_page_height")]
    pub page_height: f64,
    /// Maximum content width, used only for the line-wrap approximation.
    #[serde(default = "default_page_width")]
    pub page_width: f64,
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    #[serde(default = "default_avg_char_width")]
    pub avg_char_width: f64,
    /// Height charged for a whitespace run (a possible break point).
    #[serde(default = "default_whitespace_height")]
    pub whitespace_height: f64,
}

fn default_page_height() -> f64 {
    1122.0 // 29.7cm * 37.8px/cm
}

fn default_page_width() -> f64 {
    500.0
}

fn default_line_height() -> f64 {
    20.0
}

fn default_avg_char_width() -> f64 {
    8.0
}

fn default_whitespace_height() -> f64 {
    4.0
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_height: default_page_height(),
            page_width: default_page_width(),
            line_height: default_line_height(),
            avg_char_width: default_avg_char_width(),
            whitespace_height: default_whitespace_height(),
        }
    }
}

impl PageConfig {
    /// A config with the default estimator constants and the given budget.
    pub fn with_height(page_height: f64) -> Self {
        Self {
            page_height,
            ..Self::default()
        }
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// What kind of node this is.
    pub kind: NodeKind,

    /// Text content. Only text runs carry it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Presentational and semantic attributes (classes, variable bindings).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    /// Child nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,

    /// Correlation token shared by the halves of a node split across pages.
    /// Only ever set on rendered page output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_watermark: Option<Watermark>,
}

impl Node {
    /// Create an element node.
    pub fn element(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            text: None,
            attributes: BTreeMap::new(),
            children,
            split_watermark: None,
        }
    }

    /// Create a text run.
    pub fn text(content: &str) -> Self {
        Self {
            kind: NodeKind::Text,
            text: Some(content.to_string()),
            attributes: BTreeMap::new(),
            children: vec![],
            split_watermark: None,
        }
    }

    /// Create a node from a tag string.
    pub fn tag(tag: &str, children: Vec<Node>) -> Self {
        Self::element(NodeKind::from(tag), children)
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// All text of this subtree, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Merge adjacent text runs and drop empty ones, recursively.
    ///
    /// Two trees that differ only in how their text is chunked into runs
    /// normalize to the same tree.
    pub fn normalize(&mut self) {
        let mut merged: Vec<Node> = Vec::with_capacity(self.children.len());
        for mut child in self.children.drain(..) {
            if child.is_text() {
                let content = child.text.take().unwrap_or_default();
                if content.is_empty() {
                    continue;
                }
                if let Some(last) = merged.last_mut().filter(|n| n.is_text()) {
                    last.text.get_or_insert_with(String::new).push_str(&content);
                    continue;
                }
                child.text = Some(content);
            } else {
                child.normalize();
            }
            merged.push(child);
        }
        self.children = merged;
    }

    /// Visit every node in this subtree, depth-first, parents first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// The different kinds of nodes in the document tree.
///
/// Serialized as the tag string, so `"h2"` becomes `Heading(2)` and back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    /// A text run (`#text`).
    Text,
    /// A paragraph (`p`).
    Paragraph,
    /// A heading, `h1` to `h6`.
    Heading(u8),
    /// A block container: `div`, `section`, `ul`, `li`, `blockquote`...
    Block(String),
    /// An inline formatting container: `span`, `strong`, `em`, `a`...
    Inline(String),
    /// A table.
    Table,
    /// `thead`, `tbody` or `tfoot`.
    TableSection(String),
    /// A table row (`tr`).
    TableRow,
    /// `td` or `th`.
    TableCell(String),
    /// A hard line break (`br`).
    LineBreak,
    /// An image (`img`).
    Image,
    /// Preformatted content: `pre` or `code`.
    Preformatted(String),
    /// Anything else. Kept verbatim, treated as unbreakable.
    Unknown(String),
}

const BLOCK_TAGS: &[&str] = &[
    "div",
    "section",
    "article",
    "main",
    "body",
    "header",
    "footer",
    "blockquote",
    "ul",
    "ol",
    "li",
    "dl",
    "dt",
    "dd",
    "document",
    "container",
];

const INLINE_TAGS: &[&str] = &[
    "span", "strong", "b", "em", "i", "u", "s", "strike", "a", "sub", "sup", "mark", "small",
    "font", "label",
];

impl NodeKind {
    /// The tag string this kind round-trips through.
    pub fn tag(&self) -> String {
        match self {
            NodeKind::Text => "#text".to_string(),
            NodeKind::Paragraph => "p".to_string(),
            NodeKind::Heading(level) => format!("h{level}"),
            NodeKind::Table => "table".to_string(),
            NodeKind::TableRow => "tr".to_string(),
            NodeKind::LineBreak => "br".to_string(),
            NodeKind::Image => "img".to_string(),
            NodeKind::Block(tag)
            | NodeKind::Inline(tag)
            | NodeKind::TableSection(tag)
            | NodeKind::TableCell(tag)
            | NodeKind::Preformatted(tag)
            | NodeKind::Unknown(tag) => tag.clone(),
        }
    }

    /// Table, row, section or cell. These move between pages only whole.
    pub fn is_table_structural(&self) -> bool {
        matches!(
            self,
            NodeKind::Table
                | NodeKind::TableSection(_)
                | NodeKind::TableRow
                | NodeKind::TableCell(_)
        )
    }

    /// Kinds that always appear wholly on one page, regardless of content.
    pub fn is_unbreakable(&self) -> bool {
        self.is_table_structural()
            || matches!(
                self,
                NodeKind::Heading(_)
                    | NodeKind::Image
                    | NodeKind::Preformatted(_)
                    | NodeKind::LineBreak
                    | NodeKind::Unknown(_)
            )
    }

    /// Kinds whose closing ends a visual line inside an unbreakable block.
    pub fn ends_line(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph | NodeKind::Block(_) | NodeKind::TableRow | NodeKind::Heading(_)
        )
    }
}

impl From<&str> for NodeKind {
    fn from(tag: &str) -> Self {
        let lower = tag.trim().to_ascii_lowercase();
        match lower.as_str() {
            "#text" | "text" => NodeKind::Text,
            "p" | "paragraph" => NodeKind::Paragraph,
            "table" => NodeKind::Table,
            "thead" | "tbody" | "tfoot" => NodeKind::TableSection(lower),
            "tr" => NodeKind::TableRow,
            "td" | "th" => NodeKind::TableCell(lower),
            "br" => NodeKind::LineBreak,
            "img" | "image" => NodeKind::Image,
            "pre" | "code" => NodeKind::Preformatted(lower),
            "heading" => NodeKind::Heading(1),
            other => {
                if let Some(level) = parse_heading_level(other) {
                    NodeKind::Heading(level)
                } else if BLOCK_TAGS.contains(&other) {
                    NodeKind::Block(lower)
                } else if INLINE_TAGS.contains(&other) {
                    NodeKind::Inline(lower)
                } else {
                    // Keep the caller's spelling for kinds we don't know.
                    NodeKind::Unknown(tag.to_string())
                }
            }
        }
    }
}

fn parse_heading_level(tag: &str) -> Option<u8> {
    let level: u8 = tag.strip_prefix('h')?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

impl From<String> for NodeKind {
    fn from(tag: String) -> Self {
        NodeKind::from(tag.as_str())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.tag()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}
