//! # Height Estimation
//!
//! We don't typeset. Every height in folio comes from a declared
//! approximation: a line is `line_height` tall, a word is as many lines as
//! its characters need at `avg_char_width` across `page_width`, and a
//! whitespace run costs a small fixed amount because a page may break there.
//!
//! The approximation is a strategy behind [`HeightEstimator`], so a host
//! that can measure real rendered heights plugs in a [`MeasuredEstimator`]
//! instead. Whatever the strategy, estimates must be positive and must not
//! shrink as text grows; the reflow loops rely on both to terminate.

use std::collections::HashMap;

use crate::model::{Arena, NodeId, NodeKind, PageConfig, ELEMENT_ID_ATTRIBUTE};

/// Maps nodes and text tokens to vertical extents.
pub trait HeightEstimator {
    /// Height of a node placed whole (an unbreakable subtree).
    fn node_height(&self, arena: &Arena, id: NodeId) -> f64;

    /// Height of one word or whitespace token of a text run.
    fn token_height(&self, token: &str) -> f64;
}

/// Split text into alternating word and whitespace-run tokens.
///
/// Concatenating the tokens gives back the input exactly.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (i, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                tokens.push(&text[start..i]);
                start = i;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

pub fn is_whitespace_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_whitespace)
}

/// Constants of the heuristic approximation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    pub line_height: f64,
    pub avg_char_width: f64,
    pub max_line_width: f64,
    pub whitespace_height: f64,
}

impl From<&PageConfig> for EstimatorConfig {
    fn from(config: &PageConfig) -> Self {
        Self {
            line_height: config.line_height,
            avg_char_width: config.avg_char_width,
            max_line_width: config.page_width,
            whitespace_height: config.whitespace_height,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::from(&PageConfig::default())
    }
}

/// The default strategy: line height times estimated line count.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEstimator {
    pub config: EstimatorConfig,
}

impl HeuristicEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Lines needed for `text` set on one line-wrapped block.
    fn line_count(&self, text: &str) -> f64 {
        let chars = text.chars().count() as f64;
        let width = chars * self.config.avg_char_width;
        (width / self.config.max_line_width).ceil()
    }

    /// `ceil(chars * avg_char_width / max_line_width) * line_height`.
    pub fn text_height(&self, text: &str) -> f64 {
        self.line_count(text) * self.config.line_height
    }

    /// Hard breaks inside a subtree: `br` nodes, newlines in text, and the
    /// closing of block-level descendants. Only line ends with content after
    /// them count, and a block closing right after another line end adds
    /// nothing.
    fn hard_breaks(&self, arena: &Arena, id: NodeId) -> usize {
        let mut lines = LineEnds::default();
        for &child in arena.children(id) {
            lines.visit(arena, child);
        }
        lines.internal
    }
}

/// Line-end bookkeeping for one walk over an unbreakable subtree.
struct LineEnds {
    /// Line ends already followed by content.
    internal: usize,
    /// Line ends seen since the last content.
    pending: usize,
    at_line_start: bool,
}

impl Default for LineEnds {
    fn default() -> Self {
        Self {
            internal: 0,
            pending: 0,
            at_line_start: true,
        }
    }
}

impl LineEnds {
    fn visit(&mut self, arena: &Arena, id: NodeId) {
        let kind = arena.kind(id);
        match kind {
            NodeKind::LineBreak => self.hard_break(),
            NodeKind::Text => {
                for (i, piece) in arena.text(id).split('\n').enumerate() {
                    if i > 0 {
                        self.hard_break();
                    }
                    if !piece.is_empty() {
                        self.content();
                    }
                }
            }
            NodeKind::Image => self.content(),
            _ => {
                for &child in arena.children(id) {
                    self.visit(arena, child);
                }
                if kind.ends_line() && !self.at_line_start {
                    self.pending += 1;
                    self.at_line_start = true;
                }
            }
        }
    }

    fn content(&mut self) {
        self.internal += self.pending;
        self.pending = 0;
        self.at_line_start = false;
    }

    fn hard_break(&mut self) {
        self.pending += 1;
        self.at_line_start = true;
    }
}

impl HeightEstimator for HeuristicEstimator {
    fn node_height(&self, arena: &Arena, id: NodeId) -> f64 {
        let line = self.config.line_height;
        let element = arena.get(id);
        match &element.kind {
            NodeKind::Text => self.text_height(arena.text(id)).max(line),
            NodeKind::Heading(_) => self.text_height(&arena.text_content(id)).max(line),
            NodeKind::Image => element
                .attribute("height")
                .and_then(|h| h.trim().trim_end_matches("px").parse::<f64>().ok())
                .filter(|h| h.is_finite() && *h > 0.0)
                .unwrap_or(line),
            NodeKind::LineBreak => line,
            _ => line * (self.hard_breaks(arena, id) + 1) as f64,
        }
    }

    fn token_height(&self, token: &str) -> f64 {
        if is_whitespace_token(token) {
            self.config.whitespace_height
        } else {
            self.text_height(token)
        }
    }
}

/// Heights observed by the host, keyed by `data-element-id`, with the
/// heuristic as fallback for everything not measured.
#[derive(Debug, Clone, Default)]
pub struct MeasuredEstimator {
    pub heights: HashMap<String, f64>,
    pub fallback: HeuristicEstimator,
}

impl MeasuredEstimator {
    pub fn new(heights: HashMap<String, f64>, fallback: HeuristicEstimator) -> Self {
        Self { heights, fallback }
    }
}

impl HeightEstimator for MeasuredEstimator {
    fn node_height(&self, arena: &Arena, id: NodeId) -> f64 {
        arena
            .get(id)
            .attribute(ELEMENT_ID_ATTRIBUTE)
            .and_then(|key| self.heights.get(key))
            .copied()
            .unwrap_or_else(|| self.fallback.node_height(arena, id))
    }

    fn token_height(&self, token: &str) -> f64 {
        self.fallback.token_height(token)
    }
}

/// Pages by character count instead of height: the budget becomes
/// "characters per page".
#[derive(Debug, Clone, Copy, Default)]
pub struct CharCountEstimator;

/// Default character budget per page in character-count mode.
pub const DEFAULT_CHARS_PER_PAGE: f64 = 3000.0;

impl HeightEstimator for CharCountEstimator {
    fn node_height(&self, arena: &Arena, id: NodeId) -> f64 {
        (arena.text_content(id).chars().count() as f64).max(1.0)
    }

    fn token_height(&self, token: &str) -> f64 {
        token.chars().count() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;

    fn estimator() -> HeuristicEstimator {
        HeuristicEstimator::default()
    }

    #[test]
    fn tokenize_alternates_words_and_spaces() {
        let tokens = tokenize("The quick  brown\tfox");
        assert_eq!(tokens, vec!["The", " ", "quick", "  ", "brown", "\t", "fox"]);
        assert_eq!(tokens.concat(), "The quick  brown\tfox");
    }

    #[test]
    fn tokenize_keeps_leading_and_trailing_space() {
        assert_eq!(tokenize("  a "), vec!["  ", "a", " "]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn word_is_one_line_until_it_wraps() {
        let est = estimator();
        assert_eq!(est.token_height("contract"), 20.0);
        // 63 chars * 8 = 504 > 500
        assert_eq!(est.token_height(&"x".repeat(63)), 40.0);
        assert_eq!(est.token_height("   "), 4.0);
    }

    #[test]
    fn text_height_is_monotonic() {
        let est = estimator();
        let mut last = 0.0;
        for n in 0..300 {
            let h = est.text_height(&"a".repeat(n));
            assert!(h >= last);
            last = h;
        }
    }

    #[test]
    fn table_counts_rows_as_lines() {
        let row = |t: &str| Node::tag("tr", vec![Node::tag("td", vec![Node::text(t)])]);
        let table = Node::tag("table", vec![row("a"), row("b"), row("c")]);
        let mut arena = Arena::new();
        let id = arena.insert_tree(&table);
        assert_eq!(estimator().node_height(&arena, id), 60.0);
    }

    #[test]
    fn closing_line_end_is_not_a_break() {
        let mut arena = Arena::new();
        let one = arena.insert_tree(&Node::tag("div", vec![Node::tag("p", vec![Node::text("Provider")])]));
        let nested = arena.insert_tree(&Node::tag(
            "div",
            vec![
                Node::tag("div", vec![Node::tag("p", vec![Node::text("a")])]),
                Node::tag("p", vec![Node::text("b"), Node::tag("br", vec![])]),
            ],
        ));
        let trailing = arena.insert_tree(&Node::tag("pre", vec![Node::text("a\nb\n")]));
        assert_eq!(estimator().node_height(&arena, one), 20.0);
        assert_eq!(estimator().node_height(&arena, nested), 40.0);
        assert_eq!(estimator().node_height(&arena, trailing), 40.0);
    }

    #[test]
    fn preformatted_counts_newlines() {
        let pre = Node::tag("pre", vec![Node::text("line one\nline two\nline three")]);
        let mut arena = Arena::new();
        let id = arena.insert_tree(&pre);
        assert_eq!(estimator().node_height(&arena, id), 60.0);
    }

    #[test]
    fn image_uses_declared_height() {
        let mut arena = Arena::new();
        let with = arena.insert_tree(&Node::tag("img", vec![]).with_attr("height", "120px"));
        let without = arena.insert_tree(&Node::tag("img", vec![]));
        assert_eq!(estimator().node_height(&arena, with), 120.0);
        assert_eq!(estimator().node_height(&arena, without), 20.0);
    }

    #[test]
    fn measured_heights_override_the_heuristic() {
        let mut arena = Arena::new();
        let table = arena.insert_tree(&Node::tag("table", vec![]).with_attr("data-element-id", "t1"));
        let other = arena.insert_tree(&Node::tag("table", vec![]));
        let measured = MeasuredEstimator::new(
            HashMap::from([("t1".to_string(), 333.0)]),
            HeuristicEstimator::default(),
        );
        assert_eq!(measured.node_height(&arena, table), 333.0);
        assert_eq!(measured.node_height(&arena, other), 20.0);
    }

    #[test]
    fn char_count_charges_characters() {
        let mut arena = Arena::new();
        let img = arena.insert_tree(&Node::tag("img", vec![]));
        assert_eq!(CharCountEstimator.token_height("abc"), 3.0);
        assert_eq!(CharCountEstimator.node_height(&arena, img), 1.0);
    }
}
