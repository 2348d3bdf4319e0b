//! # Page Break Decisions
//!
//! The rules for what may be cut at a page boundary and when a boundary
//! must be opened. Everything that splits or moves content asks these two
//! questions the same way, so a node the builder kept whole is never cut
//! later by a reflow.

use crate::model::Element;

/// How a node may be divided across pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakability {
    /// A text run: breakable between words.
    Text,
    /// Must appear wholly on one page.
    Atomic,
    /// Breakable between children; split halves share a watermark.
    Container,
}

/// Caller-supplied "keep this whole" predicate.
pub type DoNotBreak<'a> = Option<&'a dyn Fn(&Element) -> bool>;

/// Classify a node. Headings, images, preformatted blocks, table structure,
/// unknown kinds, childless elements, and anything the caller's predicate
/// selects are atomic.
pub fn classify(element: &Element, do_not_break: DoNotBreak<'_>) -> Breakability {
    if element.is_text() {
        return Breakability::Text;
    }
    if element.kind.is_unbreakable()
        || element.children().is_empty()
        || do_not_break.is_some_and(|keep_whole| keep_whole(element))
    {
        return Breakability::Atomic;
    }
    Breakability::Container
}

/// What to do with the next item before placing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// It fits (or the page is still empty): place it on the current page.
    Place,
    /// Close the current page and place it at the top of a new one.
    MoveToNextPage,
}

/// Decide whether an item of `item_height` goes on the current page.
///
/// An empty page always takes the item, however tall: refusing it would
/// only produce another empty page with the same problem.
pub fn decide_break(used_height: f64, item_height: f64, budget: f64) -> BreakDecision {
    if used_height > 0.0 && used_height + item_height > budget {
        BreakDecision::MoveToNextPage
    } else {
        BreakDecision::Place
    }
}
