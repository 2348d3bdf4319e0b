//! # Forward Reflow
//!
//! Pushes content off the end of an overflowing page onto the start of the
//! next one, always working on the source's last child:
//!
//! - a text run gives up trailing tokens into a continuation run at the
//!   head of the destination;
//! - an atomic node moves whole;
//! - a container is paired with its counterpart at the head of the
//!   destination (found by watermark, or created as a shallow mirror), and
//!   the move recurses into the pair. A mirror that receives nothing is
//!   dropped again.
//!
//! The page's first token or first atomic node never moves, so a page is
//! never emptied back to nothing, however tall that first item is.
//!
//! The source page is measured once; every move then subtracts what it
//! took off, so a push costs one pass over the page plus the moved tokens.

use crate::estimate::tokenize;
use crate::model::{Arena, NodeId};

use super::{Breakability, LayoutContext};

/// How a move stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// The page fits again, or the source ran out of children.
    Done,
    /// Reached the first content of the page while still overflowing.
    Pinned,
}

/// Running height of the page being relieved.
struct Overflow {
    height: f64,
    budget: f64,
}

impl Overflow {
    fn resolved(&self) -> bool {
        self.height <= self.budget
    }
}

/// Move content from the end of `source` to the start of `dest` until
/// `source` fits its budget or only the page's first content remains.
///
/// Calling it on a page that already fits is a no-op.
pub fn move_forward(arena: &mut Arena, ctx: &LayoutContext<'_>, source: NodeId, dest: NodeId) -> Flow {
    let mut overflow = Overflow {
        height: ctx.measure_children(arena, source),
        budget: ctx.budget,
    };
    let flow = move_children_forward(arena, ctx, source, dest, &mut overflow, false);
    arena.normalize(dest);
    if flow == Flow::Pinned {
        log::debug!(
            "page {}: first content reached while still overflowing",
            ctx.page_index + 1
        );
    }
    flow
}

fn move_children_forward(
    arena: &mut Arena,
    ctx: &LayoutContext<'_>,
    source: NodeId,
    dest: NodeId,
    overflow: &mut Overflow,
    has_earlier_content: bool,
) -> Flow {
    while !overflow.resolved() {
        let Some(last) = arena.last_child(source) else {
            return Flow::Done;
        };
        let has_earlier = has_earlier_content || arena.children(source).len() > 1;

        let flow = match ctx.classify(arena, last) {
            Breakability::Text => move_text_forward(arena, ctx, last, dest, overflow, has_earlier),
            Breakability::Atomic => {
                if !has_earlier {
                    return Flow::Pinned;
                }
                log::trace!("moving <{}> to the next page", arena.kind(last));
                overflow.height -= ctx.estimator.node_height(arena, last);
                arena.prepend(dest, last);
                Flow::Done
            }
            Breakability::Container => {
                let counterpart = counterpart_in(arena, last, dest);
                let flow = move_children_forward(arena, ctx, last, counterpart, overflow, has_earlier);
                arena.normalize(counterpart);
                if arena.is_empty(counterpart) {
                    // Nothing moved: the container was not split after all.
                    arena.remove(counterpart);
                }
                flow
            }
        };

        if arena.parent(last) == Some(source) {
            if arena.is_empty(last) {
                arena.remove(last);
            } else if flow == Flow::Done && !overflow.resolved() {
                panic!(
                    "invariant broken: non-empty <{}> left behind while the page still overflows",
                    arena.kind(last)
                );
            }
        }

        if flow == Flow::Pinned {
            return Flow::Pinned;
        }
    }
    Flow::Done
}

/// The head of `dest` if it is the other half of `node`, else a fresh
/// mirror of `node` prepended to `dest`.
fn counterpart_in(arena: &mut Arena, node: NodeId, dest: NodeId) -> NodeId {
    if let (Some(head), Some(watermark)) = (arena.first_child(dest), arena.watermark(node)) {
        if arena.watermark(head) == Some(watermark) {
            return head;
        }
    }
    let watermark = arena.correlation.ensure(node);
    let mirror = arena.shallow_clone(node);
    arena.correlation.join(watermark, mirror);
    arena.prepend(dest, mirror);
    mirror
}

/// Shift trailing tokens of `run` into a continuation run at the head of
/// `dest` until the page fits.
fn move_text_forward(
    arena: &mut Arena,
    ctx: &LayoutContext<'_>,
    run: NodeId,
    dest: NodeId,
    overflow: &mut Overflow,
    has_earlier: bool,
) -> Flow {
    let text = arena.text(run).to_string();
    let tokens = tokenize(&text);

    let mut kept = tokens.len();
    let mut flow = Flow::Done;
    while kept > 0 && !overflow.resolved() {
        if kept == 1 && !has_earlier {
            flow = Flow::Pinned;
            break;
        }
        kept -= 1;
        overflow.height -= ctx.estimator.token_height(tokens[kept]);
    }
    if kept == tokens.len() {
        return flow;
    }

    let moved = tokens[kept..].concat();
    log::trace!("text split: {kept} token(s) stay, {moved:?} moves");
    arena.set_text(run, tokens[..kept].concat());
    let continuation = arena.new_text(&moved);
    arena.prepend(dest, continuation);
    flow
}
