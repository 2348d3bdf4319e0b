//! # Backward Reflow
//!
//! The inverse of [`forward`](super::forward): pulls leading content of the
//! next page onto the end of a page with spare room, until the page
//! overflows or the next page runs dry.
//!
//! - Table structure moves whole.
//! - A text run is fused onto the page's trailing run, if there is one.
//! - A node whose watermark matches the page's last child is the second
//!   half of a split: its children are pulled into that counterpart, one
//!   level deeper, and once it is drained it disappears and the two halves
//!   are one node again.
//! - Anything else moves whole.
//!
//! Only whole subtrees or watermark-merged halves ever move, so what stays
//! behind on the next page is always well formed.

use crate::model::{Arena, NodeId};

use super::LayoutContext;

/// Pull content from the start of `source` onto the end of `target` until
/// `target` overflows its budget or `source` is empty. Returns whether
/// `source` was drained.
///
/// The target page is measured once and grown by each pulled item.
pub fn move_backward(arena: &mut Arena, ctx: &LayoutContext<'_>, target: NodeId, source: NodeId) -> bool {
    let mut height = ctx.measure_children(arena, target);
    pull_children_backward(arena, ctx, target, source, &mut height);
    arena.normalize(target);
    let drained = arena.children(source).is_empty();
    if drained {
        log::debug!("page {} drained by backward reflow", ctx.page_index + 2);
    }
    drained
}

fn pull_children_backward(
    arena: &mut Arena,
    ctx: &LayoutContext<'_>,
    target: NodeId,
    source: NodeId,
    height: &mut f64,
) {
    while *height <= ctx.budget {
        let Some(first) = arena.first_child(source) else {
            return;
        };

        if arena.kind(first).is_table_structural() {
            log::trace!("pulling <{}> back whole", arena.kind(first));
            *height += ctx.measure(arena, first);
            arena.append(target, first);
            continue;
        }

        if arena.is_text(first) {
            match arena.last_child(target).filter(|&last| arena.is_text(last)) {
                Some(last) => {
                    let before = ctx.measure(arena, last);
                    let fused = format!("{}{}", arena.text(last), arena.text(first));
                    arena.set_text(last, fused);
                    arena.remove(first);
                    *height += ctx.measure(arena, last) - before;
                }
                None => {
                    *height += ctx.measure(arena, first);
                    arena.append(target, first);
                }
            }
            continue;
        }

        match counterpart_of(arena, first, target) {
            Some(counterpart) => {
                pull_children_backward(arena, ctx, counterpart, first, height);
                arena.normalize(counterpart);
                if arena.children(first).is_empty() {
                    // Reunited: the counterpart now stands for the whole node.
                    arena.remove(first);
                } else if *height <= ctx.budget {
                    panic!(
                        "invariant broken: <{}> still has children after a completed merge",
                        arena.kind(first)
                    );
                }
            }
            None => {
                log::trace!("pulling <{}> back whole", arena.kind(first));
                *height += ctx.measure(arena, first);
                arena.append(target, first);
            }
        }
    }
}

/// The last child of `target` when it is the other half of `node`.
fn counterpart_of(arena: &Arena, node: NodeId, target: NodeId) -> Option<NodeId> {
    let watermark = arena.watermark(node)?;
    arena
        .last_child(target)
        .filter(|&last| arena.watermark(last) == Some(watermark))
}
