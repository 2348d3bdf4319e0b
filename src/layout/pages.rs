//! # Page Sets
//!
//! The result of a layout pass, and the thing that stays correct while the
//! user edits variable values. A [`PageSet`] owns the arena holding every
//! page, the ordered page list, and the strategy it was built with, so a
//! later [`PageSet::reflow`] measures content exactly the way the full pass
//! did.

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use serde::Serialize;

use crate::estimate::HeightEstimator;
use crate::model::{Arena, Node, NodeId, PageConfig, Watermark, VARIABLE_ATTRIBUTE};

use super::backward::move_backward;
use super::forward::move_forward;
use super::{LayoutContext, SharedPredicate};

/// One page of a paginated document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    /// Container holding this page's share of the document.
    pub root: NodeId,
    /// Accumulated estimated height of the content.
    pub height: f64,
    /// 1-based position in the page set.
    pub index: usize,
}

/// A page copied out of the arena, ready for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub index: usize,
    pub height: f64,
    pub content: Node,
}

/// An ordered, paginated document.
pub struct PageSet {
    arena: Arena,
    pages: Vec<Page>,
    template: NodeId,
    config: PageConfig,
    estimator: Rc<dyn HeightEstimator>,
    do_not_break: Option<SharedPredicate>,
}

impl PageSet {
    pub(crate) fn from_parts(
        arena: Arena,
        pages: Vec<Page>,
        template: NodeId,
        config: PageConfig,
        estimator: Rc<dyn HeightEstimator>,
        do_not_break: Option<SharedPredicate>,
    ) -> Self {
        Self {
            arena,
            pages,
            template,
            config,
            estimator,
            do_not_break,
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Direct access for hosts that edit text themselves. Call
    /// [`PageSet::reflow`] afterwards.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// The height ledger, parallel to [`PageSet::pages`].
    pub fn heights(&self) -> Vec<f64> {
        self.pages.iter().map(|page| page.height).collect()
    }

    /// Recorded height of page `index` (zero-based).
    pub fn page_height(&self, index: usize) -> Option<f64> {
        self.pages.get(index).map(|page| page.height)
    }

    /// Replace the text of one run and reflow around it.
    ///
    /// # Panics
    ///
    /// If `run` is not a text run.
    pub fn set_text(&mut self, run: NodeId, text: &str) {
        assert!(
            self.arena.is_text(run),
            "set_text called on <{}>",
            self.arena.kind(run)
        );
        self.arena.set_text(run, text.to_string());
        self.reflow();
    }

    /// Copy every page out of the arena, split watermarks included.
    pub fn render(&self) -> Vec<RenderedPage> {
        self.pages
            .iter()
            .map(|page| RenderedPage {
                index: page.index,
                height: page.height,
                content: self.arena.to_node(page.root),
            })
            .collect()
    }

    /// Rebuild the unpaginated tree: concatenate the pages and merge every
    /// run of siblings sharing a watermark back into one node.
    pub fn reassemble(&self) -> Node {
        let mut root = self.arena.to_node(self.template);
        for page in &self.pages {
            root.children.extend(self.arena.to_node(page.root).children);
        }
        merge_split_siblings(&mut root);
        root.normalize();
        root
    }

    /// Replace the value of every element bound to a variable in `values`
    /// and reflow. Returns how many bound elements were rewritten.
    ///
    /// An element split across pages takes its whole new value in its
    /// first half; the later halves are dropped and reflow re-splits it if
    /// the value is still too long.
    pub fn apply_variables(&mut self, values: &BTreeMap<String, String>) -> usize {
        let bound: Vec<NodeId> = self
            .pages
            .iter()
            .flat_map(|page| self.arena.descendants(page.root))
            .filter(|&id| {
                self.arena
                    .get(id)
                    .attribute(VARIABLE_ATTRIBUTE)
                    .is_some_and(|name| values.contains_key(name))
            })
            .collect();

        let mut filled: HashSet<Watermark> = HashSet::new();
        let mut rewritten = 0;
        for id in bound {
            if !self.is_attached(id) {
                continue;
            }
            if let Some(watermark) = self.arena.watermark(id) {
                if !filled.insert(watermark) {
                    self.remove_split_piece(id);
                    continue;
                }
            }
            let Some(value) = self
                .arena
                .get(id)
                .attribute(VARIABLE_ATTRIBUTE)
                .and_then(|name| values.get(name))
                .cloned()
            else {
                continue;
            };
            for child in self.arena.children(id).to_vec() {
                self.arena.remove(child);
            }
            let run = self.arena.new_text(&value);
            self.arena.append(id, run);
            rewritten += 1;
        }

        log::debug!("rewrote {rewritten} variable binding(s)");
        self.reflow();
        rewritten
    }

    /// Restore the budget on every page after an edit.
    ///
    /// Walks page boundaries in order. An overflowing page pushes its tail
    /// forward (opening a page if needed); a page with room pulls from the
    /// next one, dropping pages it drains, then pushes back whatever the
    /// pull overshot.
    pub fn reflow(&mut self) {
        let estimator = Rc::clone(&self.estimator);
        let predicate = self.do_not_break.clone();
        let mut ctx = LayoutContext::new(self.config.page_height, estimator.as_ref(), predicate.as_deref());

        let mut i = 0;
        while i < self.pages.len() {
            ctx.page_index = i;
            let root = self.pages[i].root;
            if !ctx.fits(&self.arena, root) {
                self.push_forward(&ctx, i);
            } else {
                while i + 1 < self.pages.len() && ctx.fits(&self.arena, root) {
                    let next = self.pages[i + 1].root;
                    let drained = move_backward(&mut self.arena, &ctx, root, next);
                    if !drained {
                        break;
                    }
                    self.pages.remove(i + 1);
                }
                if !ctx.fits(&self.arena, root) {
                    self.push_forward(&ctx, i);
                }
            }
            i += 1;
        }

        self.pages.retain(|page| !self.arena.children(page.root).is_empty());
        if self.pages.is_empty() {
            let root = self.arena.shallow_clone(self.template);
            self.pages.push(Page {
                root,
                height: 0.0,
                index: 1,
            });
        }
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.index = i + 1;
            page.height = ctx.measure_children(&self.arena, page.root);
        }
    }

    fn push_forward(&mut self, ctx: &LayoutContext<'_>, i: usize) {
        if i + 1 == self.pages.len() {
            let root = self.arena.shallow_clone(self.template);
            self.pages.push(Page {
                root,
                height: 0.0,
                index: i + 2,
            });
            log::debug!("opened page {}", i + 2);
        }
        let (root, next) = (self.pages[i].root, self.pages[i + 1].root);
        move_forward(&mut self.arena, ctx, root, next);
        if self.arena.children(next).is_empty() {
            self.pages.remove(i + 1);
        }
    }

    /// Whether `id` still hangs below some page.
    fn is_attached(&self, id: NodeId) -> bool {
        self.pages
            .iter()
            .any(|page| page.root == id || self.arena.is_inside(id, page.root))
    }

    /// Remove a later piece of a split node, then any split-only ancestors
    /// the removal leaves empty.
    fn remove_split_piece(&mut self, id: NodeId) {
        let mut parent = self.arena.parent(id);
        self.arena.remove(id);
        while let Some(node) = parent {
            let is_page_root = self.pages.iter().any(|page| page.root == node);
            if is_page_root || !self.arena.is_empty(node) || self.arena.watermark(node).is_none() {
                break;
            }
            parent = self.arena.parent(node);
            self.arena.remove(node);
        }
    }
}

/// Fold adjacent siblings sharing a watermark into the first of them, then
/// recurse; halves of nested splits become adjacent once their parents are
/// merged.
fn merge_split_siblings(node: &mut Node) {
    let mut merged: Vec<Node> = Vec::with_capacity(node.children.len());
    for child in node.children.drain(..) {
        if let Some(last) = merged.last_mut() {
            if child.split_watermark.is_some() && last.split_watermark == child.split_watermark {
                last.children.extend(child.children);
                continue;
            }
        }
        merged.push(child);
    }
    for child in &mut merged {
        child.split_watermark = None;
        merge_split_siblings(child);
    }
    node.children = merged;
}
