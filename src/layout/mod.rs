//! # Page Set Builder
//!
//! This is where a flowing document becomes pages.
//!
//! The builder walks the tree once, depth-first, keeping a running height
//! for the page being filled:
//!
//! 1. Atomic nodes (tables, rows, headings, images...) are placed whole. If
//!    one doesn't fit and the page already has content, the page is closed
//!    first.
//! 2. Containers are opened on the current page and their children placed
//!    in order. When a page closes while containers are open, each open
//!    container is mirrored onto the new page: a shallow clone sharing a
//!    watermark with the half left behind. Nesting survives the cut.
//! 3. Text runs are placed token by token (words and whitespace runs), so a
//!    paragraph breaks between words and never loses a character.
//!
//! The first item on an empty page is always placed, even when it alone is
//! taller than the budget. That is what guarantees progress.
//!
//! Once built, a [`PageSet`] is kept correct under edits by the two reflow
//! moves in [`forward`] and [`backward`].

pub mod backward;
pub mod forward;
pub mod page_break;
pub mod pages;

use std::rc::Rc;

use crate::error::{ensure_positive, Result};
use crate::estimate::{tokenize, EstimatorConfig, HeightEstimator, HeuristicEstimator};
use crate::model::{Arena, Element, Node, NodeId, NodeKind, PageConfig};

pub use page_break::{classify, decide_break, BreakDecision, Breakability, DoNotBreak};
pub use pages::{Page, PageSet, RenderedPage};

/// Everything a layout step needs, passed explicitly.
pub struct LayoutContext<'a> {
    /// Maximum content height of one page.
    pub budget: f64,
    pub estimator: &'a dyn HeightEstimator,
    pub do_not_break: DoNotBreak<'a>,
    /// Zero-based index of the page being filled or reflowed.
    pub page_index: usize,
    /// Running height of that page.
    pub height: f64,
}

impl<'a> LayoutContext<'a> {
    pub fn new(budget: f64, estimator: &'a dyn HeightEstimator, do_not_break: DoNotBreak<'a>) -> Self {
        Self {
            budget,
            estimator,
            do_not_break,
            page_index: 0,
            height: 0.0,
        }
    }

    pub fn classify(&self, arena: &Arena, id: NodeId) -> Breakability {
        classify(arena.get(id), self.do_not_break)
    }

    /// Estimated height of a subtree as currently laid out.
    pub fn measure(&self, arena: &Arena, id: NodeId) -> f64 {
        match self.classify(arena, id) {
            Breakability::Text => tokenize(arena.text(id))
                .into_iter()
                .map(|token| self.estimator.token_height(token))
                .sum(),
            Breakability::Atomic => self.estimator.node_height(arena, id),
            Breakability::Container => self.measure_children(arena, id),
        }
    }

    /// Height of a page: the sum of its root's children.
    pub fn measure_children(&self, arena: &Arena, id: NodeId) -> f64 {
        arena
            .children(id)
            .iter()
            .map(|&child| self.measure(arena, child))
            .sum()
    }

    pub fn fits(&self, arena: &Arena, page_root: NodeId) -> bool {
        self.measure_children(arena, page_root) <= self.budget
    }
}

type SharedPredicate = Rc<dyn Fn(&Element) -> bool>;

/// Configures and runs a full layout pass.
#[derive(Clone)]
pub struct PageSetBuilder {
    config: PageConfig,
    estimator: Rc<dyn HeightEstimator>,
    do_not_break: Option<SharedPredicate>,
}

impl PageSetBuilder {
    /// A builder using the heuristic estimator configured from `config`.
    pub fn new(config: PageConfig) -> Self {
        Self {
            config,
            estimator: Rc::new(HeuristicEstimator::new(EstimatorConfig::from(&config))),
            do_not_break: None,
        }
    }

    /// Replace the height strategy.
    pub fn with_estimator(mut self, estimator: impl HeightEstimator + 'static) -> Self {
        self.estimator = Rc::new(estimator);
        self
    }

    /// Mark additional nodes as unbreakable.
    pub fn with_do_not_break(mut self, predicate: impl Fn(&Element) -> bool + 'static) -> Self {
        self.do_not_break = Some(Rc::new(predicate));
        self
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Paginate `root`. The root's own kind and attributes are repeated on
    /// every page container; its children flow across pages.
    pub fn build(&self, root: &Node) -> Result<PageSet> {
        self.validate_config()?;

        let mut arena = Arena::new();
        let source = if root.is_text() || root.kind.is_unbreakable() {
            arena.insert_tree(&Node::tag("div", vec![root.clone()]))
        } else {
            arena.insert_tree(root)
        };
        arena.normalize(source);

        let ctx = LayoutContext::new(
            self.config.page_height,
            self.estimator.as_ref(),
            self.do_not_break.as_deref(),
        );
        for &child in arena.children(source) {
            validate_estimates(&arena, &ctx, child)?;
        }

        let template = arena.shallow_clone(source);
        let mut pass = Pass::new(arena, ctx, template);
        pass.place_children(source);
        let (arena, pages) = pass.finish();
        log::debug!("laid out {} page(s)", pages.len());

        Ok(PageSet::from_parts(
            arena,
            pages,
            template,
            self.config,
            Rc::clone(&self.estimator),
            self.do_not_break.clone(),
        ))
    }

    fn validate_config(&self) -> Result<()> {
        let c = &self.config;
        ensure_positive("page height", c.page_height)?;
        ensure_positive("page width", c.page_width)?;
        ensure_positive("line height", c.line_height)?;
        ensure_positive("average character width", c.avg_char_width)?;
        ensure_positive("whitespace height", c.whitespace_height)
    }
}

/// Check every estimate the pass will ask for before placing anything.
fn validate_estimates(arena: &Arena, ctx: &LayoutContext<'_>, id: NodeId) -> Result<()> {
    match ctx.classify(arena, id) {
        Breakability::Text => {
            for token in tokenize(arena.text(id)) {
                let height = ctx.estimator.token_height(token);
                ensure_positive(&format!("height of token {token:?}"), height)?;
            }
            Ok(())
        }
        Breakability::Atomic => {
            let kind = arena.kind(id);
            if let NodeKind::Unknown(tag) = kind {
                log::warn!("unrecognized node kind `{tag}`, keeping it whole");
            }
            let height = ctx.estimator.node_height(arena, id);
            ensure_positive(&format!("height of <{kind}>"), height)
        }
        Breakability::Container => arena
            .children(id)
            .iter()
            .try_for_each(|&child| validate_estimates(arena, ctx, child)),
    }
}

/// State of one full layout pass.
struct Pass<'a> {
    arena: Arena,
    ctx: LayoutContext<'a>,
    /// Shallow copy of the document root; every page container clones it.
    template: NodeId,
    pages: Vec<Page>,
    /// Container of the page being filled.
    root: NodeId,
    /// Containers opened on the current page, outermost first.
    open: Vec<NodeId>,
    /// Text run currently receiving tokens.
    run: Option<NodeId>,
}

impl<'a> Pass<'a> {
    fn new(mut arena: Arena, ctx: LayoutContext<'a>, template: NodeId) -> Self {
        let root = arena.shallow_clone(template);
        Self {
            arena,
            ctx,
            template,
            pages: Vec::new(),
            root,
            open: Vec::new(),
            run: None,
        }
    }

    fn parent(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.root)
    }

    fn place_children(&mut self, source: NodeId) {
        for child in self.arena.children(source).to_vec() {
            self.place(child);
        }
    }

    fn place(&mut self, id: NodeId) {
        match self.ctx.classify(&self.arena, id) {
            Breakability::Atomic => {
                let height = self.ctx.estimator.node_height(&self.arena, id);
                self.make_room(height);
                let parent = self.parent();
                self.arena.append(parent, id);
                self.ctx.height += height;
                self.run = None;
            }
            Breakability::Text => {
                let text = self.arena.text(id).to_string();
                for token in tokenize(&text) {
                    let height = self.ctx.estimator.token_height(token);
                    self.make_room(height);
                    let run = self.current_run();
                    self.arena
                        .get_mut(run)
                        .text
                        .get_or_insert_with(String::new)
                        .push_str(token);
                    self.ctx.height += height;
                }
                self.run = None;
            }
            Breakability::Container => {
                let mirror = self.arena.shallow_clone(id);
                let parent = self.parent();
                self.arena.append(parent, mirror);
                self.open.push(mirror);
                self.run = None;
                self.place_children(id);
                self.open.pop();
                self.run = None;
            }
        }
    }

    fn current_run(&mut self) -> NodeId {
        if let Some(run) = self.run {
            return run;
        }
        let run = self.arena.new_text("");
        let parent = self.parent();
        self.arena.append(parent, run);
        self.run = Some(run);
        run
    }

    fn make_room(&mut self, height: f64) {
        if decide_break(self.ctx.height, height, self.ctx.budget) == BreakDecision::MoveToNextPage {
            self.break_page();
        }
    }

    /// Close the current page and open the next, carrying open containers.
    fn break_page(&mut self) {
        let closed = Page {
            root: self.root,
            height: self.ctx.height,
            index: self.pages.len() + 1,
        };
        log::debug!(
            "page {} closed at {:.1} of {:.1}",
            closed.index,
            closed.height,
            self.ctx.budget
        );
        self.pages.push(closed);

        let next_root = self.arena.shallow_clone(self.template);
        let carry_from = self.carried_whole_from();
        let mut parent = next_root;
        for level in 0..self.open.len() {
            let node = self.open[level];
            if level == carry_from {
                // Nothing of it was placed yet: move it, deeper levels included.
                self.arena.append(parent, node);
                break;
            }
            let watermark = self.arena.correlation.ensure(node);
            let mirror = self.arena.shallow_clone(node);
            self.arena.correlation.join(watermark, mirror);
            self.arena.append(parent, mirror);
            self.open[level] = mirror;
            parent = mirror;
        }

        self.root = next_root;
        self.ctx.height = 0.0;
        self.ctx.page_index += 1;
        self.run = None;
    }

    /// Shallowest open level that holds nothing but the rest of the open
    /// chain. Such containers are moved, not split.
    fn carried_whole_from(&self) -> usize {
        let mut from = self.open.len();
        for level in (0..self.open.len()).rev() {
            let children = self.arena.children(self.open[level]);
            let holds_only_chain = if level + 1 == self.open.len() {
                children.is_empty()
            } else {
                from == level + 1 && children.len() == 1 && children[0] == self.open[level + 1]
            };
            if !holds_only_chain {
                break;
            }
            from = level;
        }
        from
    }

    fn finish(mut self) -> (Arena, Vec<Page>) {
        if self.pages.is_empty() || !self.arena.children(self.root).is_empty() {
            self.pages.push(Page {
                root: self.root,
                height: self.ctx.height,
                index: self.pages.len() + 1,
            });
        }
        (self.arena, self.pages)
    }
}
