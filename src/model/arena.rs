//! # Arena Tree
//!
//! The working representation every layout pass operates on. All nodes of
//! all pages live in one [`Arena`]; pages and parents refer to them by
//! [`NodeId`]. Nodes detached during reflow simply stop being reachable.
//!
//! Split nodes are linked through the arena's [`Correlation`] table rather
//! than through anything stored on the nodes themselves: a [`Watermark`]
//! maps to every node that holds a piece of the same logical source node.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::{Node, NodeKind};

/// Index of a node inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Opaque token correlating the halves of a node split across pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(u32);

/// A node stored in the arena.
#[derive(Debug, Clone)]
pub struct Element {
    pub kind: NodeKind,
    pub text: Option<String>,
    pub attributes: BTreeMap<String, String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Element {
    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Watermark bookkeeping for split nodes.
///
/// A watermark exists only while at least two arena nodes share it.
#[derive(Debug, Clone, Default)]
pub struct Correlation {
    next: u32,
    by_node: HashMap<NodeId, Watermark>,
    members: BTreeMap<Watermark, Vec<NodeId>>,
}

impl Correlation {
    pub fn watermark(&self, id: NodeId) -> Option<Watermark> {
        self.by_node.get(&id).copied()
    }

    /// Every node currently holding a piece of the watermarked node.
    pub fn members(&self, watermark: Watermark) -> &[NodeId] {
        self.members
            .get(&watermark)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The node's watermark, minting one if it has never been split.
    pub fn ensure(&mut self, id: NodeId) -> Watermark {
        if let Some(watermark) = self.watermark(id) {
            return watermark;
        }
        let watermark = Watermark(self.next);
        self.next += 1;
        self.by_node.insert(id, watermark);
        self.members.insert(watermark, vec![id]);
        watermark
    }

    /// Register `id` as another piece of `watermark`.
    pub fn join(&mut self, watermark: Watermark, id: NodeId) {
        self.by_node.insert(id, watermark);
        self.members.entry(watermark).or_default().push(id);
    }

    /// Forget `id`. Once a single piece remains the node is whole again and
    /// its watermark is cleared.
    pub fn release(&mut self, id: NodeId) {
        let Some(watermark) = self.by_node.remove(&id) else {
            return;
        };
        let Some(members) = self.members.get_mut(&watermark) else {
            return;
        };
        members.retain(|&member| member != id);
        if members.len() < 2 {
            for survivor in members.drain(..) {
                self.by_node.remove(&survivor);
            }
            self.members.remove(&watermark);
        }
    }

    /// Number of live watermarks.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Owner of every node of a paginated document.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Element>,
    pub correlation: Correlation,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> &Element {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_text()
    }

    /// Text of a text run; empty for anything else.
    pub fn text(&self, id: NodeId) -> &str {
        self.nodes[id.0].text.as_deref().unwrap_or("")
    }

    pub fn set_text(&mut self, id: NodeId, text: String) {
        self.nodes[id.0].text = Some(text);
    }

    /// A node with no children and no text.
    pub fn is_empty(&self, id: NodeId) -> bool {
        self.children(id).is_empty() && self.text(id).is_empty()
    }

    pub fn watermark(&self, id: NodeId) -> Option<Watermark> {
        self.correlation.watermark(id)
    }

    fn alloc(&mut self, element: Element) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(element);
        id
    }

    /// A detached, empty text run.
    pub fn new_text(&mut self, text: &str) -> NodeId {
        self.alloc(Element {
            kind: NodeKind::Text,
            text: Some(text.to_string()),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
        })
    }

    /// Same kind and attributes, no children, no text. Detached.
    pub fn shallow_clone(&mut self, id: NodeId) -> NodeId {
        let source = self.get(id);
        let element = Element {
            kind: source.kind.clone(),
            text: None,
            attributes: source.attributes.clone(),
            children: Vec::new(),
            parent: None,
        };
        self.alloc(element)
    }

    /// Copy an owned tree into the arena. Returns the detached root.
    pub fn insert_tree(&mut self, node: &Node) -> NodeId {
        let id = self.alloc(Element {
            kind: node.kind.clone(),
            text: node.text.clone(),
            attributes: node.attributes.clone(),
            children: Vec::new(),
            parent: None,
        });
        for child in &node.children {
            let child_id = self.insert_tree(child);
            self.append(id, child_id);
        }
        id
    }

    /// Copy a subtree back out, carrying live watermarks.
    pub fn to_node(&self, id: NodeId) -> Node {
        let element = self.get(id);
        Node {
            kind: element.kind.clone(),
            text: element.text.clone(),
            attributes: element.attributes.clone(),
            children: element.children.iter().map(|&c| self.to_node(c)).collect(),
            split_watermark: self.watermark(id),
        }
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(0, child);
    }

    /// Unlink a node from its parent. The node keeps its own subtree.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Detach a node and drop the watermarks of its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
        for node in self.descendants(id) {
            self.correlation.release(node);
        }
    }

    /// `id` and all nodes below it, parents first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Whether `node` sits somewhere below `ancestor`.
    pub fn is_inside(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// All text below `id`, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .map(|n| self.text(n))
            .collect()
    }

    /// Fuse adjacent text runs and drop empty ones, recursively.
    pub fn normalize(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        for child in children {
            if self.is_text(child) {
                if self.text(child).is_empty() {
                    self.nodes[child.0].parent = None;
                    continue;
                }
                let trailing_run = kept.last().copied().filter(|&l| self.is_text(l));
                if let Some(last) = trailing_run {
                    let tail = self.nodes[child.0].text.take().unwrap_or_default();
                    self.nodes[last.0]
                        .text
                        .get_or_insert_with(String::new)
                        .push_str(&tail);
                    self.nodes[child.0].parent = None;
                    continue;
                }
            } else {
                self.normalize(child);
            }
            kept.push(child);
        }
        self.nodes[id.0].children = kept;
    }
}
