//! # Selection
//!
//! A selection is an anchor and a focus [`Point`]. A text point addresses a
//! character offset inside a text-carrying leaf; an element point addresses
//! a child index inside an element.
//!
//! Selections are transient: they are never serialized into the document and
//! must be re-resolved against the tree before every use. A selection whose
//! points no longer address live nodes resolves to `None`.

use crate::node::{NodeId, NodeKind, TextFormat};
use crate::tree::DocumentTree;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Text,
    Element,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub key: NodeId,
    pub offset: usize,
    #[serde(rename = "type")]
    pub kind: PointKind,
}

impl Point {
    pub fn text(key: NodeId, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Text,
        }
    }

    pub fn element(key: NodeId, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Element,
        }
    }

    /// Whether the point still addresses a position in the attached tree
    pub fn is_valid(&self, tree: &DocumentTree) -> bool {
        let Some(node) = tree.get(self.key) else {
            return false;
        };
        let in_bounds = match self.kind {
            PointKind::Text => node.kind.is_text_like() && self.offset <= node.kind.text_len(),
            PointKind::Element => !node.kind.is_leaf() && self.offset <= node.children.len(),
        };
        in_bounds && tree.closest(self.key, |k| matches!(k, NodeKind::Root)).is_some()
    }

    /// Move element points onto adjacent text where one exists
    pub fn normalized(self, tree: &DocumentTree) -> Point {
        if self.kind == PointKind::Text {
            return self;
        }
        let children = tree.children(self.key);

        if let Some(&child) = children.get(self.offset) {
            match first_leaf(tree, child) {
                Some(leaf) if is_text_like(tree, leaf) => return Point::text(leaf, 0),
                Some(_) => return self,
                None => {
                    let child_is_element = tree.kind(child).map(|k| !k.is_leaf()).unwrap_or(false);
                    if child_is_element {
                        return Point::element(child, 0).normalized(tree);
                    }
                }
            }
        }

        if self.offset > 0 {
            if let Some(&prev) = children.get(self.offset - 1) {
                if let Some(leaf) = last_leaf(tree, prev) {
                    if is_text_like(tree, leaf) {
                        let len = tree.kind(leaf).map(|k| k.text_len()).unwrap_or(0);
                        return Point::text(leaf, len);
                    }
                }
            }
        }
        self
    }
}

/// Anchor/focus pair plus the sticky format armed for the next typed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
    #[serde(default)]
    pub format: TextFormat,
}

impl Selection {
    pub fn caret(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
            format: TextFormat::empty(),
        }
    }

    pub fn range(anchor: Point, focus: Point) -> Self {
        Self {
            anchor,
            focus,
            format: TextFormat::empty(),
        }
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Focus precedes anchor in reading order
    pub fn is_backward(&self, tree: &DocumentTree) -> bool {
        self.resolve(tree).map(|r| r.backward).unwrap_or(false)
    }

    /// Resolve against the current tree; `None` when stale
    pub fn resolve(&self, tree: &DocumentTree) -> Option<ResolvedSelection> {
        if !self.anchor.is_valid(tree) || !self.focus.is_valid(tree) {
            return None;
        }
        let order = DocumentOrder::new(tree);
        let anchor = self.anchor.normalized(tree);
        let focus = self.focus.normalized(tree);
        let anchor_pos = order.position(tree, anchor)?;
        let focus_pos = order.position(tree, focus)?;
        let backward = focus_pos < anchor_pos;

        let (start, end, start_pos, end_pos) = if backward {
            (focus, anchor, focus_pos, anchor_pos)
        } else {
            (anchor, focus, anchor_pos, focus_pos)
        };

        Some(ResolvedSelection {
            start,
            end,
            start_pos,
            end_pos,
            backward,
            order,
        })
    }

    /// Caret at the end of the last text inside `node` (or after its children)
    pub fn caret_at_end(tree: &DocumentTree, node: NodeId) -> Self {
        match tree.last_text_descendant(node) {
            Some(t) => {
                let len = tree.kind(t).map(|k| k.text_len()).unwrap_or(0);
                Self::caret(Point::text(t, len))
            }
            None => Self::caret(Point::element(node, tree.children(node).len())),
        }
    }

    /// Caret at the start of the first text inside `node`
    pub fn caret_at_start(tree: &DocumentTree, node: NodeId) -> Self {
        match tree.first_text_descendant(node) {
            Some(t) => Self::caret(Point::text(t, 0)),
            None => Self::caret(Point::element(node, 0)),
        }
    }
}

/// Pre-order indices used to compare points
#[derive(Debug, Clone)]
pub struct DocumentOrder {
    index: HashMap<NodeId, usize>,
    last: HashMap<NodeId, usize>,
}

impl DocumentOrder {
    pub fn new(tree: &DocumentTree) -> Self {
        let order = tree.document_order();
        let index: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut last = HashMap::with_capacity(order.len());
        for id in order.iter().rev() {
            let own = index[id];
            let end = tree
                .children(*id)
                .last()
                .and_then(|c| last.get(c).copied())
                .unwrap_or(own);
            last.insert(*id, end);
        }

        Self { index, last }
    }

    pub fn index(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Comparable position of a point: (pre-order index, offset)
    pub fn position(&self, tree: &DocumentTree, point: Point) -> Option<(usize, usize)> {
        match point.kind {
            PointKind::Text => Some((self.index(point.key)?, point.offset)),
            PointKind::Element => match tree.children(point.key).get(point.offset) {
                Some(child) => Some((self.index(*child)?, 0)),
                None => Some((self.last.get(&point.key)? + 1, 0)),
            },
        }
    }
}

/// A selection checked against a live tree, ordered start → end
#[derive(Debug, Clone)]
pub struct ResolvedSelection {
    pub start: Point,
    pub end: Point,
    pub backward: bool,
    start_pos: (usize, usize),
    end_pos: (usize, usize),
    order: DocumentOrder,
}

impl ResolvedSelection {
    pub fn is_collapsed(&self) -> bool {
        self.start_pos == self.end_pos
    }

    pub fn order(&self) -> &DocumentOrder {
        &self.order
    }

    /// Leaves overlapping the range, in reading order
    pub fn leaves(&self, tree: &DocumentTree) -> Vec<NodeId> {
        if self.is_collapsed() {
            return Vec::new();
        }
        tree.document_order()
            .into_iter()
            .filter(|id| {
                let Some(kind) = tree.kind(*id) else {
                    return false;
                };
                if !kind.is_leaf() {
                    return false;
                }
                let Some(i) = self.order.index(*id) else {
                    return false;
                };
                let extent = if kind.is_text_like() { kind.text_len() } else { 1 };
                (i, extent) > self.start_pos && (i, 0) < self.end_pos
            })
            .collect()
    }

    /// Plain text nodes overlapping the range
    pub fn text_nodes(&self, tree: &DocumentTree) -> Vec<NodeId> {
        self.leaves(tree)
            .into_iter()
            .filter(|id| matches!(tree.kind(*id), Some(NodeKind::Text { .. })))
            .collect()
    }

    /// Nearest text blocks touched by the selection, in reading order
    pub fn blocks(&self, tree: &DocumentTree) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = Vec::new();
        let mut push = |id: NodeId| {
            if let Some(block) = tree.closest(id, NodeKind::is_text_block) {
                if !out.contains(&block) {
                    out.push(block);
                }
            }
        };
        push(self.start.key);
        for leaf in self.leaves(tree) {
            push(leaf);
        }
        push(self.end.key);
        out
    }
}

/// Character offset of `point` within the inline text of `block`
pub fn text_offset_in(tree: &DocumentTree, block: NodeId, point: Point) -> Option<usize> {
    let order = DocumentOrder::new(tree);
    let target = order.position(tree, point)?;
    let mut acc = 0;
    for leaf in tree.descendants(block) {
        let Some(kind) = tree.kind(leaf) else {
            continue;
        };
        if !kind.is_leaf() {
            continue;
        }
        let len = leaf_len(kind);
        let index = order.index(leaf)?;
        if (index, len) <= target {
            acc += len;
        } else if index == target.0 {
            acc += target.1.min(len);
            break;
        } else {
            break;
        }
    }
    Some(acc)
}

/// Point at a character offset within the inline text of `block`
pub fn point_at_text_offset(tree: &DocumentTree, block: NodeId, offset: usize) -> Point {
    let mut remaining = offset;
    for leaf in tree.descendants(block) {
        let Some(kind) = tree.kind(leaf) else {
            continue;
        };
        if kind.is_text_like() {
            let len = kind.text_len();
            if remaining <= len {
                return Point::text(leaf, remaining);
            }
            remaining -= len;
        } else if matches!(kind, NodeKind::LineBreak) {
            remaining = remaining.saturating_sub(1);
        }
    }
    match tree.last_text_descendant(block) {
        Some(t) => Point::text(t, tree.kind(t).map(|k| k.text_len()).unwrap_or(0)),
        None => Point::element(block, tree.children(block).len()),
    }
}

fn leaf_len(kind: &NodeKind) -> usize {
    match kind {
        NodeKind::LineBreak => 1,
        k => k.text_len(),
    }
}

fn is_text_like(tree: &DocumentTree, id: NodeId) -> bool {
    tree.kind(id).map(|k| k.is_text_like()).unwrap_or(false)
}

fn first_leaf(tree: &DocumentTree, id: NodeId) -> Option<NodeId> {
    tree.descendants(id)
        .into_iter()
        .find(|n| tree.kind(*n).map(|k| k.is_leaf()).unwrap_or(false))
}

fn last_leaf(tree: &DocumentTree, id: NodeId) -> Option<NodeId> {
    tree.descendants(id)
        .into_iter()
        .rev()
        .find(|n| tree.kind(*n).map(|k| k.is_leaf()).unwrap_or(false))
}
