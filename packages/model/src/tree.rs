//! # Document Tree
//!
//! Arena-backed tree of [`Node`]s with a single root.
//!
//! ## Invariants
//!
//! - Exactly one root; the root has no parent and is never removed or replaced
//! - Every other attached node has exactly one parent and appears once in
//!   that parent's `children`
//! - No cycles: a node can't be attached under one of its descendants
//! - Children respect the containment grammar in [`NodeKind::accepts`]
//! - The root (and every table cell) always has at least one child
//!
//! Structural operations check these before touching the arena, so a failed
//! operation leaves the tree unchanged.

use crate::error::{TreeError, TreeResult};
use crate::id_generator::IdGenerator;
use crate::node::{Alignment, Node, NodeId, NodeKind};
use std::collections::{HashMap, HashSet};

/// A mutable rich-text document
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    ids: IdGenerator,
}

impl DocumentTree {
    /// Create a document holding one empty paragraph
    pub fn new() -> Self {
        let mut tree = Self::bare();
        tree.ensure_non_empty();
        tree
    }

    /// Root without children; callers restore the non-empty invariant
    pub(crate) fn bare() -> Self {
        let mut ids = IdGenerator::new();
        let root = ids.new_id();
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::new(root, NodeKind::Root));
        Self { nodes, root, ids }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node(&self, id: NodeId) -> TreeResult<&Node> {
        self.nodes.get(&id).ok_or(TreeError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(&id).map(|n| &n.kind)
    }

    /// Mutable payload access. Changing the variant must go through
    /// [`DocumentTree::replace_kind`] so children stay valid.
    pub fn kind_mut(&mut self, id: NodeId) -> Option<&mut NodeKind> {
        self.nodes.get_mut(&id).map(|n| &mut n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn align(&self, id: NodeId) -> Alignment {
        self.nodes.get(&id).map(|n| n.align).unwrap_or_default()
    }

    pub fn set_align(&mut self, id: NodeId, align: Alignment) -> TreeResult<()> {
        let node = self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))?;
        node.align = align;
        Ok(())
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Nearest node (starting with `id` itself) whose kind matches
    pub fn closest(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(n) = current {
            let node = self.nodes.get(&n)?;
            if pred(&node.kind) {
                return Some(n);
            }
            current = node.parent;
        }
        None
    }

    /// Strict ancestry: `ancestor` is above `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Create a detached node
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = self.ids.new_id();
        self.nodes.insert(id, Node::new(id, kind));
        id
    }

    /// Create a detached text-carrying node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.create(NodeKind::text(text))
    }

    /// Insert `child` into `parent` at `index` (clamped), moving it if attached elsewhere
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) -> TreeResult<()> {
        self.check_attach(parent, child)?;
        self.detach(child);
        self.attach(parent, index, child);
        Ok(())
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        self.insert_at(parent, usize::MAX, child)
    }

    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> TreeResult<()> {
        self.insert_beside(reference, node, 0)
    }

    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> TreeResult<()> {
        self.insert_beside(reference, node, 1)
    }

    fn insert_beside(&mut self, reference: NodeId, node: NodeId, shift: usize) -> TreeResult<()> {
        let parent = self
            .parent(reference)
            .ok_or(TreeError::ParentNotFound(reference))?;
        if node == reference {
            return Ok(());
        }
        self.check_attach(parent, node)?;
        self.detach(node);
        let index = self
            .index_in_parent(reference)
            .ok_or(TreeError::NodeNotFound(reference))?;
        self.attach(parent, index + shift, node);
        Ok(())
    }

    /// Move `node` to be the last child of `new_parent`
    pub fn move_to(&mut self, node: NodeId, new_parent: NodeId) -> TreeResult<()> {
        self.append(new_parent, node)
    }

    /// Remove a node and everything below it
    pub fn remove(&mut self, id: NodeId) -> TreeResult<()> {
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        if !self.contains(id) {
            return Err(TreeError::NodeNotFound(id));
        }

        let parent = self.parent(id);
        self.detach(id);
        self.drop_subtree(id);

        if let Some(p) = parent {
            self.ensure_container_non_empty(p);
        }
        Ok(())
    }

    /// Change a node's type in place, keeping its id.
    ///
    /// Children are kept when the new type accepts all of them. Otherwise a
    /// code block gets the flattened text as code lines and an inline
    /// container converts code lines to plain text and flattens anything
    /// else it can't hold.
    pub fn replace_kind(&mut self, id: NodeId, kind: NodeKind) -> TreeResult<()> {
        if id == self.root || matches!(kind, NodeKind::Root) {
            return Err(TreeError::RootImmutable);
        }
        let node = self.node(id)?;
        let from = node.kind.tag();
        if let Some(parent) = node.parent {
            let parent_kind = &self.node(parent)?.kind;
            if !parent_kind.accepts(&kind) {
                return Err(TreeError::invalid_child(parent_kind.tag(), kind.tag()));
            }
        }

        let children = node.children.clone();
        let compatible = children
            .iter()
            .all(|c| self.kind(*c).map(|k| kind.accepts(k)).unwrap_or(false));

        if compatible {
            self.set_kind(id, kind);
            return Ok(());
        }

        if matches!(kind, NodeKind::CodeBlock { .. }) {
            let text = self.text_content(id);
            for child in children {
                self.detach(child);
                self.drop_subtree(child);
            }
            self.set_kind(id, kind);
            self.append_code_lines(id, &text);
            Ok(())
        } else if kind.accepts_inline() {
            self.set_kind(id, kind);
            for child in children {
                self.coerce_inline_child(id, child);
            }
            Ok(())
        } else {
            Err(TreeError::IncompatibleReplace {
                from,
                to: kind.tag(),
            })
        }
    }

    /// Split a text-carrying node at a character offset.
    ///
    /// Returns the new right-hand node, or `None` when the offset is at
    /// either edge and no split is needed.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> TreeResult<Option<NodeId>> {
        let node = self.node(id)?;
        let Some(text) = node.kind.text_value() else {
            return Err(TreeError::NotText(id));
        };
        let len = text.chars().count();
        if offset > len {
            return Err(TreeError::OffsetOutOfRange { node: id, offset });
        }
        if offset == 0 || offset == len {
            return Ok(None);
        }

        let byte = byte_offset(text, offset);
        let right_text = text[byte..].to_string();
        let mut right_kind = node.kind.clone();
        if let Some(t) = right_kind.text_value_mut() {
            *t = right_text;
        }
        let parent = node.parent;

        if let Some(t) = self.kind_mut(id).and_then(|k| k.text_value_mut()) {
            t.truncate(byte);
        }

        let right = self.create(right_kind);
        if let Some(p) = parent {
            let index = self.index_in_parent(id).unwrap_or(0);
            self.attach(p, index + 1, right);
        }
        Ok(Some(right))
    }

    /// Concatenated text below `id`; sibling blocks are separated by `\n`
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text { text, .. } | NodeKind::CodeHighlight { text, .. } => out.push_str(text),
            NodeKind::LineBreak => out.push('\n'),
            NodeKind::Image(_) => {}
            kind => {
                let separates = kind.accepts_blocks()
                    || matches!(kind, NodeKind::List { .. } | NodeKind::Table | NodeKind::TableRow);
                for (i, child) in node.children.iter().enumerate() {
                    let child_is_block = self.kind(*child).map(|k| k.is_block()).unwrap_or(false);
                    if i > 0 && (separates || child_is_block) {
                        out.push('\n');
                    }
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Pre-order traversal from the root (document reading order)
    pub fn document_order(&self) -> Vec<NodeId> {
        self.descendants(self.root)
    }

    /// Pre-order traversal of the subtree rooted at `id`, including `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn first_text_descendant(&self, id: NodeId) -> Option<NodeId> {
        self.descendants(id)
            .into_iter()
            .find(|n| self.kind(*n).map(|k| k.is_text_like()).unwrap_or(false))
    }

    pub fn last_text_descendant(&self, id: NodeId) -> Option<NodeId> {
        self.descendants(id)
            .into_iter()
            .rev()
            .find(|n| self.kind(*n).map(|k| k.is_text_like()).unwrap_or(false))
    }

    /// A document that is just one empty paragraph
    pub fn is_blank(&self) -> bool {
        match self.children(self.root) {
            [only] => {
                matches!(self.kind(*only), Some(NodeKind::Paragraph)) && self.children(*only).is_empty()
            }
            _ => false,
        }
    }

    /// Append a paragraph with one plain text node to the root
    pub fn push_paragraph(&mut self, text: &str) -> NodeId {
        let paragraph = self.create(NodeKind::Paragraph);
        if !text.is_empty() {
            let t = self.create_text(text);
            self.attach(paragraph, usize::MAX, t);
        }
        let root = self.root;
        self.attach(root, usize::MAX, paragraph);
        paragraph
    }

    /// Check every tree invariant
    pub fn validate(&self) -> TreeResult<()> {
        let root = self.node(self.root)?;
        if !matches!(root.kind, NodeKind::Root) || root.parent.is_some() {
            return Err(TreeError::RootImmutable);
        }
        if root.children.is_empty() {
            return Err(TreeError::EmptyRoot);
        }

        let mut visited = HashSet::new();
        visited.insert(self.root);
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            for child_id in &node.children {
                let child = self.node(*child_id)?;
                if child.parent != Some(id) {
                    return Err(TreeError::ParentMismatch {
                        node: *child_id,
                        listed: child
                            .parent
                            .map(|p| p.to_string())
                            .unwrap_or_else(|| "nothing".to_string()),
                        actual: id,
                    });
                }
                if !visited.insert(*child_id) {
                    return Err(TreeError::CycleDetected);
                }
                if !node.kind.accepts(&child.kind) {
                    return Err(TreeError::invalid_child(node.kind.tag(), child.kind.tag()));
                }
                stack.push(*child_id);
            }
        }

        if visited.len() != self.nodes.len() {
            let orphan = self
                .nodes
                .keys()
                .filter(|id| !visited.contains(id))
                .min()
                .copied();
            if let Some(id) = orphan {
                return Err(TreeError::Orphan(id));
            }
        }

        Ok(())
    }

    pub fn ensure_non_empty(&mut self) {
        let root = self.root;
        self.ensure_container_non_empty(root);
    }

    /// Drop detached nodes left behind by an aborted build
    pub(crate) fn prune_unreachable(&mut self) {
        let reachable: HashSet<NodeId> = self.document_order().into_iter().collect();
        self.nodes.retain(|id, _| reachable.contains(id));
    }

    /// Give an empty root or table cell an empty paragraph
    pub(crate) fn ensure_container_non_empty(&mut self, id: NodeId) {
        let needs_paragraph = self
            .nodes
            .get(&id)
            .map(|n| n.kind.accepts_blocks() && n.children.is_empty())
            .unwrap_or(false);
        if needs_paragraph {
            let paragraph = self.create(NodeKind::Paragraph);
            self.attach(id, 0, paragraph);
        }
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        if child == self.root {
            return Err(TreeError::RootImmutable);
        }
        let parent_node = self.nodes.get(&parent).ok_or(TreeError::ParentNotFound(parent))?;
        let child_node = self.node(child)?;
        if child == parent || self.is_ancestor(child, parent) {
            return Err(TreeError::CycleDetected);
        }
        if !parent_node.kind.accepts(&child_node.kind) {
            return Err(TreeError::invalid_child(
                parent_node.kind.tag(),
                child_node.kind.tag(),
            ));
        }
        Ok(())
    }

    /// Unchecked insertion; callers have validated the edge
    pub(crate) fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if let Some(p) = self.nodes.get_mut(&parent) {
            let index = index.min(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
    }

    pub(crate) fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(n) = self.nodes.get_mut(&id) {
            n.parent = None;
        }
    }

    /// Detach and drop a subtree without the non-empty fix-up of [`DocumentTree::remove`]
    pub(crate) fn discard(&mut self, id: NodeId) {
        self.detach(id);
        self.drop_subtree(id);
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
            }
        }
    }

    fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.kind = kind;
        }
    }

    /// Fill a code block with one code line per `\n`-separated line
    pub fn append_code_lines(&mut self, code: NodeId, text: &str) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                let br = self.create(NodeKind::LineBreak);
                self.attach(code, usize::MAX, br);
            }
            if !line.is_empty() {
                let l = self.create(NodeKind::code_line(line));
                self.attach(code, usize::MAX, l);
            }
        }
    }

    fn coerce_inline_child(&mut self, parent: NodeId, child: NodeId) {
        let Some(kind) = self.kind(child).cloned() else {
            return;
        };
        let parent_accepts = self
            .kind(parent)
            .map(|p| p.accepts(&kind))
            .unwrap_or(false);
        if parent_accepts {
            return;
        }

        if let NodeKind::CodeHighlight { text, .. } = kind {
            self.set_kind(child, NodeKind::text(text));
            return;
        }

        let text = self.text_content(child);
        let index = self.index_in_parent(child).unwrap_or(usize::MAX);
        self.detach(child);
        self.drop_subtree(child);
        if !text.is_empty() {
            let t = self.create_text(&text);
            self.attach(parent, index, t);
        }
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte index of the `chars`-th character (or the end of the string)
pub(crate) fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}
