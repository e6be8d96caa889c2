//! # Legacy-Tolerant Deserializer
//!
//! Builds a tree from stored document JSON of any shape the application has
//! produced over time:
//!
//! - `{ "root": {...}, "version": 1 }`
//! - `{ "editorState": { "root": {...} } }`
//! - a bare root object, or a single bare node
//! - a JSON document stored inside a JSON string
//! - a plain string (one paragraph holding that text)
//! - `null` / empty input (one empty paragraph)
//!
//! Import never fails. Unknown or malformed nodes are skipped and their text
//! moved into a sibling paragraph; misplaced nodes are wrapped in the
//! containers the grammar requires or unwrapped into their parent. Every
//! skip and repair is recorded in a [`DeserializeReport`].

use crate::node::{Alignment, ListType, NodeId, NodeKind};
use crate::registry::{JsonMap, NodeRegistry};
use crate::serializer::DOCUMENT_VERSION;
use crate::tree::DocumentTree;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// JSON-in-a-string layers unwrapped before the text is taken literally
const MAX_STRING_NESTING: usize = 4;

/// Nodes nested deeper than this are flattened to text
const MAX_DEPTH: usize = 128;

/// What the deserializer had to skip or repair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeserializeReport {
    /// Tags of unknown or malformed nodes that were dropped
    pub skipped: Vec<String>,
    /// Structural repairs applied
    pub repairs: Vec<String>,
}

impl DeserializeReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.repairs.is_empty()
    }
}

/// Deserialize with the built-in registry
pub fn deserialize(input: &Value) -> DocumentTree {
    deserialize_with(input, NodeRegistry::global()).0
}

/// Deserialize raw stored text: a stored document when the JSON has that shape, plain text otherwise
pub fn deserialize_str(input: &str) -> DocumentTree {
    deserialize(&Value::String(input.to_string()))
}

#[instrument(skip(input, registry))]
pub fn deserialize_with(input: &Value, registry: &NodeRegistry) -> (DocumentTree, DeserializeReport) {
    let mut importer = Importer::new(registry);
    importer.import_document(input, 0);
    let (tree, report) = importer.finish();
    info!(
        nodes = tree.node_count(),
        skipped = report.skipped.len(),
        repairs = report.repairs.len(),
        "document deserialized"
    );
    (tree, report)
}

struct Importer<'r> {
    registry: &'r NodeRegistry,
    tree: DocumentTree,
    report: DeserializeReport,
    /// Containers created by repairs; consecutive misplaced siblings share one
    wrappers: HashSet<NodeId>,
    /// Text runs holding salvaged text; following text of the same format joins them
    salvaged_runs: HashSet<NodeId>,
}

impl<'r> Importer<'r> {
    fn new(registry: &'r NodeRegistry) -> Self {
        Self {
            registry,
            tree: DocumentTree::bare(),
            report: DeserializeReport::default(),
            wrappers: HashSet::new(),
            salvaged_runs: HashSet::new(),
        }
    }

    fn import_document(&mut self, value: &Value, nesting: usize) {
        match value {
            Value::Null => {}
            Value::String(s) => self.import_string(s, nesting),
            Value::Bool(_) | Value::Number(_) => {
                self.tree.push_paragraph(&value.to_string());
            }
            Value::Array(items) => {
                let root = self.tree.root();
                self.import_children(root, items, 1);
            }
            Value::Object(map) => self.import_object_document(map, nesting),
        }
    }

    fn import_string(&mut self, text: &str, nesting: usize) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        if let Some(parsed) = parse_stored_document(trimmed, nesting) {
            debug!(nesting, "unwrapping document stored as a JSON string");
            self.import_document(&parsed, nesting + 1);
            return;
        }
        self.tree.push_paragraph(text);
    }

    fn import_object_document(&mut self, map: &JsonMap, nesting: usize) {
        if let Some(version) = map.get("version").and_then(Value::as_u64) {
            if version > u64::from(DOCUMENT_VERSION) {
                warn!(version, "document version is newer than supported, importing anyway");
            }
        }

        if let Some(root) = map.get("root") {
            match root {
                Value::Object(root) => self.import_root(root),
                other => self.import_document(other, nesting),
            }
            return;
        }

        if let Some(state) = map.get("editorState") {
            self.repair("unwrapped editorState envelope".to_string());
            self.import_document(state, nesting);
            return;
        }

        match map.get("type").and_then(Value::as_str) {
            Some("root") | None => self.import_root(map),
            Some(_) => {
                let root = self.tree.root();
                self.import_node(root, map, 1);
            }
        }
    }

    fn import_root(&mut self, map: &JsonMap) {
        if let Some(children) = map.get("children").and_then(Value::as_array) {
            let root = self.tree.root();
            self.import_children(root, children, 1);
        }
    }

    fn import_children(&mut self, parent: NodeId, children: &[Value], depth: usize) {
        for child in children {
            match child {
                Value::Object(map) => self.import_node(parent, map, depth),
                Value::String(text) => {
                    self.repair("bare string child converted to text".to_string());
                    let t = self.tree.create_text(text);
                    self.attach(parent, t);
                }
                other => {
                    warn!(value = %other, "skipping non-object child");
                    self.report.skipped.push(json_type_name(other).to_string());
                }
            }
        }
    }

    fn import_node(&mut self, parent: NodeId, map: &JsonMap, depth: usize) {
        let tag = map.get("type").and_then(Value::as_str).unwrap_or_default();

        if depth > MAX_DEPTH {
            self.repair(format!("{tag} nested too deeply, flattened to text"));
            self.salvage(parent, map);
            return;
        }

        let registry = self.registry;
        let Some(behavior) = registry.resolve(tag) else {
            warn!(tag, "skipping unknown node type");
            self.report.skipped.push(display_tag(tag));
            self.salvage(parent, map);
            return;
        };
        let Some(kind) = behavior.import(map) else {
            warn!(tag, "skipping malformed node");
            self.report.skipped.push(display_tag(tag));
            self.salvage(parent, map);
            return;
        };

        if matches!(kind, NodeKind::Root) {
            self.repair("nested root flattened into its parent".to_string());
            if let Some(children) = map.get("children").and_then(Value::as_array) {
                self.import_children(parent, children, depth + 1);
            }
            return;
        }

        let is_leaf = kind.is_leaf();
        let id = self.tree.create(kind);
        if !is_leaf {
            if let Some(format) = map.get("format").and_then(Value::as_str) {
                if let Some(node) = self.tree.node_mut(id) {
                    node.align = Alignment::parse(format);
                }
            }
            if let Some(children) = map.get("children").and_then(Value::as_array) {
                self.import_children(id, children, depth + 1);
            }
        }
        self.attach(parent, id);
    }

    /// Place `child` under `parent`, repairing grammar violations
    fn attach(&mut self, parent: NodeId, child: NodeId) {
        let (Some(parent_kind), Some(child_kind)) =
            (self.tree.kind(parent).cloned(), self.tree.kind(child).cloned())
        else {
            return;
        };

        if parent_kind.accepts(&child_kind) {
            if self.join_salvaged_run(parent, child) {
                return;
            }
            self.tree.attach(parent, usize::MAX, child);
            return;
        }

        match (&parent_kind, &child_kind) {
            (NodeKind::CodeBlock { .. }, NodeKind::Text { text, .. }) => {
                self.convert(child, NodeKind::code_line(text.clone()));
                self.tree.attach(parent, usize::MAX, child);
            }
            (p, NodeKind::CodeHighlight { text, .. }) if p.accepts(&NodeKind::text("")) => {
                self.convert(child, NodeKind::text(text.clone()));
                self.tree.attach(parent, usize::MAX, child);
            }
            (NodeKind::Table, _) => {
                let row = self.wrapper(parent, NodeKind::TableRow);
                self.attach(row, child);
            }
            (NodeKind::TableRow, _) => {
                let cell = self.wrapper(parent, NodeKind::TableCell { header: false });
                self.attach(cell, child);
            }
            (NodeKind::List { .. }, _) => {
                let item = self.wrapper(parent, NodeKind::ListItem { value: 1 });
                self.attach(item, child);
            }
            (p, c) if p.accepts_blocks() && (c.is_inline() || matches!(c, NodeKind::CodeHighlight { .. })) => {
                let paragraph = self.wrapper(parent, NodeKind::Paragraph);
                self.attach(paragraph, child);
            }
            (p, NodeKind::TableRow | NodeKind::TableCell { .. }) if p.accepts_blocks() => {
                let table = self.wrapper(parent, NodeKind::Table);
                self.attach(table, child);
            }
            (p, NodeKind::ListItem { .. })
                if p.accepts_blocks() || matches!(p, NodeKind::ListItem { .. }) =>
            {
                let list = self.wrapper(
                    parent,
                    NodeKind::List {
                        list_type: ListType::Bullet,
                        start: 1,
                    },
                );
                self.attach(list, child);
            }
            _ => self.unwrap_into(parent, child),
        }
    }

    /// Move a misplaced node's children into `parent` and drop the node
    fn unwrap_into(&mut self, parent: NodeId, child: NodeId) {
        let parent_tag = self.tree.kind(parent).map(NodeKind::tag).unwrap_or_default();
        let child_tag = self.tree.kind(child).map(NodeKind::tag).unwrap_or_default();
        let grandchildren = self.tree.children(child).to_vec();

        if grandchildren.is_empty() {
            self.repair(format!("dropped {child_tag} not allowed inside {parent_tag}"));
            self.tree.discard(child);
            return;
        }

        self.repair(format!("unwrapped {child_tag} inside {parent_tag}"));
        let separates = self
            .tree
            .kind(child)
            .map(|k| k.is_block() || matches!(k, NodeKind::ListItem { .. } | NodeKind::TableRow | NodeKind::TableCell { .. }))
            .unwrap_or(false);
        let parent_takes_breaks = self
            .tree
            .kind(parent)
            .map(|k| k.accepts(&NodeKind::LineBreak))
            .unwrap_or(false);
        if separates && parent_takes_breaks && !self.tree.children(parent).is_empty() {
            let br = self.tree.create(NodeKind::LineBreak);
            self.tree.attach(parent, usize::MAX, br);
        }

        for grandchild in grandchildren {
            self.tree.detach(grandchild);
            self.attach(parent, grandchild);
        }
        self.tree.discard(child);
    }

    /// Last child of `parent` when it is a wrapper of the same type, else a new wrapper
    fn wrapper(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        if let Some(&last) = self.tree.children(parent).last() {
            let same_type = self.tree.kind(last).map(NodeKind::tag) == Some(kind.tag());
            if same_type && self.wrappers.contains(&last) {
                return last;
            }
        }
        let parent_tag = self.tree.kind(parent).map(NodeKind::tag).unwrap_or_default();
        self.repair(format!("wrapped content of {parent_tag} in {}", kind.tag()));
        let id = self.tree.create(kind);
        self.tree.attach(parent, usize::MAX, id);
        self.wrappers.insert(id);
        id
    }

    fn convert(&mut self, id: NodeId, kind: NodeKind) {
        let from = self.tree.kind(id).map(NodeKind::tag).unwrap_or_default();
        self.repair(format!("converted {from} to {}", kind.tag()));
        if let Some(node) = self.tree.node_mut(id) {
            node.kind = kind;
        }
    }

    /// Keep the text of a dropped node next to where it would have gone
    fn salvage(&mut self, parent: NodeId, map: &JsonMap) {
        let mut text = String::new();
        collect_json_text(map, &mut text);
        if text.is_empty() {
            return;
        }
        debug!(chars = text.chars().count(), "salvaged text of dropped node");

        let takes_blocks = self
            .tree
            .kind(parent)
            .map(NodeKind::accepts_blocks)
            .unwrap_or(false);
        if takes_blocks {
            let t = self.tree.create_text(&text);
            let paragraph = self.tree.create(NodeKind::Paragraph);
            self.tree.attach(paragraph, usize::MAX, t);
            self.tree.attach(parent, usize::MAX, paragraph);
        } else if let Some(run) = self.last_text_run(parent) {
            if let Some(NodeKind::Text { text: existing, .. }) = self.tree.kind_mut(run) {
                existing.push_str(&text);
            }
            self.salvaged_runs.insert(run);
        } else {
            let t = self.tree.create_text(&text);
            self.attach(parent, t);
            self.salvaged_runs.insert(t);
        }
    }

    fn last_text_run(&self, parent: NodeId) -> Option<NodeId> {
        let last = *self.tree.children(parent).last()?;
        matches!(self.tree.kind(last), Some(NodeKind::Text { .. })).then_some(last)
    }

    /// Fold a text node into a preceding salvaged run with the same format and style
    fn join_salvaged_run(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(run) = self
            .last_text_run(parent)
            .filter(|run| self.salvaged_runs.contains(run))
        else {
            return false;
        };
        let text = match (self.tree.kind(child), self.tree.kind(run)) {
            (
                Some(NodeKind::Text { text, format, style }),
                Some(NodeKind::Text { format: run_format, style: run_style, .. }),
            ) if format == run_format && style == run_style => text.clone(),
            _ => return false,
        };
        if let Some(NodeKind::Text { text: existing, .. }) = self.tree.kind_mut(run) {
            existing.push_str(&text);
        }
        self.tree.discard(child);
        true
    }

    fn repair(&mut self, message: String) {
        debug!(%message, "repaired document structure");
        self.report.repairs.push(message);
    }

    fn finish(mut self) -> (DocumentTree, DeserializeReport) {
        self.tree.prune_unreachable();
        let cells: Vec<NodeId> = self
            .tree
            .document_order()
            .into_iter()
            .filter(|id| matches!(self.tree.kind(*id), Some(NodeKind::TableCell { .. })))
            .collect();
        for cell in cells {
            self.tree.ensure_container_non_empty(cell);
        }
        self.tree.ensure_non_empty();

        if let Err(err) = self.tree.validate() {
            warn!(%err, "imported tree failed validation, falling back to plain text");
            let text = self.tree.text_content(self.tree.root());
            let mut tree = DocumentTree::bare();
            if !text.is_empty() {
                tree.push_paragraph(&text);
            }
            tree.ensure_non_empty();
            self.report.repairs.push(format!("fell back to plain text: {err}"));
            return (tree, self.report);
        }

        (self.tree, self.report)
    }
}

/// JSON held in a string, but only when it has the shape of a stored document.
/// Anything else (`{"a": 1}`, `[1, 2]`, a quoted word) is the user's text.
fn parse_stored_document(text: &str, nesting: usize) -> Option<Value> {
    if nesting >= MAX_STRING_NESTING {
        return None;
    }
    if !(text.starts_with('{') || text.starts_with('[') || text.starts_with('"')) {
        return None;
    }
    let parsed = serde_json::from_str::<Value>(text).ok()?;
    let is_document = match &parsed {
        Value::Object(map) => ["root", "editorState", "type", "children"]
            .iter()
            .any(|key| map.contains_key(*key)),
        Value::Array(items) => {
            !items.is_empty()
                && items
                    .iter()
                    .all(|item| item.as_object().is_some_and(|m| m.contains_key("type")))
        }
        Value::String(inner) => parse_stored_document(inner.trim(), nesting + 1).is_some(),
        _ => false,
    };
    is_document.then_some(parsed)
}

/// Text of a raw node and its descendants; nested elements start new lines
fn collect_json_text(map: &JsonMap, out: &mut String) {
    if let Some(Value::String(text)) = map.get("text") {
        out.push_str(text);
    }
    let Some(children) = map.get("children").and_then(Value::as_array) else {
        return;
    };
    for child in children {
        match child {
            Value::Object(m) => {
                if m.contains_key("children") && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                collect_json_text(m, out);
            }
            Value::String(s) => out.push_str(s),
            _ => {}
        }
    }
}

fn display_tag(tag: &str) -> String {
    if tag.is_empty() {
        "<untyped>".to_string()
    } else {
        tag.to_string()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "<null>",
        Value::Bool(_) => "<bool>",
        Value::Number(_) => "<number>",
        Value::String(_) => "<string>",
        Value::Array(_) => "<array>",
        Value::Object(_) => "<object>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render;
    use serde_json::json;

    fn texts(tree: &DocumentTree) -> Vec<String> {
        tree.children(tree.root())
            .iter()
            .map(|c| tree.text_content(*c))
            .collect()
    }

    #[test]
    fn test_plain_string_becomes_one_paragraph() {
        let tree = deserialize(&json!("hello"));
        let root = tree.root();
        assert_eq!(tree.children(root).len(), 1);
        let paragraph = tree.children(root)[0];
        assert_eq!(tree.kind(paragraph), Some(&NodeKind::Paragraph));
        assert_eq!(tree.children(paragraph).len(), 1);
        assert_eq!(tree.text_content(paragraph), "hello");
    }

    #[test]
    fn test_null_and_empty_give_blank_document() {
        assert!(deserialize(&Value::Null).is_blank());
        assert!(deserialize(&json!("   ")).is_blank());
        assert!(deserialize(&json!({})).is_blank());
        assert!(deserialize_str("").is_blank());
    }

    #[test]
    fn test_unknown_node_text_survives_in_sibling_paragraph() {
        let (tree, report) = deserialize_with(
            &json!({ "type": "unknown-widget", "children": [{ "type": "text", "text": "x" }] }),
            NodeRegistry::global(),
        );
        assert_eq!(texts(&tree), vec!["x"]);
        assert_eq!(report.skipped, vec!["unknown-widget"]);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_unknown_node_between_known_siblings() {
        let doc = json!({ "root": { "type": "root", "children": [
            { "type": "paragraph", "children": [{ "type": "text", "text": "a" }] },
            { "type": "poll", "question": "?", "children": [{ "type": "text", "text": "b" }] },
            { "type": "paragraph", "children": [
                { "type": "text", "text": "c" },
                { "type": "emoji", "text": "!" }
            ]}
        ]}});
        let tree = deserialize(&doc);
        assert_eq!(texts(&tree), vec!["a", "b", "c!"]);
    }

    #[test]
    fn test_editor_state_and_string_envelopes() {
        let inner = json!({ "root": { "type": "root", "children": [
            { "type": "paragraph", "children": [{ "type": "text", "text": "wrapped" }] }
        ]}});
        let stored = Value::String(inner.to_string());
        assert_eq!(texts(&deserialize(&stored)), vec!["wrapped"]);

        let envelope = json!({ "editorState": inner });
        let (tree, report) = deserialize_with(&envelope, NodeRegistry::global());
        assert_eq!(texts(&tree), vec!["wrapped"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_bare_root_without_wrapper() {
        let doc = json!({ "children": [
            { "type": "heading", "tag": "h2", "children": [{ "type": "text", "text": "t" }] }
        ]});
        assert_eq!(render(&deserialize(&doc)), "<h2>t</h2>");
    }

    #[test]
    fn test_table_row_with_stray_child_is_repaired() {
        let doc = json!({ "root": { "type": "root", "children": [
            { "type": "table", "children": [
                { "type": "tablerow", "children": [
                    { "type": "paragraph", "children": [{ "type": "text", "text": "stray" }] },
                    { "type": "tablecell", "children": [] }
                ]},
                { "type": "tablecell", "children": [
                    { "type": "paragraph", "children": [{ "type": "text", "text": "loose" }] }
                ]}
            ]}
        ]}});
        let (tree, report) = deserialize_with(&doc, NodeRegistry::global());
        assert!(tree.validate().is_ok());
        assert!(!report.repairs.is_empty());
        assert_eq!(
            render(&tree),
            "<table><tbody><tr><td><p>stray</p></td><td><p><br></p></td></tr><tr><td><p>loose</p></td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_inline_at_root_is_wrapped_once() {
        let doc = json!({ "root": { "type": "root", "children": [
            { "type": "text", "text": "a" },
            { "type": "linebreak" },
            { "type": "text", "text": "b", "format": 1 }
        ]}});
        assert_eq!(render(&deserialize(&doc)), "<p>a<br><strong>b</strong></p>");
    }

    #[test]
    fn test_block_inside_paragraph_is_unwrapped() {
        let doc = json!({ "root": { "type": "root", "children": [
            { "type": "paragraph", "children": [
                { "type": "text", "text": "a" },
                { "type": "paragraph", "children": [{ "type": "text", "text": "b" }] }
            ]}
        ]}});
        let tree = deserialize(&doc);
        assert_eq!(render(&tree), "<p>a<br>b</p>");
    }

    #[test]
    fn test_text_inside_code_becomes_code_line() {
        let doc = json!({ "root": { "type": "root", "children": [
            { "type": "code", "children": [{ "type": "text", "text": "x = 1" }] }
        ]}});
        let tree = deserialize(&doc);
        let code = tree.children(tree.root())[0];
        let line = tree.children(code)[0];
        assert!(matches!(tree.kind(line), Some(NodeKind::CodeHighlight { .. })));
    }

    #[test]
    fn test_malformed_image_is_skipped() {
        let doc = json!({ "root": { "type": "root", "children": [
            { "type": "paragraph", "children": [
                { "type": "image", "altText": "no source" },
                { "type": "text", "text": "after" }
            ]}
        ]}});
        let (tree, report) = deserialize_with(&doc, NodeRegistry::global());
        assert_eq!(report.skipped, vec!["image"]);
        assert_eq!(texts(&tree), vec!["after"]);
    }
}
