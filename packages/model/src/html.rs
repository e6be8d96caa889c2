//! # Markup Rendering
//!
//! Depth-first rendering of a document to sanitized HTML. Each node renders
//! through its registry behavior; all text and attribute values pass through
//! [`escape_html`] before they reach the buffer.

use crate::node::{Alignment, Node, NodeId};
use crate::registry::NodeRegistry;
use crate::serializer::deserialize;
use crate::tree::DocumentTree;
use serde_json::Value;
use tracing::warn;

/// Options for markup rendering
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Put every block on its own indented line
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: "  ".to_string(),
        }
    }
}

/// Output buffer plus the registry used to dispatch child nodes
pub struct RenderContext<'a> {
    registry: &'a NodeRegistry,
    options: RenderOptions,
    depth: usize,
    buffer: String,
}

impl<'a> RenderContext<'a> {
    pub fn new(registry: &'a NodeRegistry, options: RenderOptions) -> Self {
        Self {
            registry,
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    /// Raw markup
    pub fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Escaped text content
    pub fn add_text(&mut self, text: &str) {
        self.buffer.push_str(&escape_html(text));
    }

    /// One block-level line; pretty output indents it and ends the line
    pub fn line(&mut self, f: impl FnOnce(&mut Self)) {
        if self.options.pretty {
            self.add_indent();
        }
        f(self);
        if self.options.pretty {
            self.add("\n");
        }
    }

    pub fn add_line(&mut self, text: &str) {
        self.line(|ctx| ctx.add(text));
    }

    fn add_indent(&mut self) {
        let indent = self.options.indent.clone();
        for _ in 0..self.depth {
            self.add(&indent);
        }
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    /// Render one node through its registry behavior
    pub fn render_node(&mut self, tree: &DocumentTree, id: NodeId) {
        let Some(node) = tree.get(id) else {
            return;
        };
        let registry = self.registry;
        match registry.behavior_for(&node.kind) {
            Some(behavior) => behavior.render(tree, node, self),
            None => {
                warn!(tag = node.tag(), "no behavior registered, rendering text only");
                self.add_text(&tree.text_content(id));
            }
        }
    }

    pub fn render_children(&mut self, tree: &DocumentTree, node: &Node) {
        for child in &node.children {
            self.render_node(tree, *child);
        }
    }

    /// Children of a block container, each on its own line when pretty
    pub fn render_block_children(&mut self, tree: &DocumentTree, node: &Node) {
        self.indent();
        self.render_children(tree, node);
        self.dedent();
    }

    fn into_output(self) -> String {
        self.buffer
    }
}

/// `style` attribute for an aligned block, empty when unaligned
pub fn align_attr(align: Alignment) -> String {
    match align {
        Alignment::Unset => String::new(),
        other => format!(" style=\"text-align: {}\"", other.as_str()),
    }
}

/// Render with the built-in registry and compact output
pub fn render(tree: &DocumentTree) -> String {
    render_with(tree, NodeRegistry::global(), &RenderOptions::default())
}

/// Render a document; a blank document renders as an empty string
pub fn render_with(tree: &DocumentTree, registry: &NodeRegistry, options: &RenderOptions) -> String {
    if tree.is_blank() {
        return String::new();
    }
    let mut ctx = RenderContext::new(registry, options.clone());
    ctx.render_node(tree, tree.root());
    ctx.into_output()
}

/// Render stored document JSON of any accepted shape
pub fn render_value(input: &Value) -> String {
    render(&deserialize(input))
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
