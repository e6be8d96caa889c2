//! # Node Registry
//!
//! Behavior for each node type lives in a [`NodeBehavior`] keyed by its wire
//! tag. Serialization, deserialization and rendering look behaviors up here
//! instead of switching over every type, so a type's wire shape or markup can
//! be swapped by registering a replacement.

use crate::html::RenderContext;
use crate::node::{Node, NodeKind};
use crate::nodes;
use crate::tree::DocumentTree;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

pub type JsonMap = Map<String, Value>;

static DEFAULT_REGISTRY: OnceLock<NodeRegistry> = OnceLock::new();

/// Serialize, deserialize and render behavior of one node type
pub trait NodeBehavior: Send + Sync {
    /// Canonical wire tag
    fn tag(&self) -> &'static str;

    /// Additional tags accepted on import
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Fresh payload with default attributes
    fn create(&self) -> NodeKind;

    /// Write type-specific attributes. `type`, `version`, `format` and
    /// `children` are written by the serializer.
    fn export(&self, _node: &Node, _out: &mut JsonMap) {}

    /// Read a payload; `None` marks the object as malformed
    fn import(&self, object: &JsonMap) -> Option<NodeKind>;

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext);
}

/// Tag → behavior lookup table
pub struct NodeRegistry {
    behaviors: HashMap<&'static str, Box<dyn NodeBehavior>>,
    aliases: HashMap<&'static str, &'static str>,
}

impl NodeRegistry {
    /// Registry without any behaviors
    pub fn empty() -> Self {
        Self {
            behaviors: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Registry holding every built-in node type
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for behavior in nodes::builtin() {
            registry.register(behavior);
        }
        registry
    }

    /// Shared registry of built-in types
    pub fn global() -> &'static NodeRegistry {
        DEFAULT_REGISTRY.get_or_init(NodeRegistry::with_defaults)
    }

    /// Add a behavior, replacing any earlier one with the same tag or alias
    pub fn register(&mut self, behavior: Box<dyn NodeBehavior>) {
        let tag = behavior.tag();
        for alias in behavior.aliases() {
            self.aliases.insert(*alias, tag);
        }
        self.aliases.remove(tag);
        self.behaviors.insert(tag, behavior);
    }

    /// Behavior for a wire tag or one of its aliases
    pub fn resolve(&self, tag: &str) -> Option<&dyn NodeBehavior> {
        let canonical = self.aliases.get(tag).copied().unwrap_or(tag);
        self.behaviors.get(canonical).map(|b| b.as_ref())
    }

    /// Behavior owning a payload
    pub fn behavior_for(&self, kind: &NodeKind) -> Option<&dyn NodeBehavior> {
        self.behaviors.get(kind.tag()).map(|b| b.as_ref())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.resolve(tag).is_some()
    }

    /// Canonical tags, sorted
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.behaviors.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
