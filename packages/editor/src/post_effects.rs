//! # Post-Effect System
//!
//! Listeners that run once per closed transaction.
//!
//! ## Design
//!
//! The pipeline notifies every registered effect after a transaction has
//! closed, in the order transactions closed. Effects see the settled tree and
//! selection through an [`UpdateEvent`]; they never observe a command half
//! applied.
//!
//! An effect may answer with follow-up commands. Those are not applied to the
//! transaction that just closed: the pipeline runs them as a new transaction,
//! which notifies again.
//!
//! Built-in effects:
//! - [`ToolbarStateEffect`]: recomputes [`ToolbarState`] for the selection
//! - [`AutosizeEffect`]: estimates the editor height from the content
//! - [`ChangeCallbackEffect`]: hands the serialized document to the host

use crate::commands::{Command, CommandOutcome};
use crate::toolbar::ToolbarState;
use crate::EditorConfig;
use scribe_model::{document_excerpt, to_json_string, DocumentTree, NodeKind, Selection};
use tracing::warn;

/// Snapshot of a settled transaction handed to each effect
#[derive(Debug, Clone, Copy)]
pub struct UpdateEvent<'a> {
    /// Sequence number of the transaction, starting at 1
    pub transaction: u64,
    pub tree: &'a DocumentTree,
    pub selection: Option<&'a Selection>,
    /// Whether any command in the transaction changed the tree
    pub tree_changed: bool,
    pub outcomes: &'a [CommandOutcome],
    pub config: &'a EditorConfig,
}

/// Listener notified after every transaction
pub trait PostEffect {
    fn name(&self) -> &'static str;

    /// React to a settled transaction, optionally requesting follow-up commands
    fn on_update(&mut self, event: &UpdateEvent<'_>) -> Vec<Command>;
}

/// Recomputes toolbar state on every notification
pub struct ToolbarStateEffect {
    sink: Box<dyn FnMut(&ToolbarState)>,
}

impl ToolbarStateEffect {
    pub fn new(sink: impl FnMut(&ToolbarState) + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }
}

impl PostEffect for ToolbarStateEffect {
    fn name(&self) -> &'static str {
        "toolbar-state"
    }

    fn on_update(&mut self, event: &UpdateEvent<'_>) -> Vec<Command> {
        let state = ToolbarState::compute(event.tree, event.selection);
        (self.sink)(&state);
        Vec::new()
    }
}

/// Estimates the editor height and reports it when it changes
pub struct AutosizeEffect {
    sink: Box<dyn FnMut(u32)>,
    last: Option<u32>,
}

impl AutosizeEffect {
    pub fn new(sink: impl FnMut(u32) + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            last: None,
        }
    }
}

/// Content height: one line per text block and line break, plus spacing
/// between top-level blocks, clamped to the configured bounds
pub fn estimate_height(tree: &DocumentTree, config: &EditorConfig) -> u32 {
    let autosize = &config.autosize;
    let mut lines: u32 = 0;
    for id in tree.document_order() {
        match tree.kind(id) {
            Some(kind) if kind.is_text_block() => lines += 1,
            Some(NodeKind::LineBreak) => lines += 1,
            _ => {}
        }
    }
    let blocks = tree.children(tree.root()).len() as u32;
    let height = lines
        .saturating_mul(autosize.line_height)
        .saturating_add(blocks.saturating_mul(autosize.block_spacing));
    height.clamp(autosize.min_height, autosize.max_height.max(autosize.min_height))
}

impl PostEffect for AutosizeEffect {
    fn name(&self) -> &'static str {
        "autosize"
    }

    fn on_update(&mut self, event: &UpdateEvent<'_>) -> Vec<Command> {
        let height = estimate_height(event.tree, event.config);
        if self.last != Some(height) {
            self.last = Some(height);
            (self.sink)(height);
        }
        Vec::new()
    }
}

/// Payload handed to the host application when the document changed
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub transaction: u64,
    /// Serialized document
    pub json: String,
    /// Plain-text preview bounded by the configured excerpt limit
    pub excerpt: String,
}

/// Serializes the document after every transaction that changed it
pub struct ChangeCallbackEffect {
    sink: Box<dyn FnMut(DocumentChange)>,
}

impl ChangeCallbackEffect {
    pub fn new(sink: impl FnMut(DocumentChange) + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }
}

impl PostEffect for ChangeCallbackEffect {
    fn name(&self) -> &'static str {
        "change-callback"
    }

    fn on_update(&mut self, event: &UpdateEvent<'_>) -> Vec<Command> {
        if !event.tree_changed {
            return Vec::new();
        }
        match to_json_string(event.tree) {
            Ok(json) => (self.sink)(DocumentChange {
                transaction: event.transaction,
                json,
                excerpt: document_excerpt(event.tree, event.config.excerpt_limit),
            }),
            Err(err) => warn!(%err, "document could not be serialized for the change callback"),
        }
        Vec::new()
    }
}

/// Post-effect engine that notifies all registered effects
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create an engine without effects
    pub fn new() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    pub fn register(&mut self, effect: Box<dyn PostEffect>) {
        self.effects.push(effect);
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Notify every effect in registration order and collect follow-ups
    pub fn notify(&mut self, event: &UpdateEvent<'_>) -> Vec<Command> {
        let mut follow_ups = Vec::new();
        for effect in &mut self.effects {
            follow_ups.append(&mut effect.on_update(event));
        }
        follow_ups
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PostEffectEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.effects.iter().map(|e| e.name()))
            .finish()
    }
}
