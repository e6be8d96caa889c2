//! # Editor Session
//!
//! The one live tree + selection pair of an editing context. Commands receive
//! the session explicitly; nothing reaches it through global state.
//!
//! Every session carries a generation number. Tearing the session down or
//! loading a new document moves it to a fresh generation, which is how late
//! asynchronous results (image decodes) detect that their context is gone.

use crate::{EditorConfig, EditorError};
use scribe_model::{
    deserialize_with, document_excerpt, render, resize_image, serialize, to_json_string,
    DeserializeReport, DocumentTree, NodeId, NodeKind, NodeRegistry, Point, ResizeBounds,
    ResizeHandle, Selection,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Saved tree + selection, used for rollback and history
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tree: DocumentTree,
    pub selection: Option<Selection>,
}

/// Single editing session
pub struct EditorSession {
    /// Session identifier
    pub id: String,
    tree: DocumentTree,
    selection: Option<Selection>,
    generation: u64,
    live: bool,
    config: EditorConfig,
}

impl EditorSession {
    /// Session over an empty document with the caret at its start
    pub fn new(id: impl Into<String>, config: EditorConfig) -> Self {
        let tree = DocumentTree::new();
        let selection = Some(Selection::caret_at_start(&tree, tree.root()));
        Self {
            id: id.into(),
            tree,
            selection,
            generation: next_generation(),
            live: true,
            config,
        }
    }

    /// Session over stored document JSON of any accepted shape
    pub fn from_value(id: impl Into<String>, stored: &Value, config: EditorConfig) -> (Self, DeserializeReport) {
        let mut session = Self::new(id, config);
        let report = session.load(stored);
        (session, report)
    }

    /// Replace the document; outstanding asynchronous work is invalidated
    pub fn load(&mut self, stored: &Value) -> DeserializeReport {
        let (tree, report) = deserialize_with(stored, NodeRegistry::global());
        self.selection = Some(Selection::caret_at_start(&tree, tree.root()));
        self.tree = tree;
        self.generation = next_generation();
        info!(session = %self.id, generation = self.generation, "document loaded");
        report
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut DocumentTree {
        &mut self.tree
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub(crate) fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// End the session; late asynchronous results are discarded from now on
    pub fn teardown(&mut self) {
        self.live = false;
        self.generation = next_generation();
        info!(session = %self.id, "session torn down");
    }

    pub fn checkpoint(&self) -> Snapshot {
        Snapshot {
            tree: self.tree.clone(),
            selection: self.selection.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.tree = snapshot.tree;
        self.selection = snapshot.selection;
    }

    /// Immutable JSON snapshot of the current document
    pub fn serialize(&self) -> Value {
        serialize(&self.tree)
    }

    pub fn to_json_string(&self) -> Result<String, EditorError> {
        if !self.live {
            return Err(EditorError::SessionClosed);
        }
        Ok(to_json_string(&self.tree)?)
    }

    pub fn render(&self) -> String {
        render(&self.tree)
    }

    /// Plain-text preview bounded by the configured excerpt limit
    pub fn excerpt(&self) -> String {
        document_excerpt(&self.tree, self.config.excerpt_limit)
    }

    /// Size an image would take for a pointer drag, without changing it.
    ///
    /// `natural` is the image's intrinsic size, used when the node has no
    /// explicit dimensions.
    pub fn preview_resize(
        &self,
        image: NodeId,
        natural: (u32, u32),
        handle: ResizeHandle,
        delta: (f64, f64),
        container_width: f64,
    ) -> Option<(u32, u32)> {
        let NodeKind::Image(payload) = self.tree.kind(image)? else {
            return None;
        };
        let start = (
            payload.width.unwrap_or(natural.0),
            payload.height.unwrap_or(natural.1),
        );
        let bounds = ResizeBounds {
            padding: f64::from(self.config.image.container_padding),
            min_size: f64::from(self.config.image.min_size),
            ..ResizeBounds::new(container_width)
        };
        Some(resize_image(start, handle, delta, &bounds))
    }

    /// Caret at the very end of the document
    pub(crate) fn caret_at_document_end(&self) -> Selection {
        let root = self.tree.root();
        match self.tree.children(root).last() {
            Some(last) => Selection::caret_at_end(&self.tree, *last),
            None => Selection::caret(Point::element(root, 0)),
        }
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("live", &self.live)
            .field("nodes", &self.tree.node_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_creation() {
        let session = EditorSession::new("client-1", EditorConfig::default());

        assert_eq!(session.id, "client-1");
        assert!(session.is_live());
        assert!(session.tree().is_blank());
        assert!(session.selection().unwrap().resolve(session.tree()).is_some());
    }

    #[test]
    fn test_load_moves_to_new_generation() {
        let mut session = EditorSession::new("client-1", EditorConfig::default());
        let before = session.generation();
        let report = session.load(&json!("hello"));

        assert!(report.is_clean());
        assert_ne!(session.generation(), before);
        assert_eq!(session.render(), "<p>hello</p>");
    }

    #[test]
    fn test_teardown_rejects_serialization() {
        let mut session = EditorSession::new("client-1", EditorConfig::default());
        let before = session.generation();
        session.teardown();

        assert!(!session.is_live());
        assert_ne!(session.generation(), before);
        assert!(matches!(session.to_json_string(), Err(EditorError::SessionClosed)));
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut session = EditorSession::new("client-1", EditorConfig::default());
        let saved = session.checkpoint();
        session.load(&json!("changed"));
        session.restore(saved);

        assert!(session.tree().is_blank());
    }

    #[test]
    fn test_preview_resize_uses_config() {
        let (session, _) = EditorSession::from_value(
            "client-1",
            &json!({ "root": { "type": "root", "children": [
                { "type": "paragraph", "children": [
                    { "type": "image", "src": "/a.png", "width": 200, "height": 100 }
                ]}
            ]}}),
            EditorConfig::default(),
        );
        let tree = session.tree();
        let paragraph = tree.children(tree.root())[0];
        let image = tree.children(paragraph)[0];

        let size = session.preview_resize(image, (0, 0), ResizeHandle::East, (1000.0, 0.0), 300.0);
        assert_eq!(size, Some((284, 142)));
        assert_eq!(session.preview_resize(paragraph, (0, 0), ResizeHandle::East, (1.0, 0.0), 300.0), None);
    }
}
