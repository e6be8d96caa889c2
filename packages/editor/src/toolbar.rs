//! Derived formatting state for toolbars.
//!
//! Recomputed from the tree and selection after every transaction; it is
//! never stored or used as a source of truth.

use crate::commands::BlockType;
use scribe_model::{Alignment, DocumentTree, NodeKind, Selection, TextFormat};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarState {
    /// Formats carried by every selected text node (the armed format for a caret)
    pub active_formats: TextFormat,
    pub block_type: Option<BlockType>,
    pub alignment: Alignment,
    pub in_table: bool,
    pub in_link: bool,
    pub link_url: Option<String>,
}

impl ToolbarState {
    /// State for `selection`; a missing or stale selection gives the default state
    pub fn compute(tree: &DocumentTree, selection: Option<&Selection>) -> Self {
        let Some(selection) = selection else {
            return Self::default();
        };
        let Some(resolved) = selection.resolve(tree) else {
            return Self::default();
        };

        let active_formats = if resolved.is_collapsed() {
            selection.format
        } else {
            let nodes = resolved.text_nodes(tree);
            if nodes.is_empty() {
                TextFormat::empty()
            } else {
                nodes.iter().fold(TextFormat::all(), |acc, n| {
                    acc & tree.kind(*n).map(|k| k.format()).unwrap_or_default()
                })
            }
        };

        let block = tree.closest(resolved.start.key, NodeKind::is_text_block);
        let link = tree.closest(resolved.start.key, |k| matches!(k, NodeKind::Link { .. }));
        let link_url = link.and_then(|l| match tree.kind(l) {
            Some(NodeKind::Link { url }) => Some(url.clone()),
            _ => None,
        });

        Self {
            active_formats,
            block_type: block.and_then(|b| BlockType::of(tree, b)),
            alignment: block.map(|b| tree.align(b)).unwrap_or_default(),
            in_table: tree
                .closest(resolved.start.key, |k| matches!(k, NodeKind::TableCell { .. }))
                .is_some(),
            in_link: link.is_some(),
            link_url,
        }
    }

    pub fn is_active(&self, format: TextFormat) -> bool {
        self.active_formats.contains(format)
    }
}
