//! Plain-text extraction for previews and summaries.

use crate::tree::DocumentTree;

/// Length of the preview excerpt handed to the surrounding application
pub const DEFAULT_EXCERPT_LIMIT: usize = 210;

const ELLIPSIS: &str = "...";

/// Text of the whole document, blocks separated by newlines
pub fn plain_text(tree: &DocumentTree) -> String {
    tree.text_content(tree.root())
}

/// First `limit` characters of `text`, with `...` appended when cut
pub fn excerpt(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte, _)) => format!("{}{ELLIPSIS}", &text[..byte]),
        None => text.to_string(),
    }
}

/// Whitespace-collapsed excerpt of a document
pub fn document_excerpt(tree: &DocumentTree, limit: usize) -> String {
    let collapsed = plain_text(tree).split_whitespace().collect::<Vec<_>>().join(" ");
    excerpt(&collapsed, limit)
}
