//! # Scribe Model
//!
//! Rich-text document model shared by the editor and read-only display.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ stored JSON (any legacy shape) / plain text │
//! └─────────────────────────────────────────────┘
//!                     ↓ deserialize (repair-or-skip)
//! ┌─────────────────────────────────────────────┐
//! │ DocumentTree: arena of typed nodes          │
//! │  - containment grammar, never-empty root    │
//! │  - Selection resolves against it            │
//! └─────────────────────────────────────────────┘
//!          ↓ serialize            ↓ render
//! ┌──────────────────┐   ┌──────────────────────┐
//! │ portable JSON    │   │ sanitized markup     │
//! └──────────────────┘   └──────────────────────┘
//! ```
//!
//! Per-type wire shape and markup live in the [`NodeRegistry`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scribe_model::{deserialize, render, serialize};
//!
//! let tree = deserialize(&stored);
//! let html = render(&tree);
//! let json = serialize(&tree);
//! ```

mod deserializer;
mod error;
mod html;
mod id_generator;
mod node;
pub mod nodes;
mod plain_text;
mod registry;
mod selection;
mod serializer;
mod tree;

pub use error::{SerializeError, TreeError, TreeResult};
pub use html::{align_attr, escape_html, render, render_value, render_with, RenderContext, RenderOptions};
pub use id_generator::IdGenerator;
pub use node::{Alignment, ImagePayload, ListType, Node, NodeId, NodeKind, TextFormat};
pub use nodes::{code_gutter, normalize_url, resize_image, sanitize_url, ResizeBounds, ResizeHandle};
pub use plain_text::{document_excerpt, excerpt, plain_text, DEFAULT_EXCERPT_LIMIT};
pub use registry::{JsonMap, NodeBehavior, NodeRegistry};
pub use selection::{
    point_at_text_offset, text_offset_in, DocumentOrder, Point, PointKind, ResolvedSelection, Selection,
};
pub use serializer::{
    deserialize, deserialize_str, deserialize_with, serialize, serialize_with, to_json_string,
    to_json_string_pretty, DeserializeReport, DOCUMENT_VERSION,
};
pub use tree::DocumentTree;
