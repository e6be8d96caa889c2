//! # Scribe Editor
//!
//! Editing engine over the scribe document model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host: input events → typed Commands         │
//! └─────────────────────────────────────────────┘
//!                     ↓ dispatch
//! ┌─────────────────────────────────────────────┐
//! │ Pipeline: one transaction per flush         │
//! │  - commands resolve against the Selection   │
//! │  - no-ops and failures roll back            │
//! │  - history records changed transactions     │
//! └─────────────────────────────────────────────┘
//!                     ↓ exactly once per transaction
//! ┌─────────────────────────────────────────────┐
//! │ PostEffects: toolbar, autosize, change sink │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Tree is source of truth**: toolbar state and excerpts are derived views
//! 2. **Explicit session**: commands receive the [`EditorSession`], never a global
//! 3. **No-ops, not errors**: a stale selection or bad payload leaves the
//!    document untouched and reports why
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scribe_editor::{Command, EditorConfig, EditorSession, Pipeline};
//!
//! let (session, _report) = EditorSession::from_value("post-42", &stored, EditorConfig::default());
//! let mut pipeline = Pipeline::new(session);
//!
//! pipeline.dispatch(Command::InsertText { text: "Hello".into() });
//! pipeline.dispatch(Command::FormatText { format: TextFormat::BOLD });
//! pipeline.flush()?;
//!
//! let json = pipeline.session().to_json_string()?;
//! ```

mod commands;
mod config;
mod errors;
mod images;
mod pipeline;
mod post_effects;
mod session;
mod toolbar;
mod undo_stack;

pub use commands::{execute, BlockType, Command, CommandOutcome, InsertPayload, TableAction, MAX_TABLE_SIZE};
pub use config::{AutosizeConfig, EditorConfig, ImageConfig};
pub use errors::{DecodeError, EditorError, NoOpReason};
pub use images::{sniff_mime, DataUrlDecoder, ImageDecoder, ImageFile, ImageTicket};
pub use pipeline::{Pipeline, TransactionReport};
pub use post_effects::{
    estimate_height, AutosizeEffect, ChangeCallbackEffect, DocumentChange, PostEffect, PostEffectEngine,
    ToolbarStateEffect, UpdateEvent,
};
pub use session::{EditorSession, Snapshot};
pub use toolbar::ToolbarState;
pub use undo_stack::{HistoryEntry, UndoStack};

// Re-export model types for convenience
pub use scribe_model::{
    Alignment, DocumentTree, ImagePayload, NodeId, NodeKind, Point, ResizeHandle, Selection, TextFormat,
};
