//! # Commands
//!
//! Typed editing messages consumed by the [`Pipeline`](crate::Pipeline).
//!
//! Every command is resolved against the session's current selection. A
//! selection that no longer addresses live nodes makes the command a no-op,
//! never an error. Commands report what happened through [`CommandOutcome`];
//! only internal failures (a structural operation the tree refused) surface
//! as [`EditorError`], and the pipeline rolls those back.

mod blocks;
mod edit;
mod format;
mod insert;
mod links;
mod tables;
mod text;

pub use blocks::BlockType;
pub use insert::{InsertPayload, MAX_TABLE_SIZE};
pub use tables::TableAction;

use crate::{EditorError, EditorSession, NoOpReason};
use scribe_model::{Alignment, NodeId, Selection, TextFormat, TreeError};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// An editing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    /// Move the caret or range; resets the sticky format to the caret's
    SetSelection { selection: Selection },

    /// Flip a format on the selected text, or arm it for the next typed text
    FormatText { format: TextFormat },

    /// Convert the blocks touched by the selection
    TransformBlock { target: BlockType },

    /// Insert a leaf or structure at the caret, replacing a ranged selection
    InsertNode { node: InsertPayload },

    /// Structural change relative to the cell holding the anchor
    MutateTable { action: TableAction },

    /// Wrap the selection in a link, or unwrap it when `url` is omitted
    ToggleLink {
        #[serde(default)]
        url: Option<String>,
    },

    SetAlignment { align: Alignment },

    /// Typed or pasted text; `\n` becomes a line break
    InsertText { text: String },

    DeleteSelection,

    /// Commit the final size of an image drag
    ResizeImage { node: NodeId, width: u32, height: u32 },
}

impl Command {
    /// Short name used in logs and history descriptions
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetSelection { .. } => "set-selection",
            Command::FormatText { .. } => "format-text",
            Command::TransformBlock { .. } => "transform-block",
            Command::InsertNode { .. } => "insert-node",
            Command::MutateTable { .. } => "mutate-table",
            Command::ToggleLink { .. } => "toggle-link",
            Command::SetAlignment { .. } => "set-alignment",
            Command::InsertText { .. } => "insert-text",
            Command::DeleteSelection => "delete-selection",
            Command::ResizeImage { .. } => "resize-image",
        }
    }
}

/// Result of executing one command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// The command took effect. `tree_changed` is false for selection-only
    /// changes such as arming a sticky format.
    Applied { tree_changed: bool },

    /// Nothing happened
    NoOp(NoOpReason),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied { .. })
    }

    pub fn tree_changed(&self) -> bool {
        matches!(self, CommandOutcome::Applied { tree_changed: true })
    }
}

/// Early exit of a command handler
#[derive(Debug)]
pub(crate) enum Abort {
    NoOp(NoOpReason),
    Failed(EditorError),
}

impl From<NoOpReason> for Abort {
    fn from(reason: NoOpReason) -> Self {
        Abort::NoOp(reason)
    }
}

impl From<TreeError> for Abort {
    fn from(err: TreeError) -> Self {
        Abort::Failed(err.into())
    }
}

pub(crate) type Step<T = CommandOutcome> = Result<T, Abort>;

const CHANGED: CommandOutcome = CommandOutcome::Applied { tree_changed: true };

/// Execute one command against a session.
///
/// A handler that bails out with a no-op may already have split text nodes;
/// the [`Pipeline`](crate::Pipeline) restores its checkpoint in that case.
#[instrument(skip(session, command), fields(session = %session.id, command = command.name()))]
pub fn execute(session: &mut EditorSession, command: &Command) -> Result<CommandOutcome, EditorError> {
    if !session.is_live() {
        return Ok(CommandOutcome::NoOp(NoOpReason::SessionClosed));
    }

    let step = match command {
        Command::SetSelection { selection } => set_selection(session, selection),
        Command::FormatText { format } => format::toggle_format(session, *format),
        Command::TransformBlock { target } => blocks::transform(session, target),
        Command::InsertNode { node } => insert::insert_node(session, node),
        Command::MutateTable { action } => tables::mutate(session, *action),
        Command::ToggleLink { url } => links::toggle_link(session, url.as_deref()),
        Command::SetAlignment { align } => blocks::set_alignment(session, *align),
        Command::InsertText { text } => text::insert_text(session, text),
        Command::DeleteSelection => text::delete_selection(session),
        Command::ResizeImage {
            node,
            width,
            height,
        } => insert::resize_image(session, *node, *width, *height),
    };

    match step {
        Ok(outcome) => {
            debug!(?outcome, "command executed");
            Ok(outcome)
        }
        Err(Abort::NoOp(reason)) => Ok(CommandOutcome::NoOp(reason)),
        Err(Abort::Failed(err)) => Err(err),
    }
}

fn set_selection(session: &mut EditorSession, selection: &Selection) -> Step {
    let resolved = selection
        .resolve(session.tree())
        .ok_or(NoOpReason::StaleSelection)?;
    let format = edit::format_at(session.tree(), resolved.start);
    session.set_selection(Some(selection.clone().with_format(format)));
    Ok(CommandOutcome::Applied { tree_changed: false })
}
