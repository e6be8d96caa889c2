use super::edit::{isolate, merge_text_runs, oriented, resolve};
use super::{CommandOutcome, Step, CHANGED};
use crate::{EditorSession, NoOpReason};
use scribe_model::{NodeId, NodeKind, TextFormat};

/// Toggle `format` on every text node in the range.
///
/// The format counts as active only when every intersected text node carries
/// it, so a mixed range is switched on for all nodes first. A caret only arms
/// the format for the next typed text.
pub(super) fn toggle_format(session: &mut EditorSession, format: TextFormat) -> Step {
    if format.is_empty() {
        return Err(NoOpReason::InvalidPayload("empty format".to_string()).into());
    }
    let resolved = resolve(session)?;

    if resolved.is_collapsed() {
        let Some(mut selection) = session.selection().cloned() else {
            return Err(NoOpReason::NoSelection.into());
        };
        selection.format = apply(selection.format, format, !selection.format.contains(format));
        session.set_selection(Some(selection));
        return Ok(CommandOutcome::Applied {
            tree_changed: false,
        });
    }

    if resolved.text_nodes(session.tree()).is_empty() {
        return Err(NoOpReason::NothingSelected.into());
    }

    let tree = session.tree_mut();
    let (start, end) = isolate(tree, resolved.start, resolved.end)?;
    let nodes = oriented(start, end, false)
        .resolve(tree)
        .map(|r| r.text_nodes(tree))
        .unwrap_or_default();

    let active = nodes
        .iter()
        .all(|n| tree.kind(*n).map(|k| k.format().contains(format)).unwrap_or(false));

    for node in &nodes {
        if let Some(NodeKind::Text { format: current, .. }) = tree.kind_mut(*node) {
            *current = apply(*current, format, !active);
        }
    }

    let mut selection = oriented(start, end, resolved.backward);
    selection.format = nodes
        .first()
        .and_then(|n| tree.kind(*n))
        .map(|k| k.format())
        .unwrap_or_default();

    let mut parents: Vec<NodeId> = Vec::new();
    for node in &nodes {
        if let Some(parent) = tree.parent(*node) {
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
    }
    for parent in parents {
        merge_text_runs(tree, parent, &mut selection)?;
    }

    session.set_selection(Some(selection));
    Ok(CHANGED)
}

/// Subscript and superscript exclude each other
fn apply(current: TextFormat, format: TextFormat, on: bool) -> TextFormat {
    let exclusive = TextFormat::SUBSCRIPT | TextFormat::SUPERSCRIPT;
    let mut next = current;
    if on && format.intersects(exclusive) {
        next.remove(exclusive);
    }
    next.set(format, on);
    next
}
