use super::edit::{
    byte_index, can_place, container_of, delete_range, format_at, merge_text_runs, place_leaf,
    point_after, resolve, sticky_format,
};
use super::{Step, CHANGED};
use crate::{EditorSession, NoOpReason};
use scribe_model::{DocumentTree, NodeKind, Point, PointKind, Selection, TextFormat};

/// Insert typed text at the caret, replacing a ranged selection.
///
/// Text lands in the caret's node when that node already carries the armed
/// format; otherwise a new text node with the armed format is placed at the
/// caret. Inside a code block text becomes code lines.
pub(super) fn insert_text(session: &mut EditorSession, text: &str) -> Step {
    if text.is_empty() {
        return Err(NoOpReason::InvalidPayload("empty text".to_string()).into());
    }
    let resolved = resolve(session)?;
    let sticky = sticky_format(session);
    let tree = session.tree_mut();

    let mut caret = if resolved.is_collapsed() {
        resolved.start
    } else {
        delete_range(tree, &resolved)?
    };
    let in_code = tree
        .closest(caret.key, |k| matches!(k, NodeKind::CodeBlock { .. }))
        .is_some();

    for (i, segment) in text.split('\n').enumerate() {
        if i > 0 {
            if !can_place(tree, caret, &NodeKind::LineBreak) {
                return Err(NoOpReason::InvalidPosition("a line break").into());
            }
            let br = tree.create(NodeKind::LineBreak);
            place_leaf(tree, caret, br)?;
            caret = point_after(tree, br);
        }
        if !segment.is_empty() {
            caret = insert_segment(tree, caret, segment, sticky, in_code)?;
        }
    }

    let mut selection = Selection::caret(caret).with_format(sticky);
    if let Some(container) = container_of(tree, caret) {
        merge_text_runs(tree, container, &mut selection)?;
    }
    session.set_selection(Some(selection));
    Ok(CHANGED)
}

fn insert_segment(
    tree: &mut DocumentTree,
    caret: Point,
    segment: &str,
    sticky: TextFormat,
    in_code: bool,
) -> Step<Point> {
    if caret.kind == PointKind::Text {
        let extends = match tree.kind(caret.key) {
            Some(NodeKind::Text { format, .. }) => *format == sticky,
            Some(NodeKind::CodeHighlight { .. }) => true,
            _ => false,
        };
        if extends {
            if let Some(text) = tree.kind_mut(caret.key).and_then(|k| k.text_value_mut()) {
                let at = byte_index(text, caret.offset);
                text.insert_str(at, segment);
                return Ok(Point::text(caret.key, caret.offset + segment.chars().count()));
            }
        }
    }

    let kind = if in_code {
        NodeKind::code_line(segment)
    } else {
        NodeKind::formatted_text(segment, sticky)
    };
    if !can_place(tree, caret, &kind) {
        return Err(NoOpReason::InvalidPosition("text").into());
    }
    let node = tree.create(kind);
    place_leaf(tree, caret, node)?;
    Ok(point_after(tree, node))
}

/// Remove the content of a ranged selection, joining the blocks at its ends
pub(super) fn delete_selection(session: &mut EditorSession) -> Step {
    let resolved = resolve(session)?;
    if resolved.is_collapsed() {
        return Err(NoOpReason::NothingSelected.into());
    }
    let tree = session.tree_mut();
    let caret = delete_range(tree, &resolved)?;
    let format = format_at(tree, caret);
    session.set_selection(Some(Selection::caret(caret).with_format(format)));
    Ok(CHANGED)
}
