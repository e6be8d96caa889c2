//! Tree editing primitives shared by the command handlers.

use super::Step;
use crate::{EditorSession, NoOpReason};
use scribe_model::{
    point_at_text_offset, text_offset_in, DocumentTree, NodeId, NodeKind, Point, PointKind,
    ResolvedSelection, Selection, TextFormat, TreeResult,
};

/// Current selection checked against the live tree
pub(super) fn resolve(session: &EditorSession) -> Step<ResolvedSelection> {
    let selection = session.selection().ok_or(NoOpReason::NoSelection)?;
    Ok(selection
        .resolve(session.tree())
        .ok_or(NoOpReason::StaleSelection)?)
}

/// Armed format of the session's selection
pub(super) fn sticky_format(session: &EditorSession) -> TextFormat {
    session
        .selection()
        .map(|s| s.format)
        .unwrap_or_default()
}

/// Format of the text node a point sits in
pub(super) fn format_at(tree: &DocumentTree, point: Point) -> TextFormat {
    tree.kind(point.key).map(|k| k.format()).unwrap_or_default()
}

/// Range between `start` and `end`, oriented like the original selection
pub(super) fn oriented(start: Point, end: Point, backward: bool) -> Selection {
    if backward {
        Selection::range(end, start)
    } else {
        Selection::range(start, end)
    }
}

pub(super) fn text_len(tree: &DocumentTree, id: NodeId) -> usize {
    tree.kind(id).map(|k| k.text_len()).unwrap_or(0)
}

pub(super) fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// Split text at both ends of a range so the range covers whole nodes.
///
/// The end is split first so the start offset stays meaningful when both
/// points sit in the same node. Returns the adjusted points.
pub(super) fn isolate(tree: &mut DocumentTree, start: Point, end: Point) -> TreeResult<(Point, Point)> {
    let mut end = end;
    let mut start = start;

    if end.kind == PointKind::Text {
        tree.split_text(end.key, end.offset)?;
    }
    if start.kind == PointKind::Text {
        if let Some(right) = tree.split_text(start.key, start.offset)? {
            if end.kind == PointKind::Text && end.key == start.key {
                end = Point::text(right, end.offset - start.offset);
            }
            start = Point::text(right, 0);
        }
    }
    Ok((start, end))
}

/// Node that would receive a leaf placed at `point`
pub(super) fn container_of(tree: &DocumentTree, point: Point) -> Option<NodeId> {
    match point.kind {
        PointKind::Text => tree.parent(point.key),
        PointKind::Element => Some(point.key),
    }
}

pub(super) fn can_place(tree: &DocumentTree, point: Point, kind: &NodeKind) -> bool {
    container_of(tree, point)
        .and_then(|c| tree.kind(c))
        .map(|c| c.accepts(kind))
        .unwrap_or(false)
}

/// Attach a detached leaf at a caret, splitting the text under it
pub(super) fn place_leaf(tree: &mut DocumentTree, at: Point, leaf: NodeId) -> TreeResult<()> {
    match at.kind {
        PointKind::Text => {
            if at.offset == 0 {
                return tree.insert_before(at.key, leaf);
            }
            if at.offset < text_len(tree, at.key) {
                tree.split_text(at.key, at.offset)?;
            }
            tree.insert_after(at.key, leaf)
        }
        PointKind::Element => tree.insert_at(at.key, at.offset, leaf),
    }
}

/// Caret directly after an attached node
pub(super) fn point_after(tree: &DocumentTree, id: NodeId) -> Point {
    if tree.kind(id).map(|k| k.is_text_like()).unwrap_or(false) {
        return Point::text(id, text_len(tree, id));
    }
    match (tree.parent(id), tree.index_in_parent(id)) {
        (Some(parent), Some(index)) => Point::element(parent, index + 1),
        _ => Point::element(tree.root(), 0),
    }
}

/// Nearest node (starting at `id`) that sits directly in the root or a table cell
pub(super) fn top_block(tree: &DocumentTree, id: NodeId) -> Option<NodeId> {
    std::iter::once(id)
        .chain(tree.ancestors(id))
        .find(|n| {
            tree.parent(*n)
                .and_then(|p| tree.kind(p))
                .map(|k| k.accepts_blocks())
                .unwrap_or(false)
        })
}

pub(super) fn sibling(tree: &DocumentTree, id: NodeId, after: bool) -> Option<NodeId> {
    let parent = tree.parent(id)?;
    let index = tree.index_in_parent(id)?;
    let siblings = tree.children(parent);
    if after {
        siblings.get(index + 1).copied()
    } else {
        index.checked_sub(1).and_then(|i| siblings.get(i).copied())
    }
}

/// Nearest text block around a point plus the point's offset inside it
pub(super) fn block_mark(tree: &DocumentTree, point: Point) -> Option<(NodeId, usize)> {
    let point = point.normalized(tree);
    let block = tree.closest(point.key, NodeKind::is_text_block)?;
    Some((block, text_offset_in(tree, block, point)?))
}

pub(super) fn is_blank_paragraph(tree: &DocumentTree, id: NodeId) -> bool {
    matches!(tree.kind(id), Some(NodeKind::Paragraph)) && tree.children(id).is_empty()
}

/// Remove links and lists left without children, walking upwards
pub(super) fn remove_if_empty(tree: &mut DocumentTree, id: NodeId) -> TreeResult<()> {
    let mut current = Some(id);
    while let Some(node) = current {
        let empty_wrapper = matches!(
            tree.kind(node),
            Some(NodeKind::Link { .. }) | Some(NodeKind::List { .. })
        ) && tree.children(node).is_empty();
        if !empty_wrapper {
            break;
        }
        current = tree.parent(node);
        tree.remove(node)?;
    }
    Ok(())
}

/// Join adjacent plain text siblings that carry identical formatting.
///
/// Points of `selection` that sit in a merged node are moved onto the
/// surviving node.
pub(super) fn merge_text_runs(
    tree: &mut DocumentTree,
    parent: NodeId,
    selection: &mut Selection,
) -> TreeResult<()> {
    let mut i = 0;
    loop {
        let (left, right) = {
            let children = tree.children(parent);
            if i + 1 >= children.len() {
                break;
            }
            (children[i], children[i + 1])
        };

        let mergeable = match (tree.kind(left), tree.kind(right)) {
            (
                Some(NodeKind::Text {
                    format: f1,
                    style: s1,
                    ..
                }),
                Some(NodeKind::Text {
                    format: f2,
                    style: s2,
                    ..
                }),
            ) => f1 == f2 && s1 == s2,
            _ => false,
        };
        if !mergeable {
            i += 1;
            continue;
        }

        let left_len = text_len(tree, left);
        let right_text = tree
            .kind(right)
            .and_then(|k| k.text_value())
            .unwrap_or_default()
            .to_string();
        if let Some(text) = tree.kind_mut(left).and_then(|k| k.text_value_mut()) {
            text.push_str(&right_text);
        }

        for point in [&mut selection.anchor, &mut selection.focus] {
            match point.kind {
                PointKind::Text if point.key == right => {
                    *point = Point::text(left, left_len + point.offset);
                }
                PointKind::Element if point.key == parent && point.offset > i + 1 => {
                    point.offset -= 1;
                }
                _ => {}
            }
        }
        tree.remove(right)?;
    }
    Ok(())
}

/// Move one inline node into `target`, converting it when the target is a
/// code block. Returns false when the node has no place there.
fn move_inline(tree: &mut DocumentTree, child: NodeId, target: NodeId) -> TreeResult<bool> {
    let Some(kind) = tree.kind(child).cloned() else {
        return Ok(false);
    };
    let Some(target_kind) = tree.kind(target).cloned() else {
        return Ok(false);
    };
    if target_kind.accepts(&kind) {
        tree.append(target, child)?;
        return Ok(true);
    }
    if matches!(target_kind, NodeKind::CodeBlock { .. }) && kind.is_inline() {
        let text = tree.text_content(child);
        tree.remove(child)?;
        if !text.is_empty() {
            tree.append_code_lines(target, &text);
        }
        return Ok(true);
    }
    if target_kind.accepts_inline() {
        if let NodeKind::CodeHighlight { text, .. } = kind {
            let replacement = tree.create(NodeKind::text(text));
            tree.append(target, replacement)?;
            tree.remove(child)?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Delete the content of a ranged selection and return the resulting caret.
///
/// Leaves inside the range are removed, text blocks emptied by the range are
/// dropped, and the block holding the end is merged into the block holding
/// the start.
pub(super) fn delete_range(tree: &mut DocumentTree, resolved: &ResolvedSelection) -> Step<Point> {
    let start_block = tree.closest(resolved.start.key, NodeKind::is_text_block);
    let end_block = tree.closest(resolved.end.key, NodeKind::is_text_block);
    let (Some(start_block), Some(end_block)) = (start_block, end_block) else {
        return Err(NoOpReason::InvalidPosition("a deletion").into());
    };
    let offset = text_offset_in(tree, start_block, resolved.start).unwrap_or(0);
    let middle: Vec<NodeId> = resolved
        .blocks(tree)
        .into_iter()
        .filter(|b| *b != start_block && *b != end_block)
        .collect();

    let (start, end) = isolate(tree, resolved.start, resolved.end)?;
    let leaves = Selection::range(start, end)
        .resolve(tree)
        .map(|r| r.leaves(tree))
        .unwrap_or_default();
    for leaf in leaves {
        let parent = tree.parent(leaf);
        tree.remove(leaf)?;
        if let Some(parent) = parent {
            remove_if_empty(tree, parent)?;
        }
    }

    for block in middle {
        let holds_content = !tree.contains(block)
            || tree.is_ancestor(block, start_block)
            || tree.is_ancestor(block, end_block)
            || tree
                .descendants(block)
                .iter()
                .any(|n| tree.kind(*n).map(|k| k.is_leaf()).unwrap_or(false));
        if holds_content {
            continue;
        }
        let parent = tree.parent(block);
        tree.remove(block)?;
        if let Some(parent) = parent {
            remove_if_empty(tree, parent)?;
        }
    }

    let nested = tree.is_ancestor(start_block, end_block) || tree.is_ancestor(end_block, start_block);
    if end_block != start_block && tree.contains(end_block) && !nested {
        for child in tree.children(end_block).to_vec() {
            move_inline(tree, child, start_block)?;
        }
        if tree.children(end_block).is_empty() {
            let parent = tree.parent(end_block);
            tree.remove(end_block)?;
            if let Some(parent) = parent {
                remove_if_empty(tree, parent)?;
            }
        }
    }

    let mut caret = Selection::caret(point_at_text_offset(tree, start_block, offset));
    merge_text_runs(tree, start_block, &mut caret)?;
    Ok(caret.anchor)
}
