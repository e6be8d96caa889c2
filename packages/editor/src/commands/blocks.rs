use super::edit::{block_mark, resolve, sibling};
use super::{Step, CHANGED};
use crate::{EditorSession, NoOpReason};
use scribe_model::{
    point_at_text_offset, Alignment, DocumentTree, ListType, NodeId, NodeKind, Point, Selection,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Target of a block transform, also reported by the toolbar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockType {
    Paragraph,
    Heading {
        level: u8,
    },
    Quote,
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    BulletList,
    NumberList,
}

impl BlockType {
    /// Block type of a text block as the toolbar shows it
    pub fn of(tree: &DocumentTree, block: NodeId) -> Option<BlockType> {
        match tree.kind(block)? {
            NodeKind::Paragraph => Some(BlockType::Paragraph),
            NodeKind::Heading { level } => Some(BlockType::Heading { level: *level }),
            NodeKind::Quote => Some(BlockType::Quote),
            NodeKind::CodeBlock { language } => Some(BlockType::Code {
                language: language.clone(),
            }),
            NodeKind::ListItem { .. } => match tree.parent(block).and_then(|l| tree.kind(l)) {
                Some(NodeKind::List {
                    list_type: ListType::Number,
                    ..
                }) => Some(BlockType::NumberList),
                _ => Some(BlockType::BulletList),
            },
            _ => None,
        }
    }

    fn list_type(&self) -> Option<ListType> {
        match self {
            BlockType::BulletList => Some(ListType::Bullet),
            BlockType::NumberList => Some(ListType::Number),
            _ => None,
        }
    }

    fn node_kind(&self) -> Option<NodeKind> {
        match self {
            BlockType::Paragraph => Some(NodeKind::Paragraph),
            BlockType::Heading { level } => Some(NodeKind::Heading { level: *level }),
            BlockType::Quote => Some(NodeKind::Quote),
            BlockType::Code { language } => Some(NodeKind::CodeBlock {
                language: language.clone(),
            }),
            BlockType::BulletList | BlockType::NumberList => None,
        }
    }
}

/// Convert every text block touched by the selection to `target`.
///
/// Blocks already of the target type are left alone; when all of them are,
/// the command is a no-op, so applying the same transform twice changes
/// nothing the second time.
pub(super) fn transform(session: &mut EditorSession, target: &BlockType) -> Step {
    if let BlockType::Heading { level } = target {
        if !(1..=6).contains(level) {
            return Err(NoOpReason::InvalidPayload(format!("heading level {level}")).into());
        }
    }
    let resolved = resolve(session)?;
    let Some(selection) = session.selection().cloned() else {
        return Err(NoOpReason::NoSelection.into());
    };

    let tree = session.tree_mut();
    let blocks = resolved.blocks(tree);
    if blocks.is_empty() {
        return Err(NoOpReason::InvalidPosition("a block transform").into());
    }
    let anchor = block_mark(tree, selection.anchor);
    let focus = block_mark(tree, selection.focus);

    let mut replaced: HashMap<NodeId, NodeId> = HashMap::new();
    let mut changed = false;
    for block in blocks {
        if !tree.contains(block) {
            continue;
        }
        changed |= match (target.list_type(), target.node_kind()) {
            (Some(list_type), _) => into_list_item(tree, block, list_type, &mut replaced)?,
            (None, Some(kind)) => into_block(tree, block, kind, &mut replaced)?,
            (None, None) => false,
        };
    }
    if !changed {
        return Err(NoOpReason::AlreadyApplied.into());
    }

    let remap = |mark: Option<(NodeId, usize)>, original: Point, tree: &DocumentTree| match mark {
        Some((block, offset)) => {
            let block = replaced.get(&block).copied().unwrap_or(block);
            point_at_text_offset(tree, block, offset)
        }
        None => original,
    };
    let mut next = Selection::range(
        remap(anchor, selection.anchor, tree),
        remap(focus, selection.focus, tree),
    )
    .with_format(selection.format);
    if next.resolve(tree).is_none() {
        next = Selection::caret_at_start(tree, tree.root());
    }
    session.set_selection(Some(next));
    Ok(CHANGED)
}

fn into_block(
    tree: &mut DocumentTree,
    block: NodeId,
    kind: NodeKind,
    replaced: &mut HashMap<NodeId, NodeId>,
) -> Step<bool> {
    if tree.kind(block) == Some(&kind) {
        return Ok(false);
    }
    if !matches!(tree.kind(block), Some(NodeKind::ListItem { .. })) {
        tree.replace_kind(block, kind)?;
        return Ok(true);
    }

    // Lift the item out of its list, splitting the list around it
    let Some(list) = tree.parent(block) else {
        return Ok(false);
    };
    let lifts_to_container = tree
        .parent(list)
        .and_then(|p| tree.kind(p))
        .map(|k| k.accepts_blocks())
        .unwrap_or(false);
    if !lifts_to_container {
        debug!(%block, "nested list item left in place");
        return Ok(false);
    }
    let index = tree.index_in_parent(block).unwrap_or(0);
    let tail: Vec<NodeId> = tree.children(list).iter().skip(index + 1).copied().collect();

    let lifted = tree.create(NodeKind::Paragraph);
    tree.set_align(lifted, tree.align(block))?;
    let mut nested = Vec::new();
    for child in tree.children(block).to_vec() {
        if matches!(tree.kind(child), Some(NodeKind::List { .. })) {
            nested.push(child);
        } else {
            tree.append(lifted, child)?;
        }
    }

    tree.insert_after(list, lifted)?;
    let mut last = lifted;
    for list_node in nested {
        tree.insert_after(last, list_node)?;
        last = list_node;
    }
    if !tail.is_empty() {
        let rest_kind = tree.kind(list).cloned().unwrap_or(NodeKind::List {
            list_type: ListType::Bullet,
            start: 1,
        });
        let rest = tree.create(rest_kind);
        tree.insert_after(last, rest)?;
        for item in tail {
            tree.append(rest, item)?;
        }
        renumber(tree, rest);
    }

    tree.remove(block)?;
    if tree.children(list).is_empty() {
        tree.remove(list)?;
    } else {
        renumber(tree, list);
    }
    if kind != NodeKind::Paragraph {
        tree.replace_kind(lifted, kind)?;
    }
    replaced.insert(block, lifted);
    Ok(true)
}

fn into_list_item(
    tree: &mut DocumentTree,
    block: NodeId,
    list_type: ListType,
    replaced: &mut HashMap<NodeId, NodeId>,
) -> Step<bool> {
    if matches!(tree.kind(block), Some(NodeKind::ListItem { .. })) {
        let Some(list) = tree.parent(block) else {
            return Ok(false);
        };
        return Ok(match tree.kind_mut(list) {
            Some(NodeKind::List { list_type: current, .. }) if *current != list_type => {
                *current = list_type;
                true
            }
            _ => false,
        });
    }

    if !matches!(tree.kind(block), Some(NodeKind::Paragraph)) {
        tree.replace_kind(block, NodeKind::Paragraph)?;
    }
    let item = tree.create(NodeKind::ListItem { value: 1 });
    tree.set_align(item, tree.align(block))?;
    for child in tree.children(block).to_vec() {
        tree.append(item, child)?;
    }

    let list = match sibling(tree, block, false) {
        Some(prev) if is_list_of(tree, prev, list_type) => prev,
        _ => {
            let list = tree.create(NodeKind::List {
                list_type,
                start: 1,
            });
            tree.insert_before(block, list)?;
            list
        }
    };
    tree.append(list, item)?;
    tree.remove(block)?;

    if let Some(next) = sibling(tree, list, true) {
        if is_list_of(tree, next, list_type) {
            for following in tree.children(next).to_vec() {
                tree.append(list, following)?;
            }
            tree.remove(next)?;
        }
    }
    renumber(tree, list);
    replaced.insert(block, item);
    Ok(true)
}

fn is_list_of(tree: &DocumentTree, id: NodeId, list_type: ListType) -> bool {
    matches!(tree.kind(id), Some(NodeKind::List { list_type: t, .. }) if *t == list_type)
}

/// Item values follow their position, counting from the list start
fn renumber(tree: &mut DocumentTree, list: NodeId) {
    let start = match tree.kind(list) {
        Some(NodeKind::List { start, .. }) => *start,
        _ => return,
    };
    for (i, item) in tree.children(list).to_vec().into_iter().enumerate() {
        if let Some(NodeKind::ListItem { value }) = tree.kind_mut(item) {
            *value = u32::try_from(i).map_or(u32::MAX, |i| start.saturating_add(i));
        }
    }
}

/// Align every text block touched by the selection
pub(super) fn set_alignment(session: &mut EditorSession, align: Alignment) -> Step {
    let resolved = resolve(session)?;
    let tree = session.tree_mut();
    let mut changed = false;
    for block in resolved.blocks(tree) {
        if tree.align(block) != align {
            tree.set_align(block, align)?;
            changed = true;
        }
    }
    if !changed {
        return Err(NoOpReason::AlreadyApplied.into());
    }
    Ok(CHANGED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{execute, Command, CommandOutcome};
    use crate::EditorConfig;
    use serde_json::json;

    fn session(texts: &[&str]) -> EditorSession {
        let children: Vec<_> = texts
            .iter()
            .map(|t| json!({ "type": "paragraph", "children": [{ "type": "text", "text": t }] }))
            .collect();
        let (session, _) = EditorSession::from_value(
            "blocks",
            &json!({ "root": { "type": "root", "children": children } }),
            EditorConfig::default(),
        );
        session
    }

    fn select_all(session: &mut EditorSession) {
        let tree = session.tree();
        let first = tree.first_text_descendant(tree.root()).unwrap();
        let last = tree.last_text_descendant(tree.root()).unwrap();
        let len = tree.kind(last).unwrap().text_len();
        let selection = Selection::range(Point::text(first, 0), Point::text(last, len));
        execute(session, &Command::SetSelection { selection }).unwrap();
    }

    fn transform_to(session: &mut EditorSession, target: BlockType) -> CommandOutcome {
        execute(session, &Command::TransformBlock { target }).unwrap()
    }

    #[test]
    fn test_heading_transform_is_idempotent() {
        let mut session = session(&["title"]);
        select_all(&mut session);

        let first = transform_to(&mut session, BlockType::Heading { level: 2 });
        assert!(first.tree_changed());
        let once = session.serialize();

        let second = transform_to(&mut session, BlockType::Heading { level: 2 });
        assert_eq!(second, CommandOutcome::NoOp(NoOpReason::AlreadyApplied));
        assert_eq!(session.serialize(), once);
        assert_eq!(session.render(), "<h2>title</h2>");
    }

    #[test]
    fn test_paragraphs_join_one_list() {
        let mut session = session(&["one", "two", "three"]);
        select_all(&mut session);

        transform_to(&mut session, BlockType::NumberList);
        assert_eq!(
            session.render(),
            "<ol><li>one</li><li>two</li><li>three</li></ol>"
        );
        let once = session.serialize();

        let again = transform_to(&mut session, BlockType::NumberList);
        assert_eq!(again, CommandOutcome::NoOp(NoOpReason::AlreadyApplied));
        assert_eq!(session.serialize(), once);

        transform_to(&mut session, BlockType::BulletList);
        assert_eq!(
            session.render(),
            "<ul><li>one</li><li>two</li><li>three</li></ul>"
        );
        assert!(session.selection().unwrap().resolve(session.tree()).is_some());
    }

    #[test]
    fn test_joining_list_at_numeric_limit_saturates() {
        let (mut session, _) = EditorSession::from_value(
            "blocks",
            &json!({ "root": { "type": "root", "children": [
                { "type": "list", "listType": "number", "start": u32::MAX, "children": [
                    { "type": "listitem", "children": [{ "type": "text", "text": "last" }] }
                ]},
                { "type": "paragraph", "children": [{ "type": "text", "text": "next" }] }
            ]}}),
            EditorConfig::default(),
        );
        let next = session.tree().last_text_descendant(session.tree().root()).unwrap();
        execute(
            &mut session,
            &Command::SetSelection {
                selection: Selection::caret(Point::text(next, 0)),
            },
        )
        .unwrap();

        assert!(transform_to(&mut session, BlockType::NumberList).tree_changed());
        let tree = session.tree();
        let list = tree.children(tree.root())[0];
        let values: Vec<_> = tree
            .children(list)
            .iter()
            .map(|item| tree.kind(*item).cloned())
            .collect();
        assert_eq!(
            values,
            vec![
                Some(NodeKind::ListItem { value: u32::MAX }),
                Some(NodeKind::ListItem { value: u32::MAX })
            ]
        );
    }

    #[test]
    fn test_lifting_middle_item_splits_list() {
        let mut session = session(&["one", "two", "three"]);
        select_all(&mut session);
        transform_to(&mut session, BlockType::BulletList);

        let tree = session.tree();
        let list = tree.children(tree.root())[0];
        let middle = tree.children(list)[1];
        let text = tree.children(middle)[0];
        execute(
            &mut session,
            &Command::SetSelection {
                selection: Selection::caret(Point::text(text, 1)),
            },
        )
        .unwrap();

        transform_to(&mut session, BlockType::Paragraph);
        assert_eq!(
            session.render(),
            "<ul><li>one</li></ul><p>two</p><ul><li>three</li></ul>"
        );

        let selection = session.selection().unwrap();
        assert_eq!(selection.anchor, Point::text(text, 1));
        assert!(session.tree().validate().is_ok());
    }

    #[test]
    fn test_code_transform_remaps_selection() {
        let mut session = session(&["let x = 1;"]);
        let tree = session.tree();
        let text = tree.first_text_descendant(tree.root()).unwrap();
        execute(
            &mut session,
            &Command::SetSelection {
                selection: Selection::caret(Point::text(text, 4)),
            },
        )
        .unwrap();

        transform_to(&mut session, BlockType::Code { language: None });

        let tree = session.tree();
        let selection = session.selection().unwrap();
        assert!(selection.resolve(tree).is_some());
        assert!(matches!(
            tree.kind(selection.anchor.key),
            Some(NodeKind::CodeHighlight { .. })
        ));
        assert_eq!(selection.anchor.offset, 4);
    }

    #[test]
    fn test_invalid_heading_level() {
        let mut session = session(&["x"]);
        assert!(matches!(
            transform_to(&mut session, BlockType::Heading { level: 9 }),
            CommandOutcome::NoOp(NoOpReason::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_alignment_applies_once() {
        let mut session = session(&["a", "b"]);
        select_all(&mut session);
        let center = Command::SetAlignment {
            align: Alignment::Center,
        };

        assert!(execute(&mut session, &center).unwrap().tree_changed());
        assert_eq!(
            execute(&mut session, &center).unwrap(),
            CommandOutcome::NoOp(NoOpReason::AlreadyApplied)
        );
        assert!(session.render().contains(r#"<p style="text-align: center">a</p>"#));
    }
}
