use super::edit::{
    can_place, delete_range, is_blank_paragraph, place_leaf, point_after, resolve, sibling,
    top_block,
};
use super::{Step, CHANGED};
use crate::{EditorSession, NoOpReason};
use scribe_model::{DocumentTree, ImagePayload, NodeId, NodeKind, Point, Selection, TreeResult};
use serde::{Deserialize, Serialize};

/// Largest row or column count accepted for a new table
pub const MAX_TABLE_SIZE: usize = 64;

/// What [`Command::InsertNode`](super::Command::InsertNode) places at the caret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InsertPayload {
    Image(ImagePayload),
    Table {
        rows: usize,
        columns: usize,
        #[serde(default, rename = "headerRow")]
        header_row: bool,
    },
    LineBreak,
}

impl InsertPayload {
    fn validate(&self) -> Result<(), NoOpReason> {
        match self {
            InsertPayload::Image(image) if image.src.trim().is_empty() => {
                Err(NoOpReason::InvalidPayload("image without src".to_string()))
            }
            InsertPayload::Table { rows, columns, .. }
                if *rows == 0 || *columns == 0 || *rows > MAX_TABLE_SIZE || *columns > MAX_TABLE_SIZE =>
            {
                Err(NoOpReason::InvalidPayload(format!("{rows}x{columns} table")))
            }
            _ => Ok(()),
        }
    }
}

pub(super) fn insert_node(session: &mut EditorSession, payload: &InsertPayload) -> Step {
    payload.validate()?;
    let resolved = resolve(session)?;
    let format = session.selection().map(|s| s.format).unwrap_or_default();
    let tree = session.tree_mut();

    let caret = if resolved.is_collapsed() {
        resolved.start
    } else {
        delete_range(tree, &resolved)?
    };

    let selection = match payload {
        InsertPayload::Image(image) => {
            Selection::caret(insert_image(tree, caret, image.clone())?).with_format(format)
        }
        InsertPayload::LineBreak => {
            if !can_place(tree, caret, &NodeKind::LineBreak) {
                return Err(NoOpReason::InvalidPosition("a line break").into());
            }
            let br = tree.create(NodeKind::LineBreak);
            place_leaf(tree, caret, br)?;
            Selection::caret(point_after(tree, br)).with_format(format)
        }
        InsertPayload::Table {
            rows,
            columns,
            header_row,
        } => insert_table(tree, caret, *rows, *columns, *header_row)?,
    };
    session.set_selection(Some(selection));
    Ok(CHANGED)
}

/// Image inline at the caret, or in a new paragraph after the caret's block
/// when the caret can't hold one (inside code)
fn insert_image(tree: &mut DocumentTree, caret: Point, image: ImagePayload) -> Step<Point> {
    let kind = NodeKind::Image(image);
    if can_place(tree, caret, &kind) {
        let node = tree.create(kind);
        place_leaf(tree, caret, node)?;
        return Ok(point_after(tree, node));
    }

    let Some(block) = top_block(tree, caret.key) else {
        return Err(NoOpReason::InvalidPosition("an image").into());
    };
    let paragraph = tree.create(NodeKind::Paragraph);
    tree.insert_after(block, paragraph)?;
    let node = tree.create(kind);
    tree.append(paragraph, node)?;
    Ok(Point::element(paragraph, 1))
}

/// Table after the caret's block, replacing that block when it is an empty
/// paragraph. The caret moves into the first cell.
fn insert_table(
    tree: &mut DocumentTree,
    caret: Point,
    rows: usize,
    columns: usize,
    header_row: bool,
) -> Step<Selection> {
    let Some(block) = top_block(tree, caret.key) else {
        return Err(NoOpReason::InvalidPosition("a table").into());
    };
    let table = build_table(tree, rows, columns, header_row)?;
    tree.insert_after(block, table)?;
    if is_blank_paragraph(tree, block) {
        tree.remove(block)?;
    }
    if sibling(tree, table, true).is_none() {
        let paragraph = tree.create(NodeKind::Paragraph);
        tree.insert_after(table, paragraph)?;
    }

    let first_cell = tree
        .children(table)
        .first()
        .and_then(|row| tree.children(*row).first())
        .copied()
        .unwrap_or(table);
    Ok(Selection::caret_at_start(tree, first_cell))
}

fn build_table(tree: &mut DocumentTree, rows: usize, columns: usize, header_row: bool) -> TreeResult<NodeId> {
    let table = tree.create(NodeKind::Table);
    for r in 0..rows {
        let row = tree.create(NodeKind::TableRow);
        for _ in 0..columns {
            let cell = tree.create(NodeKind::TableCell {
                header: header_row && r == 0,
            });
            let paragraph = tree.create(NodeKind::Paragraph);
            tree.append(cell, paragraph)?;
            tree.append(row, cell)?;
        }
        tree.append(table, row)?;
    }
    Ok(table)
}

/// Commit an image size, never below the configured minimum
pub(super) fn resize_image(session: &mut EditorSession, node: NodeId, width: u32, height: u32) -> Step {
    let min = session.config().image.min_size;
    let (width, height) = (width.max(min), height.max(min));
    match session.tree_mut().kind_mut(node) {
        None => Err(NoOpReason::UnknownNode(node).into()),
        Some(NodeKind::Image(image)) => {
            if image.width == Some(width) && image.height == Some(height) {
                return Err(NoOpReason::AlreadyApplied.into());
            }
            image.width = Some(width);
            image.height = Some(height);
            Ok(CHANGED)
        }
        Some(other) => Err(NoOpReason::InvalidPayload(format!("{} is not an image", other.tag())).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{execute, Command, CommandOutcome};
    use crate::EditorConfig;
    use serde_json::json;

    fn insert(session: &mut EditorSession, node: InsertPayload) -> CommandOutcome {
        execute(session, &Command::InsertNode { node }).unwrap()
    }

    fn image(src: &str) -> InsertPayload {
        InsertPayload::Image(ImagePayload::new(src, "alt"))
    }

    #[test]
    fn test_payload_wire_shape() {
        let payload: InsertPayload = serde_json::from_value(json!({
            "type": "image", "src": "/a.png", "altText": "A", "width": 120
        }))
        .unwrap();
        assert_eq!(
            payload,
            InsertPayload::Image(ImagePayload {
                src: "/a.png".to_string(),
                alt_text: "A".to_string(),
                width: Some(120),
                height: None,
            })
        );

        let table: InsertPayload =
            serde_json::from_value(json!({ "type": "table", "rows": 2, "columns": 3, "headerRow": true }))
                .unwrap();
        assert_eq!(
            table,
            InsertPayload::Table {
                rows: 2,
                columns: 3,
                header_row: true
            }
        );
    }

    #[test]
    fn test_image_inserted_at_caret() {
        let (mut session, _) = EditorSession::from_value("i", &json!("ab"), EditorConfig::default());
        let tree = session.tree();
        let text = tree.first_text_descendant(tree.root()).unwrap();
        execute(
            &mut session,
            &Command::SetSelection {
                selection: Selection::caret(Point::text(text, 1)),
            },
        )
        .unwrap();

        assert!(insert(&mut session, image("https://cdn.test/x.png")).tree_changed());
        let html = session.render();
        assert!(html.starts_with("<p>a<span class=\"editor-image\"><img src=\"https://cdn.test/x.png\""));
        assert!(html.ends_with("b</p>"));
        assert!(session.selection().unwrap().resolve(session.tree()).is_some());
    }

    #[test]
    fn test_image_in_code_goes_after_block() {
        let (mut session, _) = EditorSession::from_value(
            "i",
            &json!({ "root": { "type": "root", "children": [
                { "type": "code", "children": [{ "type": "code-highlight", "text": "x" }] }
            ]}}),
            EditorConfig::default(),
        );

        insert(&mut session, image("/y.png"));
        let tree = session.tree();
        let blocks = tree.children(tree.root());
        assert_eq!(blocks.len(), 2);
        assert!(matches!(tree.kind(blocks[1]), Some(NodeKind::Paragraph)));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_image_without_src_is_rejected() {
        let mut session = EditorSession::new("i", EditorConfig::default());
        assert!(matches!(
            insert(&mut session, image("  ")),
            CommandOutcome::NoOp(NoOpReason::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_table_replaces_blank_paragraph() {
        let mut session = EditorSession::new("i", EditorConfig::default());
        insert(
            &mut session,
            InsertPayload::Table {
                rows: 2,
                columns: 2,
                header_row: true,
            },
        );

        let tree = session.tree();
        let blocks = tree.children(tree.root());
        assert_eq!(blocks.len(), 2);
        assert!(matches!(tree.kind(blocks[0]), Some(NodeKind::Table)));
        assert!(is_blank_paragraph(tree, blocks[1]));

        let anchor = session.selection().unwrap().anchor;
        let cell = tree
            .closest(anchor.key, |k| matches!(k, NodeKind::TableCell { .. }))
            .unwrap();
        assert_eq!(tree.kind(cell), Some(&NodeKind::TableCell { header: true }));
        assert!(session.render().starts_with("<table><tbody><tr><th>"));
    }

    #[test]
    fn test_line_break_payload() {
        let (mut session, _) = EditorSession::from_value("i", &json!("ab"), EditorConfig::default());
        let tree = session.tree();
        let text = tree.first_text_descendant(tree.root()).unwrap();
        execute(
            &mut session,
            &Command::SetSelection {
                selection: Selection::caret(Point::text(text, 1)),
            },
        )
        .unwrap();

        insert(&mut session, InsertPayload::LineBreak);
        assert_eq!(session.render(), "<p>a<br>b</p>");
    }

    #[test]
    fn test_resize_commits_clamped_size() {
        let (mut session, _) = EditorSession::from_value(
            "i",
            &json!({ "root": { "type": "root", "children": [
                { "type": "paragraph", "children": [{ "type": "image", "src": "/a.png" }] }
            ]}}),
            EditorConfig::default(),
        );
        let tree = session.tree();
        let paragraph = tree.children(tree.root())[0];
        let img = tree.children(paragraph)[0];

        let resize = Command::ResizeImage {
            node: img,
            width: 20,
            height: 300,
        };
        assert!(execute(&mut session, &resize).unwrap().tree_changed());
        assert_eq!(
            session.tree().kind(img),
            Some(&NodeKind::Image(ImagePayload::new("/a.png", "").with_size(80, 300)))
        );
        assert_eq!(
            execute(&mut session, &resize).unwrap(),
            CommandOutcome::NoOp(NoOpReason::AlreadyApplied)
        );
        assert_eq!(
            execute(
                &mut session,
                &Command::ResizeImage {
                    node: paragraph,
                    width: 100,
                    height: 100
                }
            )
            .unwrap(),
            CommandOutcome::NoOp(NoOpReason::InvalidPayload("paragraph is not an image".to_string()))
        );
    }
}
