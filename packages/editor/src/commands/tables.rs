use super::edit::{resolve, sibling};
use super::{Step, CHANGED};
use crate::{EditorSession, NoOpReason};
use scribe_model::{DocumentTree, NodeId, NodeKind, Point, Selection, TreeResult};
use serde::{Deserialize, Serialize};

/// Structural table change, relative to the cell holding the anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableAction {
    InsertRowBefore,
    InsertRowAfter,
    InsertColumnBefore,
    InsertColumnAfter,
    DeleteRow,
    DeleteColumn,
}

struct CellPosition {
    table: NodeId,
    row: NodeId,
    row_index: usize,
    column: usize,
}

impl CellPosition {
    fn locate(tree: &DocumentTree, point: Point) -> Option<Self> {
        let cell = tree.closest(point.key, |k| matches!(k, NodeKind::TableCell { .. }))?;
        let row = tree.parent(cell)?;
        let table = tree.parent(row)?;
        Some(Self {
            table,
            row,
            row_index: tree.index_in_parent(row)?,
            column: tree.index_in_parent(cell)?,
        })
    }
}

/// Apply a table action. Outside a table this is a no-op.
///
/// Deleting the last row or column leaves an empty table in place; the
/// caret moves to the block after it.
pub(super) fn mutate(session: &mut EditorSession, action: TableAction) -> Step {
    let resolved = resolve(session)?;
    let anchor = if resolved.backward {
        resolved.end
    } else {
        resolved.start
    };
    let format = session.selection().map(|s| s.format).unwrap_or_default();
    let tree = session.tree_mut();
    let Some(position) = CellPosition::locate(tree, anchor) else {
        return Err(NoOpReason::NotInTable.into());
    };

    match action {
        TableAction::InsertRowBefore => insert_row(tree, &position, false)?,
        TableAction::InsertRowAfter => insert_row(tree, &position, true)?,
        TableAction::InsertColumnBefore => insert_column(tree, &position, false)?,
        TableAction::InsertColumnAfter => insert_column(tree, &position, true)?,
        TableAction::DeleteRow => {
            let caret = delete_row(tree, &position)?;
            session.set_selection(Some(caret.with_format(format)));
        }
        TableAction::DeleteColumn => {
            let caret = delete_column(tree, &position)?;
            session.set_selection(Some(caret.with_format(format)));
        }
    }
    Ok(CHANGED)
}

fn new_cell(tree: &mut DocumentTree, header: bool) -> TreeResult<NodeId> {
    let cell = tree.create(NodeKind::TableCell { header });
    let paragraph = tree.create(NodeKind::Paragraph);
    tree.append(cell, paragraph)?;
    Ok(cell)
}

fn header_flags(tree: &DocumentTree, row: NodeId) -> Vec<bool> {
    tree.children(row)
        .iter()
        .map(|c| matches!(tree.kind(*c), Some(NodeKind::TableCell { header: true })))
        .collect()
}

fn is_header_row(tree: &DocumentTree, row: NodeId) -> bool {
    let flags = header_flags(tree, row);
    !flags.is_empty() && flags.iter().all(|h| *h)
}

fn insert_row(tree: &mut DocumentTree, at: &CellPosition, after: bool) -> TreeResult<()> {
    let flags = header_flags(tree, at.row);
    let header_row = is_header_row(tree, at.row);
    let new_row = tree.create(NodeKind::TableRow);
    for column in 0..flags.len().max(1) {
        // A header column stays a header column; a header row is not copied
        let header = !header_row && flags.get(column).copied().unwrap_or(false);
        let cell = new_cell(tree, header)?;
        tree.append(new_row, cell)?;
    }
    if after {
        tree.insert_after(at.row, new_row)
    } else {
        tree.insert_before(at.row, new_row)
    }
}

fn insert_column(tree: &mut DocumentTree, at: &CellPosition, after: bool) -> TreeResult<()> {
    let index = if after { at.column + 1 } else { at.column };
    for row in tree.children(at.table).to_vec() {
        let header = is_header_row(tree, row);
        let cell = new_cell(tree, header)?;
        tree.insert_at(row, index, cell)?;
    }
    Ok(())
}

fn delete_row(tree: &mut DocumentTree, at: &CellPosition) -> TreeResult<Selection> {
    let neighbour = sibling(tree, at.row, true).or_else(|| sibling(tree, at.row, false));
    tree.remove(at.row)?;
    match neighbour {
        Some(row) => Ok(caret_in_row(tree, row, at.column)),
        None => caret_after_table(tree, at.table),
    }
}

fn delete_column(tree: &mut DocumentTree, at: &CellPosition) -> TreeResult<Selection> {
    for row in tree.children(at.table).to_vec() {
        if let Some(&cell) = tree.children(row).get(at.column) {
            tree.remove(cell)?;
        }
        if tree.children(row).is_empty() {
            tree.remove(row)?;
        }
    }
    if tree.contains(at.row) {
        return Ok(caret_in_row(tree, at.row, at.column));
    }
    let rows = tree.children(at.table);
    let nearest = rows.get(at.row_index.min(rows.len().saturating_sub(1))).copied();
    match nearest {
        Some(row) => Ok(caret_in_row(tree, row, at.column)),
        None => caret_after_table(tree, at.table),
    }
}

/// Caret at the start of the cell nearest to `column` in `row`
fn caret_in_row(tree: &DocumentTree, row: NodeId, column: usize) -> Selection {
    let cells = tree.children(row);
    match cells.get(column.min(cells.len().saturating_sub(1))) {
        Some(&cell) => Selection::caret_at_start(tree, cell),
        None => Selection::caret_at_start(tree, row),
    }
}

/// Caret in the block following a table, adding an empty paragraph if none
fn caret_after_table(tree: &mut DocumentTree, table: NodeId) -> TreeResult<Selection> {
    if let Some(next) = sibling(tree, table, true) {
        return Ok(Selection::caret_at_start(tree, next));
    }
    let paragraph = tree.create(NodeKind::Paragraph);
    tree.insert_after(table, paragraph)?;
    Ok(Selection::caret(Point::element(paragraph, 0)))
}
