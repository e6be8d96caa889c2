use super::u32_field;
use crate::html::{align_attr, RenderContext};
use crate::node::{Node, NodeKind};
use crate::registry::{JsonMap, NodeBehavior};
use crate::tree::DocumentTree;
use serde_json::Value;

/// Row-header bit of the persisted `headerState`
const HEADER_ROW: u32 = 1;

pub(crate) struct TableBehavior;

impl NodeBehavior for TableBehavior {
    fn tag(&self) -> &'static str {
        "table"
    }

    fn create(&self) -> NodeKind {
        NodeKind::Table
    }

    fn import(&self, _object: &JsonMap) -> Option<NodeKind> {
        Some(NodeKind::Table)
    }

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        ctx.add_line("<table><tbody>");
        ctx.render_block_children(tree, node);
        ctx.add_line("</tbody></table>");
    }
}

pub(crate) struct TableRowBehavior;

impl NodeBehavior for TableRowBehavior {
    fn tag(&self) -> &'static str {
        "tablerow"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["table-row"]
    }

    fn create(&self) -> NodeKind {
        NodeKind::TableRow
    }

    fn import(&self, _object: &JsonMap) -> Option<NodeKind> {
        Some(NodeKind::TableRow)
    }

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        ctx.add_line("<tr>");
        ctx.render_block_children(tree, node);
        ctx.add_line("</tr>");
    }
}

pub(crate) struct TableCellBehavior;

impl NodeBehavior for TableCellBehavior {
    fn tag(&self) -> &'static str {
        "tablecell"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["table-cell"]
    }

    fn create(&self) -> NodeKind {
        NodeKind::TableCell { header: false }
    }

    fn export(&self, node: &Node, out: &mut JsonMap) {
        if let NodeKind::TableCell { header } = node.kind {
            let state = if header { HEADER_ROW } else { 0 };
            out.insert("headerState".into(), Value::from(state));
        }
    }

    fn import(&self, object: &JsonMap) -> Option<NodeKind> {
        let header = match object.get("header") {
            Some(Value::Bool(b)) => *b,
            _ => u32_field(object, "headerState").unwrap_or(0) != 0,
        };
        Some(NodeKind::TableCell { header })
    }

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        let tag = match node.kind {
            NodeKind::TableCell { header: true } => "th",
            _ => "td",
        };
        ctx.add_line(&format!("<{tag}{}>", align_attr(node.align)));
        ctx.render_block_children(tree, node);
        ctx.add_line(&format!("</{tag}>"));
    }
}

#[cfg(test)]
mod tests {
    use crate::{deserialize, render};
    use serde_json::json;

    #[test]
    fn test_table_render() {
        let doc = json!({ "root": { "type": "root", "children": [
            { "type": "table", "children": [
                { "type": "tablerow", "children": [
                    { "type": "tablecell", "headerState": 1, "children": [
                        { "type": "paragraph", "children": [{ "type": "text", "text": "H" }] }
                    ]},
                    { "type": "table-cell", "headerState": 0, "children": [] }
                ]}
            ]}
        ]}});
        assert_eq!(
            render(&deserialize(&doc)),
            "<table><tbody><tr><th><p>H</p></th><td><p><br></p></td></tr></tbody></table>"
        );
    }
}
