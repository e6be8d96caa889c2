use super::{str_field, u32_field};
use crate::html::{align_attr, RenderContext};
use crate::node::{ListType, Node, NodeKind};
use crate::registry::{JsonMap, NodeBehavior};
use crate::tree::DocumentTree;
use serde_json::Value;

pub(crate) struct ListBehavior;

impl NodeBehavior for ListBehavior {
    fn tag(&self) -> &'static str {
        "list"
    }

    fn create(&self) -> NodeKind {
        NodeKind::List {
            list_type: ListType::Bullet,
            start: 1,
        }
    }

    fn export(&self, node: &Node, out: &mut JsonMap) {
        if let NodeKind::List { list_type, start } = node.kind {
            out.insert("listType".into(), Value::from(list_type.as_str()));
            out.insert("start".into(), Value::from(start));
            out.insert("tag".into(), Value::from(list_type.tag_name()));
        }
    }

    fn import(&self, object: &JsonMap) -> Option<NodeKind> {
        let list_type = match (str_field(object, "listType"), str_field(object, "tag")) {
            (Some("number" | "ordered"), _) => ListType::Number,
            (Some(_), _) => ListType::Bullet,
            (None, Some("ol")) => ListType::Number,
            (None, _) => ListType::Bullet,
        };
        Some(NodeKind::List {
            list_type,
            start: u32_field(object, "start").unwrap_or(1),
        })
    }

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        let NodeKind::List { list_type, start } = node.kind else {
            return;
        };
        let tag = list_type.tag_name();
        let start_attr = match (list_type, start) {
            (ListType::Number, s) if s != 1 => format!(" start=\"{s}\""),
            _ => String::new(),
        };
        ctx.add_line(&format!("<{tag}{start_attr}{}>", align_attr(node.align)));
        ctx.render_block_children(tree, node);
        ctx.add_line(&format!("</{tag}>"));
    }
}

pub(crate) struct ListItemBehavior;

impl NodeBehavior for ListItemBehavior {
    fn tag(&self) -> &'static str {
        "listitem"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["list-item"]
    }

    fn create(&self) -> NodeKind {
        NodeKind::ListItem { value: 1 }
    }

    fn export(&self, node: &Node, out: &mut JsonMap) {
        if let NodeKind::ListItem { value } = node.kind {
            out.insert("value".into(), Value::from(value));
        }
    }

    fn import(&self, object: &JsonMap) -> Option<NodeKind> {
        Some(NodeKind::ListItem {
            value: u32_field(object, "value").unwrap_or(1),
        })
    }

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        ctx.line(|ctx| {
            ctx.add(&format!("<li{}>", align_attr(node.align)));
            ctx.render_children(tree, node);
            ctx.add("</li>");
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::{deserialize, render};
    use serde_json::json;

    #[test]
    fn test_numbered_list_with_start() {
        let doc = json!({ "root": { "type": "root", "children": [
            { "type": "list", "listType": "number", "start": 3, "children": [
                { "type": "listitem", "value": 3, "children": [{ "type": "text", "text": "three" }] },
                { "type": "listitem", "value": 4, "children": [{ "type": "text", "text": "four" }] }
            ]}
        ]}});
        assert_eq!(
            render(&deserialize(&doc)),
            "<ol start=\"3\"><li>three</li><li>four</li></ol>"
        );
    }

    #[test]
    fn test_ordered_and_unordered_list_types() {
        let doc = json!({ "root": { "type": "root", "children": [
            { "type": "list", "listType": "ordered", "children": [
                { "type": "listitem", "children": [{ "type": "text", "text": "one" }] }
            ]},
            { "type": "list", "listType": "unordered", "children": [
                { "type": "listitem", "children": [{ "type": "text", "text": "dot" }] }
            ]}
        ]}});
        assert_eq!(
            render(&deserialize(&doc)),
            "<ol><li>one</li></ol><ul><li>dot</li></ul>"
        );
    }

    #[test]
    fn test_nested_list_and_legacy_item_alias() {
        let doc = json!({ "root": { "type": "root", "children": [
            { "type": "list", "tag": "ul", "children": [
                { "type": "list-item", "children": [
                    { "type": "text", "text": "outer" },
                    { "type": "list", "listType": "bullet", "children": [
                        { "type": "listitem", "children": [{ "type": "text", "text": "inner" }] }
                    ]}
                ]}
            ]}
        ]}});
        assert_eq!(
            render(&deserialize(&doc)),
            "<ul><li>outer<ul><li>inner</li></ul></li></ul>"
        );
    }
}
