use super::str_field;
use crate::html::{align_attr, RenderContext};
use crate::node::{Node, NodeKind};
use crate::registry::{JsonMap, NodeBehavior};
use crate::tree::DocumentTree;
use serde_json::Value;

pub(crate) struct RootBehavior;

impl NodeBehavior for RootBehavior {
    fn tag(&self) -> &'static str {
        "root"
    }

    fn create(&self) -> NodeKind {
        NodeKind::Root
    }

    fn import(&self, _object: &JsonMap) -> Option<NodeKind> {
        Some(NodeKind::Root)
    }

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        ctx.render_children(tree, node);
    }
}

pub(crate) struct ParagraphBehavior;

impl NodeBehavior for ParagraphBehavior {
    fn tag(&self) -> &'static str {
        "paragraph"
    }

    fn create(&self) -> NodeKind {
        NodeKind::Paragraph
    }

    fn import(&self, _object: &JsonMap) -> Option<NodeKind> {
        Some(NodeKind::Paragraph)
    }

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        render_text_block(tree, node, ctx, "p");
    }
}

pub(crate) struct HeadingBehavior;

impl NodeBehavior for HeadingBehavior {
    fn tag(&self) -> &'static str {
        "heading"
    }

    fn create(&self) -> NodeKind {
        NodeKind::heading(1)
    }

    fn export(&self, node: &Node, out: &mut JsonMap) {
        if let NodeKind::Heading { level } = node.kind {
            out.insert("tag".into(), Value::from(format!("h{level}")));
        }
    }

    fn import(&self, object: &JsonMap) -> Option<NodeKind> {
        let level = str_field(object, "tag")
            .and_then(|t| t.strip_prefix('h'))
            .and_then(|l| l.parse::<u8>().ok())
            .unwrap_or(1);
        Some(NodeKind::heading(level))
    }

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        let level = match node.kind {
            NodeKind::Heading { level } => level.clamp(1, 6),
            _ => 1,
        };
        render_text_block(tree, node, ctx, &format!("h{level}"));
    }
}

pub(crate) struct QuoteBehavior;

impl NodeBehavior for QuoteBehavior {
    fn tag(&self) -> &'static str {
        "quote"
    }

    fn create(&self) -> NodeKind {
        NodeKind::Quote
    }

    fn import(&self, _object: &JsonMap) -> Option<NodeKind> {
        Some(NodeKind::Quote)
    }

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        render_text_block(tree, node, ctx, "blockquote");
    }
}

/// A block holding inline content, rendered on one line
fn render_text_block(tree: &DocumentTree, node: &Node, ctx: &mut RenderContext, tag: &str) {
    ctx.line(|ctx| {
        ctx.add(&format!("<{tag}{}>", align_attr(node.align)));
        if node.children.is_empty() {
            ctx.add("<br>");
        } else {
            ctx.render_children(tree, node);
        }
        ctx.add(&format!("</{tag}>"));
    });
}

#[cfg(test)]
mod tests {
    use crate::{deserialize, render, serialize};
    use serde_json::json;

    #[test]
    fn test_heading_tag_round_trip() {
        let doc = json!({
            "root": {
                "type": "root",
                "children": [
                    { "type": "heading", "tag": "h3", "children": [{ "type": "text", "text": "Hi" }] },
                    { "type": "heading", "tag": "h9", "children": [] }
                ]
            }
        });
        let tree = deserialize(&doc);
        assert_eq!(render(&tree), "<h3>Hi</h3><h6><br></h6>");

        let out = serialize(&tree);
        assert_eq!(out["root"]["children"][0]["tag"], "h3");
    }

    #[test]
    fn test_quote_renders_blockquote() {
        let doc = json!({
            "root": { "type": "root", "children": [
                { "type": "quote", "format": "right", "children": [{ "type": "text", "text": "q" }] }
            ]}
        });
        assert_eq!(
            render(&deserialize(&doc)),
            "<blockquote style=\"text-align: right\">q</blockquote>"
        );
    }
}
