use super::str_field;
use crate::html::{escape_html, RenderContext};
use crate::node::{Node, NodeKind};
use crate::registry::{JsonMap, NodeBehavior};
use crate::tree::DocumentTree;
use serde_json::Value;

pub(crate) struct CodeBehavior;

impl NodeBehavior for CodeBehavior {
    fn tag(&self) -> &'static str {
        "code"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["code-block"]
    }

    fn create(&self) -> NodeKind {
        NodeKind::CodeBlock { language: None }
    }

    fn export(&self, node: &Node, out: &mut JsonMap) {
        if let NodeKind::CodeBlock {
            language: Some(language),
        } = &node.kind
        {
            out.insert("language".into(), Value::from(language.as_str()));
        }
    }

    fn import(&self, object: &JsonMap) -> Option<NodeKind> {
        let language = str_field(object, "language")
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        Some(NodeKind::CodeBlock { language })
    }

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        let NodeKind::CodeBlock { language } = &node.kind else {
            return;
        };
        let language_attr = language
            .as_deref()
            .map(|l| format!(" data-language=\"{}\"", escape_html(l)))
            .unwrap_or_default();
        let gutter = code_gutter(&tree.text_content(node.id));

        ctx.line(|ctx| {
            ctx.add(&format!(
                "<pre class=\"code-block\"{language_attr} data-gutter=\"{gutter}\" spellcheck=\"false\"><code>"
            ));
            ctx.render_children(tree, node);
            ctx.add("</code></pre>");
        });
    }
}

pub(crate) struct CodeHighlightBehavior;

impl NodeBehavior for CodeHighlightBehavior {
    fn tag(&self) -> &'static str {
        "code-highlight"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["code-text-with-highlight-class"]
    }

    fn create(&self) -> NodeKind {
        NodeKind::code_line("")
    }

    fn export(&self, node: &Node, out: &mut JsonMap) {
        if let NodeKind::CodeHighlight { text, highlight } = &node.kind {
            out.insert("text".into(), Value::from(text.as_str()));
            if let Some(class) = highlight {
                out.insert("highlightType".into(), Value::from(class.as_str()));
            }
        }
    }

    fn import(&self, object: &JsonMap) -> Option<NodeKind> {
        let text = match object.get("text") {
            Some(Value::String(s)) => s.clone(),
            None | Some(Value::Null) => String::new(),
            Some(_) => return None,
        };
        let highlight = str_field(object, "highlightType")
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        Some(NodeKind::CodeHighlight { text, highlight })
    }

    fn render(&self, _tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        let NodeKind::CodeHighlight { text, highlight } = &node.kind else {
            return;
        };
        match highlight.as_deref().filter(|c| is_token_class(c)) {
            Some(class) => {
                ctx.add(&format!("<span class=\"token-{class}\">"));
                ctx.add_text(text);
                ctx.add("</span>");
            }
            None => ctx.add_text(text),
        }
    }
}

fn is_token_class(class: &str) -> bool {
    class
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Line numbers for a code block, one per line, `\n`-separated.
///
/// Empty text counts as one line and a single trailing newline does not
/// start a new line.
pub fn code_gutter(text: &str) -> String {
    let body = text.strip_suffix('\n').unwrap_or(text);
    let lines = body.split('\n').count();
    (1..=lines)
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
