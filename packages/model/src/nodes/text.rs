use super::str_field;
use crate::html::RenderContext;
use crate::node::{Node, NodeKind, TextFormat};
use crate::registry::{JsonMap, NodeBehavior};
use crate::tree::DocumentTree;
use serde_json::Value;

/// Markup for each format, outermost first
const FORMAT_TAGS: [(TextFormat, &str); 8] = [
    (TextFormat::BOLD, "strong"),
    (TextFormat::ITALIC, "em"),
    (TextFormat::STRIKETHROUGH, "s"),
    (TextFormat::UNDERLINE, "u"),
    (TextFormat::SUBSCRIPT, "sub"),
    (TextFormat::SUPERSCRIPT, "sup"),
    (TextFormat::HIGHLIGHT, "mark"),
    (TextFormat::CODE, "code"),
];

pub(crate) struct TextBehavior;

impl NodeBehavior for TextBehavior {
    fn tag(&self) -> &'static str {
        "text"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["tab"]
    }

    fn create(&self) -> NodeKind {
        NodeKind::text("")
    }

    fn export(&self, node: &Node, out: &mut JsonMap) {
        if let NodeKind::Text { text, format, style } = &node.kind {
            out.insert("text".into(), Value::from(text.as_str()));
            out.insert("format".into(), Value::from(format.bits()));
            out.insert("style".into(), Value::from(style.as_str()));
            out.insert("detail".into(), Value::from(0));
            out.insert("mode".into(), Value::from("normal"));
        }
    }

    fn import(&self, object: &JsonMap) -> Option<NodeKind> {
        let text = match object.get("text") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            None if str_field(object, "type") == Some("tab") => "\t".to_string(),
            None | Some(Value::Null) => String::new(),
            Some(_) => return None,
        };
        Some(NodeKind::Text {
            text,
            format: import_format(object.get("format")),
            style: str_field(object, "style").unwrap_or_default().to_string(),
        })
    }

    fn render(&self, _tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        if let NodeKind::Text { text, format, .. } = &node.kind {
            render_formatted(ctx, text, *format);
        }
    }
}

pub(crate) struct LineBreakBehavior;

impl NodeBehavior for LineBreakBehavior {
    fn tag(&self) -> &'static str {
        "linebreak"
    }

    fn create(&self) -> NodeKind {
        NodeKind::LineBreak
    }

    fn import(&self, _object: &JsonMap) -> Option<NodeKind> {
        Some(NodeKind::LineBreak)
    }

    fn render(&self, _tree: &DocumentTree, _node: &Node, ctx: &mut RenderContext) {
        ctx.add("<br>");
    }
}

/// Bitmask, a space-separated list of names, or an array of names
fn import_format(value: Option<&Value>) -> TextFormat {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|bits| u32::try_from(bits).ok())
            .map(TextFormat::from_bits_truncate)
            .unwrap_or_default(),
        Some(Value::String(names)) => names
            .split([' ', ','])
            .filter_map(TextFormat::from_format_name)
            .fold(TextFormat::empty(), |acc, f| acc | f),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .filter_map(TextFormat::from_format_name)
            .fold(TextFormat::empty(), |acc, f| acc | f),
        _ => TextFormat::empty(),
    }
}

fn render_formatted(ctx: &mut RenderContext, text: &str, format: TextFormat) {
    let active: Vec<&str> = FORMAT_TAGS
        .iter()
        .filter(|(f, _)| format.contains(*f))
        .map(|(_, tag)| *tag)
        .collect();
    for tag in &active {
        ctx.add(&format!("<{tag}>"));
    }
    ctx.add_text(text);
    for tag in active.iter().rev() {
        ctx.add(&format!("</{tag}>"));
    }
}
