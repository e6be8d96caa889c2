use super::str_field;
use crate::html::{escape_html, RenderContext};
use crate::node::{Node, NodeKind};
use crate::registry::{JsonMap, NodeBehavior};
use crate::tree::DocumentTree;
use serde_json::Value;

const SAFE_SCHEMES: [&str; 4] = ["http", "https", "mailto", "tel"];

pub(crate) struct LinkBehavior;

impl NodeBehavior for LinkBehavior {
    fn tag(&self) -> &'static str {
        "link"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["autolink"]
    }

    fn create(&self) -> NodeKind {
        NodeKind::Link { url: String::new() }
    }

    fn export(&self, node: &Node, out: &mut JsonMap) {
        if let NodeKind::Link { url } = &node.kind {
            out.insert("url".into(), Value::from(url.as_str()));
            out.insert("rel".into(), Value::from("noopener noreferrer"));
            out.insert("target".into(), Value::from("_blank"));
        }
    }

    fn import(&self, object: &JsonMap) -> Option<NodeKind> {
        Some(NodeKind::Link {
            url: str_field(object, "url").unwrap_or_default().trim().to_string(),
        })
    }

    fn render(&self, tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        let NodeKind::Link { url } = &node.kind else {
            return;
        };
        match sanitize_url(url) {
            Some(href) => {
                ctx.add(&format!(
                    "<a href=\"{}\" rel=\"noopener noreferrer\" target=\"_blank\">",
                    escape_html(href)
                ));
                ctx.render_children(tree, node);
                ctx.add("</a>");
            }
            None => ctx.render_children(tree, node),
        }
    }
}

/// Normalize user-entered link text.
///
/// Whitespace is trimmed and an empty value yields `None`. Anything without
/// an `http://`, `https://` or protocol-relative `//` prefix gets `https://`.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || trimmed.starts_with("//") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}

/// The URL when it is safe to emit as an `href`, otherwise `None`.
///
/// Relative and protocol-relative URLs pass; absolute URLs must use one of
/// http, https, mailto or tel.
pub fn sanitize_url(url: &str) -> Option<&str> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    match scheme_of(trimmed) {
        None => Some(trimmed),
        Some(scheme) if SAFE_SCHEMES.contains(&scheme.as_str()) => Some(trimmed),
        Some(_) => None,
    }
}

/// Lower-cased scheme, ignoring the control characters browsers strip
pub(crate) fn scheme_of(url: &str) -> Option<String> {
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_ascii_control() && !c.is_whitespace())
        .collect();
    let end = cleaned.find([':', '/', '?', '#'])?;
    if !cleaned[end..].starts_with(':') || end == 0 {
        return None;
    }
    let scheme = &cleaned[..end];
    let valid = scheme
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if valid {
        Some(scheme.to_ascii_lowercase())
    } else {
        // Not a scheme the parser would recognise; treat as opaque and unsafe
        Some(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com").as_deref(), Some("https://example.com"));
        assert_eq!(normalize_url("  "), None);
        assert_eq!(normalize_url("http://x.com").as_deref(), Some("http://x.com"));
        assert_eq!(normalize_url(" HTTPS://X.com ").as_deref(), Some("HTTPS://X.com"));
        assert_eq!(normalize_url("//cdn.test/a").as_deref(), Some("//cdn.test/a"));
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(sanitize_url("https://x.test"), Some("https://x.test"));
        assert_eq!(sanitize_url("mailto:a@b.test"), Some("mailto:a@b.test"));
        assert_eq!(sanitize_url("/answers/12"), Some("/answers/12"));
        assert_eq!(sanitize_url("javascript:alert(1)"), None);
        assert_eq!(sanitize_url("java\tscript:alert(1)"), None);
        assert_eq!(sanitize_url(" JavaScript:alert(1)"), None);
        assert_eq!(sanitize_url("data:text/html,hi"), None);
        assert_eq!(sanitize_url(""), None);
    }
}
