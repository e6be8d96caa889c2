//! # Document Serializer
//!
//! Converts a tree to the portable JSON document:
//!
//! ```json
//! { "root": { "type": "root", "format": "", "children": [...], "version": 1 }, "version": 1 }
//! ```
//!
//! Each node carries `type` and `version`; elements add `format` (alignment)
//! and `children`; everything else comes from the node's registry behavior.

use crate::error::SerializeError;
use crate::node::NodeId;
use crate::registry::{JsonMap, NodeRegistry};
use crate::tree::DocumentTree;
use serde_json::Value;
use tracing::instrument;

pub use crate::deserializer::{deserialize, deserialize_str, deserialize_with, DeserializeReport};

/// Version written into every document and node
pub const DOCUMENT_VERSION: u32 = 1;

/// Serialize with the built-in registry
pub fn serialize(tree: &DocumentTree) -> Value {
    serialize_with(tree, NodeRegistry::global())
}

#[instrument(skip(tree, registry), fields(nodes = tree.node_count()))]
pub fn serialize_with(tree: &DocumentTree, registry: &NodeRegistry) -> Value {
    let mut document = JsonMap::new();
    document.insert("root".into(), export_node(tree, registry, tree.root()));
    document.insert("version".into(), Value::from(DOCUMENT_VERSION));
    Value::Object(document)
}

/// Serialized document as a compact JSON string
pub fn to_json_string(tree: &DocumentTree) -> Result<String, SerializeError> {
    Ok(serde_json::to_string(&serialize(tree))?)
}

pub fn to_json_string_pretty(tree: &DocumentTree) -> Result<String, SerializeError> {
    Ok(serde_json::to_string_pretty(&serialize(tree))?)
}

fn export_node(tree: &DocumentTree, registry: &NodeRegistry, id: NodeId) -> Value {
    let Some(node) = tree.get(id) else {
        return Value::Null;
    };
    let mut object = JsonMap::new();
    object.insert("type".into(), Value::from(node.tag()));
    if let Some(behavior) = registry.behavior_for(&node.kind) {
        behavior.export(node, &mut object);
    }
    if !node.kind.is_leaf() {
        object.insert("format".into(), Value::from(node.align.as_str()));
        let children = node
            .children
            .iter()
            .map(|c| export_node(tree, registry, *c))
            .collect();
        object.insert("children".into(), Value::Array(children));
    }
    object.insert("version".into(), Value::from(DOCUMENT_VERSION));
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ImagePayload, NodeKind, TextFormat};
    use serde_json::json;

    #[test]
    fn test_blank_document_shape() {
        let out = serialize(&DocumentTree::new());
        assert_eq!(
            out,
            json!({
                "root": {
                    "type": "root",
                    "format": "",
                    "children": [
                        { "type": "paragraph", "format": "", "children": [], "version": 1 }
                    ],
                    "version": 1
                },
                "version": 1
            })
        );
    }

    #[test]
    fn test_text_and_image_attributes() {
        let mut tree = DocumentTree::bare();
        let p = tree.push_paragraph("");
        let bold = tree.create(NodeKind::formatted_text("b", TextFormat::BOLD));
        tree.append(p, bold).unwrap();
        let image = tree.create(NodeKind::Image(ImagePayload::new("/a.png", "alt")));
        tree.append(p, image).unwrap();

        let out = serialize(&tree);
        let children = &out["root"]["children"][0]["children"];
        assert_eq!(
            children[0],
            json!({ "type": "text", "text": "b", "format": 1, "style": "", "detail": 0, "mode": "normal", "version": 1 })
        );
        assert_eq!(
            children[1],
            json!({ "type": "image", "src": "/a.png", "altText": "alt", "version": 1 })
        );
    }

    #[test]
    fn test_snapshot_is_detached_from_tree() {
        let mut tree = DocumentTree::bare();
        let p = tree.push_paragraph("before");
        let snapshot = to_json_string(&tree).unwrap();

        let text = tree.children(p)[0];
        if let Some(t) = tree.kind_mut(text).and_then(|k| k.text_value_mut()) {
            *t = "after".to_string();
        }

        assert!(snapshot.contains("before"));
        assert!(!snapshot.contains("after"));
    }
}
