//! Built-in node behaviors

mod block;
mod code;
mod image;
mod link;
mod list;
mod table;
mod text;

pub use code::code_gutter;
pub use image::{resize_image, ResizeBounds, ResizeHandle, DEFAULT_CONTAINER_PADDING, MIN_IMAGE_SIZE};
pub use link::{normalize_url, sanitize_url};

use crate::registry::{JsonMap, NodeBehavior};
use serde_json::Value;

pub(crate) fn builtin() -> Vec<Box<dyn NodeBehavior>> {
    vec![
        Box::new(block::RootBehavior),
        Box::new(block::ParagraphBehavior),
        Box::new(block::HeadingBehavior),
        Box::new(block::QuoteBehavior),
        Box::new(list::ListBehavior),
        Box::new(list::ListItemBehavior),
        Box::new(link::LinkBehavior),
        Box::new(text::TextBehavior),
        Box::new(text::LineBreakBehavior),
        Box::new(code::CodeBehavior),
        Box::new(code::CodeHighlightBehavior),
        Box::new(table::TableBehavior),
        Box::new(table::TableRowBehavior),
        Box::new(table::TableCellBehavior),
        Box::new(image::ImageBehavior),
    ]
}

fn str_field<'a>(object: &'a JsonMap, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

/// Non-negative integer given as a number or a numeric string
fn u32_field(object: &JsonMap, key: &str) -> Option<u32> {
    match object.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f.round() as u32),
        _ => None,
    }
}
