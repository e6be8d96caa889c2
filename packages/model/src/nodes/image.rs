//! Image decorator node and its resize geometry.

use super::{str_field, u32_field};
use crate::html::{escape_html, RenderContext};
use crate::node::{ImagePayload, Node, NodeKind};
use crate::registry::{JsonMap, NodeBehavior};
use crate::tree::DocumentTree;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Smallest width or height an image may be resized to
pub const MIN_IMAGE_SIZE: u32 = 80;

/// Space kept free between a resized image and its container edge
pub const DEFAULT_CONTAINER_PADDING: u32 = 16;

pub(crate) struct ImageBehavior;

impl NodeBehavior for ImageBehavior {
    fn tag(&self) -> &'static str {
        "image"
    }

    fn create(&self) -> NodeKind {
        NodeKind::Image(ImagePayload::default())
    }

    fn export(&self, node: &Node, out: &mut JsonMap) {
        let NodeKind::Image(image) = &node.kind else {
            return;
        };
        out.insert("src".into(), Value::from(image.src.as_str()));
        out.insert("altText".into(), Value::from(image.alt_text.as_str()));
        if let Some(width) = image.width {
            out.insert("width".into(), Value::from(width));
        }
        if let Some(height) = image.height {
            out.insert("height".into(), Value::from(height));
        }
    }

    fn import(&self, object: &JsonMap) -> Option<NodeKind> {
        let src = str_field(object, "src")?.trim();
        if src.is_empty() {
            return None;
        }
        let alt_text = str_field(object, "altText")
            .or_else(|| str_field(object, "alt"))
            .unwrap_or_default();
        Some(NodeKind::Image(ImagePayload {
            src: src.to_string(),
            alt_text: alt_text.to_string(),
            width: u32_field(object, "width").filter(|w| *w > 0),
            height: u32_field(object, "height").filter(|h| *h > 0),
        }))
    }

    fn render(&self, _tree: &DocumentTree, node: &Node, ctx: &mut RenderContext) {
        let NodeKind::Image(image) = &node.kind else {
            return;
        };
        let Some(src) = safe_image_src(&image.src) else {
            return;
        };

        let mut attrs = format!(
            "src=\"{}\" alt=\"{}\"",
            escape_html(src),
            escape_html(&image.alt_text)
        );
        if let Some(width) = image.width {
            attrs.push_str(&format!(" width=\"{width}\""));
        }
        if let Some(height) = image.height {
            attrs.push_str(&format!(" height=\"{height}\""));
        }
        attrs.push_str(&format!(" data-min-size=\"{MIN_IMAGE_SIZE}\""));
        if let (Some(w), Some(h)) = (image.width, image.height) {
            let ratio = (f64::from(w) / f64::from(h) * 10_000.0).round() / 10_000.0;
            attrs.push_str(&format!(" data-aspect-ratio=\"{ratio}\""));
        }

        ctx.add(&format!("<span class=\"editor-image\"><img {attrs}></span>"));
    }
}

/// Image sources allowed in rendered markup
fn safe_image_src(src: &str) -> Option<&str> {
    let trimmed = src.trim();
    if trimmed.to_ascii_lowercase().starts_with("data:image/") {
        return Some(trimmed);
    }
    match super::link::scheme_of(trimmed) {
        None => Some(trimmed),
        Some(scheme) if scheme == "http" || scheme == "https" => Some(trimmed),
        Some(_) => None,
    }
}

/// Handle being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeHandle {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl ResizeHandle {
    /// Direction a positive pointer x delta grows the width in
    fn horizontal(self) -> f64 {
        match self {
            ResizeHandle::East | ResizeHandle::NorthEast | ResizeHandle::SouthEast => 1.0,
            ResizeHandle::West | ResizeHandle::NorthWest | ResizeHandle::SouthWest => -1.0,
            ResizeHandle::North | ResizeHandle::South => 0.0,
        }
    }

    fn vertical(self) -> f64 {
        match self {
            ResizeHandle::South | ResizeHandle::SouthEast | ResizeHandle::SouthWest => 1.0,
            ResizeHandle::North | ResizeHandle::NorthEast | ResizeHandle::NorthWest => -1.0,
            ResizeHandle::East | ResizeHandle::West => 0.0,
        }
    }
}

/// Limits applied while resizing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeBounds {
    pub container_width: f64,
    /// `None` leaves the height unbounded above
    pub container_height: Option<f64>,
    pub padding: f64,
    pub min_size: f64,
}

impl ResizeBounds {
    pub fn new(container_width: f64) -> Self {
        Self {
            container_width,
            container_height: None,
            padding: f64::from(DEFAULT_CONTAINER_PADDING),
            min_size: f64::from(MIN_IMAGE_SIZE),
        }
    }

    pub fn with_height(mut self, container_height: f64) -> Self {
        self.container_height = Some(container_height);
        self
    }

    fn max_width(&self) -> f64 {
        (self.container_width - self.padding).max(self.min_size)
    }

    fn max_height(&self) -> f64 {
        self.container_height
            .map(|h| (h - self.padding).max(self.min_size))
            .unwrap_or(f64::INFINITY)
    }
}

/// New image size for a pointer drag.
///
/// The axis with the larger signed delta drives the resize and the other
/// axis follows the starting aspect ratio. Width then height are clamped to
/// `[min_size, container - padding]`, re-deriving the other axis after each
/// clamp that changed a value.
pub fn resize_image(
    start: (u32, u32),
    handle: ResizeHandle,
    delta: (f64, f64),
    bounds: &ResizeBounds,
) -> (u32, u32) {
    let start_width = f64::from(start.0.max(1));
    let start_height = f64::from(start.1.max(1));
    let aspect = start_width / start_height;

    let dx = delta.0 * handle.horizontal();
    let dy = delta.1 * handle.vertical();

    let (mut width, mut height) = if dx.abs() >= dy.abs() {
        let width = start_width + dx;
        (width, width / aspect)
    } else {
        let height = start_height + dy;
        (height * aspect, height)
    };

    let clamped = width.clamp(bounds.min_size, bounds.max_width());
    if clamped != width {
        width = clamped;
        height = width / aspect;
    }
    let clamped = height.clamp(bounds.min_size, bounds.max_height());
    if clamped != height {
        height = clamped;
        width = height * aspect;
    }

    let width = width.clamp(bounds.min_size, bounds.max_width());
    let height = height.clamp(bounds.min_size, bounds.max_height());
    (width.round() as u32, height.round() as u32)
}
