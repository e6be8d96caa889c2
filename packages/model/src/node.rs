//! # Node Types
//!
//! Every element of a document tree is a [`Node`]: an id, a parent
//! back-reference, an ordered list of children and a [`NodeKind`] payload.
//!
//! ## Containment grammar
//!
//! ```text
//! root, tablecell      → blocks (paragraph, heading, quote, list, code, table)
//! paragraph, heading,
//! quote                → inline (text, linebreak, link, image)
//! listitem             → inline + nested list
//! link                 → text, linebreak, image
//! code                 → code-highlight, linebreak
//! list                 → listitem
//! table                → tablerow
//! tablerow             → tablecell
//! ```
//!
//! Formatting is a flat bitmask on text nodes, never a wrapper node.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node, unique within one document instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

bitflags! {
    /// Inline text formats. Bit values match the persisted document format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TextFormat: u32 {
        const BOLD = 1;
        const ITALIC = 1 << 1;
        const STRIKETHROUGH = 1 << 2;
        const UNDERLINE = 1 << 3;
        const CODE = 1 << 4;
        const SUBSCRIPT = 1 << 5;
        const SUPERSCRIPT = 1 << 6;
        const HIGHLIGHT = 1 << 7;
    }
}

impl TextFormat {
    /// Look up a single format by its name (`"bold"`, `"italic"`, ...)
    pub fn from_format_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bold" => Some(Self::BOLD),
            "italic" => Some(Self::ITALIC),
            "strikethrough" => Some(Self::STRIKETHROUGH),
            "underline" => Some(Self::UNDERLINE),
            "code" => Some(Self::CODE),
            "subscript" => Some(Self::SUBSCRIPT),
            "superscript" => Some(Self::SUPERSCRIPT),
            "highlight" => Some(Self::HIGHLIGHT),
            _ => None,
        }
    }
}

/// Block alignment, persisted as the element `format` string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    #[serde(rename = "")]
    Unset,
    Left,
    Center,
    Right,
    Justify,
    Start,
    End,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Unset => "",
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
            Alignment::Start => "start",
            Alignment::End => "end",
        }
    }

    /// Unknown strings fall back to [`Alignment::Unset`]
    pub fn parse(value: &str) -> Self {
        match value {
            "left" => Alignment::Left,
            "center" => Alignment::Center,
            "right" => Alignment::Right,
            "justify" => Alignment::Justify,
            "start" => Alignment::Start,
            "end" => Alignment::End,
            _ => Alignment::Unset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Bullet,
    Number,
}

impl ListType {
    pub fn as_str(self) -> &'static str {
        match self {
            ListType::Bullet => "bullet",
            ListType::Number => "number",
        }
    }

    pub fn tag_name(self) -> &'static str {
        match self {
            ListType::Bullet => "ul",
            ListType::Number => "ol",
        }
    }
}

/// Rendering payload of an image decorator node
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub src: String,
    #[serde(default)]
    pub alt_text: String,
    /// `None` means "inherit" (natural size)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl ImagePayload {
    pub fn new(src: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt_text: alt_text.into(),
            width: None,
            height: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Type tag plus type-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Paragraph,
    Heading { level: u8 },
    Quote,
    List { list_type: ListType, start: u32 },
    ListItem { value: u32 },
    Link { url: String },
    Text { text: String, format: TextFormat, style: String },
    LineBreak,
    CodeBlock { language: Option<String> },
    CodeHighlight { text: String, highlight: Option<String> },
    Table,
    TableRow,
    TableCell { header: bool },
    Image(ImagePayload),
}

impl NodeKind {
    pub fn text(text: impl Into<String>) -> Self {
        NodeKind::Text {
            text: text.into(),
            format: TextFormat::empty(),
            style: String::new(),
        }
    }

    pub fn formatted_text(text: impl Into<String>, format: TextFormat) -> Self {
        NodeKind::Text {
            text: text.into(),
            format,
            style: String::new(),
        }
    }

    pub fn code_line(text: impl Into<String>) -> Self {
        NodeKind::CodeHighlight {
            text: text.into(),
            highlight: None,
        }
    }

    pub fn heading(level: u8) -> Self {
        NodeKind::Heading {
            level: level.clamp(1, 6),
        }
    }

    /// Canonical wire tag
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading { .. } => "heading",
            NodeKind::Quote => "quote",
            NodeKind::List { .. } => "list",
            NodeKind::ListItem { .. } => "listitem",
            NodeKind::Link { .. } => "link",
            NodeKind::Text { .. } => "text",
            NodeKind::LineBreak => "linebreak",
            NodeKind::CodeBlock { .. } => "code",
            NodeKind::CodeHighlight { .. } => "code-highlight",
            NodeKind::Table => "table",
            NodeKind::TableRow => "tablerow",
            NodeKind::TableCell { .. } => "tablecell",
            NodeKind::Image(_) => "image",
        }
    }

    /// Nodes the root (and a table cell) may hold directly
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Heading { .. }
                | NodeKind::Quote
                | NodeKind::List { .. }
                | NodeKind::CodeBlock { .. }
                | NodeKind::Table
        )
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Text { .. } | NodeKind::LineBreak | NodeKind::Link { .. } | NodeKind::Image(_)
        )
    }

    /// Nodes that never have children
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            NodeKind::Text { .. }
                | NodeKind::LineBreak
                | NodeKind::CodeHighlight { .. }
                | NodeKind::Image(_)
        )
    }

    /// Leaves that carry text and can hold a text point
    pub fn is_text_like(&self) -> bool {
        matches!(self, NodeKind::Text { .. } | NodeKind::CodeHighlight { .. })
    }

    /// Blocks whose direct content is inline; targets of block transforms
    pub fn is_text_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Heading { .. }
                | NodeKind::Quote
                | NodeKind::ListItem { .. }
                | NodeKind::CodeBlock { .. }
        )
    }

    /// Whether a child of kind `child` may be placed directly under `self`
    pub fn accepts(&self, child: &NodeKind) -> bool {
        match self {
            NodeKind::Root | NodeKind::TableCell { .. } => child.is_block(),
            NodeKind::Paragraph | NodeKind::Heading { .. } | NodeKind::Quote => child.is_inline(),
            NodeKind::ListItem { .. } => child.is_inline() || matches!(child, NodeKind::List { .. }),
            NodeKind::Link { .. } => {
                matches!(child, NodeKind::Text { .. } | NodeKind::LineBreak | NodeKind::Image(_))
            }
            NodeKind::CodeBlock { .. } => {
                matches!(child, NodeKind::CodeHighlight { .. } | NodeKind::LineBreak)
            }
            NodeKind::List { .. } => matches!(child, NodeKind::ListItem { .. }),
            NodeKind::Table => matches!(child, NodeKind::TableRow),
            NodeKind::TableRow => matches!(child, NodeKind::TableCell { .. }),
            NodeKind::Text { .. }
            | NodeKind::LineBreak
            | NodeKind::CodeHighlight { .. }
            | NodeKind::Image(_) => false,
        }
    }

    pub fn accepts_blocks(&self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::TableCell { .. })
    }

    pub fn accepts_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph | NodeKind::Heading { .. } | NodeKind::Quote | NodeKind::ListItem { .. }
        )
    }

    pub fn text_value(&self) -> Option<&str> {
        match self {
            NodeKind::Text { text, .. } | NodeKind::CodeHighlight { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn text_value_mut(&mut self) -> Option<&mut String> {
        match self {
            NodeKind::Text { text, .. } | NodeKind::CodeHighlight { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Length of the carried text in characters (0 for non-text nodes)
    pub fn text_len(&self) -> usize {
        self.text_value().map(|t| t.chars().count()).unwrap_or(0)
    }

    pub fn format(&self) -> TextFormat {
        match self {
            NodeKind::Text { format, .. } => *format,
            _ => TextFormat::empty(),
        }
    }
}

/// One element of the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Back-reference only; the arena owns every node
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    pub align: Alignment,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            kind,
            align: Alignment::Unset,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }
}
