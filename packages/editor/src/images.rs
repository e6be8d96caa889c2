//! Pasted and uploaded image files.
//!
//! Decoding a file into a displayable source may finish after the editor has
//! moved on. An [`ImageTicket`] taken when the read starts ties the result to
//! the session generation at that moment; the pipeline drops results whose
//! ticket no longer matches.

use crate::DecodeError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use scribe_model::ImagePayload;

/// Raw file handed over by a paste, drop or file picker
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub name: String,
    /// Declared type; the decoder trusts the file contents instead
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes,
        }
    }
}

/// Turns a file into an image source
pub trait ImageDecoder {
    fn decode(&self, file: &ImageFile) -> Result<ImagePayload, DecodeError>;
}

/// Marks an image insert started for one session generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTicket {
    pub(crate) generation: u64,
}

/// Embeds the file as a base64 `data:` URL after checking its magic bytes
#[derive(Debug, Clone)]
pub struct DataUrlDecoder {
    max_bytes: usize,
}

impl DataUrlDecoder {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for DataUrlDecoder {
    fn default() -> Self {
        Self::new(crate::config::ImageConfig::default().max_bytes)
    }
}

impl ImageDecoder for DataUrlDecoder {
    fn decode(&self, file: &ImageFile) -> Result<ImagePayload, DecodeError> {
        if file.bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        if file.bytes.len() > self.max_bytes {
            return Err(DecodeError::TooLarge {
                size: file.bytes.len(),
                limit: self.max_bytes,
            });
        }
        let mime = sniff_mime(&file.bytes).ok_or_else(|| {
            DecodeError::UnsupportedFormat(file.mime.clone().unwrap_or_else(|| file.name.clone()))
        })?;

        let src = format!("data:{mime};base64,{}", STANDARD.encode(&file.bytes));
        Ok(ImagePayload::new(src, alt_from_name(&file.name)))
    }
}

/// Image type from the leading bytes of a file
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

    if bytes.starts_with(PNG) {
        Some("image/png")
    } else if bytes.starts_with(JPEG) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn alt_from_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}
