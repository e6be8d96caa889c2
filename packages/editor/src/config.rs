use scribe_model::DEFAULT_EXCERPT_LIMIT;
use serde::{Deserialize, Serialize};

/// Editor settings, loadable from the `editor` section of `scribe.config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Characters kept in the change-callback excerpt
    pub excerpt_limit: usize,

    pub image: ImageConfig,

    pub autosize: AutosizeConfig,

    /// Undo levels kept (0 = unlimited)
    pub history_limit: usize,

    /// Follow-up transactions a single flush may trigger
    pub max_reentrant_transactions: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            excerpt_limit: DEFAULT_EXCERPT_LIMIT,
            image: ImageConfig::default(),
            autosize: AutosizeConfig::default(),
            history_limit: 100,
            max_reentrant_transactions: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageConfig {
    pub min_size: u32,
    pub container_padding: u32,
    /// Largest file the data URL decoder accepts
    pub max_bytes: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            min_size: scribe_model::nodes::MIN_IMAGE_SIZE,
            container_padding: scribe_model::nodes::DEFAULT_CONTAINER_PADDING,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Inputs of the editor height estimate, in logical pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutosizeConfig {
    pub line_height: u32,
    pub block_spacing: u32,
    pub min_height: u32,
    pub max_height: u32,
}

impl Default for AutosizeConfig {
    fn default() -> Self {
        Self {
            line_height: 24,
            block_spacing: 8,
            min_height: 120,
            max_height: 600,
        }
    }
}
