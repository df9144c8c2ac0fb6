//! Strip Configuration
//!
//! Persistent settings for a flow strip.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::Result;

/// Strip layout, animation, and content settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    // === Layout ===
    /// Width of a single item in pixels
    pub item_width: u32,

    /// Height of a single item in pixels
    pub item_height: u32,

    /// Horizontal gap between neighbouring items in pixels
    pub gap_between_items: u32,

    /// Width of the visible window in pixels
    pub viewport_width: u32,

    /// Blank rows above the items
    pub padding_top: u32,

    /// Blank rows below the items
    pub padding_bottom: u32,

    // === Animation ===
    /// Scroll speed in pixels per second (sign is ignored; the strip always
    /// scrolls forward)
    pub speed_px_per_sec: f32,

    // === Content ===
    /// Ordered, cyclic list of image references (URLs or file paths)
    pub image_refs: Vec<String>,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            item_width: 160,
            item_height: 160,
            gap_between_items: 0,
            viewport_width: 480,
            padding_top: 0,
            padding_bottom: 0,
            speed_px_per_sec: 100.0,
            image_refs: Vec::new(),
        }
    }
}

impl StripConfig {
    /// Get config file path
    fn file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("flowstrip").join("config.json"))
    }

    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        let path = Self::file_path().ok_or_else(|| anyhow::anyhow!("No config directory"))?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load settings from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StripConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::file_path().ok_or_else(|| anyhow::anyhow!("No config directory"))?;

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Item width plus its trailing gap
    pub fn item_extent(&self) -> u32 {
        self.item_width + self.gap_between_items
    }

    /// Height of the composited frame
    pub fn frame_height(&self) -> u32 {
        self.padding_top + self.item_height + self.padding_bottom
    }
}
