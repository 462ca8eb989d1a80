//! Pipeline Configuration
//!
//! Geometry constants stored in TOML format: guide fractions, overlay
//! extents and the sensor rotation direction.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Direction of the fixed quarter-turn applied to every raw frame
///
/// Depends on how the sensor is mounted relative to the portrait capture
/// surface; a per-device config edit, never an inline literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    /// Sensor streams landscape-left relative to the portrait surface
    #[default]
    Clockwise,
    /// Sensor streams landscape-right
    CounterClockwise,
}

/// Normalized position of the number band within the guide outline
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GuideFraction {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for GuideFraction {
    fn default() -> Self {
        // Number band of an ID-1 card outline (85.6 x 54.0 mm)
        Self {
            left: 28.0 / 85.6,
            right: 76.0 / 85.6,
            top: 44.0 / 54.0,
            bottom: 49.0 / 54.0,
        }
    }
}

/// Half-extents of the centered guide outline in display pixels
///
/// The rendered outline spans twice these values on each axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OverlayExtent {
    pub width: u32,
    pub height: u32,
}

impl Default for OverlayExtent {
    fn default() -> Self {
        // Card aspect ratio (1.585:1) at a size that fits a 480px surface
        Self {
            width: 200,
            height: 126,
        }
    }
}

/// Capture pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Where the number band sits within the guide outline
    pub guide: GuideFraction,
    /// Rendered guide half-extents in display pixels
    pub overlay: OverlayExtent,
    /// Status-bar-equivalent inset added to both vertical crop edges
    pub vertical_inset_px: i32,
    /// Quarter-turn direction matching the sensor mounting
    pub rotation: Rotation,
    /// Maximum width/height ratio deviation accepted by preview selection
    pub aspect_tolerance: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            guide: GuideFraction::default(),
            overlay: OverlayExtent::default(),
            vertical_inset_px: 72,
            rotation: Rotation::default(),
            aspect_tolerance: 0.1,
        }
    }
}

/// Resolve the per-user configuration directory, creating it if needed
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "cashea", "card-capture")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<CaptureConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: CaptureConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &CaptureConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
