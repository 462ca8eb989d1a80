//! Guide-Region Geometry
//!
//! Maps the normalized guide band from display coordinates into pixel
//! coordinates of the rotated frame buffer. Three coordinate systems meet
//! here: the display surface, the centered guide overlay, and the
//! sensor-native frame after rotation; the conversion lives in one pure
//! function so it can be tested without a camera.

use crate::config::GuideFraction;
use crate::error::CaptureError;

/// Display surface and guide overlay extents, refreshed by the layout pass
///
/// `overlay_*` are the half-extents of the centered guide outline; the
/// rendered outline spans twice these values on each axis, so the surface
/// may letterbox it symmetrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub surface_width: u32,
    pub surface_height: u32,
    pub overlay_width: u32,
    pub overlay_height: u32,
}

/// Crop rectangle in rotated-frame pixels, end-exclusive on r and b
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.r - self.l
    }

    pub fn height(&self) -> u32 {
        self.b - self.t
    }
}

/// Map one guide fraction through the centered overlay onto a frame axis
fn map_axis(fraction: f32, overlay: u32, surface: u32, frame: u32) -> i64 {
    let overlay = overlay as f32;
    let surface = surface as f32;
    ((fraction * overlay * 2.0 + surface / 2.0 - overlay) / surface * frame as f32).round() as i64
}

/// Convert the guide band into a crop rectangle within the rotated frame
///
/// The frame has already been rotated, so its width corresponds to the
/// display's width axis. `vertical_inset_px` shifts both vertical edges by
/// the status-bar-equivalent row offset. Must be called fresh every frame:
/// the display geometry can change between frames and the result is never
/// valid across a resolution change.
pub fn map_guide_to_crop(
    guide: &GuideFraction,
    display: &DisplayGeometry,
    vertical_inset_px: i32,
    frame_width: u32,
    frame_height: u32,
) -> Result<CropRect, CaptureError> {
    let degenerate = CaptureError::InvalidGeometry {
        surface_width: display.surface_width,
        surface_height: display.surface_height,
    };

    if display.surface_width == 0
        || display.surface_height == 0
        || frame_width == 0
        || frame_height == 0
    {
        return Err(degenerate);
    }

    let inset = vertical_inset_px as i64;
    let l = map_axis(
        guide.left,
        display.overlay_width,
        display.surface_width,
        frame_width,
    );
    let r = map_axis(
        guide.right,
        display.overlay_width,
        display.surface_width,
        frame_width,
    );
    let t = map_axis(
        guide.top,
        display.overlay_height,
        display.surface_height,
        frame_height,
    ) + inset;
    let b = map_axis(
        guide.bottom,
        display.overlay_height,
        display.surface_height,
        frame_height,
    ) + inset;

    let l = l.clamp(0, frame_width as i64) as u32;
    let r = r.clamp(0, frame_width as i64) as u32;
    let t = t.clamp(0, frame_height as i64) as u32;
    let b = b.clamp(0, frame_height as i64) as u32;

    // Strict ordering also keeps l and t inside [0, frame) after clamping
    if l >= r || t >= b {
        return Err(degenerate);
    }

    Ok(CropRect { l, r, t, b })
}
