//! Vision Layer
//!
//! Frame transforms plus the boundary to the external recognition engine.
//! The pipeline never performs character recognition itself; it only decides
//! when the recognizer runs and on which pixels.

pub mod scripted;
pub mod transform;

pub use scripted::ScriptedRecognizer;
pub use transform::{crop, ensure_in_bounds, rotate90};

use crate::geometry::CropRect;

/// Boundary to the external recognition engine
///
/// `bytes` is the full rotated frame plane with `width`/`height` its
/// dimensions; `rect` locates the number band in frame-pixel coordinates,
/// not buffer-relative ones. Returns `None` when no confident reading
/// exists. The call blocks on the frame-delivery thread; implementations
/// should return promptly or frame throughput degrades.
pub trait Recognizer {
    fn recognize(
        &mut self,
        bytes: &[u8],
        width: u32,
        height: u32,
        rect: &CropRect,
    ) -> Option<String>;
}
