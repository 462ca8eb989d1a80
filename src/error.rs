//! Pipeline error types
//!
//! Only `NoCameraAvailable` blocks starting a session; the geometry errors
//! are recoverable and cause the current frame to be skipped.

use thiserror::Error;

/// Errors raised by the capture pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The frame source reported no supported preview sizes
    #[error("no camera preview sizes available")]
    NoCameraAvailable,

    /// The guide mapping collapsed to an empty rectangle
    #[error("guide region degenerate on {surface_width}x{surface_height} surface")]
    InvalidGeometry {
        surface_width: u32,
        surface_height: u32,
    },

    /// A crop rectangle exceeds the rotated frame bounds
    #[error("crop ({l},{t})..({r},{b}) outside {width}x{height} frame")]
    OutOfBounds {
        l: u32,
        r: u32,
        t: u32,
        b: u32,
        width: u32,
        height: u32,
    },
}
