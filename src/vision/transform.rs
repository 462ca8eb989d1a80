//! Frame rotation and cropping
//!
//! The per-frame hot path: `rotate90` touches every byte of every frame and
//! has to finish well inside the camera's frame interval (~33 ms at 30 fps)
//! or the source silently drops frames.

use crate::capture::frame::{RawFrame, RotatedFrame};
use crate::config::Rotation;
use crate::error::CaptureError;
use crate::geometry::CropRect;

/// Quarter-turn a single-plane frame, swapping its dimensions
///
/// Clockwise maps source (x, y) to (height-1-y, x); counter-clockwise maps
/// (x, y) to (y, width-1-x). The direction comes from configuration and
/// must match the physical sensor mounting.
pub fn rotate90(frame: &RawFrame<'_>, direction: Rotation) -> RotatedFrame {
    let w = frame.width as usize;
    let h = frame.height as usize;
    let src = &frame.bytes[..w * h];
    let mut dst = vec![0u8; w * h];

    match direction {
        Rotation::Clockwise => {
            for (y, row) in src.chunks_exact(w).enumerate() {
                let col = h - 1 - y;
                for (x, &px) in row.iter().enumerate() {
                    dst[x * h + col] = px;
                }
            }
        }
        Rotation::CounterClockwise => {
            for (y, row) in src.chunks_exact(w).enumerate() {
                for (x, &px) in row.iter().enumerate() {
                    dst[(w - 1 - x) * h + y] = px;
                }
            }
        }
    }

    RotatedFrame {
        bytes: dst,
        width: frame.height,
        height: frame.width,
    }
}

/// Check that a crop rectangle lies inside a rotated frame
///
/// Used both before copying pixels and before handing the rectangle to the
/// recognizer; a rectangle can transiently overflow during a resolution
/// change and the frame is then skipped.
pub fn ensure_in_bounds(frame: &RotatedFrame, rect: &CropRect) -> Result<(), CaptureError> {
    if rect.l >= rect.r || rect.t >= rect.b || rect.r > frame.width || rect.b > frame.height {
        return Err(CaptureError::OutOfBounds {
            l: rect.l,
            r: rect.r,
            t: rect.t,
            b: rect.b,
            width: frame.width,
            height: frame.height,
        });
    }
    Ok(())
}

/// Copy `[l,r) x [t,b)` out of a rotated frame into a dense buffer
///
/// Format-preserving, one byte per pixel, no interpolation. The output
/// length is exactly `(r-l) * (b-t)`.
pub fn crop(frame: &RotatedFrame, rect: &CropRect) -> Result<Vec<u8>, CaptureError> {
    ensure_in_bounds(frame, rect)?;

    let stride = frame.width as usize;
    let width = rect.width() as usize;
    let mut out = Vec::with_capacity(width * rect.height() as usize);

    for row in rect.t..rect.b {
        let start = row as usize * stride + rect.l as usize;
        out.extend_from_slice(&frame.bytes[start..start + width]);
    }

    Ok(out)
}
