//! Camera Session Layer
//!
//! Preview-size negotiation against the frame source's supported list.
//! The camera itself (open/release, permissions, streaming) is an external
//! collaborator; this layer only decides which resolution to ask it for.

pub mod frame;

use tracing::info;

use crate::error::CaptureError;

/// A capture resolution supported by the frame source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSize {
    pub width: u32,
    pub height: u32,
}

impl PreviewSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Pick the best-fit preview size for a target surface
///
/// Prefers sizes within `aspect_tolerance` of the target width/height ratio,
/// minimizing the height difference; falls back to the plain height
/// minimization when nothing passes the aspect filter. Ties go to the first
/// size encountered in the supplied order, so the result is deterministic
/// for a fixed input order. Returns `None` only for an empty list.
pub fn select_preview_size(
    sizes: &[PreviewSize],
    target_width: u32,
    target_height: u32,
    aspect_tolerance: f64,
) -> Option<PreviewSize> {
    let target_ratio = target_width as f64 / target_height as f64;

    let mut optimal: Option<PreviewSize> = None;
    let mut min_diff = f64::MAX;

    for size in sizes {
        let ratio = size.width as f64 / size.height as f64;
        if (ratio - target_ratio).abs() > aspect_tolerance {
            continue;
        }
        let diff = (size.height as f64 - target_height as f64).abs();
        if diff < min_diff {
            optimal = Some(*size);
            min_diff = diff;
        }
    }

    // Nothing matched the aspect ratio, ignore the requirement
    if optimal.is_none() {
        min_diff = f64::MAX;
        for size in sizes {
            let diff = (size.height as f64 - target_height as f64).abs();
            if diff < min_diff {
                optimal = Some(*size);
                min_diff = diff;
            }
        }
    }

    optimal
}

/// Negotiated state for one camera streaming session
#[derive(Debug, Clone)]
pub struct CaptureSession {
    preview: PreviewSize,
}

impl CaptureSession {
    /// Negotiate the preview size for a portrait capture surface
    ///
    /// The sensor streams landscape while the capture surface is portrait,
    /// so the surface dimensions are swapped before matching. Fails with
    /// `NoCameraAvailable` when the source supplied no sizes; the chosen
    /// size must be handed back to the source before streaming begins.
    pub fn negotiate(
        sizes: &[PreviewSize],
        surface_width: u32,
        surface_height: u32,
        aspect_tolerance: f64,
    ) -> Result<Self, CaptureError> {
        let preview =
            select_preview_size(sizes, surface_height, surface_width, aspect_tolerance)
                .ok_or(CaptureError::NoCameraAvailable)?;
        info!(
            "negotiated preview size {}x{} for {}x{} surface",
            preview.width, preview.height, surface_width, surface_height
        );
        Ok(Self { preview })
    }

    /// The resolution the frame source should stream at
    pub fn preview_size(&self) -> PreviewSize {
        self.preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes() -> Vec<PreviewSize> {
        vec![
            PreviewSize::new(1920, 1080),
            PreviewSize::new(1280, 720),
            PreviewSize::new(1024, 768),
            PreviewSize::new(800, 480),
            PreviewSize::new(640, 480),
        ]
    }

    #[test]
    fn test_select_returns_member_of_input() {
        let sizes = sizes();
        let chosen = select_preview_size(&sizes, 800, 480, 0.1).unwrap();
        assert!(sizes.contains(&chosen));
    }

    #[test]
    fn test_select_prefers_matching_aspect() {
        let sizes = sizes();
        // 16:9-ish target: 1024x768 (4:3) is closest in height but off-aspect
        let chosen = select_preview_size(&sizes, 1334, 750, 0.1).unwrap();
        assert_eq!(chosen, PreviewSize::new(1280, 720));
    }

    #[test]
    fn test_select_tie_break_first_encountered() {
        let sizes = vec![
            PreviewSize::new(1280, 720),
            PreviewSize::new(1920, 1080),
        ];
        // Both pass the 16:9 filter with equal |height - 900| distance
        let chosen = select_preview_size(&sizes, 1600, 900, 0.1).unwrap();
        assert_eq!(chosen, PreviewSize::new(1280, 720));
    }

    #[test]
    fn test_select_falls_back_when_no_aspect_match() {
        let sizes = vec![PreviewSize::new(640, 480), PreviewSize::new(800, 600)];
        // 21:9-ish target that nothing matches
        let chosen = select_preview_size(&sizes, 2100, 900, 0.1).unwrap();
        assert_eq!(chosen, PreviewSize::new(800, 600));
    }

    #[test]
    fn test_select_empty_returns_none() {
        assert!(select_preview_size(&[], 800, 480, 0.1).is_none());
    }

    #[test]
    fn test_negotiate_swaps_portrait_surface() {
        // Portrait 480x800 surface should match landscape 800x480 streams
        let session = CaptureSession::negotiate(&sizes(), 480, 800, 0.1).unwrap();
        assert_eq!(session.preview_size(), PreviewSize::new(800, 480));
    }

    #[test]
    fn test_negotiate_no_camera() {
        let err = CaptureSession::negotiate(&[], 480, 800, 0.1).unwrap_err();
        assert_eq!(err, CaptureError::NoCameraAvailable);
    }
}
