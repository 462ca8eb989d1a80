//! Capture Confirmation Engine
//!
//! Per-frame orchestration: rotate the delivered frame, map the guide band,
//! run the recognizer and debounce its output. A read is accepted only when
//! two consecutive frames agree on a full-length result; a single frame is
//! unreliable (motion blur, partial occlusion) and two consecutive identical
//! reads reject transient misreads without a voting scheme.

use tracing::{debug, info};

use crate::capture::frame::RawFrame;
use crate::config::{CaptureConfig, GuideFraction};
use crate::error::CaptureError;
use crate::geometry::{map_guide_to_crop, CropRect, DisplayGeometry};
use crate::vision::{self, Recognizer};

/// Number of characters in a complete card-number read
pub const CARD_NUMBER_LEN: usize = 18;

/// The whole guide outline, used for the illustrative crop on confirmation
const FULL_BAND: GuideFraction = GuideFraction {
    left: 0.0,
    right: 1.0,
    top: 0.0,
    bottom: 1.0,
};

/// Scan session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPhase {
    /// Frames are being processed and candidates compared
    #[default]
    Scanning,
    /// A result was emitted; frames are ignored until reset
    Confirmed,
}

/// Result payload handed to the sink on confirmation
#[derive(Debug, Clone)]
pub struct CapturePayload {
    /// Dense pixel buffer of the full guide band
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Source rectangle within the rotated frame
    pub rect: CropRect,
}

/// Boundary to the result presentation layer
///
/// Called exactly once per session, fire-and-forget: the session stays
/// confirmed regardless of what the sink does with the payload.
pub trait ResultSink {
    fn present(&mut self, text: &str, crop: &CapturePayload);
}

/// Per-session confirmation state, owned exclusively by the engine
#[derive(Debug, Default)]
struct ConfirmationState {
    /// Last full-length read, awaiting an identical successor
    candidate: Option<String>,
    phase: ScanPhase,
}

impl ConfirmationState {
    fn reset(&mut self) {
        self.candidate = None;
        self.phase = ScanPhase::Scanning;
    }
}

/// Drives one scan session from Scanning to Confirmed
///
/// Single-threaded and frame-driven: the camera delivers frames
/// sequentially and the recognizer blocks on the same thread, so frames are
/// processed strictly in arrival order. That ordering is what makes the
/// consecutive-read comparison meaningful.
pub struct ScanEngine<R> {
    config: CaptureConfig,
    display: DisplayGeometry,
    recognizer: R,
    state: ConfirmationState,
}

impl<R: Recognizer> ScanEngine<R> {
    /// Create an engine for a fresh scanning session
    pub fn new(config: CaptureConfig, display: DisplayGeometry, recognizer: R) -> Self {
        Self {
            config,
            display,
            recognizer,
            state: ConfirmationState::default(),
        }
    }

    /// Current session phase
    pub fn phase(&self) -> ScanPhase {
        self.state.phase
    }

    /// The read awaiting confirmation, if any
    pub fn candidate(&self) -> Option<&str> {
        self.state.candidate.as_deref()
    }

    /// Access the injected recognizer
    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Adopt the geometry from a new layout pass
    ///
    /// Takes effect on the very next frame; the crop rectangle is derived
    /// fresh per frame and never cached.
    pub fn set_display_geometry(&mut self, display: DisplayGeometry) {
        self.display = display;
    }

    /// Return to Scanning and forget the candidate
    ///
    /// The only external mutator besides frame delivery; the caller invokes
    /// it when the capture view is re-entered.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Process one delivered frame
    ///
    /// Geometry and bounds failures skip the frame and leave the session
    /// state untouched; the error is returned for the caller's logging
    /// only. While confirmed, frames are ignored without invoking the
    /// recognizer.
    pub fn on_frame<S: ResultSink>(
        &mut self,
        frame: &RawFrame<'_>,
        sink: &mut S,
    ) -> Result<ScanPhase, CaptureError> {
        if self.state.phase == ScanPhase::Confirmed {
            return Ok(ScanPhase::Confirmed);
        }

        let rotated = vision::rotate90(frame, self.config.rotation);
        let rect = map_guide_to_crop(
            &self.config.guide,
            &self.display,
            self.config.vertical_inset_px,
            rotated.width,
            rotated.height,
        )?;
        // The recognizer receives the whole rotated plane plus the band
        // rectangle in frame coordinates, so only the bounds are validated
        // here; pixels are copied out when the payload is built.
        vision::ensure_in_bounds(&rotated, &rect)?;

        let result = self
            .recognizer
            .recognize(&rotated.bytes, rotated.width, rotated.height, &rect);

        match result {
            Some(text) if text.chars().count() == CARD_NUMBER_LEN => {
                if self.state.candidate.as_deref() == Some(text.as_str()) {
                    let band_rect = map_guide_to_crop(
                        &FULL_BAND,
                        &self.display,
                        self.config.vertical_inset_px,
                        rotated.width,
                        rotated.height,
                    )?;
                    let bytes = vision::crop(&rotated, &band_rect)?;
                    let payload = CapturePayload {
                        bytes,
                        width: band_rect.width(),
                        height: band_rect.height(),
                        rect: band_rect,
                    };
                    self.state.phase = ScanPhase::Confirmed;
                    info!("card number confirmed after two consecutive matching reads");
                    sink.present(&text, &payload);
                } else {
                    debug!("candidate read stored, awaiting a matching successor");
                    self.state.candidate = Some(text);
                }
            }
            other => {
                if other.is_some() {
                    debug!("discarding read of wrong length");
                }
                self.state.candidate = None;
            }
        }

        Ok(self.state.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::ScriptedRecognizer;

    const RAW_W: u32 = 320;
    const RAW_H: u32 = 240;

    fn display() -> DisplayGeometry {
        DisplayGeometry {
            surface_width: 480,
            surface_height: 800,
            overlay_width: 200,
            overlay_height: 126,
        }
    }

    fn frame_bytes() -> Vec<u8> {
        (0..RAW_W * RAW_H).map(|i| (i % 251) as u8).collect()
    }

    fn engine_with_script(
        outputs: Vec<Option<String>>,
    ) -> ScanEngine<ScriptedRecognizer> {
        ScanEngine::new(
            CaptureConfig::default(),
            display(),
            ScriptedRecognizer::new(outputs),
        )
    }

    #[derive(Default)]
    struct RecordingSink {
        texts: Vec<String>,
        payloads: Vec<CapturePayload>,
    }

    impl ResultSink for RecordingSink {
        fn present(&mut self, text: &str, crop: &CapturePayload) {
            self.texts.push(text.to_string());
            self.payloads.push(crop.clone());
        }
    }

    /// A recognizer that records the rectangle it was handed each frame
    #[derive(Default)]
    struct RectProbe {
        rects: Vec<CropRect>,
    }

    impl Recognizer for RectProbe {
        fn recognize(
            &mut self,
            _bytes: &[u8],
            _width: u32,
            _height: u32,
            rect: &CropRect,
        ) -> Option<String> {
            self.rects.push(*rect);
            None
        }
    }

    #[test]
    fn test_confirms_on_second_consecutive_matching_read() {
        let full = "ABCDEFGHIJKLMNOPQR";
        let mut engine = engine_with_script(vec![
            Some(String::new()),
            None,
            Some(full.to_string()),
            Some(full.to_string()),
        ]);
        let mut sink = RecordingSink::default();
        let bytes = frame_bytes();
        let frame = RawFrame::new(&bytes, RAW_W, RAW_H);

        assert_eq!(engine.on_frame(&frame, &mut sink).unwrap(), ScanPhase::Scanning);
        assert_eq!(engine.on_frame(&frame, &mut sink).unwrap(), ScanPhase::Scanning);
        assert_eq!(engine.on_frame(&frame, &mut sink).unwrap(), ScanPhase::Scanning);
        assert_eq!(engine.candidate(), Some(full));
        assert!(sink.texts.is_empty());

        assert_eq!(engine.on_frame(&frame, &mut sink).unwrap(), ScanPhase::Confirmed);
        assert_eq!(sink.texts, vec![full.to_string()]);
    }

    #[test]
    fn test_differing_full_length_reads_keep_scanning() {
        let mut engine = engine_with_script(vec![
            Some("1234567890123456ZZ".to_string()),
            Some("1234567890123456XX".to_string()),
        ]);
        let mut sink = RecordingSink::default();
        let bytes = frame_bytes();
        let frame = RawFrame::new(&bytes, RAW_W, RAW_H);

        engine.on_frame(&frame, &mut sink).unwrap();
        engine.on_frame(&frame, &mut sink).unwrap();

        assert_eq!(engine.phase(), ScanPhase::Scanning);
        assert_eq!(engine.candidate(), Some("1234567890123456XX"));
        assert!(sink.texts.is_empty());
    }

    #[test]
    fn test_inconclusive_read_clears_candidate() {
        let full = "ABCDEFGHIJKLMNOPQR";
        let mut engine = engine_with_script(vec![
            Some(full.to_string()),
            None,
            Some(full.to_string()),
        ]);
        let mut sink = RecordingSink::default();
        let bytes = frame_bytes();
        let frame = RawFrame::new(&bytes, RAW_W, RAW_H);

        engine.on_frame(&frame, &mut sink).unwrap();
        assert_eq!(engine.candidate(), Some(full));

        engine.on_frame(&frame, &mut sink).unwrap();
        assert_eq!(engine.candidate(), None);

        // The match chain restarts; the third read must not confirm
        engine.on_frame(&frame, &mut sink).unwrap();
        assert_eq!(engine.phase(), ScanPhase::Scanning);
        assert!(sink.texts.is_empty());
    }

    #[test]
    fn test_confirmed_is_terminal_until_reset() {
        let full = "ABCDEFGHIJKLMNOPQR";
        let mut engine = engine_with_script(vec![
            Some(full.to_string()),
            Some(full.to_string()),
            Some("999999999999999999".to_string()),
        ]);
        let mut sink = RecordingSink::default();
        let bytes = frame_bytes();
        let frame = RawFrame::new(&bytes, RAW_W, RAW_H);

        engine.on_frame(&frame, &mut sink).unwrap();
        engine.on_frame(&frame, &mut sink).unwrap();
        assert_eq!(engine.phase(), ScanPhase::Confirmed);
        assert_eq!(engine.recognizer().calls(), 2);

        // Further frames must not reach the recognizer or the sink
        engine.on_frame(&frame, &mut sink).unwrap();
        engine.on_frame(&frame, &mut sink).unwrap();
        assert_eq!(engine.recognizer().calls(), 2);
        assert_eq!(sink.texts.len(), 1);

        engine.reset();
        assert_eq!(engine.phase(), ScanPhase::Scanning);
        assert_eq!(engine.candidate(), None);
        engine.on_frame(&frame, &mut sink).unwrap();
        assert_eq!(engine.recognizer().calls(), 3);
    }

    #[test]
    fn test_payload_covers_full_guide_band() {
        let full = "ABCDEFGHIJKLMNOPQR";
        let mut engine =
            engine_with_script(vec![Some(full.to_string()), Some(full.to_string())]);
        let mut sink = RecordingSink::default();
        let bytes = frame_bytes();
        let frame = RawFrame::new(&bytes, RAW_W, RAW_H);

        engine.on_frame(&frame, &mut sink).unwrap();
        engine.on_frame(&frame, &mut sink).unwrap();

        let payload = &sink.payloads[0];
        assert_eq!(
            payload.bytes.len(),
            (payload.width * payload.height) as usize
        );
        assert_eq!(payload.width, payload.rect.width());
        assert_eq!(payload.height, payload.rect.height());

        // The illustrative band must contain the number band
        let number_rect = map_guide_to_crop(
            &GuideFraction::default(),
            &display(),
            CaptureConfig::default().vertical_inset_px,
            RAW_H,
            RAW_W,
        )
        .unwrap();
        assert!(payload.rect.l <= number_rect.l);
        assert!(payload.rect.r >= number_rect.r);
        assert!(payload.rect.t <= number_rect.t);
        assert!(payload.rect.b >= number_rect.b);
    }

    #[test]
    fn test_payload_matches_rotated_frame_content() {
        let full = "ABCDEFGHIJKLMNOPQR";
        let mut engine =
            engine_with_script(vec![Some(full.to_string()), Some(full.to_string())]);
        let mut sink = RecordingSink::default();
        let bytes = frame_bytes();
        let frame = RawFrame::new(&bytes, RAW_W, RAW_H);

        engine.on_frame(&frame, &mut sink).unwrap();
        engine.on_frame(&frame, &mut sink).unwrap();

        let payload = &sink.payloads[0];
        let rotated = vision::rotate90(&frame, CaptureConfig::default().rotation);
        let expected = vision::crop(&rotated, &payload.rect).unwrap();
        assert_eq!(payload.bytes, expected);
    }

    #[test]
    fn test_geometry_failure_skips_frame_without_state_change() {
        let full = "ABCDEFGHIJKLMNOPQR";
        let mut engine =
            engine_with_script(vec![Some(full.to_string()), Some(full.to_string())]);
        let mut sink = RecordingSink::default();
        let bytes = frame_bytes();
        let frame = RawFrame::new(&bytes, RAW_W, RAW_H);

        engine.on_frame(&frame, &mut sink).unwrap();
        assert_eq!(engine.candidate(), Some(full));

        // Mid-resize: layout collapses for one frame
        engine.set_display_geometry(DisplayGeometry {
            surface_width: 0,
            surface_height: 0,
            overlay_width: 200,
            overlay_height: 126,
        });
        let err = engine.on_frame(&frame, &mut sink).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidGeometry { .. }));
        assert_eq!(engine.candidate(), Some(full));
        assert_eq!(engine.phase(), ScanPhase::Scanning);

        // Geometry recovers; the pending candidate still confirms
        engine.set_display_geometry(display());
        assert_eq!(engine.on_frame(&frame, &mut sink).unwrap(), ScanPhase::Confirmed);
    }

    #[test]
    fn test_display_resize_changes_rect_on_next_frame() {
        let mut engine = ScanEngine::new(
            CaptureConfig::default(),
            display(),
            RectProbe::default(),
        );
        let mut sink = RecordingSink::default();
        let bytes = frame_bytes();
        let frame = RawFrame::new(&bytes, RAW_W, RAW_H);

        engine.on_frame(&frame, &mut sink).unwrap();
        engine.set_display_geometry(DisplayGeometry {
            surface_width: 600,
            surface_height: 1000,
            overlay_width: 200,
            overlay_height: 126,
        });
        engine.on_frame(&frame, &mut sink).unwrap();

        let rects = &engine.recognizer().rects;
        assert_eq!(rects.len(), 2);
        assert_ne!(rects[0], rects[1]);
    }

    #[test]
    fn test_crop_roundtrip_through_rotation() {
        // The band cropped from a rotated frame lines up with raw columns
        let bytes = frame_bytes();
        let frame = RawFrame::new(&bytes, RAW_W, RAW_H);
        let rotated = vision::rotate90(&frame, crate::config::Rotation::Clockwise);

        let rect = CropRect {
            l: 10,
            r: 20,
            t: 30,
            b: 40,
        };
        let band = vision::crop(&rotated, &rect).unwrap();

        // Rotated (x, y) came from raw (y, height-1-x)
        for (i, &px) in band.iter().enumerate() {
            let x = rect.l + (i as u32 % rect.width());
            let y = rect.t + (i as u32 / rect.width());
            let raw_x = y;
            let raw_y = RAW_H - 1 - x;
            assert_eq!(px, bytes[(raw_y * RAW_W + raw_x) as usize]);
        }
    }
}
