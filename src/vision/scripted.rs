//! Scripted recognizer backend
//!
//! Replays a predetermined sequence of recognition outputs, one per frame.
//! Stands in for the native engine in tests and in the frame-replay
//! harness; loads its script from a JSON array where `null` means no
//! confident read.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::geometry::CropRect;
use crate::vision::Recognizer;

/// Recognizer that answers from a fixed per-frame script
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    outputs: VecDeque<Option<String>>,
    calls: usize,
}

impl ScriptedRecognizer {
    /// Build from an explicit output sequence
    pub fn new<I>(outputs: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        Self {
            outputs: outputs.into_iter().collect(),
            calls: 0,
        }
    }

    /// Load a script from a JSON array of strings and nulls
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recognizer script: {:?}", path))?;
        let outputs: Vec<Option<String>> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid recognizer script: {:?}", path))?;
        Ok(Self::new(outputs))
    }

    /// How many frames have been submitted so far
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Recognizer for ScriptedRecognizer {
    fn recognize(
        &mut self,
        _bytes: &[u8],
        width: u32,
        height: u32,
        rect: &CropRect,
    ) -> Option<String> {
        self.calls += 1;
        let result = self.outputs.pop_front().flatten();
        debug!(
            "scripted read on {}x{} frame, band {}x{}: {:?}",
            width,
            height,
            rect.width(),
            rect.height(),
            result
        );
        result
    }
}
