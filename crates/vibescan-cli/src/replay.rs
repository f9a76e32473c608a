//! Replay of recorded detector output.
//!
//! A recording is JSON: `{ "width": 640, "height": 480, "frames": [[face, ...], ...] }`.
//! Each face has a `box`, `expressions` and `landmarks`, the latter either
//! grouped by region or as a flat array of 68 points.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use vibescan_core::{
    BoundingBox, Detection, DetectorError, ExpressionVector, FaceDetector, Frame, FrameError, FrameSource,
    LandmarkSet, Point,
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordedLandmarks {
    Points(Vec<Point>),
    Regions(LandmarkSet),
}

#[derive(Debug, Deserialize)]
struct RecordedFace {
    #[serde(rename = "box")]
    bbox: BoundingBox,
    landmarks: RecordedLandmarks,
    #[serde(default)]
    expressions: ExpressionVector,
}

impl From<RecordedFace> for Detection {
    fn from(face: RecordedFace) -> Self {
        let landmarks = match face.landmarks {
            RecordedLandmarks::Points(points) => LandmarkSet::from_points68(&points),
            RecordedLandmarks::Regions(set) => set,
        };
        Detection {
            bbox: face.bbox,
            landmarks,
            expressions: face.expressions,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecordingFile {
    width: u32,
    height: u32,
    frames: Vec<Vec<RecordedFace>>,
}

/// Decoded recording, shared by the replay detector and frame source.
#[derive(Debug)]
pub struct Recording {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<Vec<Detection>>,
}

impl Recording {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: RecordingFile = serde_json::from_str(text)?;
        Ok(Self {
            width: file.width,
            height: file.height,
            frames: file
                .frames
                .into_iter()
                .map(|faces| faces.into_iter().map(Detection::from).collect())
                .collect(),
        })
    }

    /// Split into a detector and a frame source over the same frames.
    pub fn into_replay(self) -> (ReplayDetector, ReplayFrames) {
        let shared = Arc::new(self);
        (
            ReplayDetector { recording: Arc::clone(&shared) },
            ReplayFrames { recording: shared, next: 0 },
        )
    }
}

/// Answers `detect` with the faces recorded for the frame's sequence number.
pub struct ReplayDetector {
    recording: Arc<Recording>,
}

impl FaceDetector for ReplayDetector {
    fn is_ready(&self) -> bool {
        true
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        usize::try_from(frame.sequence)
            .ok()
            .and_then(|i| self.recording.frames.get(i))
            .cloned()
            .ok_or_else(|| DetectorError::InferenceFailed(format!("no recorded frame {}", frame.sequence)))
    }
}

/// Emits one empty frame per recorded frame, then ends.
pub struct ReplayFrames {
    recording: Arc<Recording>,
    next: usize,
}

impl FrameSource for ReplayFrames {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        if self.next >= self.recording.frames.len() {
            return Ok(None);
        }
        let frame = Frame {
            data: Vec::new(),
            width: self.recording.width,
            height: self.recording.height,
            sequence: self.next as u64,
        };
        self.next += 1;
        Ok(Some(frame))
    }
}

/// Stand-in for commands that only read persisted state.
pub struct Idle;

impl FaceDetector for Idle {
    fn is_ready(&self) -> bool {
        false
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        Err(DetectorError::Unavailable("no detector attached".into()))
    }
}

impl FrameSource for Idle {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        Ok(None)
    }
}
