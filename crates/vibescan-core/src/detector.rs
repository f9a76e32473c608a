//! Seams to the face model and the camera.
//!
//! Both are external collaborators: the engine only needs a frame with its
//! native resolution and, per frame, the list of faces the model found.

use crate::types::{Detection, FrameSize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detector not ready: {0}")]
    Unavailable(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

/// A captured camera frame.
///
/// Pixel data is opaque to the core; only the detector looks at it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u64,
}

impl Frame {
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

/// Face detection + landmarks + expression model.
pub trait FaceDetector {
    /// Whether the model weights are loaded and `detect` can be called.
    fn is_ready(&self) -> bool;

    /// Detect all faces in a frame. Zero faces is `Ok(vec![])`, not an error.
    ///
    /// Implementations must return faces in a stable order from frame to
    /// frame; the accumulator attributes samples by position.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError>;
}

/// Live frame stream.
pub trait FrameSource {
    /// Next frame, or `None` once the stream has stopped.
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError>;
}

impl<T: FaceDetector + ?Sized> FaceDetector for Box<T> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        (**self).detect(frame)
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        (**self).next_frame()
    }
}
