//! Scan session state machine.
//!
//! ```text
//! Idle ──start──▶ Searching ──gate met──▶ Accumulating ──window closed──▶ Scored
//!                     ▲                        │
//!                     └──────gate lost─────────┘
//! ```
//!
//! The session is driven by polling: one call to [`Session::poll`] per
//! detection cycle. Losing the face-count gate mid-window drops everything
//! collected so far; there is no resume.

use crate::accumulator::{AccumulationStatus, Accumulator, DEFAULT_WINDOW_FRAMES};
use crate::detector::FaceDetector;
use crate::types::{Detection, ExpressionVector, FrameSize, Mode};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("face detector is not ready")]
    DetectorUnavailable,
    #[error("session already scored; start a new one")]
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Searching,
    Accumulating,
    Scored,
}

/// What the scanner overlay should say for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudStatus {
    Idle,
    /// No face in frame.
    Searching,
    /// Some faces, not enough for the mode.
    AlignFace,
    WaitingForPlayers,
    AssembleSquad,
    Analyzing { faces: usize },
    Complete,
}

impl HudStatus {
    pub fn text(&self) -> String {
        match self {
            HudStatus::Idle => "INITIALIZING CAMERA...".to_string(),
            HudStatus::Searching => "SEARCHING...".to_string(),
            HudStatus::AlignFace => "ALIGN FACE...".to_string(),
            HudStatus::WaitingForPlayers => "WAITING FOR 2ND PLAYER...".to_string(),
            HudStatus::AssembleSquad => "ASSEMBLE THE SQUAD...".to_string(),
            HudStatus::Analyzing { faces } => format!("TARGETS ACQUIRED ({faces}) - ANALYZING..."),
            HudStatus::Complete => "ANALYSIS COMPLETE".to_string(),
        }
    }
}

/// A finished accumulation window, ready for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedWindow {
    /// Time-averaged expressions, one per face slot.
    pub averages: Vec<ExpressionVector>,
    /// Detections from the closing frame; landmarks for scoring come from here.
    pub detections: Vec<Detection>,
    pub frame: FrameSize,
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Waiting for the mode's face count.
    Searching { faces: usize },
    /// Window open; `frames` of `window` collected.
    Accumulating { frames: usize, window: usize },
    /// The gate was lost mid-window and the partial window discarded.
    Interrupted { faces: usize },
    /// Window closed. The session is now `Scored`.
    Complete(ClosedWindow),
}

/// One scan attempt. Owned by the caller; discarded after scoring.
#[derive(Debug, Clone)]
pub struct Session {
    mode: Mode,
    state: SessionState,
    accumulator: Accumulator,
    last_faces: usize,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self::with_window(mode, DEFAULT_WINDOW_FRAMES)
    }

    pub fn with_window(mode: Mode, window: usize) -> Self {
        Self {
            mode,
            state: SessionState::Idle,
            accumulator: Accumulator::new(window),
            last_faces: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Frames collected in the open window.
    pub fn frames(&self) -> usize {
        self.accumulator.frames()
    }

    /// Begin searching for faces.
    ///
    /// Stays `Idle` if the detector is not ready. Calling `start` on a
    /// session that is already searching or accumulating is a no-op.
    pub fn start<D: FaceDetector + ?Sized>(&mut self, detector: &D) -> Result<(), SessionError> {
        match self.state {
            SessionState::Scored => Err(SessionError::Finished),
            SessionState::Searching | SessionState::Accumulating => Ok(()),
            SessionState::Idle => {
                if !detector.is_ready() {
                    tracing::warn!(mode = %self.mode, "detector not ready; session stays idle");
                    return Err(SessionError::DetectorUnavailable);
                }
                tracing::debug!(mode = %self.mode, "session searching");
                self.state = SessionState::Searching;
                Ok(())
            }
        }
    }

    /// Feed one frame's detections.
    pub fn poll(&mut self, detections: &[Detection], frame: FrameSize) -> Result<PollOutcome, SessionError> {
        let faces = detections.len();
        self.last_faces = faces;

        match self.state {
            SessionState::Idle => return Err(SessionError::DetectorUnavailable),
            SessionState::Scored => return Err(SessionError::Finished),
            SessionState::Searching | SessionState::Accumulating => {}
        }

        if !self.mode.is_satisfied_by(faces) {
            if self.state == SessionState::Accumulating {
                tracing::debug!(
                    mode = %self.mode,
                    faces,
                    discarded_frames = self.accumulator.frames(),
                    "face gate lost; back to searching"
                );
                self.accumulator.clear();
                self.state = SessionState::Searching;
                return Ok(PollOutcome::Interrupted { faces });
            }
            return Ok(PollOutcome::Searching { faces });
        }

        if self.state == SessionState::Searching {
            tracing::debug!(mode = %self.mode, faces, "face gate met; accumulating");
            self.state = SessionState::Accumulating;
        }

        match self.accumulator.accumulate(detections) {
            AccumulationStatus::Accumulating { frames } => Ok(PollOutcome::Accumulating {
                frames,
                window: self.accumulator.window(),
            }),
            AccumulationStatus::Complete => {
                let averages = self.accumulator.take_averages();
                self.state = SessionState::Scored;
                tracing::info!(
                    mode = %self.mode,
                    faces,
                    dominant = averages.first().map(ExpressionVector::dominant).unwrap_or("none"),
                    "accumulation window closed"
                );
                Ok(PollOutcome::Complete(ClosedWindow {
                    averages,
                    detections: detections.to_vec(),
                    frame,
                }))
            }
        }
    }

    /// Reopen a scored session with a fresh window.
    ///
    /// Used when none of the faces in a closed window could be scored.
    pub fn restart_search(&mut self) {
        self.accumulator.clear();
        if self.state != SessionState::Idle {
            self.state = SessionState::Searching;
        }
    }

    /// Abandon the scan. Drops any partial window; touches nothing else.
    pub fn cancel(&mut self) {
        if self.accumulator.frames() > 0 {
            tracing::debug!(discarded_frames = self.accumulator.frames(), "session cancelled");
        }
        self.accumulator.clear();
        self.state = SessionState::Idle;
    }

    /// Overlay status for the most recent poll.
    pub fn hud_status(&self) -> HudStatus {
        match self.state {
            SessionState::Idle => HudStatus::Idle,
            SessionState::Scored => HudStatus::Complete,
            SessionState::Accumulating => HudStatus::Analyzing { faces: self.last_faces },
            SessionState::Searching if self.last_faces == 0 => HudStatus::Searching,
            SessionState::Searching => match self.mode {
                Mode::Duo => HudStatus::WaitingForPlayers,
                Mode::Squad => HudStatus::AssembleSquad,
                Mode::Solo | Mode::Glowup => HudStatus::AlignFace,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{DetectorError, Frame};
    use crate::types::{BoundingBox, LandmarkSet};

    struct Ready(bool);

    impl FaceDetector for Ready {
        fn is_ready(&self) -> bool {
            self.0
        }

        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
            Ok(Vec::new())
        }
    }

    const FRAME: FrameSize = FrameSize::new(640, 480);

    fn faces(n: usize, happy: f64) -> Vec<Detection> {
        (0..n)
            .map(|_| Detection {
                bbox: BoundingBox { x: 0.0, y: 0.0, width: 100.0, height: 120.0 },
                landmarks: LandmarkSet::default(),
                expressions: ExpressionVector { happy, ..Default::default() },
            })
            .collect()
    }

    fn started(mode: Mode, window: usize) -> Session {
        let mut s = Session::with_window(mode, window);
        s.start(&Ready(true)).unwrap();
        s
    }

    #[test]
    fn test_start_requires_ready_detector() {
        let mut s = Session::new(Mode::Solo);
        assert_eq!(s.start(&Ready(false)), Err(SessionError::DetectorUnavailable));
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.poll(&faces(1, 0.0), FRAME), Err(SessionError::DetectorUnavailable));

        s.start(&Ready(true)).unwrap();
        assert_eq!(s.state(), SessionState::Searching);
    }

    #[test]
    fn test_full_solo_scan() {
        let mut s = started(Mode::Solo, 30);
        assert_eq!(s.poll(&faces(0, 0.0), FRAME), Ok(PollOutcome::Searching { faces: 0 }));
        assert_eq!(s.hud_status(), HudStatus::Searching);

        for i in 1..30 {
            assert_eq!(
                s.poll(&faces(1, 1.0), FRAME),
                Ok(PollOutcome::Accumulating { frames: i, window: 30 })
            );
        }
        assert_eq!(s.state(), SessionState::Accumulating);
        assert_eq!(s.hud_status(), HudStatus::Analyzing { faces: 1 });

        let Ok(PollOutcome::Complete(window)) = s.poll(&faces(1, 1.0), FRAME) else {
            panic!("window should close on frame 30");
        };
        assert_eq!(window.averages.len(), 1);
        assert!((window.averages[0].happy - 1.0).abs() < 1e-12);
        assert_eq!(window.detections.len(), 1);
        assert_eq!(window.frame, FRAME);
        assert_eq!(s.state(), SessionState::Scored);
        assert_eq!(s.poll(&faces(1, 1.0), FRAME), Err(SessionError::Finished));
    }

    #[test]
    fn test_duo_gate() {
        let mut s = started(Mode::Duo, 3);
        assert_eq!(s.poll(&faces(1, 0.0), FRAME), Ok(PollOutcome::Searching { faces: 1 }));
        assert_eq!(s.hud_status(), HudStatus::WaitingForPlayers);
        assert!(matches!(s.poll(&faces(2, 0.0), FRAME), Ok(PollOutcome::Accumulating { frames: 1, .. })));
    }

    #[test]
    fn test_squad_hud() {
        let mut s = started(Mode::Squad, 3);
        s.poll(&faces(2, 0.0), FRAME).unwrap();
        assert_eq!(s.hud_status(), HudStatus::AssembleSquad);
        assert_eq!(s.hud_status().text(), "ASSEMBLE THE SQUAD...");
    }

    #[test]
    fn test_gate_lost_discards_window() {
        let mut s = started(Mode::Duo, 3);
        s.poll(&faces(2, 1.0), FRAME).unwrap();
        s.poll(&faces(2, 1.0), FRAME).unwrap();
        assert_eq!(s.frames(), 2);

        assert_eq!(s.poll(&faces(1, 1.0), FRAME), Ok(PollOutcome::Interrupted { faces: 1 }));
        assert_eq!(s.state(), SessionState::Searching);
        assert_eq!(s.frames(), 0);

        // A full fresh window is required.
        assert!(matches!(s.poll(&faces(2, 0.0), FRAME), Ok(PollOutcome::Accumulating { frames: 1, .. })));
        s.poll(&faces(2, 0.0), FRAME).unwrap();
        let Ok(PollOutcome::Complete(window)) = s.poll(&faces(2, 0.0), FRAME) else {
            panic!("expected completion");
        };
        assert_eq!(window.averages[0].happy, 0.0);
    }

    #[test]
    fn test_extra_face_restarts_window_without_leaving_gate() {
        let mut s = started(Mode::Solo, 3);
        s.poll(&faces(1, 1.0), FRAME).unwrap();
        s.poll(&faces(1, 1.0), FRAME).unwrap();
        assert!(matches!(s.poll(&faces(2, 0.0), FRAME), Ok(PollOutcome::Accumulating { frames: 1, .. })));
        assert_eq!(s.state(), SessionState::Accumulating);
    }

    #[test]
    fn test_cancel_discards_state() {
        let mut s = started(Mode::Solo, 3);
        s.poll(&faces(1, 1.0), FRAME).unwrap();
        s.cancel();
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.frames(), 0);
        assert_eq!(s.hud_status(), HudStatus::Idle);
    }

    #[test]
    fn test_restart_after_scored() {
        let mut s = started(Mode::Solo, 1);
        assert!(matches!(s.poll(&faces(1, 1.0), FRAME), Ok(PollOutcome::Complete(_))));
        s.restart_search();
        assert_eq!(s.state(), SessionState::Searching);
        assert!(matches!(s.poll(&faces(1, 1.0), FRAME), Ok(PollOutcome::Complete(_))));
    }

    #[test]
    fn test_start_after_scored_is_rejected() {
        let mut s = started(Mode::Glowup, 1);
        s.poll(&faces(1, 1.0), FRAME).unwrap();
        assert_eq!(s.start(&Ready(true)), Err(SessionError::Finished));
    }
}
