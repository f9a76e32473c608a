//! vibescan-core — Vibe scoring engine.
//!
//! Accumulates per-face expression probabilities over a fixed window of
//! frames, derives geometric ratios from 68-point landmarks, and turns both
//! into six bounded sub-scores, an unbounded aura and unlockable badges.

pub mod accumulator;
pub mod badges;
pub mod detector;
pub mod entitlement;
pub mod features;
pub mod history;
pub mod quota;
pub mod scan;
pub mod scoring;
pub mod session;
pub mod store;
pub mod types;

pub use detector::{DetectorError, FaceDetector, Frame, FrameError, FrameSource};
pub use entitlement::{Entitlement, StaticEntitlement, StoreEntitlement};
pub use scan::{complete_scan, ScanError, ScanReport};
pub use scoring::{score, score_detection, ScoreSet, SubScores, Vibe};
pub use session::{ClosedWindow, PollOutcome, Session, SessionError, SessionState};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use types::{BoundingBox, Detection, ExpressionVector, FrameSize, LandmarkSet, Mode, Point};
