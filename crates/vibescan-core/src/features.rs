//! Geometric features derived from landmarks and the face box.
//!
//! Ratios are normalized by face height, except `mouth_tilt` and `head_tilt`
//! which stay raw pixel deltas. Scores built on them therefore depend on the
//! source resolution; the scoring weights were fitted to that behavior.

use crate::types::{Detection, FrameSize, LandmarkRegion, Point};
use thiserror::Error;

// Landmark indices within each region (68-point layout).
const JAW_CHIN: usize = 8;
const NOSE_TIP: usize = 3;
const EYE_OUTER: usize = 0;
const EYE_UPPER: usize = 1;
const EYE_INNER: usize = 3;
const EYE_LOWER: usize = 5;
const MOUTH_LEFT: usize = 0;
const MOUTH_RIGHT: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("landmark region '{region}' is missing or incomplete")]
    MissingLandmarks { region: LandmarkRegion },
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),
}

/// Scalar features for one detection. Unclamped.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeometricFeatures {
    /// Face box area over frame area.
    pub face_coverage: f64,
    /// Horizontal jaw span over face height.
    pub jaw_ratio: f64,
    /// Mean vertical eye opening over face height.
    pub eye_ratio: f64,
    /// Vertical offset between mouth corners, in pixels.
    pub mouth_tilt: f64,
    /// Horizontal offset between nose tip and chin, in pixels.
    pub head_tilt: f64,
    /// 1.0 when both eyes are equally wide.
    pub eye_symmetry: f64,
    /// Face height over face width.
    pub aspect_ratio: f64,
}

/// Fetch `region`, requiring at least `min_len` points.
fn region(det: &Detection, region: LandmarkRegion, min_len: usize) -> Result<&[Point], FeatureError> {
    let points = det.landmarks.region(region);
    if points.len() < min_len.max(1) {
        return Err(FeatureError::MissingLandmarks { region });
    }
    Ok(points)
}

fn eye_opening(eye: &[Point]) -> f64 {
    (eye[EYE_UPPER].y - eye[EYE_LOWER].y).abs()
}

fn eye_width(eye: &[Point]) -> f64 {
    (eye[EYE_INNER].x - eye[EYE_OUTER].x).abs()
}

/// Derive geometric features for `det` in a frame of size `frame`.
pub fn features(det: &Detection, frame: FrameSize) -> Result<GeometricFeatures, FeatureError> {
    let jaw = region(det, LandmarkRegion::Jaw, JAW_CHIN + 1)?;
    let left_eye = region(det, LandmarkRegion::LeftEye, EYE_LOWER + 1)?;
    let right_eye = region(det, LandmarkRegion::RightEye, EYE_LOWER + 1)?;
    let nose = region(det, LandmarkRegion::Nose, NOSE_TIP + 1)?;
    let mouth = region(det, LandmarkRegion::Mouth, MOUTH_RIGHT + 1)?;

    let bbox = &det.bbox;
    if !(bbox.width > 0.0 && bbox.height > 0.0) {
        return Err(FeatureError::DegenerateGeometry("face box has no area"));
    }
    let frame_area = frame.area();
    if frame_area <= 0.0 {
        return Err(FeatureError::DegenerateGeometry("frame has no area"));
    }

    let jaw_first = jaw[0];
    let jaw_last = jaw[jaw.len() - 1];
    let jaw_ratio = (jaw_last.x - jaw_first.x).abs() / bbox.height;

    let eye_ratio = (eye_opening(left_eye) + eye_opening(right_eye)) / 2.0 / bbox.height;

    let mouth_tilt = (mouth[MOUTH_LEFT].y - mouth[MOUTH_RIGHT].y).abs();
    let head_tilt = (nose[NOSE_TIP].x - jaw[JAW_CHIN].x).abs();

    let lw = eye_width(left_eye);
    let rw = eye_width(right_eye);
    let mean_width = (lw + rw) / 2.0;
    // Two zero-width eyes are equal, hence symmetric.
    let eye_symmetry = if mean_width > 0.0 {
        1.0 - (lw - rw).abs() / mean_width
    } else {
        1.0
    };

    Ok(GeometricFeatures {
        face_coverage: bbox.area() / frame_area,
        jaw_ratio,
        eye_ratio,
        mouth_tilt,
        head_tilt,
        eye_symmetry,
        aspect_ratio: bbox.height / bbox.width,
    })
}
