use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{AddAssign, Div};
use std::str::FromStr;

/// A 2D landmark position in source-frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box for a detected face, in source-frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Native resolution of the frame a detection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }
}

/// Expression probabilities over the seven fixed categories.
///
/// Values are approximately normalized per detection; nothing here enforces
/// that they sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpressionVector {
    #[serde(default)]
    pub neutral: f64,
    #[serde(default)]
    pub happy: f64,
    #[serde(default)]
    pub sad: f64,
    #[serde(default)]
    pub angry: f64,
    #[serde(default)]
    pub fearful: f64,
    #[serde(default)]
    pub disgusted: f64,
    #[serde(default)]
    pub surprised: f64,
}

impl ExpressionVector {
    /// Category names in canonical order.
    pub const CATEGORIES: [&'static str; 7] = [
        "neutral",
        "happy",
        "sad",
        "angry",
        "fearful",
        "disgusted",
        "surprised",
    ];

    /// Values in the order of [`CATEGORIES`](Self::CATEGORIES).
    pub fn values(&self) -> [f64; 7] {
        [
            self.neutral,
            self.happy,
            self.sad,
            self.angry,
            self.fearful,
            self.disgusted,
            self.surprised,
        ]
    }

    /// Name of the most probable category. Ties keep the earlier category.
    pub fn dominant(&self) -> &'static str {
        let values = self.values();
        let mut best = 0;
        for (i, v) in values.iter().enumerate().skip(1) {
            if *v > values[best] {
                best = i;
            }
        }
        Self::CATEGORIES[best]
    }
}

impl AddAssign for ExpressionVector {
    fn add_assign(&mut self, rhs: Self) {
        self.neutral += rhs.neutral;
        self.happy += rhs.happy;
        self.sad += rhs.sad;
        self.angry += rhs.angry;
        self.fearful += rhs.fearful;
        self.disgusted += rhs.disgusted;
        self.surprised += rhs.surprised;
    }
}

impl Div<f64> for ExpressionVector {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self {
            neutral: self.neutral / rhs,
            happy: self.happy / rhs,
            sad: self.sad / rhs,
            angry: self.angry / rhs,
            fearful: self.fearful / rhs,
            disgusted: self.disgusted / rhs,
            surprised: self.surprised / rhs,
        }
    }
}

/// Named landmark regions used by the feature extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkRegion {
    Jaw,
    LeftEye,
    RightEye,
    Nose,
    Mouth,
}

impl fmt::Display for LandmarkRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jaw => "jaw",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::Nose => "nose",
            Self::Mouth => "mouth",
        })
    }
}

/// Landmark points grouped by facial region.
///
/// Follows the 68-point layout: jaw 17, nose 9, each eye 6, mouth 20.
/// Eyebrows are not used by any feature and are not kept.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkSet {
    #[serde(default)]
    pub jaw: Vec<Point>,
    #[serde(default)]
    pub left_eye: Vec<Point>,
    #[serde(default)]
    pub right_eye: Vec<Point>,
    #[serde(default)]
    pub nose: Vec<Point>,
    #[serde(default)]
    pub mouth: Vec<Point>,
}

impl LandmarkSet {
    /// Split a flat 68-point array into regions.
    ///
    /// A short input leaves the trailing regions partially filled or empty;
    /// the feature extractor reports those as missing.
    pub fn from_points68(points: &[Point]) -> Self {
        let slice = |start: usize, end: usize| -> Vec<Point> {
            let end = end.min(points.len());
            points.get(start..end).map(<[Point]>::to_vec).unwrap_or_default()
        };

        Self {
            jaw: slice(0, 17),
            nose: slice(27, 36),
            left_eye: slice(36, 42),
            right_eye: slice(42, 48),
            mouth: slice(48, 68),
        }
    }

    pub fn region(&self, region: LandmarkRegion) -> &[Point] {
        match region {
            LandmarkRegion::Jaw => &self.jaw,
            LandmarkRegion::LeftEye => &self.left_eye,
            LandmarkRegion::RightEye => &self.right_eye,
            LandmarkRegion::Nose => &self.nose,
            LandmarkRegion::Mouth => &self.mouth,
        }
    }
}

/// One face in one frame, as reported by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub landmarks: LandmarkSet,
    pub expressions: ExpressionVector,
}

/// Scan variant: controls the face-count gate and beauty scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Solo,
    Duo,
    Squad,
    Glowup,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Solo, Mode::Duo, Mode::Squad, Mode::Glowup];

    /// Minimum number of visible faces before accumulation starts.
    pub fn required_faces(&self) -> usize {
        match self {
            Mode::Solo | Mode::Glowup => 1,
            Mode::Duo => 2,
            Mode::Squad => 3,
        }
    }

    /// Whether `face_count` satisfies this mode's gate.
    pub fn is_satisfied_by(&self, face_count: usize) -> bool {
        face_count >= self.required_faces()
    }

    /// Only glow-up needs the premium entitlement.
    pub fn is_premium(&self) -> bool {
        matches!(self, Mode::Glowup)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Solo => "solo",
            Mode::Duo => "duo",
            Mode::Squad => "squad",
            Mode::Glowup => "glowup",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown scan mode: {0} (expected solo, duo, squad or glowup)")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points68_split() {
        let points: Vec<Point> = (0..68).map(|i| Point::new(i as f64, 0.0)).collect();
        let set = LandmarkSet::from_points68(&points);
        assert_eq!(set.jaw.len(), 17);
        assert_eq!(set.nose.len(), 9);
        assert_eq!(set.left_eye.len(), 6);
        assert_eq!(set.right_eye.len(), 6);
        assert_eq!(set.mouth.len(), 20);
        assert_eq!(set.nose[3].x, 30.0);
        assert_eq!(set.left_eye[0].x, 36.0);
        assert_eq!(set.mouth[0].x, 48.0);
    }

    #[test]
    fn test_points68_short_input() {
        let points: Vec<Point> = (0..40).map(|i| Point::new(i as f64, 0.0)).collect();
        let set = LandmarkSet::from_points68(&points);
        assert_eq!(set.jaw.len(), 17);
        assert_eq!(set.left_eye.len(), 4);
        assert!(set.right_eye.is_empty());
        assert!(set.mouth.is_empty());
    }

    #[test]
    fn test_expression_sum_and_average() {
        let mut sum = ExpressionVector::default();
        let frame = ExpressionVector { happy: 0.5, angry: 0.25, ..Default::default() };
        sum += frame;
        sum += frame;
        let avg = sum / 2.0;
        assert!((avg.happy - 0.5).abs() < 1e-12);
        assert!((avg.angry - 0.25).abs() < 1e-12);
        assert_eq!(avg.neutral, 0.0);
    }

    #[test]
    fn test_dominant_tie_keeps_first() {
        let v = ExpressionVector { happy: 0.4, angry: 0.4, ..Default::default() };
        assert_eq!(v.dominant(), "happy");
        assert_eq!(ExpressionVector::default().dominant(), "neutral");
    }

    #[test]
    fn test_mode_gate() {
        assert!(Mode::Solo.is_satisfied_by(1));
        assert!(Mode::Solo.is_satisfied_by(3));
        assert!(!Mode::Duo.is_satisfied_by(1));
        assert!(Mode::Duo.is_satisfied_by(2));
        assert!(!Mode::Squad.is_satisfied_by(2));
        assert!(Mode::Glowup.is_satisfied_by(1));
        assert!(!Mode::Solo.is_satisfied_by(0));
    }

    #[test]
    fn test_mode_parse_roundtrip() {
        for mode in Mode::ALL {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
        assert_eq!("GlowUp".parse::<Mode>().unwrap(), Mode::Glowup);
        assert!("trio".parse::<Mode>().is_err());
    }

    #[test]
    fn test_detection_json_uses_box_key() {
        let json = r#"{
            "box": {"x": 1, "y": 2, "width": 100, "height": 120},
            "landmarks": {"jaw": [{"x": 0, "y": 0}]},
            "expressions": {"neutral": 0.9, "happy": 0.1}
        }"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(det.bbox.width, 100.0);
        assert_eq!(det.landmarks.jaw.len(), 1);
        assert!(det.landmarks.mouth.is_empty());
        assert_eq!(det.expressions.sad, 0.0);
    }
}
