//! Vibe scoring.
//!
//! Six sub-scores are fixed linear combinations of averaged expressions and
//! geometric features. The coefficients below are the compatibility contract
//! with previously recorded scores; do not retune them.

use crate::features::{features, FeatureError, GeometricFeatures};
use crate::types::{Detection, ExpressionVector, FrameSize, Mode};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const AURA_BASE: f64 = 1000.0;
const AURA_COVERAGE_WEIGHT: f64 = 5000.0;
const AURA_ANGRY_BOOST: f64 = 1.2;
const AURA_FEAR_PENALTY: f64 = 0.5;
const EXPRESSION_TRIGGER: f64 = 0.5;

const GOLDEN_RATIO: f64 = 1.618;
const BEAUTY_GAIN: f64 = 1.1;
const BEAUTY_MIN: f64 = 10.0;

/// Round half toward positive infinity (`2.5 → 3`, `-2.5 → -2`).
///
/// Matches how historical aura values were rounded; `f64::round` differs
/// on negative halves.
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Round then clamp into `[min, 100]`. NaN maps to `min`.
fn clamp_score(raw: f64, min: f64) -> u8 {
    let rounded = round_half_up(raw);
    if rounded.is_nan() {
        return min as u8;
    }
    rounded.clamp(min, 100.0) as u8
}

/// The six sub-score keys, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vibe {
    #[serde(rename = "NPC")]
    Npc,
    Sigma,
    Rizz,
    Villain,
    Glazing,
    Gyat,
}

impl Vibe {
    /// Fixed enumeration order. Ties in [`SubScores::main_vibe`] resolve to
    /// the earliest entry.
    pub const ALL: [Vibe; 6] = [
        Vibe::Npc,
        Vibe::Sigma,
        Vibe::Rizz,
        Vibe::Villain,
        Vibe::Glazing,
        Vibe::Gyat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vibe::Npc => "NPC",
            Vibe::Sigma => "Sigma",
            Vibe::Rizz => "Rizz",
            Vibe::Villain => "Villain",
            Vibe::Glazing => "Glazing",
            Vibe::Gyat => "Gyat",
        }
    }

    /// Catchphrases shown with this headline vibe.
    pub fn phrases(&self) -> &'static [&'static str; 3] {
        match self {
            Vibe::Npc => &[
                "Default Settings Detected 💀",
                "Bro is running on Windows 95",
                "Zero thoughts, head empty",
            ],
            Vibe::Sigma => &[
                "Bateman Stare Locked 🗿",
                "Grindset Mindset Active",
                "Lonely at the top",
            ],
            Vibe::Rizz => &[
                "Hide your girlfriends 🥶",
                "Unspoken Rizz Detected",
                "Menace to society",
            ],
            Vibe::Villain => &[
                "Villain Arc Loading... 😈",
                "Who hurt you bro?",
                "Demon Time",
            ],
            Vibe::Glazing => &[
                "Professional Glazer 🍩",
                "Simp levels critical",
                "Bro thinks he's on the team",
            ],
            Vibe::Gyat => &[
                "Level 10 Gyat Detected",
                "Ohio Final Boss",
                "Skibidi Rizz",
            ],
        }
    }
}

impl fmt::Display for Vibe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Unclamped sub-scores, as fed into the aura.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawScores {
    pub npc: f64,
    pub sigma: f64,
    pub rizz: f64,
    pub villain: f64,
    pub glazing: f64,
    pub gyat: f64,
}

impl RawScores {
    pub fn compute(expr: &ExpressionVector, f: &GeometricFeatures) -> Self {
        Self {
            npc: expr.neutral * 90.0 + expr.fearful * 10.0,
            sigma: expr.neutral * 40.0 + expr.angry * 40.0 + (f.jaw_ratio - 0.7) * 100.0,
            rizz: expr.happy * 30.0
                + f.mouth_tilt * 2.0
                + (0.05 - f.eye_ratio) * 500.0
                + expr.neutral * 20.0,
            villain: expr.angry * 70.0 + expr.disgusted * 30.0 + f.head_tilt * 0.5,
            glazing: expr.surprised * 50.0 + expr.happy * 30.0 + f.eye_ratio * 200.0,
            gyat: (f.jaw_ratio - 0.75) * 400.0,
        }
    }

    /// Unbounded aggregate. Uses the raw values, not the clamped ones.
    pub fn aura(&self, expr: &ExpressionVector, face_coverage: f64) -> i64 {
        let mut aura = AURA_BASE;
        aura += face_coverage * AURA_COVERAGE_WEIGHT;
        aura += self.sigma * 20.0 + self.rizz * 15.0 + self.villain * 15.0;
        aura -= self.npc * 10.0 + self.glazing * 15.0;
        if expr.angry > EXPRESSION_TRIGGER {
            aura *= AURA_ANGRY_BOOST;
        }
        if expr.fearful > EXPRESSION_TRIGGER {
            aura *= AURA_FEAR_PENALTY;
        }
        round_half_up(aura) as i64
    }

    pub fn clamped(&self) -> SubScores {
        SubScores {
            npc: clamp_score(self.npc, 0.0),
            sigma: clamp_score(self.sigma, 0.0),
            rizz: clamp_score(self.rizz, 0.0),
            villain: clamp_score(self.villain, 0.0),
            glazing: clamp_score(self.glazing, 0.0),
            gyat: clamp_score(self.gyat, 0.0),
        }
    }
}

/// Sub-scores clamped into `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubScores {
    #[serde(rename = "NPC")]
    pub npc: u8,
    #[serde(rename = "Sigma")]
    pub sigma: u8,
    #[serde(rename = "Rizz")]
    pub rizz: u8,
    #[serde(rename = "Villain")]
    pub villain: u8,
    #[serde(rename = "Glazing")]
    pub glazing: u8,
    #[serde(rename = "Gyat")]
    pub gyat: u8,
}

impl SubScores {
    pub fn get(&self, vibe: Vibe) -> u8 {
        match vibe {
            Vibe::Npc => self.npc,
            Vibe::Sigma => self.sigma,
            Vibe::Rizz => self.rizz,
            Vibe::Villain => self.villain,
            Vibe::Glazing => self.glazing,
            Vibe::Gyat => self.gyat,
        }
    }

    /// Highest sub-score; ties go to the earliest key in [`Vibe::ALL`].
    pub fn main_vibe(&self) -> Vibe {
        let mut best = Vibe::ALL[0];
        for vibe in Vibe::ALL.into_iter().skip(1) {
            if self.get(vibe) > self.get(best) {
                best = vibe;
            }
        }
        best
    }
}

/// Glow-up mode beauty score in `[10, 100]`.
pub fn beauty_score(f: &GeometricFeatures) -> u8 {
    let ratio_score = (1.0 - (GOLDEN_RATIO - f.aspect_ratio).abs()).max(0.0);
    let raw = (f.eye_symmetry * 40.0 + ratio_score * 30.0 + f.jaw_ratio * 30.0) * BEAUTY_GAIN;
    clamp_score(raw, BEAUTY_MIN)
}

/// Verdict band for a beauty score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeautyTier {
    ModelTier,
    HighTier,
    Potential,
    ItsOver,
}

impl BeautyTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s > 90 => BeautyTier::ModelTier,
            s if s > 80 => BeautyTier::HighTier,
            s if s > 60 => BeautyTier::Potential,
            _ => BeautyTier::ItsOver,
        }
    }

    pub fn caption(&self) -> &'static str {
        match self {
            BeautyTier::ModelTier => "ABSOLUTE MODEL TIER ✨",
            BeautyTier::HighTier => "HIGH TIER HUMAN 🔥",
            BeautyTier::Potential => "POTENTIAL DETECTED 📈",
            BeautyTier::ItsOver => "IT'S OVER FOR YOU 💀",
        }
    }
}

/// Finished scores for one face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSet {
    pub scores: SubScores,
    pub main_vibe: Vibe,
    pub aura: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub beauty_score: Option<u8>,
    pub phrase: String,
    /// Display labels of badges held when the scan finished.
    #[serde(default)]
    pub badges: Vec<String>,
}

/// Score averaged expressions plus geometry.
pub fn score<R: Rng + ?Sized>(
    expr: &ExpressionVector,
    features: &GeometricFeatures,
    mode: Mode,
    rng: &mut R,
) -> ScoreSet {
    let raw = RawScores::compute(expr, features);
    let scores = raw.clamped();
    let main_vibe = scores.main_vibe();

    let phrases = main_vibe.phrases();
    let phrase = phrases[rng.gen_range(0..phrases.len())].to_string();

    let beauty_score = (mode == Mode::Glowup).then(|| beauty_score(features));

    ScoreSet {
        scores,
        main_vibe,
        aura: raw.aura(expr, features.face_coverage),
        beauty_score,
        phrase,
        badges: Vec::new(),
    }
}

/// Extract features from `det` and score them against `expr`.
///
/// Fails only when feature extraction fails; the caller should skip this
/// face rather than abort the scan.
pub fn score_detection<R: Rng + ?Sized>(
    expr: &ExpressionVector,
    det: &Detection,
    frame: FrameSize,
    mode: Mode,
    rng: &mut R,
) -> Result<ScoreSet, FeatureError> {
    let f = features(det, frame)?;
    Ok(score(expr, &f, mode, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::sample_detection;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn neutral_face() -> (ExpressionVector, GeometricFeatures) {
        let expr = ExpressionVector { neutral: 1.0, ..Default::default() };
        let f = GeometricFeatures {
            jaw_ratio: 0.7,
            eye_ratio: 0.05,
            ..Default::default()
        };
        (expr, f)
    }

    #[test]
    fn test_neutral_reference_scores() {
        let (expr, f) = neutral_face();
        let s = score(&expr, &f, Mode::Solo, &mut rng());

        assert_eq!(s.scores.npc, 90);
        assert_eq!(s.scores.sigma, 40);
        assert_eq!(s.scores.rizz, 20);
        assert_eq!(s.scores.villain, 0);
        assert_eq!(s.scores.glazing, 0);
        assert_eq!(s.scores.gyat, 0);
        assert_eq!(s.main_vibe, Vibe::Npc);
        assert_eq!(s.aura, 1200);
        assert_eq!(s.beauty_score, None);
        assert!(Vibe::Npc.phrases().contains(&s.phrase.as_str()));
    }

    #[test]
    fn test_aura_uses_raw_values() {
        // Sigma raw far above 100 must still feed the aura unclamped.
        let expr = ExpressionVector::default();
        let f = GeometricFeatures { jaw_ratio: 2.7, eye_ratio: 0.05, ..Default::default() };
        let raw = RawScores::compute(&expr, &f);
        assert!((raw.sigma - 200.0).abs() < 1e-9);
        let s = score(&expr, &f, Mode::Solo, &mut rng());
        assert_eq!(s.scores.sigma, 100);
        // 1000 + 200*20 + 0*15 - 0 - (0.05*200)*15
        assert_eq!(s.aura, 1000 + 4000 - 150);
    }

    #[test]
    fn test_aura_multipliers_stack() {
        let expr = ExpressionVector { angry: 0.6, fearful: 0.6, ..Default::default() };
        let f = GeometricFeatures { jaw_ratio: 0.7, eye_ratio: 0.05, ..Default::default() };
        let raw = RawScores::compute(&expr, &f);
        let base = 1000.0 + raw.sigma * 20.0 + raw.rizz * 15.0 + raw.villain * 15.0
            - raw.npc * 10.0
            - raw.glazing * 15.0;
        let expected = round_half_up(base * 1.2 * 0.5) as i64;
        assert_eq!(raw.aura(&expr, 0.0), expected);
    }

    #[test]
    fn test_aura_can_go_negative() {
        let expr = ExpressionVector { neutral: 1.0, fearful: 1.0, surprised: 1.0, ..Default::default() };
        let f = GeometricFeatures { jaw_ratio: 0.0, eye_ratio: 0.5, ..Default::default() };
        let s = score(&expr, &f, Mode::Solo, &mut rng());
        assert!(s.aura < 0, "aura = {}", s.aura);
    }

    #[test]
    fn test_coverage_adds_to_aura() {
        let (expr, mut f) = neutral_face();
        f.face_coverage = 0.2;
        assert_eq!(score(&expr, &f, Mode::Solo, &mut rng()).aura, 2200);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(round_half_up(103.4), 103.0);
    }

    #[test]
    fn test_glowup_beauty_upper_clamp() {
        let f = GeometricFeatures {
            eye_symmetry: 1.0,
            aspect_ratio: 1.618,
            jaw_ratio: 0.8,
            ..Default::default()
        };
        assert_eq!(beauty_score(&f), 100);
        let s = score(&ExpressionVector::default(), &f, Mode::Glowup, &mut rng());
        assert_eq!(s.beauty_score, Some(100));
    }

    #[test]
    fn test_glowup_beauty_lower_clamp() {
        let f = GeometricFeatures {
            eye_symmetry: 0.0,
            aspect_ratio: 5.0,
            jaw_ratio: 0.0,
            ..Default::default()
        };
        assert_eq!(beauty_score(&f), 10);
    }

    #[test]
    fn test_glowup_beauty_midrange() {
        // (0.9*40 + 0.8*30 + 0.6*30) * 1.1 = 85.8
        let f = GeometricFeatures {
            eye_symmetry: 0.9,
            aspect_ratio: 1.418,
            jaw_ratio: 0.6,
            ..Default::default()
        };
        assert_eq!(beauty_score(&f), 86);
    }

    #[test]
    fn test_all_equal_resolves_to_npc() {
        let s = SubScores { npc: 50, sigma: 50, rizz: 50, villain: 50, glazing: 50, gyat: 50 };
        assert_eq!(s.main_vibe(), Vibe::Npc);
    }

    #[test]
    fn test_tie_resolves_to_earlier_key() {
        let s = SubScores { rizz: 80, glazing: 80, ..Default::default() };
        assert_eq!(s.main_vibe(), Vibe::Rizz);
        let s = SubScores { villain: 10, gyat: 11, ..Default::default() };
        assert_eq!(s.main_vibe(), Vibe::Gyat);
    }

    #[test]
    fn test_phrase_is_deterministic_for_seeded_rng() {
        let (expr, f) = neutral_face();
        let a = score(&expr, &f, Mode::Solo, &mut StdRng::seed_from_u64(42));
        let b = score(&expr, &f, Mode::Solo, &mut StdRng::seed_from_u64(42));
        assert_eq!(a.phrase, b.phrase);
    }

    #[test]
    fn test_every_phrase_reachable() {
        let (expr, f) = neutral_face();
        let mut rng = rng();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(score(&expr, &f, Mode::Solo, &mut rng).phrase);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_beauty_tiers() {
        assert_eq!(BeautyTier::from_score(100), BeautyTier::ModelTier);
        assert_eq!(BeautyTier::from_score(91), BeautyTier::ModelTier);
        assert_eq!(BeautyTier::from_score(90), BeautyTier::HighTier);
        assert_eq!(BeautyTier::from_score(61), BeautyTier::Potential);
        assert_eq!(BeautyTier::from_score(60), BeautyTier::ItsOver);
    }

    #[test]
    fn test_score_detection_skips_missing_landmarks() {
        let mut det = sample_detection();
        det.landmarks.jaw.clear();
        let err = score_detection(&det.expressions, &det, FrameSize::new(400, 300), Mode::Solo, &mut rng());
        assert!(matches!(err, Err(FeatureError::MissingLandmarks { .. })));
    }

    #[test]
    fn test_score_detection_sample() {
        let det = sample_detection();
        let s = score_detection(&det.expressions, &det, FrameSize::new(400, 300), Mode::Glowup, &mut rng()).unwrap();
        assert_eq!(s.scores.npc, 90);
        assert!(s.beauty_score.is_some());
    }

    #[test]
    fn test_score_set_json_keys() {
        let (expr, f) = neutral_face();
        let s = score(&expr, &f, Mode::Solo, &mut rng());
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["mainVibe"], "NPC");
        assert_eq!(json["scores"]["NPC"], 90);
        assert_eq!(json["scores"]["Gyat"], 0);
        assert_eq!(json["aura"], 1200);
        assert!(json.get("beautyScore").is_none());
    }

    fn unit() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }

    fn any_expr() -> impl Strategy<Value = ExpressionVector> {
        (unit(), unit(), unit(), unit(), unit(), unit(), unit()).prop_map(
            |(neutral, happy, sad, angry, fearful, disgusted, surprised)| ExpressionVector {
                neutral,
                happy,
                sad,
                angry,
                fearful,
                disgusted,
                surprised,
            },
        )
    }

    fn any_features() -> impl Strategy<Value = GeometricFeatures> {
        (
            0.0f64..2.0,
            -5.0f64..5.0,
            -1.0f64..1.0,
            -500.0f64..500.0,
            -500.0f64..500.0,
            -3.0f64..3.0,
            0.0f64..5.0,
        )
            .prop_map(
                |(face_coverage, jaw_ratio, eye_ratio, mouth_tilt, head_tilt, eye_symmetry, aspect_ratio)| {
                    GeometricFeatures {
                        face_coverage,
                        jaw_ratio,
                        eye_ratio,
                        mouth_tilt,
                        head_tilt,
                        eye_symmetry,
                        aspect_ratio,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn prop_sub_scores_bounded(expr in any_expr(), f in any_features(), seed in any::<u64>()) {
            let s = score(&expr, &f, Mode::Glowup, &mut StdRng::seed_from_u64(seed));
            for vibe in Vibe::ALL {
                prop_assert!(s.scores.get(vibe) <= 100);
            }
            let beauty = s.beauty_score.unwrap();
            prop_assert!((10..=100).contains(&beauty));
        }

        #[test]
        fn prop_main_vibe_is_first_maximum(expr in any_expr(), f in any_features()) {
            let s = score(&expr, &f, Mode::Solo, &mut rng());
            let max = Vibe::ALL.iter().map(|v| s.scores.get(*v)).max().unwrap();
            let first = Vibe::ALL.into_iter().find(|v| s.scores.get(*v) == max).unwrap();
            prop_assert_eq!(s.main_vibe, first);
        }
    }
}
