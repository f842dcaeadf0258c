//! Pure score arithmetic: quick-filter mapping, weighted combination, the
//! progressive three-band remap, the contrastive penalty and the final clamp.
//!
//! Every constant here is pinned: existing scores and tests depend on the
//! exact thresholds, so treat them as contract values.

use serde::{Deserialize, Serialize};

use crate::types::{
    Category, DimensionSimilarities, EvaluationMethod, MappingBand, QualityTier, ScoreBreakdown,
};

/// Universal similarity below which detailed analysis is skipped.
pub const QUICK_THRESHOLD: f64 = 0.20;
/// Source range of the quick-reject mapping.
pub const QUICK_SOURCE: (f64, f64) = (0.10, 0.20);
/// Target range of the quick-reject mapping (clamped).
pub const QUICK_TARGET: (f64, f64) = (20.0, 40.0);

/// Progressive mapping breakpoints over the weighted similarity.
pub const BAND_FLOOR: f64 = 0.18;
pub const BAND_AVERAGE: f64 = 0.23;
pub const BAND_GOOD: f64 = 0.26;
pub const BAND_EXCELLENT: f64 = 0.30;

/// Negative similarity above which a penalty applies.
pub const NEGATIVE_THRESHOLD: f64 = 0.22;
/// Points subtracted per unit of negative similarity above the threshold.
pub const NEGATIVE_PENALTY_SCALE: f64 = 20.0;

/// Final score bounds.
pub const SCORE_MIN: f64 = 30.0;
pub const SCORE_MAX: f64 = 98.0;

/// Fixed weights for combining the five positive dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    pub universal: f64,
    pub technical: f64,
    pub composition: f64,
    pub lighting: f64,
    pub category: f64,
}

pub const WEIGHTS: DimensionWeights = DimensionWeights {
    universal: 0.20,
    technical: 0.25,
    composition: 0.25,
    lighting: 0.15,
    category: 0.15,
};

impl DimensionWeights {
    pub fn total(&self) -> f64 {
        self.universal + self.technical + self.composition + self.lighting + self.category
    }

    pub fn combine(&self, sims: &DimensionSimilarities) -> f64 {
        self.universal * sims.universal
            + self.technical * sims.technical
            + self.composition * sims.composition
            + self.lighting * sims.lighting
            + self.category * sims.category
    }
}

/// Linear interpolation of `x` from `src` onto `dst`. Extrapolates outside `src`.
pub fn lerp(x: f64, src: (f64, f64), dst: (f64, f64)) -> f64 {
    (x - src.0) / (src.1 - src.0) * (dst.1 - dst.0) + dst.0
}

/// Returns the quick-reject score when `universal` fails the filter.
pub fn quick_filter(universal: f64) -> Option<f64> {
    if universal < QUICK_THRESHOLD {
        Some(lerp(universal, QUICK_SOURCE, QUICK_TARGET).clamp(QUICK_TARGET.0, QUICK_TARGET.1))
    } else {
        None
    }
}

/// Three-band progressive remap. No clamping here; only the final stage clamps.
pub fn progressive_map(weighted: f64) -> (f64, MappingBand) {
    if weighted < BAND_AVERAGE {
        (
            lerp(weighted, (BAND_FLOOR, BAND_AVERAGE), (40.0, 65.0)),
            MappingBand::Lower,
        )
    } else if weighted < BAND_GOOD {
        (
            lerp(weighted, (BAND_AVERAGE, BAND_GOOD), (65.0, 80.0)),
            MappingBand::Middle,
        )
    } else {
        (
            lerp(weighted, (BAND_GOOD, BAND_EXCELLENT), (80.0, 95.0)),
            MappingBand::Upper,
        )
    }
}

/// Points to subtract for resemblance to the negative prompts (0 when below threshold).
pub fn negative_penalty(negative: f64) -> f64 {
    if negative > NEGATIVE_THRESHOLD {
        (negative - NEGATIVE_THRESHOLD) * NEGATIVE_PENALTY_SCALE
    } else {
        0.0
    }
}

pub fn clamp_score(score: f64) -> f64 {
    score.clamp(SCORE_MIN, SCORE_MAX)
}

/// Breakdown for an image rejected by the quick filter. `mapped` is the
/// `[20, 40]` quick score; the final clamp still applies on top of it.
pub fn quick_breakdown(
    universal: f64,
    mapped: f64,
    category: Category,
    model_name: &str,
) -> ScoreBreakdown {
    let aesthetic_score = clamp_score(mapped);
    ScoreBreakdown {
        aesthetic_score,
        tier: QualityTier::from_score(aesthetic_score),
        method: EvaluationMethod::Quick,
        category,
        universal_raw: universal,
        technical_raw: None,
        composition_raw: None,
        lighting_raw: None,
        category_raw: None,
        negative_raw: None,
        weighted_raw: None,
        mapped_score: mapped,
        negative_penalty: None,
        mapping_band: None,
        model_name: model_name.to_string(),
    }
}

/// Stages 3-6 over precomputed similarities.
pub fn detailed_breakdown(
    sims: &DimensionSimilarities,
    category: Category,
    model_name: &str,
) -> ScoreBreakdown {
    let weighted = WEIGHTS.combine(sims);
    let (mapped, band) = progressive_map(weighted);
    let penalty = negative_penalty(sims.negative);
    let aesthetic_score = clamp_score(mapped - penalty);

    ScoreBreakdown {
        aesthetic_score,
        tier: QualityTier::from_score(aesthetic_score),
        method: EvaluationMethod::Detailed,
        category,
        universal_raw: sims.universal,
        technical_raw: Some(sims.technical),
        composition_raw: Some(sims.composition),
        lighting_raw: Some(sims.lighting),
        category_raw: Some(sims.category),
        negative_raw: Some(sims.negative),
        weighted_raw: Some(weighted),
        mapped_score: mapped,
        negative_penalty: Some(penalty),
        mapping_band: Some(band),
        model_name: model_name.to_string(),
    }
}

/// Full algorithm (quick filter included) over precomputed similarities.
pub fn score_similarities(
    sims: &DimensionSimilarities,
    category: Category,
    model_name: &str,
) -> ScoreBreakdown {
    match quick_filter(sims.universal) {
        Some(mapped) => quick_breakdown(sims.universal, mapped, category, model_name),
        None => detailed_breakdown(sims, category, model_name),
    }
}
