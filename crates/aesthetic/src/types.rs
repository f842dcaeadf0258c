use serde::{Deserialize, Serialize};
use std::fmt;

/// Photo categories accepted by the upload path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Landscape,
    Cityscape,
    Architecture,
    Nature,
    Sunset,
    Night,
    Wildlife,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Landscape,
        Category::Cityscape,
        Category::Architecture,
        Category::Nature,
        Category::Sunset,
        Category::Night,
        Category::Wildlife,
        Category::Other,
    ];

    /// Lenient, case-insensitive parse. Unknown labels resolve to [`Category::Other`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "landscape" => Category::Landscape,
            "cityscape" => Category::Cityscape,
            "architecture" => Category::Architecture,
            "nature" => Category::Nature,
            "sunset" => Category::Sunset,
            "night" => Category::Night,
            "wildlife" => Category::Wildlife,
            _ => Category::Other,
        }
    }

    /// Category whose prompt group is used when scoring. Categories without tuned
    /// prompts share the generic `other` group.
    pub fn prompt_category(self) -> Category {
        match self {
            Category::Wildlife => Category::Other,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Landscape => "landscape",
            Category::Cityscape => "cityscape",
            Category::Architecture => "architecture",
            Category::Nature => "nature",
            Category::Sunset => "sunset",
            Category::Night => "night",
            Category::Wildlife => "wildlife",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One axis of aesthetic evaluation, plus the contrastive negative set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Universal,
    Technical,
    Composition,
    Lighting,
    Category,
    Negative,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Universal => "universal",
            Dimension::Technical => "technical",
            Dimension::Composition => "composition",
            Dimension::Lighting => "lighting",
            Dimension::Category => "category",
            Dimension::Negative => "negative",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse label derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Poor,
    BelowAverage,
    Average,
    Good,
    Excellent,
    Outstanding,
}

impl QualityTier {
    /// Bands: `[30,45)` poor, `[45,60)` below average, `[60,75)` average,
    /// `[75,85)` good, `[85,95)` excellent, `[95,98]` outstanding.
    pub fn from_score(score: f64) -> Self {
        if score >= 95.0 {
            QualityTier::Outstanding
        } else if score >= 85.0 {
            QualityTier::Excellent
        } else if score >= 75.0 {
            QualityTier::Good
        } else if score >= 60.0 {
            QualityTier::Average
        } else if score >= 45.0 {
            QualityTier::BelowAverage
        } else {
            QualityTier::Poor
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Poor => "poor",
            QualityTier::BelowAverage => "below_average",
            QualityTier::Average => "average",
            QualityTier::Good => "good",
            QualityTier::Excellent => "excellent",
            QualityTier::Outstanding => "outstanding",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which branch of the progressive mapping a weighted score fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingBand {
    /// weighted < 0.23, mapped from `[0.18, 0.23]` to `[40, 65]`.
    Lower,
    /// 0.23 <= weighted < 0.26, mapped from `[0.23, 0.26]` to `[65, 80]`.
    Middle,
    /// weighted >= 0.26, mapped from `[0.26, 0.30]` to `[80, 95]`.
    Upper,
}

/// Whether the image was rejected by the quick filter or went through detailed analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMethod {
    Quick,
    Detailed,
}

/// Raw mean similarities of one image against every prompt group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionSimilarities {
    pub universal: f64,
    pub technical: f64,
    pub composition: f64,
    pub lighting: f64,
    pub category: f64,
    pub negative: f64,
}

/// Result of one evaluation. Dimension fields other than `universal_raw` are `None`
/// when the quick filter short-circuited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Final clamped score in `[30, 98]`.
    pub aesthetic_score: f64,
    pub tier: QualityTier,
    pub method: EvaluationMethod,
    /// Category whose prompts were used (after fallback).
    pub category: Category,
    /// Mean similarity against the universal prompts (the quick-filter score).
    pub universal_raw: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_raw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition_raw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lighting_raw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_raw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_raw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_raw: Option<f64>,
    /// Score after mapping but before the negative penalty and final clamp.
    pub mapped_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_band: Option<MappingBand>,
    pub model_name: String,
}

impl ScoreBreakdown {
    pub fn is_quick(&self) -> bool {
        self.method == EvaluationMethod::Quick
    }

    /// Per-dimension raw similarities, `None` for the quick path.
    pub fn similarities(&self) -> Option<DimensionSimilarities> {
        Some(DimensionSimilarities {
            universal: self.universal_raw,
            technical: self.technical_raw?,
            composition: self.composition_raw?,
            lighting: self.lighting_raw?,
            category: self.category_raw?,
            negative: self.negative_raw?,
        })
    }
}
