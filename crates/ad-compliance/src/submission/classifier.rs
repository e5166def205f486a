use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Scores strictly above this are compliant.
pub const COMPLIANT_ABOVE: f64 = 75.0;
/// Scores strictly above this (and not compliant) are a warning.
pub const WARNING_ABOVE: f64 = 40.0;
/// Image scores below this are flagged as not compliant.
pub const IMAGE_NOT_COMPLIANT_BELOW: f64 = 40.0;
/// Image scores below this (and not already flagged) get a relevance warning.
pub const IMAGE_WARNING_BELOW: f64 = 50.0;

/// Response body as returned by every analysis endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawAnalysis {
    pub relevancy_score: f64,
    #[serde(default)]
    pub image_score: Option<f64>,
    pub compliant: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub issues: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub cost_usd: Option<f64>,
    #[serde(default)]
    pub tokens: Option<TokenUsage>,
}

/// Engines send `null` for an empty list as often as they omit the key.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

/// Presentation band for a 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Compliant,
    Warning,
    NonCompliant,
}

impl ScoreTier {
    /// Boundaries are exclusive: exactly 75 is a warning, exactly 40 is non-compliant.
    pub fn from_score(score: f64) -> Self {
        if score > COMPLIANT_ABOVE {
            Self::Compliant
        } else if score > WARNING_ABOVE {
            Self::Warning
        } else {
            Self::NonCompliant
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::Warning => "warning",
            Self::NonCompliant => "non-compliant",
        }
    }
}

/// Image-specific banner, independent of the tier bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageAdvisory {
    NotCompliant,
    RelevanceWarning,
}

impl ImageAdvisory {
    pub fn for_score(score: f64) -> Option<Self> {
        if score < IMAGE_NOT_COMPLIANT_BELOW {
            Some(Self::NotCompliant)
        } else if score < IMAGE_WARNING_BELOW {
            Some(Self::RelevanceWarning)
        } else {
            None
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotCompliant => "Image Not Compliant",
            Self::RelevanceWarning => "Image Relevance Warning",
        }
    }
}

/// Normalized verdict from one successful dispatch. Replaced wholesale by the next one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub relevancy_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_score: Option<f64>,
    pub compliant: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenUsage>,
}

impl AnalysisResult {
    pub fn relevancy_tier(&self) -> ScoreTier {
        ScoreTier::from_score(self.relevancy_score)
    }

    pub fn image_tier(&self) -> Option<ScoreTier> {
        self.image_score.map(ScoreTier::from_score)
    }

    pub fn image_advisory(&self) -> Option<ImageAdvisory> {
        self.image_score.and_then(ImageAdvisory::for_score)
    }

    /// Everything the presentation layer needs, recomputed on every call.
    pub fn report(&self) -> ResultReport {
        let image_value = self.image_score.unwrap_or_default();
        ResultReport {
            relevancy: ScorePill::new("Relevancy", self.relevancy_score),
            image: ScorePill::new("Image", image_value),
            compliant: self.compliant,
            verdict: if self.compliant {
                "Compliant"
            } else {
                "Not Compliant"
            },
            image_advisory: self.image_advisory().map(ImageAdvisory::label),
            issues: self.issues.clone(),
            suggestions: self.suggestions.clone(),
            cost: self.cost_usd.map(|cost_usd| CostLine {
                cost_usd,
                tokens: self.tokens,
            }),
        }
    }
}

/// Score with its tier for a single pill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorePill {
    pub label: &'static str,
    pub value: f64,
    pub tier: ScoreTier,
}

impl ScorePill {
    fn new(label: &'static str, value: f64) -> Self {
        Self {
            label,
            value,
            tier: ScoreTier::from_score(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostLine {
    pub cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenUsage>,
}

/// Presentation model rendered by the CLI and returned over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultReport {
    pub relevancy: ScorePill,
    pub image: ScorePill,
    pub compliant: bool,
    pub verdict: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_advisory: Option<&'static str>,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostLine>,
}

/// Turns raw engine output into an [`AnalysisResult`].
///
/// `compliant` is copied verbatim; it is never reconciled with the scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultClassifier;

impl ResultClassifier {
    pub fn classify(&self, raw: RawAnalysis) -> AnalysisResult {
        AnalysisResult {
            relevancy_score: clamp_score("relevancy_score", raw.relevancy_score),
            image_score: raw.image_score.map(|score| clamp_score("image_score", score)),
            compliant: raw.compliant,
            issues: raw.issues,
            suggestions: raw.suggestions,
            cost_usd: raw.cost_usd,
            tokens: raw.tokens,
        }
    }
}

fn clamp_score(field: &'static str, score: f64) -> f64 {
    if (0.0..=100.0).contains(&score) {
        return score;
    }
    warn!(field, score, "engine returned a score outside 0-100; clamping");
    score.clamp(0.0, 100.0)
}
