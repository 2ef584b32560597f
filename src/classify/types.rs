use crate::utils::math::round2;
use serde::Serialize;
use std::fmt;

/// Single classifier verdict: the winning category and the probability mass
/// it received, as a percentage rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub category: String,
    pub confidence: f32,
}

impl Prediction {
    pub fn new(category: impl Into<String>, confidence: f32) -> Self {
        Self {
            category: category.into(),
            confidence: round2(confidence),
        }
    }
}

/// Combined verdict of both classifiers for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// Closed-vocabulary prediction
    pub label: Prediction,
    /// Open-vocabulary waste-type prediction
    pub waste_type: Prediction,
}

impl ClassificationResult {
    pub fn new(label: Prediction, waste_type: Prediction) -> Self {
        Self { label, waste_type }
    }

    /// Legacy one-line sentence. Only the label confidence is surfaced; the
    /// waste-type confidence stays in the structured result.
    pub fn summary(&self) -> String {
        format!(
            "This is {} with {}% confidence and the waste type is {}",
            self.label.category, self.label.confidence, self.waste_type.category
        )
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
