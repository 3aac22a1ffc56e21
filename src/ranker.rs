// 🏷️ Result Ranker - SHAP ranking, risk buckets, classification
// Pure functions over the scoring service's responses

use crate::model::{BulkResult, PredictionResponse};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of factors the result views show
pub const DISPLAY_FACTORS: usize = 5;

const HIGH_RISK_THRESHOLD: f64 = 0.7;
const MEDIUM_RISK_THRESHOLD: f64 = 0.3;

// ============================================================================
// RANKED FACTORS
// ============================================================================

/// RankedFactor - one feature's SHAP contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFactor {
    pub name: String,
    pub value: f64,
}

impl fmt::Display for RankedFactor {
    /// "InscClaimAmtReimbursed: +0.4213" (sign shown for positive values)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.value > 0.0 { "+" } else { "" };
        write!(f, "{}: {}{:.4}", self.name, sign, self.value)
    }
}

/// Pair names with values and sort by descending magnitude
///
/// `sort_by` is stable, so equal magnitudes keep their positional order.
/// Extra entries on either side are dropped by the zip.
pub fn rank_pairs(names: &[String], values: &[f64]) -> Vec<RankedFactor> {
    let mut ranked: Vec<RankedFactor> = names
        .iter()
        .zip(values)
        .map(|(name, value)| RankedFactor {
            name: name.clone(),
            value: *value,
        })
        .collect();

    ranked.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
    ranked
}

/// Ranked explanation for a single prediction
pub fn rank_factors(response: &PredictionResponse) -> Vec<RankedFactor> {
    rank_pairs(&response.feature_names, &response.shap_values)
}

/// First `n` factors of an already ranked list
pub fn top_factors(ranked: &[RankedFactor], n: usize) -> &[RankedFactor] {
    &ranked[..n.min(ranked.len())]
}

// ============================================================================
// RISK BUCKET
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskBucket {
    Low,
    Medium,
    High,
}

impl RiskBucket {
    /// `p > 0.7` → High, `p > 0.3` → Medium, otherwise Low
    pub fn from_probability(probability: f64) -> Self {
        if probability > HIGH_RISK_THRESHOLD {
            RiskBucket::High
        } else if probability > MEDIUM_RISK_THRESHOLD {
            RiskBucket::Medium
        } else {
            RiskBucket::Low
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RiskBucket::Low => "Low",
            RiskBucket::Medium => "Medium",
            RiskBucket::High => "High",
        }
    }
}

impl fmt::Display for RiskBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Binary verdict, taken from the prediction flag only
///
/// Independent of `RiskBucket`: prediction=0 with probability 0.75 is
/// NotFraud and High at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Fraud,
    NotFraud,
}

impl Classification {
    pub fn from_prediction(prediction: u8) -> Self {
        if prediction == 1 {
            Classification::Fraud
        } else {
            Classification::NotFraud
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Classification::Fraud => "Fraud",
            Classification::NotFraud => "Not Fraud",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Probability as a percentage with two decimals ("85.00%")
pub fn format_probability(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

// ============================================================================
// RISK DISTRIBUTION (bulk summary cards)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskDistribution {
    pub fn from_bulk(result: &BulkResult) -> Self {
        let mut dist = RiskDistribution::default();
        for row in &result.results {
            match RiskBucket::from_probability(row.probability) {
                RiskBucket::High => dist.high += 1,
                RiskBucket::Medium => dist.medium += 1,
                RiskBucket::Low => dist.low += 1,
            }
        }
        dist
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

// ============================================================================
// TESTS
// ============================================================================
