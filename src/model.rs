// 📦 Wire model - scoring service responses
// Field names follow the service's snake_case JSON

use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};

// ============================================================================
// SINGLE PREDICTION
// ============================================================================

/// Response of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// 0 = not fraud, 1 = fraud
    pub prediction: u8,
    pub probability: f64,
    /// Aligned positionally with `feature_names`
    pub shap_values: Vec<f64>,
    pub base_value: f64,
    pub feature_names: Vec<String>,
}

impl PredictionResponse {
    /// Check the invariants serde alone cannot express
    pub fn validate(&self) -> Result<()> {
        validate_prediction_flag(self.prediction)?;
        validate_probability(self.probability)?;
        if self.shap_values.len() != self.feature_names.len() {
            return Err(RiskError::DecodeFailed(format!(
                "{} SHAP values for {} feature names",
                self.shap_values.len(),
                self.feature_names.len()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// BULK PREDICTION
// ============================================================================

/// One row of a bulk result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    /// 0-based row position in the submitted CSV
    pub provider_index: usize,
    pub prediction: u8,
    pub probability: f64,
    pub shap_values: Vec<f64>,
    pub base_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkSummary {
    pub total_providers: usize,
    pub fraud_detected: usize,
    pub fraud_rate: f64,
    pub average_probability: f64,
}

impl BulkSummary {
    /// Compute the summary from the result rows
    ///
    /// An empty batch gives a fraud rate and average probability of 0.
    pub fn from_results(results: &[ProviderResult]) -> Self {
        let total_providers = results.len();
        let fraud_detected = results.iter().filter(|r| r.prediction == 1).count();

        let (fraud_rate, average_probability) = if total_providers == 0 {
            (0.0, 0.0)
        } else {
            let total = total_providers as f64;
            let sum: f64 = results.iter().map(|r| r.probability).sum();
            (fraud_detected as f64 / total, sum / total)
        };

        BulkSummary {
            total_providers,
            fraud_detected,
            fraud_rate,
            average_probability,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} providers: {} flagged as fraud ({:.1}%), average probability {:.1}%",
            self.total_providers,
            self.fraud_detected,
            self.fraud_rate * 100.0,
            self.average_probability * 100.0
        )
    }
}

/// Response of `POST /bulk`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResult {
    pub results: Vec<ProviderResult>,
    pub summary: BulkSummary,
    pub feature_names: Vec<String>,
}

impl BulkResult {
    /// Assemble a result and derive its summary
    pub fn new(results: Vec<ProviderResult>, feature_names: Vec<String>) -> Self {
        let summary = BulkSummary::from_results(&results);
        BulkResult {
            results,
            summary,
            feature_names,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for row in &self.results {
            validate_prediction_flag(row.prediction)?;
            validate_probability(row.probability)?;
            if row.shap_values.len() != self.feature_names.len() {
                return Err(RiskError::DecodeFailed(format!(
                    "provider {}: {} SHAP values for {} feature names",
                    row.provider_index,
                    row.shap_values.len(),
                    self.feature_names.len()
                )));
            }
        }

        let expected = BulkSummary::from_results(&self.results);
        if self.summary.total_providers != expected.total_providers {
            return Err(RiskError::DecodeFailed(format!(
                "summary reports {} providers, {} results returned",
                self.summary.total_providers, expected.total_providers
            )));
        }
        if self.summary.fraud_detected != expected.fraud_detected {
            return Err(RiskError::DecodeFailed(format!(
                "summary reports {} fraud cases, results contain {}",
                self.summary.fraud_detected, expected.fraud_detected
            )));
        }
        if (self.summary.fraud_rate - expected.fraud_rate).abs() > 1e-9 {
            return Err(RiskError::DecodeFailed(format!(
                "summary fraud rate {} does not match {}",
                self.summary.fraud_rate, expected.fraud_rate
            )));
        }
        Ok(())
    }
}

fn validate_prediction_flag(prediction: u8) -> Result<()> {
    if prediction > 1 {
        return Err(RiskError::DecodeFailed(format!(
            "prediction must be 0 or 1, got {}",
            prediction
        )));
    }
    Ok(())
}

fn validate_probability(probability: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(RiskError::DecodeFailed(format!(
            "probability must be within [0, 1], got {}",
            probability
        )));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
