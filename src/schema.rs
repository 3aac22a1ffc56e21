// 📐 Feature Schema - the ten aggregated provider features
// One canonical name per feature + exactly one declared alias

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// FEATURES
// ============================================================================

/// Feature - one named numeric input of a provider record
///
/// Canonical names are the ones the scoring service declares on its request
/// model. The aggregated variant (`BeneID_nunique`, `ClaimID_count`, ...)
/// comes from the feature-engineering step and is accepted through `alias()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    UniqueBeneficiaries,
    ClaimCount,
    TotalReimbursed,
    TotalDeductiblePaid,
    PartACoverageMonths,
    PartBCoverageMonths,
    InpatientReimbursement,
    InpatientDeductible,
    OutpatientReimbursement,
    OutpatientDeductible,
}

impl Feature {
    /// All features in canonical (wire and CSV) order
    pub const ALL: [Feature; 10] = [
        Feature::UniqueBeneficiaries,
        Feature::ClaimCount,
        Feature::TotalReimbursed,
        Feature::TotalDeductiblePaid,
        Feature::PartACoverageMonths,
        Feature::PartBCoverageMonths,
        Feature::InpatientReimbursement,
        Feature::InpatientDeductible,
        Feature::OutpatientReimbursement,
        Feature::OutpatientDeductible,
    ];

    /// Canonical field name (JSON key and CSV header)
    pub fn name(&self) -> &'static str {
        match self {
            Feature::UniqueBeneficiaries => "BeneID",
            Feature::ClaimCount => "ClaimID",
            Feature::TotalReimbursed => "InscClaimAmtReimbursed",
            Feature::TotalDeductiblePaid => "DeductibleAmtPaid",
            Feature::PartACoverageMonths => "NoOfMonths_PartACov",
            Feature::PartBCoverageMonths => "NoOfMonths_PartBCov",
            Feature::InpatientReimbursement => "IPAnnualReimbursementAmt",
            Feature::InpatientDeductible => "IPAnnualDeductibleAmt",
            Feature::OutpatientReimbursement => "OPAnnualReimbursementAmt",
            Feature::OutpatientDeductible => "OPAnnualDeductibleAmt",
        }
    }

    /// Aggregated-variant name, mapped onto the canonical feature
    pub fn alias(&self) -> &'static str {
        match self {
            Feature::UniqueBeneficiaries => "BeneID_nunique",
            Feature::ClaimCount => "ClaimID_count",
            Feature::TotalReimbursed => "InscClaimAmtReimbursed_sum",
            Feature::TotalDeductiblePaid => "DeductibleAmtPaid_sum",
            Feature::PartACoverageMonths => "NoOfMonths_PartACov_mean",
            Feature::PartBCoverageMonths => "NoOfMonths_PartBCov_mean",
            Feature::InpatientReimbursement => "IPAnnualReimbursementAmt_sum",
            Feature::InpatientDeductible => "IPAnnualDeductibleAmt_sum",
            Feature::OutpatientReimbursement => "OPAnnualReimbursementAmt_sum",
            Feature::OutpatientDeductible => "OPAnnualDeductibleAmt_sum",
        }
    }

    /// Human-readable label for form prompts
    pub fn label(&self) -> &'static str {
        match self {
            Feature::UniqueBeneficiaries => "Unique beneficiaries",
            Feature::ClaimCount => "Number of claims",
            Feature::TotalReimbursed => "Total reimbursed amount",
            Feature::TotalDeductiblePaid => "Total deductible paid",
            Feature::PartACoverageMonths => "Avg months of Part A coverage",
            Feature::PartBCoverageMonths => "Avg months of Part B coverage",
            Feature::InpatientReimbursement => "Total inpatient annual reimbursement",
            Feature::InpatientDeductible => "Total inpatient annual deductible",
            Feature::OutpatientReimbursement => "Total outpatient annual reimbursement",
            Feature::OutpatientDeductible => "Total outpatient annual deductible",
        }
    }

    /// Resolve a CSV header or form key to a feature
    ///
    /// Matches the canonical name or its alias, exactly, after trimming.
    /// Anything else is unknown and returns None.
    pub fn from_header(header: &str) -> Option<Feature> {
        let header = header.trim();
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.name() == header || f.alias() == header)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// FIELD PARSING
// ============================================================================

/// Parse a raw form/CSV value into a feature value
///
/// Silent-default policy: empty, non-numeric and non-finite input all
/// become 0.0. No range or sign checks (negative amounts pass through).
pub fn parse_field(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

// ============================================================================
// PROVIDER FEATURE RECORD
// ============================================================================

/// ProviderFeatureRecord - one provider's aggregated claim features
///
/// Serializes to the JSON object the scoring service expects.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderFeatureRecord {
    #[serde(rename = "BeneID", alias = "BeneID_nunique", default)]
    pub unique_beneficiaries: f64,

    #[serde(rename = "ClaimID", alias = "ClaimID_count", default)]
    pub claim_count: f64,

    #[serde(rename = "InscClaimAmtReimbursed", alias = "InscClaimAmtReimbursed_sum", default)]
    pub total_reimbursed: f64,

    #[serde(rename = "DeductibleAmtPaid", alias = "DeductibleAmtPaid_sum", default)]
    pub total_deductible_paid: f64,

    #[serde(rename = "NoOfMonths_PartACov", alias = "NoOfMonths_PartACov_mean", default)]
    pub part_a_coverage_months: f64,

    #[serde(rename = "NoOfMonths_PartBCov", alias = "NoOfMonths_PartBCov_mean", default)]
    pub part_b_coverage_months: f64,

    #[serde(rename = "IPAnnualReimbursementAmt", alias = "IPAnnualReimbursementAmt_sum", default)]
    pub inpatient_reimbursement: f64,

    #[serde(rename = "IPAnnualDeductibleAmt", alias = "IPAnnualDeductibleAmt_sum", default)]
    pub inpatient_deductible: f64,

    #[serde(rename = "OPAnnualReimbursementAmt", alias = "OPAnnualReimbursementAmt_sum", default)]
    pub outpatient_reimbursement: f64,

    #[serde(rename = "OPAnnualDeductibleAmt", alias = "OPAnnualDeductibleAmt_sum", default)]
    pub outpatient_deductible: f64,
}

impl ProviderFeatureRecord {
    /// All-zero record (what an untouched form submits)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from values in canonical order
    pub fn from_values(values: [f64; 10]) -> Self {
        let mut record = Self::new();
        for (feature, value) in Feature::ALL.iter().zip(values) {
            record.set(*feature, value);
        }
        record
    }

    /// Schema-validated construction from raw (name, value) pairs
    ///
    /// Names go through `Feature::from_header`; unknown names are dropped,
    /// missing features stay at 0.0, values go through `parse_field`.
    pub fn from_fields<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut record = Self::new();
        for (name, raw) in fields {
            match Feature::from_header(name) {
                Some(feature) => record.set(feature, parse_field(raw)),
                None => tracing::debug!(field = %name, "Ignoring unknown feature field"),
            }
        }
        record
    }

    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::UniqueBeneficiaries => self.unique_beneficiaries,
            Feature::ClaimCount => self.claim_count,
            Feature::TotalReimbursed => self.total_reimbursed,
            Feature::TotalDeductiblePaid => self.total_deductible_paid,
            Feature::PartACoverageMonths => self.part_a_coverage_months,
            Feature::PartBCoverageMonths => self.part_b_coverage_months,
            Feature::InpatientReimbursement => self.inpatient_reimbursement,
            Feature::InpatientDeductible => self.inpatient_deductible,
            Feature::OutpatientReimbursement => self.outpatient_reimbursement,
            Feature::OutpatientDeductible => self.outpatient_deductible,
        }
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::UniqueBeneficiaries => &mut self.unique_beneficiaries,
            Feature::ClaimCount => &mut self.claim_count,
            Feature::TotalReimbursed => &mut self.total_reimbursed,
            Feature::TotalDeductiblePaid => &mut self.total_deductible_paid,
            Feature::PartACoverageMonths => &mut self.part_a_coverage_months,
            Feature::PartBCoverageMonths => &mut self.part_b_coverage_months,
            Feature::InpatientReimbursement => &mut self.inpatient_reimbursement,
            Feature::InpatientDeductible => &mut self.inpatient_deductible,
            Feature::OutpatientReimbursement => &mut self.outpatient_reimbursement,
            Feature::OutpatientDeductible => &mut self.outpatient_deductible,
        };
        *slot = value;
    }

    /// Values in canonical order
    pub fn values(&self) -> [f64; 10] {
        Feature::ALL.map(|f| self.get(f))
    }
}

// ============================================================================
// TESTS
// ============================================================================
