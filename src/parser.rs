// 🏗️ CSV Template / Parser / Results export
// Tabular provider files <-> ProviderFeatureRecord

use crate::error::{Result, RiskError};
use crate::model::BulkResult;
use crate::ranker::{format_probability, Classification, RiskBucket};
use crate::schema::{parse_field, Feature, ProviderFeatureRecord};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::path::Path;

/// Illustrative rows shipped in the downloadable template
pub const TEMPLATE_EXAMPLES: [[f64; 10]; 2] = [
    [100.0, 500.0, 100000.0, 20000.0, 10.0, 8.0, 50000.0, 10000.0, 30000.0, 5000.0],
    [85.0, 320.0, 85000.0, 15000.0, 12.0, 9.0, 40000.0, 8000.0, 25000.0, 4000.0],
];

/// Header of the downloadable results file
pub const RESULTS_HEADER: [&str; 4] = [
    "Provider Index",
    "Fraud Prediction",
    "Fraud Probability",
    "Risk Level",
];

// ============================================================================
// TEMPLATE
// ============================================================================

/// Header row (canonical feature names) followed by the example rows
pub fn generate_template() -> String {
    let header: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();

    let mut out = header.join(",");
    out.push('\n');
    for row in TEMPLATE_EXAMPLES {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse CSV text into provider records
///
/// - blank lines are skipped, the first non-blank line is the header
/// - columns map positionally to header names through `Feature::from_header`
/// - short rows leave the missing trailing features at 0.0
/// - row order is kept; the position becomes `provider_index` downstream
/// - quotes are plain characters, so every data line is exactly one record
pub fn parse_csv(text: &str) -> Result<Vec<ProviderFeatureRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut header: Option<Vec<Option<Feature>>> = None;
    let mut records = Vec::new();

    for result in reader.records() {
        let row = result?;
        if is_blank(&row) {
            continue;
        }

        if header.is_none() {
            let mapped = map_header(&row);
            if mapped.iter().all(Option::is_none) {
                tracing::warn!(header = ?row, "CSV header has no recognised feature columns");
            }
            header = Some(mapped);
            continue;
        }
        let columns = header.as_deref().unwrap_or(&[]);

        let mut record = ProviderFeatureRecord::new();
        for (i, column) in columns.iter().enumerate() {
            if let Some(feature) = column {
                // Short rows: `get` is None past the end, which parses as 0.0
                record.set(*feature, parse_field(row.get(i).unwrap_or("")));
            }
        }
        records.push(record);
    }

    tracing::debug!(rows = records.len(), "Parsed provider CSV");
    Ok(records)
}

fn is_blank(row: &StringRecord) -> bool {
    row.iter().all(|field| field.is_empty())
}

fn map_header(header: &StringRecord) -> Vec<Option<Feature>> {
    header
        .iter()
        .map(|name| {
            let feature = Feature::from_header(name);
            if feature.is_none() {
                tracing::debug!(column = %name, "Ignoring unknown CSV column");
            }
            feature
        })
        .collect()
}

// ============================================================================
// FILE UPLOAD
// ============================================================================

/// Reject anything that is not a `.csv` file (case-insensitive)
pub fn check_upload(path: &Path) -> Result<()> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        Ok(())
    } else {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        Err(RiskError::UnsupportedFileType(name))
    }
}

/// Check, read and parse an uploaded CSV file
pub async fn load_csv(path: &Path) -> Result<Vec<ProviderFeatureRecord>> {
    check_upload(path)?;
    let text = tokio::fs::read_to_string(path).await?;
    let records = parse_csv(&text)?;
    tracing::info!(file = %path.display(), providers = records.len(), "Loaded provider file");
    Ok(records)
}

// ============================================================================
// RESULTS EXPORT
// ============================================================================

/// Render a bulk result as the downloadable results CSV
pub fn export_results(result: &BulkResult) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(RESULTS_HEADER)?;

    for row in &result.results {
        writer.write_record([
            row.provider_index.to_string(),
            Classification::from_prediction(row.prediction).label().to_string(),
            format_probability(row.probability),
            RiskBucket::from_probability(row.probability).name().to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| RiskError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| RiskError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

// ============================================================================
// TESTS
// ============================================================================
