// ⚠️ Error types for the provider risk client
// Every failure here is recoverable: sessions go back to Idle with a message

use thiserror::Error;

/// Errors surfaced by the schema, CSV, client and session layers.
///
/// Non-numeric feature values are NOT an error: they are coerced to 0.0
/// by `schema::parse_field` and never reach this enum.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Upload rejected before reading (only `.csv` is accepted)
    #[error("Unsupported file type: {0} (only .csv files are accepted)")]
    UnsupportedFileType(String),

    /// Scoring service answered with a non-2xx status
    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// Response body did not match the expected shape or invariants
    #[error("Could not decode response: {0}")]
    DecodeFailed(String),

    /// Transport failure (connect, timeout, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// A request is already outstanding for this session
    #[error("A request is already in flight for this session")]
    RequestInFlight,

    /// Operation not allowed in the session's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RiskError {
    /// Message shown to the user next to the retry affordance
    pub fn user_message(&self) -> String {
        match self {
            RiskError::UnsupportedFileType(name) => {
                format!("Please upload a CSV file ({} is not supported)", name)
            }
            RiskError::RequestFailed { status, .. } => {
                format!("The scoring service rejected the request (HTTP {}). Please try again.", status)
            }
            RiskError::DecodeFailed(_) => {
                "The scoring service returned an unexpected response. Please try again.".to_string()
            }
            RiskError::Network(_) => {
                "Could not reach the scoring service. Please try again.".to_string()
            }
            RiskError::RequestInFlight => "An analysis is already running.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;
