// Provider Risk - Core Library
// Client side of the provider fraud-risk service: schema, CSV, HTTP, ranking, sessions

pub mod error;
pub mod config;
pub mod schema;   // Feature Schema
pub mod model;    // Wire types returned by the scoring service
pub mod parser;   // CSV template / parser / results export
pub mod client;   // Prediction Client
pub mod ranker;   // Result Ranker
pub mod session;  // Live-check + bulk state machines

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use error::{Result, RiskError};
pub use config::ClientConfig;
pub use schema::{parse_field, Feature, ProviderFeatureRecord};
pub use model::{BulkResult, BulkSummary, PredictionResponse, ProviderResult};
pub use parser::{
    check_upload, export_results, generate_template, load_csv, parse_csv,
};
pub use client::PredictionClient;
pub use ranker::{
    format_probability, rank_factors, rank_pairs, top_factors,
    Classification, RankedFactor, RiskBucket, RiskDistribution, DISPLAY_FACTORS,
};
pub use session::{
    BulkOutcome, BulkSession, BulkState,
    LiveCheckOutcome, LiveCheckSession, LiveCheckState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
