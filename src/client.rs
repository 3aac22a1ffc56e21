// 🌐 Prediction Client - HTTP access to the external scoring service
//
// POST /predict  one provider  -> PredictionResponse
// POST /bulk     many providers -> BulkResult
// GET  /         health message
//
// Bounded timeout on every request. One retry, only for transport failures
// (connect / timeout); an HTTP error status is returned as-is.

use crate::config::ClientConfig;
use crate::error::{Result, RiskError};
use crate::model::{BulkResult, PredictionResponse};
use crate::schema::ProviderFeatureRecord;
use serde::de::DeserializeOwned;
use serde::Deserialize;

const USER_AGENT: &str = concat!("provider-risk/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct HealthResponse {
    message: String,
}

/// Client for the scoring service (cheap to clone)
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl PredictionClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| RiskError::Network(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Score a single provider
    pub async fn predict_one(&self, record: &ProviderFeatureRecord) -> Result<PredictionResponse> {
        let url = self.config.endpoint("/predict");
        tracing::debug!(url = %url, "Requesting single prediction");

        let response = self.send(|| self.http.post(&url).json(record)).await?;
        let prediction: PredictionResponse = decode(response).await?;
        prediction.validate()?;

        tracing::info!(
            prediction = prediction.prediction,
            probability = prediction.probability,
            "Prediction received"
        );
        Ok(prediction)
    }

    /// Score a batch of providers, order preserved
    pub async fn predict_bulk(&self, records: &[ProviderFeatureRecord]) -> Result<BulkResult> {
        let url = self.config.endpoint("/bulk");
        tracing::debug!(url = %url, providers = records.len(), "Requesting bulk prediction");

        let response = self.send(|| self.http.post(&url).json(records)).await?;
        let result: BulkResult = decode(response).await?;
        result.validate()?;

        tracing::info!(
            providers = result.summary.total_providers,
            fraud_detected = result.summary.fraud_detected,
            "Bulk prediction received"
        );
        Ok(result)
    }

    /// Service banner from `GET /`
    pub async fn health(&self) -> Result<String> {
        let url = self.config.endpoint("/");
        let response = self.send(|| self.http.get(&url)).await?;
        let health: HealthResponse = decode(response).await?;
        Ok(health.message)
    }

    /// Send with the retry policy and map non-2xx to `RequestFailed`
    async fn send<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let retries = self.config.effective_retries();
        let mut attempt = 0;

        let response = loop {
            match build().send().await {
                Ok(response) => break response,
                Err(e) if is_transient(&e) && attempt < retries => {
                    attempt += 1;
                    tracing::warn!(error = %e, attempt, "Transient network failure, retrying");
                }
                Err(e) => return Err(RiskError::Network(e.to_string())),
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Scoring service returned an error status");
            return Err(RiskError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| RiskError::Network(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| RiskError::DecodeFailed(e.to_string()))
}

// ============================================================================
// TESTS
// ============================================================================
