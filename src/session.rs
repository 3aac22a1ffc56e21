// 🔁 Sessions - live-check and bulk-analysis state machines
//
// Live check:  Idle -> Analyzing -> Success | Fraud        (failure -> Idle)
// Bulk:        Idle -> Uploading -> Analyzing -> Completed (failure -> Idle)
// reset():     any settled state -> Idle
//
// One request per session at a time. The in-flight flag lives here, not in
// the UI, so scripted callers get the same guarantee.

use crate::client::PredictionClient;
use crate::error::{Result, RiskError};
use crate::model::{BulkResult, PredictionResponse};
use crate::parser::{check_upload, export_results, load_csv, parse_csv};
use crate::ranker::{rank_factors, Classification, RankedFactor, RiskBucket, RiskDistribution};
use crate::schema::ProviderFeatureRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

// ============================================================================
// IN-FLIGHT GUARD
// ============================================================================

/// Single-slot request flag
#[derive(Debug, Default)]
struct InFlight(AtomicBool);

/// Releases the slot when dropped (success, error or panic)
struct InFlightGuard<'a>(&'a AtomicBool);

impl InFlight {
    fn try_acquire(&self) -> Result<InFlightGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard(&self.0))
            .map_err(|_| RiskError::RequestInFlight)
    }

    fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// LIVE CHECK
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiveCheckState {
    Idle,
    Analyzing,
    /// Settled with prediction = 0
    Success,
    /// Settled with prediction = 1
    Fraud,
}

/// Display-ready result of one live check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveCheckOutcome {
    pub response: PredictionResponse,
    pub factors: Vec<RankedFactor>,
    pub bucket: RiskBucket,
    pub classification: Classification,
    pub completed_at: DateTime<Utc>,
}

impl LiveCheckOutcome {
    pub fn from_response(response: PredictionResponse) -> Self {
        LiveCheckOutcome {
            factors: rank_factors(&response),
            bucket: RiskBucket::from_probability(response.probability),
            classification: Classification::from_prediction(response.prediction),
            completed_at: Utc::now(),
            response,
        }
    }
}

#[derive(Debug)]
struct LiveCheckInner {
    state: LiveCheckState,
    outcome: Option<LiveCheckOutcome>,
    error: Option<String>,
}

/// One user's live-check form session
pub struct LiveCheckSession {
    id: Uuid,
    client: PredictionClient,
    inner: Mutex<LiveCheckInner>,
    in_flight: InFlight,
}

impl LiveCheckSession {
    pub fn new(client: PredictionClient) -> Self {
        LiveCheckSession {
            id: Uuid::new_v4(),
            client,
            inner: Mutex::new(LiveCheckInner {
                state: LiveCheckState::Idle,
                outcome: None,
                error: None,
            }),
            in_flight: InFlight::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> LiveCheckState {
        lock(&self.inner).state
    }

    pub fn outcome(&self) -> Option<LiveCheckOutcome> {
        lock(&self.inner).outcome.clone()
    }

    /// Message to show after a failed submission (cleared on next submit)
    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner).error.clone()
    }

    /// Submit raw form values keyed by feature name
    pub async fn submit_form<'a, I>(&self, fields: I) -> Result<LiveCheckOutcome>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let record = ProviderFeatureRecord::from_fields(fields);
        self.submit(&record).await
    }

    /// Idle -> Analyzing -> Success | Fraud, or back to Idle on failure
    pub async fn submit(&self, record: &ProviderFeatureRecord) -> Result<LiveCheckOutcome> {
        let _guard = self.in_flight.try_acquire()?;

        {
            let mut inner = lock(&self.inner);
            if inner.state != LiveCheckState::Idle {
                return Err(RiskError::InvalidState(format!(
                    "cannot submit from {:?}, reset first",
                    inner.state
                )));
            }
            inner.state = LiveCheckState::Analyzing;
            inner.error = None;
        }
        tracing::info!(session = %self.id, "Live check submitted");

        match self.client.predict_one(record).await {
            Ok(response) => {
                let outcome = LiveCheckOutcome::from_response(response);
                let mut inner = lock(&self.inner);
                inner.state = match outcome.classification {
                    Classification::Fraud => LiveCheckState::Fraud,
                    Classification::NotFraud => LiveCheckState::Success,
                };
                inner.outcome = Some(outcome.clone());
                tracing::info!(session = %self.id, state = ?inner.state, bucket = %outcome.bucket, "Live check complete");
                Ok(outcome)
            }
            Err(e) => {
                let mut inner = lock(&self.inner);
                inner.state = LiveCheckState::Idle;
                inner.error = Some(e.user_message());
                tracing::warn!(session = %self.id, error = %e, "Live check failed");
                Err(e)
            }
        }
    }

    /// Back to Idle, clearing the result and any error
    pub fn reset(&self) -> Result<()> {
        if self.in_flight.is_set() {
            return Err(RiskError::RequestInFlight);
        }
        let mut inner = lock(&self.inner);
        inner.state = LiveCheckState::Idle;
        inner.outcome = None;
        inner.error = None;
        Ok(())
    }
}

// ============================================================================
// BULK ANALYSIS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkState {
    Idle,
    Uploading,
    Analyzing,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub result: BulkResult,
    pub distribution: RiskDistribution,
    pub completed_at: DateTime<Utc>,
}

impl BulkOutcome {
    pub fn from_result(result: BulkResult) -> Self {
        BulkOutcome {
            distribution: RiskDistribution::from_bulk(&result),
            completed_at: Utc::now(),
            result,
        }
    }
}

#[derive(Debug)]
struct BulkInner {
    state: BulkState,
    outcome: Option<BulkOutcome>,
    error: Option<String>,
}

/// One user's bulk upload session
pub struct BulkSession {
    id: Uuid,
    client: PredictionClient,
    inner: Mutex<BulkInner>,
    in_flight: InFlight,
}

impl BulkSession {
    pub fn new(client: PredictionClient) -> Self {
        BulkSession {
            id: Uuid::new_v4(),
            client,
            inner: Mutex::new(BulkInner {
                state: BulkState::Idle,
                outcome: None,
                error: None,
            }),
            in_flight: InFlight::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> BulkState {
        lock(&self.inner).state
    }

    pub fn outcome(&self) -> Option<BulkOutcome> {
        lock(&self.inner).outcome.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner).error.clone()
    }

    /// Analyze a CSV file on disk
    pub async fn analyze_file(&self, path: &Path) -> Result<BulkOutcome> {
        self.run(load_csv(path)).await
    }

    /// Analyze file contents handed over by a UI (name is used for the type check)
    pub async fn analyze_upload(&self, file_name: &str, contents: &str) -> Result<BulkOutcome> {
        self.run(async {
            check_upload(Path::new(file_name))?;
            parse_csv(contents)
        })
        .await
    }

    async fn run<F>(&self, load: F) -> Result<BulkOutcome>
    where
        F: Future<Output = Result<Vec<ProviderFeatureRecord>>>,
    {
        let _guard = self.in_flight.try_acquire()?;

        {
            let mut inner = lock(&self.inner);
            if inner.state != BulkState::Idle {
                return Err(RiskError::InvalidState(format!(
                    "cannot start an upload from {:?}, reset first",
                    inner.state
                )));
            }
            inner.state = BulkState::Uploading;
            inner.error = None;
        }

        let records = match load.await {
            Ok(records) => records,
            Err(e) => return Err(self.fail(e)),
        };

        lock(&self.inner).state = BulkState::Analyzing;
        tracing::info!(session = %self.id, providers = records.len(), "Bulk analysis started");

        // Nothing to score: the service cannot handle an empty batch
        let scored = if records.is_empty() {
            Ok(BulkResult::new(Vec::new(), Vec::new()))
        } else {
            self.client.predict_bulk(&records).await
        };

        match scored {
            Ok(result) => {
                let outcome = BulkOutcome::from_result(result);
                let mut inner = lock(&self.inner);
                inner.state = BulkState::Completed;
                inner.outcome = Some(outcome.clone());
                tracing::info!(session = %self.id, "{}", outcome.result.summary.summary());
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&self, error: RiskError) -> RiskError {
        let mut inner = lock(&self.inner);
        tracing::warn!(session = %self.id, stage = ?inner.state, error = %error, "Bulk analysis failed");
        inner.state = BulkState::Idle;
        inner.error = Some(error.user_message());
        error
    }

    /// Results CSV for the completed analysis
    pub fn export(&self) -> Result<String> {
        let inner = lock(&self.inner);
        match (&inner.state, &inner.outcome) {
            (BulkState::Completed, Some(outcome)) => export_results(&outcome.result),
            (state, _) => Err(RiskError::InvalidState(format!(
                "no completed analysis to export (state {:?})",
                state
            ))),
        }
    }

    pub fn reset(&self) -> Result<()> {
        if self.in_flight.is_set() {
            return Err(RiskError::RequestInFlight);
        }
        let mut inner = lock(&self.inner);
        inner.state = BulkState::Idle;
        inner.outcome = None;
        inner.error = None;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::parser::generate_template;
    use crate::test_support::{closed_port_url, fraud_response, spawn_service};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn client_for(base_url: &str) -> PredictionClient {
        PredictionClient::new(ClientConfig::default().with_base_url(base_url).with_timeout_secs(5)).unwrap()
    }

    fn bulk_body(count: usize) -> Value {
        let results: Vec<Value> = (0..count)
            .map(|i| {
                let prediction = u8::from(i == 0);
                let probability = if i == 0 { 0.9 } else { 0.2 };
                json!({
                    "provider_index": i,
                    "prediction": prediction,
                    "probability": probability,
                    "shap_values": [0.1],
                    "base_value": 0.1
                })
            })
            .collect();
        let fraud = usize::from(count > 0);
        let rate = if count == 0 { 0.0 } else { fraud as f64 / count as f64 };
        json!({
            "results": results,
            "summary": {
                "total_providers": count,
                "fraud_detected": fraud,
                "fraud_rate": rate,
                "average_probability": 0.3
            },
            "feature_names": ["BeneID"]
        })
    }

    #[tokio::test]
    async fn test_live_check_fraud_path() {
        let app = Router::new().route("/predict", post(|| async { Json(fraud_response()) }));
        let session = LiveCheckSession::new(client_for(&spawn_service(app).await));

        assert_eq!(session.state(), LiveCheckState::Idle);
        let outcome = session.submit(&ProviderFeatureRecord::new()).await.unwrap();

        assert_eq!(session.state(), LiveCheckState::Fraud);
        assert_eq!(outcome.bucket, RiskBucket::High);
        assert_eq!(outcome.classification, Classification::Fraud);
        assert_eq!(outcome.factors[0].name, "a");
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_live_check_success_keeps_disagreeing_bucket() {
        let app = Router::new().route(
            "/predict",
            post(|| async {
                Json(json!({
                    "prediction": 0,
                    "probability": 0.75,
                    "shap_values": [0.2],
                    "base_value": 0.1,
                    "feature_names": ["ClaimID"]
                }))
            }),
        );
        let session = LiveCheckSession::new(client_for(&spawn_service(app).await));

        let outcome = session.submit(&ProviderFeatureRecord::new()).await.unwrap();

        assert_eq!(session.state(), LiveCheckState::Success);
        assert_eq!(outcome.classification, Classification::NotFraud);
        assert_eq!(outcome.bucket, RiskBucket::High);
    }

    #[tokio::test]
    async fn test_live_check_failure_returns_to_idle_not_success() {
        let app = Router::new().route(
            "/predict",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let session = LiveCheckSession::new(client_for(&spawn_service(app).await));

        let err = session.submit(&ProviderFeatureRecord::new()).await.unwrap_err();

        assert!(matches!(err, RiskError::RequestFailed { status: 500, .. }));
        assert_eq!(session.state(), LiveCheckState::Idle);
        assert!(session.outcome().is_none());
        assert!(session.last_error().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_live_check_network_failure_allows_resubmit() {
        let session = LiveCheckSession::new(client_for(&closed_port_url().await));

        assert!(matches!(
            session.submit(&ProviderFeatureRecord::new()).await,
            Err(RiskError::Network(_))
        ));
        assert_eq!(session.state(), LiveCheckState::Idle);

        // Flag was released: a second attempt reaches the network again
        assert!(matches!(
            session.submit(&ProviderFeatureRecord::new()).await,
            Err(RiskError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_live_check_rejects_overlapping_submit() {
        let app = Router::new().route(
            "/predict",
            post(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Json(fraud_response())
            }),
        );
        let session = LiveCheckSession::new(client_for(&spawn_service(app).await));
        let record = ProviderFeatureRecord::new();

        let (first, second) = tokio::join!(session.submit(&record), session.submit(&record));

        // Whichever call got the slot first wins; the other never hits the network
        let (won, lost) = if first.is_ok() { (first, second) } else { (second, first) };
        assert!(won.is_ok());
        assert!(matches!(lost, Err(RiskError::RequestInFlight)));
        assert_eq!(session.state(), LiveCheckState::Fraud);
    }

    #[tokio::test]
    async fn test_live_check_submit_requires_reset() {
        let app = Router::new().route("/predict", post(|| async { Json(fraud_response()) }));
        let session = LiveCheckSession::new(client_for(&spawn_service(app).await));

        session.submit(&ProviderFeatureRecord::new()).await.unwrap();
        assert!(matches!(
            session.submit(&ProviderFeatureRecord::new()).await,
            Err(RiskError::InvalidState(_))
        ));

        session.reset().unwrap();
        assert_eq!(session.state(), LiveCheckState::Idle);
        assert!(session.outcome().is_none());
        assert!(session.submit(&ProviderFeatureRecord::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_live_check_reset_refused_while_in_flight() {
        let app = Router::new().route(
            "/predict",
            post(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Json(fraud_response())
            }),
        );
        let session = LiveCheckSession::new(client_for(&spawn_service(app).await));
        let record = ProviderFeatureRecord::new();

        let (submitted, reset) = tokio::join!(session.submit(&record), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.reset()
        });

        assert!(matches!(reset, Err(RiskError::RequestInFlight)));
        assert!(submitted.is_ok());
        assert_eq!(session.state(), LiveCheckState::Fraud);
        assert!(session.outcome().is_some());
    }

    #[tokio::test]
    async fn test_bulk_upload_completes_and_exports() {
        let app = Router::new().route("/bulk", post(|| async { Json(bulk_body(2)) }));
        let session = BulkSession::new(client_for(&spawn_service(app).await));

        let outcome = session.analyze_upload("providers.csv", &generate_template()).await.unwrap();

        assert_eq!(session.state(), BulkState::Completed);
        assert_eq!(outcome.result.summary.total_providers, 2);
        assert_eq!(outcome.distribution.high, 1);
        assert_eq!(outcome.distribution.low, 1);

        let csv = session.export().unwrap();
        assert_eq!(csv.lines().nth(1).unwrap(), "0,Fraud,90.00%,High");

        session.reset().unwrap();
        assert_eq!(session.state(), BulkState::Idle);
        assert!(matches!(session.export(), Err(RiskError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_bulk_rejects_non_csv_upload() {
        let session = BulkSession::new(client_for(&closed_port_url().await));

        let err = session.analyze_upload("claims.pdf", "whatever").await.unwrap_err();

        assert!(matches!(err, RiskError::UnsupportedFileType(_)));
        assert_eq!(session.state(), BulkState::Idle);
        assert!(session.last_error().unwrap().contains("claims.pdf"));
    }

    #[tokio::test]
    async fn test_bulk_request_failure_returns_to_idle() {
        let app = Router::new().route(
            "/bulk",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "bad rows") }),
        );
        let session = BulkSession::new(client_for(&spawn_service(app).await));

        let err = session.analyze_upload("providers.csv", &generate_template()).await.unwrap_err();

        assert!(matches!(err, RiskError::RequestFailed { status: 422, .. }));
        assert_eq!(session.state(), BulkState::Idle);
        assert!(session.outcome().is_none());
    }

    #[tokio::test]
    async fn test_bulk_empty_upload_completes_without_request() {
        // Closed port: any request would fail with Network
        let session = BulkSession::new(client_for(&closed_port_url().await));

        let outcome = session.analyze_upload("empty.csv", "BeneID,ClaimID\n").await.unwrap();

        assert_eq!(session.state(), BulkState::Completed);
        assert_eq!(outcome.result.summary.total_providers, 0);
        assert_eq!(outcome.result.summary.fraud_rate, 0.0);
        assert_eq!(outcome.result.summary.average_probability, 0.0);
        assert_eq!(outcome.distribution.total(), 0);
        assert_eq!(session.export().unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn test_bulk_decode_failure_returns_to_idle() {
        let app = Router::new().route(
            "/bulk",
            post(|| async {
                let mut body = bulk_body(2);
                body["summary"]["total_providers"] = json!(5);
                Json(body)
            }),
        );
        let session = BulkSession::new(client_for(&spawn_service(app).await));

        let err = session.analyze_upload("providers.csv", &generate_template()).await.unwrap_err();

        assert!(matches!(err, RiskError::DecodeFailed(_)));
        assert_eq!(session.state(), BulkState::Idle);
        assert!(session.outcome().is_none());
        assert!(session.last_error().unwrap().contains("unexpected response"));
    }

    #[tokio::test]
    async fn test_bulk_analyze_file_from_disk() {
        let app = Router::new().route("/bulk", post(|| async { Json(bulk_body(2)) }));
        let session = BulkSession::new(client_for(&spawn_service(app).await));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.csv");
        std::fs::write(&path, generate_template()).unwrap();

        let outcome = session.analyze_file(&path).await.unwrap();

        assert_eq!(outcome.result.results.len(), 2);
        assert_eq!(session.state(), BulkState::Completed);
    }
}
