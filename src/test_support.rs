// 🧪 In-process stand-in for the scoring service (unit tests only)

use axum::Router;
use serde_json::{json, Value};

/// Serve `app` on an ephemeral localhost port and return its base URL
pub async fn spawn_service(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL of a port nothing listens on
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn fraud_response() -> Value {
    json!({
        "prediction": 1,
        "probability": 0.85,
        "shap_values": [0.5, -0.3],
        "base_value": 0.1,
        "feature_names": ["a", "b"]
    })
}
