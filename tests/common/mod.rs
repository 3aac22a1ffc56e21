// Shared helpers for integration tests (stand-in scoring service)

use axum::Router;
use provider_risk::{ClientConfig, PredictionClient};

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

pub fn client(base_url: &str) -> PredictionClient {
    PredictionClient::new(ClientConfig::default().with_base_url(base_url).with_timeout_secs(5)).unwrap()
}
