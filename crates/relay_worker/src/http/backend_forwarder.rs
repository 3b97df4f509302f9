use crate::domain::{ForwardError, ObservationForwarder, ObservationRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Request};
use std::time::Duration;
use tracing::{debug, instrument};

/// Header the backend checks to authenticate the worker
pub const WORKER_SECRET_HEADER: &str = "X-WORKER-SECRET";

/// Forwards observation records to the backend's internal ingestion endpoint.
///
/// One `reqwest::Client` is built up front and reused for every delivery
/// and across broker sessions, so connection pooling spans reconnects.
#[derive(Clone)]
pub struct HttpBackendForwarder {
    client: Client,
    endpoint: String,
    secret: String,
}

impl HttpBackendForwarder {
    pub fn new(
        endpoint: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            secret: secret.into(),
        })
    }

    fn build_request(&self, record: &ObservationRecord) -> Result<Request, ForwardError> {
        let body = record
            .to_json()
            .map_err(|e| ForwardError::Build(e.to_string()))?;

        self.client
            .post(self.endpoint.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(WORKER_SECRET_HEADER, self.secret.as_str())
            .body(body)
            .build()
            .map_err(|e| ForwardError::Build(e.to_string()))
    }
}

#[async_trait]
impl ObservationForwarder for HttpBackendForwarder {
    #[instrument(skip(self, record), fields(endpoint = %self.endpoint, timestamp = %record.timestamp))]
    async fn forward(&self, record: &ObservationRecord) -> Result<u16, ForwardError> {
        let request = self.build_request(record)?;

        let response = self.client.execute(request).await.map_err(|e| {
            let kind = if e.is_timeout() { "timed out" } else { "failed" };
            ForwardError::Transport(format!("POST {} {}: {}", self.endpoint, kind, e))
        })?;

        let status = response.status().as_u16();
        debug!(status, "backend responded");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(HeaderMap, Bytes)>>>;

    async fn spawn_backend(status: StatusCode, delay: Duration) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let state = captured.clone();

        let app = Router::new().route(
            "/api/weather/logs",
            post(move |headers: HeaderMap, body: Bytes| {
                let state = state.clone();
                async move {
                    state.lock().unwrap().push((headers, body));
                    tokio::time::sleep(delay).await;
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/api/weather/logs", addr), captured)
    }

    fn record() -> ObservationRecord {
        ObservationRecord {
            temperature: 21.5,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            source: "weather-api".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_posts_json_with_worker_secret() {
        let (endpoint, captured) = spawn_backend(StatusCode::CREATED, Duration::ZERO).await;
        let forwarder =
            HttpBackendForwarder::new(endpoint, "s3cret", Duration::from_secs(10)).unwrap();

        let status = forwarder.forward(&record()).await.unwrap();
        assert_eq!(status, 201);

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        let (headers, body) = &captured[0];
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["x-worker-secret"], "s3cret");

        let sent: ObservationRecord = serde_json::from_slice(body).unwrap();
        assert_eq!(sent, record());
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let (endpoint, _) = spawn_backend(StatusCode::SERVICE_UNAVAILABLE, Duration::ZERO).await;
        let forwarder =
            HttpBackendForwarder::new(endpoint, "s3cret", Duration::from_secs(10)).unwrap();

        assert_eq!(forwarder.forward(&record()).await, Ok(503));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let (endpoint, _) = spawn_backend(StatusCode::OK, Duration::from_secs(5)).await;
        let forwarder =
            HttpBackendForwarder::new(endpoint, "s3cret", Duration::from_millis(100)).unwrap();

        let err = forwarder.forward(&record()).await.unwrap_err();
        assert!(matches!(err, ForwardError::Transport(ref msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let forwarder = HttpBackendForwarder::new(
            format!("http://{}/api/weather/logs", addr),
            "s3cret",
            Duration::from_secs(10),
        )
        .unwrap();

        let err = forwarder.forward(&record()).await.unwrap_err();
        assert!(matches!(err, ForwardError::Transport(_)));
    }

    #[test]
    fn test_malformed_endpoint_is_build_error() {
        let forwarder =
            HttpBackendForwarder::new("not a url", "s3cret", Duration::from_secs(10)).unwrap();

        let err = forwarder.build_request(&record()).unwrap_err();
        assert!(matches!(err, ForwardError::Build(_)));
    }

    #[test]
    fn test_invalid_secret_is_build_error() {
        let forwarder = HttpBackendForwarder::new(
            "http://localhost/api/weather/logs",
            "line\nbreak",
            Duration::from_secs(10),
        )
        .unwrap();

        let err = forwarder.build_request(&record()).unwrap_err();
        assert!(matches!(err, ForwardError::Build(_)));
    }
}
