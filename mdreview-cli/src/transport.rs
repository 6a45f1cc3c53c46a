//! Outbound delivery of the review payload

use std::time::Duration;

use anyhow::{Context, Result};
use mdreview_core::{ReviewError, Transport};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

/// Posts the payload as JSON to the collaborator's endpoint
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn deliver(&self, body: &str) -> mdreview_core::Result<()> {
        debug!(endpoint = %self.endpoint, bytes = body.len(), "posting review payload");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .map_err(|e| ReviewError::SubmissionTransportFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReviewError::SubmissionTransportFailure(format!(
                "{} responded with {}",
                self.endpoint, status
            )));
        }
        Ok(())
    }
}

/// Used with `--no-submit`: nothing leaves the process
pub struct LocalOnly;

impl Transport for LocalOnly {
    fn deliver(&self, body: &str) -> mdreview_core::Result<()> {
        info!(bytes = body.len(), "submission disabled, payload kept local");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{mpsc, Arc, Mutex};

    use axum::{http::StatusCode, routing::post, Json, Router};
    use mdreview_core::{SegmentationMode, Session, Target};
    use serde_json::Value;

    type Received = Arc<Mutex<Vec<Value>>>;

    /// Start a receiver on an ephemeral port in its own runtime
    fn spawn_receiver(status: StatusCode) -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let state = received.clone();
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();

                let app = Router::new().route(
                    "/submit",
                    post(move |Json(body): Json<Value>| {
                        let state = state.clone();
                        async move {
                            state.lock().unwrap().push(body);
                            status
                        }
                    }),
                );
                axum::serve(listener, app).await.unwrap();
            });
        });

        let addr = rx.recv().unwrap();
        (format!("http://{}/submit", addr), received)
    }

    #[test]
    fn test_posts_submitted_payload() {
        let (url, received) = spawn_receiver(StatusCode::OK);
        let transport = HttpTransport::new(url, Duration::from_secs(5)).unwrap();

        let mut session = Session::new("t", "# A\n\nB", SegmentationMode::Block);
        session.toggle_approval("block-1").unwrap();
        session.set_comment(&Target::unit("block-1"), "drop it").unwrap();
        let mut outbox = session.submit().unwrap();
        outbox.send(&transport).unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let payload = &received[0];
        assert_eq!(payload["status"], "submitted");
        assert_eq!(payload["items"][1]["checked"], false);
        assert_eq!(payload["items"][1]["comment"], "drop it");
    }

    #[test]
    fn test_error_status_is_transport_failure() {
        let (url, received) = spawn_receiver(StatusCode::INTERNAL_SERVER_ERROR);
        let transport = HttpTransport::new(url, Duration::from_secs(5)).unwrap();

        let err = transport.deliver(r#"{"status":"cancelled","items":[]}"#).unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("500"));
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_failure() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let transport =
            HttpTransport::new(format!("http://127.0.0.1:{}/submit", port), Duration::from_secs(2))
                .unwrap();

        let err = transport.deliver("{}").unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_local_only_always_succeeds() {
        assert!(LocalOnly.deliver("{}").is_ok());
    }
}
