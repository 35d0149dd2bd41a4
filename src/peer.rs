//! Peer temperature client.
//!
//! Fetches the paired node's `/temp` reading once per tick. Every failure is
//! folded into [`PeerUnreachable`], which the control loop treats as "no peer
//! reading this tick". Nothing is carried between attempts: idle connections
//! are not pooled and there is no retry or backoff.

use crate::config::PeerConfig;
use crate::error::ConfigError;
use crate::sensors::Temperature;
use crate::server::TempResponse;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Why a peer reading was unavailable.
#[derive(Debug, Error)]
pub enum PeerUnreachable {
    #[error("peer did not answer within {0:?}")]
    Timeout(Duration),

    #[error("peer request failed: {0}")]
    Request(String),

    #[error("peer answered with status {0}")]
    Status(u16),

    #[error("peer sent a malformed payload: {0}")]
    Payload(String),
}

/// Something that can report the paired node's temperature.
#[async_trait]
pub trait PeerSource: Send + Sync {
    /// Where the reading comes from, for logs.
    fn endpoint(&self) -> &str;

    async fn fetch_temperature(&self) -> Result<Temperature, PeerUnreachable>;
}

/// HTTP client for another node's status service.
pub struct PeerClient {
    url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new(config: &PeerConfig) -> Result<Self, ConfigError> {
        Self::with_url(config.temp_url(), config.timeout)
    }

    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ConfigError::PeerClient(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            timeout,
            http,
        })
    }

    fn classify(&self, e: reqwest::Error) -> PeerUnreachable {
        if e.is_timeout() {
            PeerUnreachable::Timeout(self.timeout)
        } else if e.is_decode() {
            PeerUnreachable::Payload(e.to_string())
        } else {
            PeerUnreachable::Request(e.to_string())
        }
    }
}

#[async_trait]
impl PeerSource for PeerClient {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn fetch_temperature(&self) -> Result<Temperature, PeerUnreachable> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerUnreachable::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        let body: TempResponse =
            serde_json::from_slice(&bytes).map_err(|e| PeerUnreachable::Payload(e.to_string()))?;

        if !body.temp.celsius().is_finite() {
            return Err(PeerUnreachable::Payload(format!("{}", body.temp.celsius())));
        }

        Ok(body.temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/temp", addr)
    }

    fn client(url: String, timeout: Duration) -> PeerClient {
        PeerClient::with_url(url, timeout).unwrap()
    }

    #[tokio::test]
    async fn test_fetches_peer_temperature() {
        let url = serve(Router::new().route("/temp", get(|| async { r#"{"temp": 61.25}"# }))).await;

        let temp = client(url, Duration::from_secs(2))
            .fetch_temperature()
            .await
            .unwrap();
        assert_eq!(temp.celsius(), 61.25);
    }

    #[tokio::test]
    async fn test_error_status_is_unreachable() {
        let url = serve(Router::new().route(
            "/temp",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "sensor error") }),
        ))
        .await;

        let result = client(url, Duration::from_secs(2)).fetch_temperature().await;
        assert!(matches!(result, Err(PeerUnreachable::Status(500))));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_unreachable() {
        let url =
            serve(Router::new().route("/temp", get(|| async { r#"{"temperature": "hot"}"# }))).await;

        let result = client(url, Duration::from_secs(2)).fetch_temperature().await;
        assert!(matches!(result, Err(PeerUnreachable::Payload(_))));
    }

    #[tokio::test]
    async fn test_slow_peer_times_out() {
        let url = serve(Router::new().route(
            "/temp",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                r#"{"temp": 40.0}"#
            }),
        ))
        .await;

        let result = client(url, Duration::from_millis(100))
            .fetch_temperature()
            .await;
        assert!(matches!(result, Err(PeerUnreachable::Timeout(_))));
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        // Bind then drop to find a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client(format!("http://{}/temp", addr), Duration::from_secs(2))
            .fetch_temperature()
            .await;
        assert!(matches!(result, Err(PeerUnreachable::Request(_))));
    }

    #[tokio::test]
    async fn test_endpoint_from_config() {
        let config = PeerConfig {
            hostname: "pi-b.local".to_string(),
            port: 9768,
            timeout: Duration::from_secs(3),
        };
        let peer = PeerClient::new(&config).unwrap();
        assert_eq!(peer.endpoint(), "http://pi-b.local:9768/temp");
    }
}
