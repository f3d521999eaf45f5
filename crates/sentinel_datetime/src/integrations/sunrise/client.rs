use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use tracing::warn;

use super::response::SunriseResponse;
use crate::config::LocationConfig;
use crate::config::SunriseConfig;

#[derive(Debug, thiserror::Error)]
pub enum SunriseError {
    #[error("sunrise request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("sunrise service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed sunrise response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Trait for sunrise/sunset lookups
///
/// This trait allows for mocking the remote service for testing purposes
#[async_trait]
pub trait SunriseClient: Send + Sync {
    /// Fetch today's sunrise and sunset for `location`
    async fn fetch(&self, location: &LocationConfig) -> Result<SunriseResponse, SunriseError>;
}

/// Real client backed by a single keep-alive `reqwest::Client`
pub struct HttpSunriseClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSunriseClient {
    pub fn new(config: &SunriseConfig) -> Result<Self, SunriseError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .pool_idle_timeout(None)
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    fn url(&self, location: &LocationConfig) -> String {
        format!(
            "{}?lat={}&lng={}&formatted=0",
            self.base_url, location.latitude, location.longitude
        )
    }
}

#[async_trait]
impl SunriseClient for HttpSunriseClient {
    async fn fetch(&self, location: &LocationConfig) -> Result<SunriseResponse, SunriseError> {
        let url = self.url(location);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            warn!("Sunrise service returned {}: {}", status, body);
            return Err(SunriseError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Scripted client for tests
///
/// Clones share the response queue and the call counter.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MockSunriseClient {
    responses: std::sync::Arc<
        std::sync::Mutex<std::collections::VecDeque<Result<SunriseResponse, SunriseError>>>,
    >,
    calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl MockSunriseClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response with the given RFC 3339 instants
    pub fn push_times(&self, sunrise: &str, sunset: &str) {
        let body = serde_json::json!({
            "results": { "sunrise": sunrise, "sunset": sunset },
            "status": "OK",
        });
        let response = serde_json::from_value(body).expect("valid sunrise fixture");
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_response(&self, response: Result<SunriseResponse, SunriseError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SunriseClient for MockSunriseClient {
    async fn fetch(&self, _location: &LocationConfig) -> Result<SunriseResponse, SunriseError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(SunriseError::Status {
                status: 503,
                body: "no scripted response".to_string(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::Json;
    use axum::Router;

    use super::*;

    const OSLO: LocationConfig = LocationConfig {
        latitude: 59.91,
        longitude: 10.75,
    };

    /// Serve `router` on an ephemeral port, returning the `/json` endpoint URL
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/json", addr)
    }

    fn client_for(url: String) -> HttpSunriseClient {
        HttpSunriseClient::new(&SunriseConfig {
            url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_location_and_parses_results() {
        let router = Router::new().route(
            "/json",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                // Echo the query back through the status field
                let status = format!(
                    "{}|{}|{}",
                    params["lat"], params["lng"], params["formatted"]
                );
                Json(serde_json::json!({
                    "results": {
                        "sunrise": "2024-06-21T01:53:12+00:00",
                        "sunset": "2024-06-21T20:44:40+00:00",
                    },
                    "status": status,
                }))
            }),
        );
        let client = client_for(serve(router).await);

        let response = client.fetch(&OSLO).await.unwrap();
        assert_eq!(response.status.as_deref(), Some("59.91|10.75|0"));
        let times = response.results.unwrap();
        assert_eq!(times.sunrise.at().to_rfc3339(), "2024-06-21T01:53:12+00:00");
    }

    #[tokio::test]
    async fn test_non_200_is_an_error() {
        let router = Router::new().route(
            "/json",
            get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let client = client_for(serve(router).await);

        match client.fetch(&OSLO).await {
            Err(SunriseError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_an_error() {
        let router = Router::new().route("/json", get(|| async { "<html>maintenance</html>" }));
        let client = client_for(serve(router).await);

        assert!(matches!(
            client.fetch(&OSLO).await,
            Err(SunriseError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_request_has_no_results() {
        let router = Router::new().route(
            "/json",
            get(|| async {
                Json(serde_json::json!({ "results": "", "status": "INVALID_REQUEST" }))
            }),
        );
        let client = client_for(serve(router).await);

        let response = client.fetch(&OSLO).await.unwrap();
        assert!(response.results.is_none());
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let router = Router::new().route(
            "/json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({ "results": "", "status": "OK" }))
            }),
        );
        let client = HttpSunriseClient::new(&SunriseConfig {
            url: serve(router).await,
            timeout_secs: 1,
        })
        .unwrap();

        let started = std::time::Instant::now();
        match client.fetch(&OSLO).await {
            Err(SunriseError::Request(e)) => assert!(e.is_timeout(), "{}", e),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}/json", addr));
        assert!(matches!(
            client.fetch(&OSLO).await,
            Err(SunriseError::Request(_))
        ));
    }

    #[test]
    fn test_url_format() {
        let client = client_for("https://api.sunrise-sunset.org/json".to_string());
        assert_eq!(
            client.url(&OSLO),
            "https://api.sunrise-sunset.org/json?lat=59.91&lng=10.75&formatted=0"
        );
    }
}
