//! HTTP client for ballot page retrieval.

mod user_agent;

pub use user_agent::{random_user_agent, resolve_user_agent, IMPERSONATE, IMPERSONATE_USER_AGENTS};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::Settings;
use crate::services::{FetchError, PageSource};

/// HTTP client presenting a browser user agent, with a fixed delay after
/// every request.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    request_delay: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(timeout: Duration, request_delay: Duration) -> Result<Self, FetchError> {
        Self::with_user_agent(timeout, request_delay, None)
    }

    /// Create a new HTTP client with custom user agent configuration.
    /// - None or Some("impersonate"): Use random real browser user agent
    /// - Some(custom): Use custom user agent string
    pub fn with_user_agent(
        timeout: Duration,
        request_delay: Duration,
        user_agent_config: Option<&str>,
    ) -> Result<Self, FetchError> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            request_delay,
        })
    }

    /// Create a client from application settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        Self::with_user_agent(
            Duration::from_secs(settings.request_timeout),
            Duration::from_millis(settings.request_delay_ms),
            Some(&settings.user_agent),
        )
    }

    /// Get page content as text. Non-success statuses are errors.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!(
            "GET {} -> {} in {}ms",
            url,
            status.as_u16(),
            start.elapsed().as_millis()
        );

        let result = if status.is_success() {
            response.text().await.map_err(FetchError::from)
        } else {
            Err(FetchError::Status(status.as_u16()))
        };

        // Apply base delay
        tokio::time::sleep(self.request_delay).await;

        result
    }
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.get_text(url).await
    }
}
