// HTTP transport
//
// Executes one logical API call against the fixed base URL, reusing the
// session cookie jar, classifying the response status and retrying
// retryable failures with a linear backoff.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, snippet};
use crate::query_log::QueryLog;
use crate::request::ApiRequest;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://smart.vaillant.com/mobile/api/v4";

/// Retry budget for retryable failures (5xx, 429, network errors).
///
/// After the n-th failure (n starting at 1) the transport waits
/// `n * backoff_step` before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_step * retry
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).unwrap_or_else(|_| unreachable!()),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` bound to the given cookie jar.
    fn build_client(&self, jar: Arc<Jar>) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("vrc9xx/", env!("CARGO_PKG_VERSION")))
            .cookie_provider(jar)
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }
}

/// One HTTP session: a client, its cookie jar and the retry policy.
///
/// Dropping a `Transport` drops its cookies; the session manager builds a
/// fresh one whenever a forced login is needed.
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
    cookie_jar: Arc<Jar>,
    retry: RetryPolicy,
    query_log: Option<Arc<QueryLog>>,
}

impl Transport {
    /// Create a transport with an empty cookie jar.
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        let cookie_jar = Arc::new(Jar::default());
        let http = config.build_client(Arc::clone(&cookie_jar))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            cookie_jar,
            retry: config.retry,
            query_log: None,
        })
    }

    /// Attach a query log that receives every authenticated exchange.
    pub fn with_query_log(mut self, log: Option<Arc<QueryLog>>) -> Self {
        self.query_log = log;
        self
    }

    /// The session cookie jar.
    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.cookie_jar
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL for an API path: `{base}{path}`.
    ///
    /// `Url::join` would discard the base path (`/mobile/api/v4`), so the
    /// path is appended textually.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    /// Execute a request, retrying retryable failures.
    ///
    /// Returns the decoded JSON body (JSON `null` for an empty body).
    pub async fn execute(&self, request: &ApiRequest) -> Result<Value, Error> {
        debug!(
            method = ?request.method,
            path = %request.path,
            "[{}]",
            request.description
        );

        let mut retry = 0;
        loop {
            match self.send_once(request).await {
                Ok(body) => {
                    if let Some(log) = &self.query_log {
                        log.record(request, &body).await;
                    }
                    return Ok(body);
                }
                Err(e) if e.is_transient() => {
                    if retry >= self.retry.max_retries {
                        return Err(Error::TooManyRetries {
                            description: request.description.to_owned(),
                            attempts: retry + 1,
                            last: Box::new(e),
                        });
                    }
                    retry += 1;
                    let delay = self.retry.delay_for(retry);
                    warn!(
                        error = %e,
                        retry,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "[{}] retrying",
                        request.description
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    debug!(error = %e, "[{}] failed", request.description);
                    return Err(e);
                }
            }
        }
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<Value, Error> {
        let url = self.url(&request.path)?;
        let mut builder = self
            .http
            .request(request.method.into(), url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        trace!(%status, body = %snippet(&text), "response");

        if !status.is_success() {
            return Err(Error::from_status(status, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", snippet(&text)),
            body: text,
        })
    }
}
