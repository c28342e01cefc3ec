use std::time::Duration;

use crate::errors::ClientError;

/// Environment variable holding the backend base URL.
pub const API_URL_ENV: &str = "RAGKB_API_URL";
/// Environment variable overriding the request timeout, in seconds.
pub const TIMEOUT_SECS_ENV: &str = "RAGKB_TIMEOUT_SECS";
/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Configuration for `RagClient`.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the backend API, including any path prefix such as `/api/v1`.
    pub base_url: String,
    /// Timeout for non-streaming requests (health, upload, delete, query).
    ///
    /// Streaming queries are not bounded by it.
    pub request_timeout: Duration,
    /// Timeout for establishing a connection, applied to every request.
    pub connect_timeout: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    /// Creates a config for the given base URL with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("ragkb-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Builds a config from `RAGKB_API_URL` and `RAGKB_TIMEOUT_SECS`.
    ///
    /// Unset variables fall back to defaults and trailing slashes on the URL
    /// are dropped. A timeout that is not a positive integer is a config error.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ClientError> {
        let base_url = lookup(API_URL_ENV)
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);
        if let Some(raw) = lookup(TIMEOUT_SECS_ENV).filter(|v| !v.trim().is_empty()) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    ClientError::Config(format!(
                        "{TIMEOUT_SECS_ENV} must be a positive integer, got {raw:?}"
                    ))
                })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the non-streaming request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must start with http:// or https://, got {base:?}"
            )));
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn health_url(&self) -> String {
        self.endpoint("health")
    }

    pub(crate) fn upload_url(&self) -> String {
        self.endpoint("documents/upload")
    }

    pub(crate) fn document_url(&self, document_id: &str) -> String {
        self.endpoint(&format!("documents/{}", urlencoding::encode(document_id)))
    }

    pub(crate) fn query_url(&self) -> String {
        self.endpoint("query")
    }

    pub(crate) fn query_stream_url(&self) -> String {
        self.endpoint("query/stream")
    }
}
