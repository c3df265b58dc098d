//! Client configuration.

use std::time::Duration;

/// Retry behavior of every remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per call, the first one included. Zero still makes one attempt.
    pub retry_count: u32,
    /// Wait `base_delay * 2^attempt` plus jitter between attempts. When false,
    /// attempts follow each other immediately.
    pub use_exponential_backoff: bool,
    /// Delay before the first retry. Default: 1 second.
    pub base_delay: Duration,
    /// Upper bound of the random delay added to each backoff. Default: 1 second.
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_count: 5,
            use_exponential_backoff: true,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
        }
    }
}

/// Configuration shared by the spreadsheet and drive facades.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub retry: RetryConfig,
    /// Base URL of the spreadsheet API.
    pub sheets_endpoint: String,
    /// Base URL of the file metadata API.
    pub drive_endpoint: String,
    /// Base URL of the file upload API.
    pub upload_endpoint: String,
    /// OAuth2 token endpoint used to refresh access tokens.
    pub token_endpoint: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            sheets_endpoint: "https://sheets.googleapis.com/v4".to_string(),
            drive_endpoint: "https://www.googleapis.com/drive/v3".to_string(),
            upload_endpoint: "https://www.googleapis.com/upload/drive/v3".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

impl ClientConfig {
    /// Point every endpoint at `base`, e.g. a local test server.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            sheets_endpoint: format!("{}/v4", base),
            drive_endpoint: format!("{}/drive/v3", base),
            upload_endpoint: format!("{}/upload/drive/v3", base),
            token_endpoint: format!("{}/token", base),
            ..Default::default()
        }
    }
}
