//! Access-token sources.
//!
//! Every remote call carries a bearer token obtained from a [`TokenSource`].
//! Two sources exist: a fixed token and an OAuth2 token file that is
//! refreshed through the refresh-token grant when it expires.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// File names looked up by [`AuthOption::from_dir`]
pub const TOKEN_FILE: &str = "token.json";
pub const CLIENT_SECRET_FILE: &str = "client-secret.json";

/// Tokens closer than this to their expiry are refreshed
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Something that can produce a bearer token for the next request.
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    async fn access_token(&self) -> Result<String>;
}

/// A token supplied by the caller, used as is.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// How the client authenticates.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOption {
    /// Bearer token obtained elsewhere
    AccessToken(String),
    /// Stored OAuth2 credentials
    OAuth2 {
        token_json_file: PathBuf,
        client_secret_json_file: PathBuf,
    },
}

impl AuthOption {
    /// OAuth2 credentials stored as `token.json` and `client-secret.json` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        AuthOption::OAuth2 {
            token_json_file: dir.join(TOKEN_FILE),
            client_secret_json_file: dir.join(CLIENT_SECRET_FILE),
        }
    }

    /// Pick a token over a credentials directory; fail when neither is given.
    pub fn from_parts(token: Option<String>, oauth_dir: Option<PathBuf>) -> Result<Self> {
        match (token, oauth_dir) {
            (Some(token), _) => Ok(AuthOption::AccessToken(token)),
            (None, Some(dir)) => Ok(AuthOption::from_dir(dir)),
            (None, None) => Err(Error::Auth(
                "Please set up some authentication information".to_string(),
            )),
        }
    }

    /// Build the token source this option describes.
    pub fn into_token_source(
        self,
        client: reqwest::Client,
        config: &ClientConfig,
    ) -> Result<Arc<dyn TokenSource>> {
        match self {
            AuthOption::AccessToken(token) => Ok(Arc::new(StaticToken::new(token))),
            AuthOption::OAuth2 {
                token_json_file,
                client_secret_json_file,
            } => {
                let source = OAuth2TokenFile::load(
                    client,
                    &config.token_endpoint,
                    &token_json_file,
                    &client_secret_json_file,
                )?;
                Ok(Arc::new(source))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
}

/// `client-secret.json` either holds the secret directly or nests it under
/// the application type.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClientSecretFile {
    Installed { installed: ClientSecret },
    Web { web: ClientSecret },
    Flat(ClientSecret),
}

impl ClientSecretFile {
    fn into_secret(self) -> ClientSecret {
        match self {
            ClientSecretFile::Installed { installed } => installed,
            ClientSecretFile::Web { web } => web,
            ClientSecretFile::Flat(secret) => secret,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StoredToken {
    access_token: Option<String>,
    refresh_token: Option<String>,
    /// Milliseconds since the Unix epoch
    expiry_date: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<SystemTime>,
}

impl CachedToken {
    fn is_fresh(&self, now: SystemTime) -> bool {
        match self.expires_at {
            Some(expires_at) => now + EXPIRY_MARGIN < expires_at,
            None => true,
        }
    }
}

/// OAuth2 credentials read from a token file and a client secret file.
///
/// The access token is kept in memory and refreshed when it is about to
/// expire. Refreshed tokens are not written back to disk.
pub struct OAuth2TokenFile {
    client: reqwest::Client,
    token_endpoint: String,
    secret: ClientSecret,
    refresh_token: Option<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for OAuth2TokenFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2TokenFile")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.secret.client_id)
            .finish_non_exhaustive()
    }
}

impl OAuth2TokenFile {
    /// Read both credential files.
    pub fn load(
        client: reqwest::Client,
        token_endpoint: &str,
        token_json_file: &Path,
        client_secret_json_file: &Path,
    ) -> Result<Self> {
        let token: StoredToken = read_json(token_json_file)?;
        let secret: ClientSecretFile = read_json(client_secret_json_file)?;

        let cached = token.access_token.map(|access_token| CachedToken {
            access_token,
            expires_at: token
                .expiry_date
                .map(|ms| UNIX_EPOCH + Duration::from_millis(ms)),
        });

        if cached.is_none() && token.refresh_token.is_none() {
            return Err(Error::Auth(format!(
                "{} holds neither an access token nor a refresh token",
                token_json_file.display()
            )));
        }

        Ok(Self {
            client,
            token_endpoint: token_endpoint.to_string(),
            secret: secret.into_secret(),
            refresh_token: token.refresh_token,
            cached: Mutex::new(cached),
        })
    }

    async fn refresh(&self) -> Result<CachedToken> {
        let refresh_token = self.refresh_token.as_deref().ok_or_else(|| {
            Error::Auth("access token expired and no refresh token is stored".to_string())
        })?;

        tracing::debug!(endpoint = %self.token_endpoint, "Refreshing access token");
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "token refresh failed with status {}: {}",
                status.as_u16(),
                message
            )));
        }

        let body: RefreshResponse = response.json().await?;
        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: body
                .expires_in
                .map(|secs| SystemTime::now() + Duration::from_secs(secs)),
        })
    }
}

#[async_trait]
impl TokenSource for OAuth2TokenFile {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(SystemTime::now()) {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.refresh().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::Auth(format!("cannot read {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&text)?)
}
