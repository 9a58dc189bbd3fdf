//! Bearer token sources

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Grant type exchanging an API key for an IAM token
const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Tokens are renewed this long before they expire
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Credentials attached to API requests
#[derive(Clone)]
pub struct Token {
    pub access_token: String,
    /// Sent along with actions the service runs on our behalf
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Check if the token is still usable at `now`, keeping a safety margin
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + chrono::Duration::seconds(EXPIRY_MARGIN_SECS) < expires_at,
            None => true,
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of bearer tokens for the transport
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Token>;
}

/// Fixed token, for pre-authenticated callers and tests
pub struct StaticToken {
    token: Token,
}

impl StaticToken {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            token: Token {
                access_token: access_token.into(),
                refresh_token: refresh_token.into(),
                expires_at: None,
            },
        }
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Token> {
        Ok(self.token.clone())
    }
}

/// IAM token endpoint response
#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expiration: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges an API key for IAM tokens and caches them until they expire
pub struct IamAuthenticator {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    cached: Mutex<Option<Token>>,
}

impl IamAuthenticator {
    /// Create a new authenticator
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            cached: Mutex::new(None),
        })
    }

    async fn request_token(&self) -> Result<Token> {
        debug!("Requesting IAM token from {}", self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", APIKEY_GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("IAM request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "IAM returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: IamTokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Invalid IAM response: {}", e)))?;

        let expires_at = body
            .expiration
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .or_else(|| {
                body.expires_in
                    .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
            });

        info!("Obtained IAM token");
        Ok(Token {
            access_token: body.access_token,
            refresh_token: body.refresh_token.unwrap_or_default(),
            expires_at,
        })
    }
}

#[async_trait]
impl TokenSource for IamAuthenticator {
    async fn token(&self) -> Result<Token> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.clone());
        }

        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
