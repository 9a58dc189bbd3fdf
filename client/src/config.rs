//! Client configuration

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Environment variable prefix for every configuration key
const ENV_PREFIX: &str = "SCHEMATICS";

/// Conventional environment variable holding the IBM Cloud API key
const API_KEY_ENV: &str = "IC_API_KEY";

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Schematics API
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// API version path segment
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// IAM endpoint exchanging the API key for bearer tokens
    #[serde(default = "default_iam_endpoint")]
    pub iam_endpoint: String,

    /// API key. Falls back to `IC_API_KEY` when not set
    #[serde(default)]
    pub api_key: Option<String>,

    /// User-Agent header sent on every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Connect timeout and IAM token request timeout, in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    /// Create workspace timeout in seconds
    #[serde(default = "default_call_timeout")]
    pub create_timeout: u64,

    /// List workspaces, version and list activities timeout in seconds
    #[serde(default = "default_call_timeout")]
    pub list_timeout: u64,

    /// Delete workspace timeout in seconds
    #[serde(default = "default_call_timeout")]
    pub delete_timeout: u64,

    /// Code upload timeout in seconds
    #[serde(default = "default_call_timeout")]
    pub upload_timeout: u64,

    /// Plan/apply/destroy trigger, outputs and workspace refresh timeout in seconds
    #[serde(default = "default_call_timeout")]
    pub action_timeout: u64,

    /// Single activity refresh timeout in seconds
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout: u64,

    /// First delay between activity polls, in milliseconds
    #[serde(default = "default_poll_initial_ms")]
    pub poll_initial_ms: u64,

    /// Upper bound of the delay between activity polls, in milliseconds
    #[serde(default = "default_poll_max_ms")]
    pub poll_max_ms: u64,

    /// Overall deadline of one activity wait in seconds (0 = no deadline)
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout: u64,

    /// Template type used for new workspaces
    #[serde(default = "default_template_type")]
    pub template_type: String,

    /// Log format of the runner: "text" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_api_endpoint() -> String {
    "https://schematics.cloud.ibm.com".to_string()
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_iam_endpoint() -> String {
    "https://iam.cloud.ibm.com/identity/token".to_string()
}

fn default_user_agent() -> String {
    format!("schematics-client/{}", env!("CARGO_PKG_VERSION"))
}

fn default_http_timeout() -> u64 {
    20
}

fn default_call_timeout() -> u64 {
    50
}

fn default_refresh_timeout() -> u64 {
    30
}

fn default_poll_initial_ms() -> u64 {
    2_000
}

fn default_poll_max_ms() -> u64 {
    30_000
}

fn default_wait_timeout() -> u64 {
    3600 // 1 hour
}

fn default_template_type() -> String {
    "terraform_v0.13".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Per-call deadlines handed to the API layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub list: Duration,
    pub delete: Duration,
    pub upload: Duration,
    pub action: Duration,
    pub refresh: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Config::default().timeouts()
    }
}

impl Config {
    /// Load configuration from `SCHEMATICS_*` environment variables
    pub fn load() -> Result<Self> {
        let mut config: Config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        if config.api_key.as_deref().map_or(true, str::is_empty) {
            config.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the client misbehave
    pub fn validate(&self) -> Result<()> {
        if self.poll_initial_ms == 0 {
            return Err(Error::Config(
                "poll_initial_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The API key, or a usage error when none was configured
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(Error::MissingApiKey)
    }

    /// Base URL including the API version, without a trailing slash
    pub fn api_base_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_endpoint.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }

    /// Per-call deadlines
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            create: Duration::from_secs(self.create_timeout),
            list: Duration::from_secs(self.list_timeout),
            delete: Duration::from_secs(self.delete_timeout),
            upload: Duration::from_secs(self.upload_timeout),
            action: Duration::from_secs(self.action_timeout),
            refresh: Duration::from_secs(self.refresh_timeout),
        }
    }

    /// Overall activity wait deadline, `None` when disabled
    pub fn wait_deadline(&self) -> Option<Duration> {
        (self.wait_timeout > 0).then(|| Duration::from_secs(self.wait_timeout))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            api_version: default_api_version(),
            iam_endpoint: default_iam_endpoint(),
            api_key: None,
            user_agent: default_user_agent(),
            http_timeout: default_http_timeout(),
            create_timeout: default_call_timeout(),
            list_timeout: default_call_timeout(),
            delete_timeout: default_call_timeout(),
            upload_timeout: default_call_timeout(),
            action_timeout: default_call_timeout(),
            refresh_timeout: default_refresh_timeout(),
            poll_initial_ms: default_poll_initial_ms(),
            poll_max_ms: default_poll_max_ms(),
            wait_timeout: default_wait_timeout(),
            template_type: default_template_type(),
            log_format: default_log_format(),
        }
    }
}
