//! HTTP transport to the Schematics API
//!
//! The transport sends one request and hands back the raw status and body.
//! Status interpretation belongs to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};
use crate::infra::auth::TokenSource;

/// Header the service expects the IAM refresh token in
pub const REFRESH_TOKEN_HEADER: &str = "refresh_token";

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    /// Single file part of a multipart form
    Multipart {
        field: String,
        file_name: String,
        content: Vec<u8>,
    },
}

/// One request to the API, relative to the versioned base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    /// Attach the IAM refresh token
    pub with_refresh_token: bool,
    /// Deadline of this call
    pub timeout: Duration,
    /// What the call does, e.g. "create the workspace"
    pub operation: &'static str,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, operation: &'static str) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            with_refresh_token: false,
            timeout: Duration::from_secs(50),
            operation,
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn file(mut self, field: &str, file_name: &str, content: Vec<u8>) -> Self {
        self.body = RequestBody::Multipart {
            field: field.to_string(),
            file_name: file_name.to_string(),
            content,
        };
        self
    }

    pub fn refresh_token(mut self) -> Self {
        self.with_refresh_token = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Raw response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Error::from)
    }
}

/// Sends requests to the API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport with bearer authentication
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
    tokens: Arc<dyn TokenSource>,
}

impl HttpTransport {
    /// Create a new transport. `connect_timeout` bounds connection setup,
    /// each request carries its own overall timeout.
    pub fn new(
        base_url: &str,
        user_agent: &str,
        connect_timeout: Duration,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let token = self.tokens.token().await?;
        let url = self.url(&request.path);

        debug!("{:?} {}", request.method, url);

        let mut builder = self
            .http
            .request(request.method.as_reqwest(), &url)
            .timeout(request.timeout)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .bearer_auth(&token.access_token);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if request.with_refresh_token {
            builder = builder.header(REFRESH_TOKEN_HEADER, &token.refresh_token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(&value)?),
            RequestBody::Multipart {
                field,
                file_name,
                content,
            } => builder.multipart(Form::new().part(field, Part::bytes(content).file_name(file_name))),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    operation: request.operation.to_string(),
                }
            } else {
                Error::Transport(format!("failed to {}: {}", request.operation, e))
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;

        debug!("{} responded {} ({} bytes)", url, status, body.len());
        Ok(ApiResponse { status, body })
    }
}
