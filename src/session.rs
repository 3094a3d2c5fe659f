use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder};
use url::Url;

use crate::error::Result;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const USER_AGENT: &str = concat!("autoforge/", env!("CARGO_PKG_VERSION"));

/// Wrapper around the configured HTTP client and the service base URL.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    base: Url,
}

/// Minimal data required to build an HTTP session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: String,
    /// Process-wide credential. A missing key is only noticed by the service.
    pub api_key: Option<String>,
    /// `None` leaves requests without a deadline.
    pub timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Option<Duration>) -> Self {
        Self {
            base_url,
            api_key,
            timeout,
        }
    }
}

impl HttpSession {
    /// Build a new HTTP session based on CLI arguments.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref().filter(|key| !key.is_empty()) {
            let mut value = HeaderValue::from_str(key).context("API key is not a valid header")?;
            value.set_sensitive(true);
            default_headers.insert(api_key_header(), value);
        } else {
            tracing::debug!("no API key configured; requests will be unauthenticated");
        }

        let mut builder = ClientBuilder::new()
            .default_headers(default_headers)
            .pool_idle_timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client,
            base: Url::parse(&base).with_context(|| format!("parsing base URL `{base}`"))?,
        })
    }

    /// Returns reference to the inner `reqwest::Client`.
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `generateContent` endpoint for `model`.
    pub fn generate_content_url(&self, model: &str) -> std::result::Result<Url, url::ParseError> {
        self.base
            .join(&format!("v1beta/models/{model}:generateContent"))
    }
}

fn api_key_header() -> HeaderName {
    HeaderName::from_static("x-goog-api-key")
}
