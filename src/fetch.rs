//! Outbound HTTP to bilibili: header bundles and the shared [`Fetcher`].

use crate::config::UpstreamConfig;
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER, USER_AGENT};
use reqwest::{Client, Response, Url};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Headers attached to every outbound request made on behalf of a client.
#[derive(Clone, PartialEq, Eq)]
pub struct HeaderBundle {
    /// Session cookie forwarded from the browser, if any.
    pub cookie: Option<String>,
    pub referer: String,
    pub user_agent: String,
}

impl HeaderBundle {
    /// Build a bundle from the inbound request's values, falling back to the
    /// configured defaults.
    pub fn new(cookie: Option<&str>, user_agent: Option<&str>, upstream: &UpstreamConfig) -> Self {
        let user_agent = user_agent
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .unwrap_or(&upstream.user_agent);

        Self {
            cookie: cookie.filter(|c| !c.is_empty()).map(str::to_string),
            referer: upstream.referer.clone(),
            user_agent: user_agent.to_string(),
        }
    }

    /// Convert into a reqwest header map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a value contains characters that
    /// are not allowed in an HTTP header.
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, header_value("referer", &self.referer)?);
        headers.insert(USER_AGENT, header_value("user-agent", &self.user_agent)?);
        if let Some(ref cookie) = self.cookie {
            let mut value = header_value("cookie", cookie)?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }
        Ok(headers)
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| Error::invalid(format!("{} is not a valid header value", name)))
}

// Keeps the cookie out of logs.
impl fmt::Debug for HeaderBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderBundle")
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .field("referer", &self.referer)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Render a URL for logs and error messages: scheme, host and path only.
///
/// CDN URLs carry signed tokens in the query string.
pub fn display_url(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.set_fragment(None);
    let _ = shown.set_password(None);
    let _ = shown.set_username("");
    shown.to_string()
}

/// Parse an absolute http(s) URL supplied by a caller.
pub fn parse_source_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::invalid(format!("invalid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::invalid(format!("unsupported URL scheme: {}", other))),
    }
}

/// Thin wrapper over a shared [`reqwest::Client`].
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Create a fetcher. `connect_timeout` bounds connection setup only;
    /// whole-request timeouts are applied per call.
    pub fn new(connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self { client }
    }

    /// GET `url` with query `params` and return the JSON body's `data` field.
    ///
    /// A successful response without `data` yields an empty object.
    pub async fn get_data<P: Serialize + ?Sized>(
        &self,
        url: &str,
        params: &P,
        headers: &HeaderBundle,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let parsed = Url::parse(url).map_err(|e| Error::upstream(url, e.to_string()))?;
        let shown = display_url(&parsed);

        let response = self
            .client
            .get(parsed)
            .query(params)
            .headers(headers.to_header_map()?)
            .timeout(timeout)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| {
                tracing::error!("Request failed: {} - URL: {} - Headers: {:?}", e, shown, headers);
                Error::upstream(&shown, e.without_url().to_string())
            })?;

        let mut body: serde_json::Value = response.json().await.map_err(|e| {
            tracing::error!("Invalid JSON from {}: {}", shown, e);
            Error::upstream(&shown, format!("invalid JSON body: {}", e.without_url()))
        })?;

        Ok(body
            .get_mut("data")
            .map(serde_json::Value::take)
            .unwrap_or_else(|| serde_json::json!({})))
    }

    /// Start a streaming GET of `url`.
    ///
    /// The returned response has a success status; the body has not been read.
    pub async fn get_stream(&self, url: &Url, headers: &HeaderBundle) -> Result<Response> {
        let shown = display_url(url);

        self.client
            .get(url.clone())
            .headers(headers.to_header_map()?)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| Error::download(shown, e.without_url().to_string()))
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}
