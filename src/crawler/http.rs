//! HTTP client seam
//!
//! This module handles the plumbing every crawler request goes through:
//! - Building the reqwest client with a proper user agent string
//! - The [`HttpClient`] trait the fetcher, document and signal clients share
//! - Buffered [`HttpResponse`] values that can be cached and cloned

use crate::config::{EndpointConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Proxy, Request, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// A fully buffered HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(url: impl Into<String>, status: StatusCode) -> Self {
        Self {
            url: url.into(),
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Reads a reqwest response to the end
    pub async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let url = response.url().to_string();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(Self {
            url,
            status,
            headers,
            body,
        })
    }

    /// Returns a header value if present and valid ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Anything that can perform one HTTP exchange
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: Request) -> Result<HttpResponse, reqwest::Error>;
}

#[async_trait]
impl HttpClient for Client {
    async fn send(&self, request: Request) -> Result<HttpResponse, reqwest::Error> {
        let response = self.execute(request).await?;
        HttpResponse::read(response).await
    }
}

/// Builds a bare GET request
pub fn get_request(url: &str) -> Result<Request, url::ParseError> {
    Ok(Request::new(Method::GET, Url::parse(url)?))
}

/// Formats the crawler user agent: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `endpoints` - Proxy and certificate settings
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (e.g. invalid proxy URL)
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    endpoints: &EndpointConfig,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent_string(user_agent))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .danger_accept_invalid_certs(endpoints.accept_invalid_certs);

    if let Some(proxy) = endpoints.proxy.as_deref().filter(|p| !p.is_empty()) {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}
