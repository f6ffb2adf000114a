//! Negative-caching HTTP fetcher
//!
//! Thousands of packages often share one upstream host, and a broken endpoint
//! on that host tends to answer every request with HTTP 500. The
//! [`ResilientFetcher`] remembers each GET URL that produced a 500 and answers
//! later requests for it from memory with an empty body, so a doomed URL is
//! only ever requested once per process.

use crate::crawler::http::{HttpClient, HttpResponse};
use async_trait::async_trait;
use reqwest::{Method, Request, StatusCode};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// HTTP client wrapper with a per-URL negative cache of 500 responses
pub struct ResilientFetcher<C> {
    bad_urls: RwLock<HashMap<String, HttpResponse>>,
    client: C,
}

impl<C: HttpClient> ResilientFetcher<C> {
    pub fn new(client: C) -> Self {
        Self {
            bad_urls: RwLock::new(HashMap::new()),
            client,
        }
    }

    /// The wrapped client
    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Number of URLs currently known to fail with 500
    pub fn blacklisted(&self) -> usize {
        self.bad_urls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn cached(&self, url: &str) -> Option<HttpResponse> {
        self.bad_urls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    fn remember(&self, url: String, response: &HttpResponse) {
        let entry = HttpResponse {
            body: Vec::new(),
            ..response.clone()
        };
        self.bad_urls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url, entry);
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ResilientFetcher<C> {
    async fn send(&self, request: Request) -> Result<HttpResponse, reqwest::Error> {
        if *request.method() != Method::GET {
            return self.client.send(request).await;
        }

        let url = request.url().to_string();
        tracing::trace!("GET {}", url);

        if let Some(response) = self.cached(&url) {
            tracing::debug!("{} found in 500 blacklist, returning cached response", url);
            return Ok(response);
        }

        let response = self.client.send(request).await?;
        if response.status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::info!("Putting {} into 500 blacklist", url);
            self.remember(url, &response);
        }

        Ok(response)
    }
}
