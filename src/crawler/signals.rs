//! Social popularity signals
//!
//! When a document source cannot tell how popular a package is, the crawler
//! asks two independent social counters about the project URL and fuses the
//! answers with [`fuse_stars`].

use crate::crawler::http::HttpClient;
use crate::model::UNKNOWN_STARS;
use crate::SearchError;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Body, Method, Request};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

/// Fuses two star counts from sources with overlapping audiences
///
/// With `a <= b`: if `a` is at most a third of `b` the overlap is taken to be
/// negligible and `b` alone is returned. Otherwise roughly half of each
/// audience is assumed shared, and the result is `(a + b) * 3 / 4`, saturating
/// at `i32::MAX`.
///
/// This is a tuned heuristic rather than a derived estimator. Negative
/// inputs mean "unknown"; one unknown side yields the other side, two
/// unknown sides yield an unknown result.
///
/// ```
/// use pkgsearch::crawler::fuse_stars;
///
/// assert_eq!(fuse_stars(10, 100), 100);
/// assert_eq!(fuse_stars(40, 50), 67);
/// assert_eq!(fuse_stars(50, 40), 67);
/// ```
pub fn fuse_stars(a: i32, b: i32) -> i32 {
    let (a, b) = if a > b { (b, a) } else { (a, b) };

    if a <= b / 3 {
        return b;
    }

    // Sums of two huge counts saturate instead of wrapping negative
    i32::try_from((a as i64 + b as i64) * 3 / 4).unwrap_or(i32::MAX)
}

/// Endpoints of the two social counters
#[derive(Debug, Clone)]
pub struct SignalEndpoints {
    pub plusone: String,
    pub like_button: String,
}

impl SignalEndpoints {
    /// Queries both counters for `project_url` and fuses their answers
    ///
    /// A counter that fails for any reason counts as unknown.
    pub async fn fused_stars(&self, client: &dyn HttpClient, project_url: &str) -> i32 {
        let plus = match plusone(client, &self.plusone, project_url).await {
            Ok(count) => count,
            Err(e) => {
                tracing::debug!("+1 count for {} unavailable: {}", project_url, e);
                UNKNOWN_STARS
            }
        };
        let like = match like_button(client, &self.like_button, project_url).await {
            Ok(count) => count,
            Err(e) => {
                tracing::debug!("Like count for {} unavailable: {}", project_url, e);
                UNKNOWN_STARS
            }
        };
        fuse_stars(plus, like)
    }
}

#[derive(Deserialize)]
struct PlusoneReply {
    result: PlusoneResult,
}

#[derive(Deserialize)]
struct PlusoneResult {
    metadata: PlusoneMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlusoneMetadata {
    global_counts: PlusoneCounts,
}

#[derive(Deserialize)]
struct PlusoneCounts {
    count: f64,
}

/// Asks the "+1" JSON-RPC counter how often `project_url` was endorsed
pub async fn plusone(
    client: &dyn HttpClient,
    endpoint: &str,
    project_url: &str,
) -> Result<i32, SearchError> {
    let payload = serde_json::json!([{
        "method": "pos.plusones.get",
        "id": "p",
        "params": {
            "nolog": true,
            "id": project_url,
            "source": "widget",
            "userId": "@viewer",
            "groupId": "@self",
        },
        "jsonrpc": "2.0",
        "key": "p",
        "apiVersion": "v1",
    }]);

    let mut request = Request::new(Method::POST, Url::parse(endpoint)?);
    request
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *request.body_mut() = Some(Body::from(payload.to_string()));

    let response = client.send(request).await.map_err(|source| SearchError::Http {
        url: endpoint.to_string(),
        source,
    })?;
    let replies: Vec<PlusoneReply> = response.json()?;
    let count = replies
        .first()
        .map(|reply| reply.result.metadata.global_counts.count)
        .unwrap_or(0.0);

    Ok((0.5 + count) as i32)
}

#[derive(Deserialize)]
struct LikeShares {
    #[serde(default)]
    shares: i32,
}

/// Asks the "like" counter how often `project_url` was shared
pub async fn like_button(
    client: &dyn HttpClient,
    endpoint: &str,
    project_url: &str,
) -> Result<i32, SearchError> {
    let url = Url::parse_with_params(endpoint, &[("ids", project_url)])?;
    let request = Request::new(Method::GET, url.clone());

    let response = client.send(request).await.map_err(|source| SearchError::Http {
        url: url.to_string(),
        source,
    })?;
    let counts: HashMap<String, LikeShares> = response.json()?;

    Ok(counts.get(project_url).map_or(0, |c| c.shares))
}
