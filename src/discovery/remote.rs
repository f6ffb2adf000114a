//! Remote package discovery
//!
//! Two sources feed new work to the crawler besides bulk imports: the
//! document service's list of every package it knows, and the hosting
//! site's "recently updated" repository search.

use crate::crawler::{get_request, HttpClient};
use crate::SearchError;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize)]
struct PackageList {
    #[serde(default)]
    results: Vec<PackageListItem>,
}

#[derive(Deserialize)]
struct PackageListItem {
    path: String,
}

async fn get_ok(client: &dyn HttpClient, url: &str) -> Result<Vec<u8>, SearchError> {
    let response = client
        .send(get_request(url)?)
        .await
        .map_err(|source| SearchError::Http {
            url: url.to_string(),
            source,
        })?;

    if response.status != StatusCode::OK {
        return Err(SearchError::Status {
            url: url.to_string(),
            status: response.status.as_u16(),
        });
    }
    Ok(response.body)
}

/// Fetches the import paths of every package the document service knows
///
/// The listing is `{"results": [{"path": "..."}, ...]}`.
pub async fn fetch_package_list(
    client: &dyn HttpClient,
    url: &str,
) -> Result<Vec<String>, SearchError> {
    let body = get_ok(client, url).await?;
    let list: PackageList = serde_json::from_slice(&body)?;

    tracing::info!("Package list at {} has {} entries", url, list.results.len());
    Ok(list.results.into_iter().map(|item| item.path).collect())
}

/// Extracts `github.com/{owner}/{repo}` → last update from one search page
///
/// Each result links to `/{owner}/{repo}/stargazers` and is followed by an
/// element carrying a `datetime` attribute. The first time seen for a
/// repository wins.
pub fn parse_github_updates(html: &str, updates: &mut HashMap<String, DateTime<Utc>>) {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(r#"a[href$="/stargazers"], [datetime]"#) else {
        return;
    };

    let mut current: Option<String> = None;
    for element in document.select(&selector) {
        let value = element.value();

        if let Some(href) = value.attr("href").filter(|h| h.ends_with("/stargazers")) {
            let mut parts = href.trim_start_matches('/').split('/');
            current = match (parts.next(), parts.next()) {
                (Some(owner), Some(repo)) if !owner.is_empty() && repo != "stargazers" => {
                    Some(format!("github.com/{}/{}", owner, repo))
                }
                _ => None,
            };
            continue;
        }

        let Some(repo) = current.take() else {
            continue;
        };
        match value
            .attr("datetime")
            .map(DateTime::parse_from_rfc3339)
        {
            Some(Ok(time)) => {
                updates.entry(repo).or_insert(time.with_timezone(&Utc));
            }
            _ => tracing::debug!("Unparsable update time for {}", repo),
        }
    }
}

/// Scrapes the first `pages` pages of the "recently updated" search
///
/// Page numbers are appended as `&p={n}`. Fails if nothing was found at
/// all, which usually means the page layout changed.
pub async fn github_updates(
    client: &dyn HttpClient,
    search_url: &str,
    pages: usize,
) -> Result<HashMap<String, DateTime<Utc>>, SearchError> {
    let mut updates = HashMap::new();

    for page in 1..=pages {
        let url = format!("{}&p={}", search_url, page);
        let body = get_ok(client, &url).await?;
        parse_github_updates(&String::from_utf8_lossy(&body), &mut updates);
    }

    if updates.is_empty() {
        return Err(SearchError::Discovery(format!(
            "no updates found at {}",
            search_url
        )));
    }

    tracing::info!("Found {} recently updated repositories", updates.len());
    Ok(updates)
}
