//! Person crawling
//!
//! A person is an account on a code-hosting site. Crawling one lists the
//! repositories it owns so they can be scheduled as packages.

use crate::crawler::document::DocError;
use crate::crawler::http::{get_request, HttpClient, HttpResponse};
use crate::crawler::CrawlContext;
use crate::model::{Person, PersonId};
use crate::SearchError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

/// GitHub's largest page of repositories
const GITHUB_PAGE_SIZE: usize = 100;

/// Upper bound on listing pages fetched for one person
const MAX_LISTING_PAGES: usize = 10;

/// Hosting sites whose accounts can be listed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonSite {
    GitHub,
    Bitbucket,
}

const PERSON_SITES: &[(&str, PersonSite)] = &[
    ("github.com", PersonSite::GitHub),
    ("bitbucket.org", PersonSite::Bitbucket),
];

impl PersonSite {
    /// Looks up the site for a host name
    pub fn from_host(host: &str) -> Option<Self> {
        PERSON_SITES
            .iter()
            .find(|(name, _)| *name == host)
            .map(|(_, site)| *site)
    }

    pub fn host(self) -> &'static str {
        PERSON_SITES
            .iter()
            .find(|(_, site)| *site == self)
            .map_or("", |(name, _)| name)
    }
}

/// Lists the projects owned by an account
#[async_trait]
pub trait PersonSource: Send + Sync {
    /// Returns import paths (`{host}/{owner}/{repo}`) of the owner's projects
    async fn projects(
        &self,
        client: &dyn HttpClient,
        site: PersonSite,
        owner: &str,
    ) -> Result<Vec<String>, DocError>;
}

/// [`PersonSource`] backed by the GitHub and Bitbucket REST APIs
pub struct HostingApis {
    github_api: String,
    bitbucket_api: String,
}

#[derive(Deserialize)]
struct Repository {
    full_name: String,
}

#[derive(Deserialize)]
struct RepositoryPage {
    #[serde(default)]
    values: Vec<Repository>,

    /// Absolute URL of the following page, absent on the last one
    next: Option<String>,
}

/// Appends path segments to an API base URL, escaping each one
fn api_url(base: &str, segments: &[&str]) -> Result<Url, DocError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| DocError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

impl HostingApis {
    pub fn new(github_api: impl Into<String>, bitbucket_api: impl Into<String>) -> Self {
        Self {
            github_api: github_api.into(),
            bitbucket_api: bitbucket_api.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        client: &dyn HttpClient,
        url: &str,
        owner: &str,
    ) -> Result<T, DocError> {
        let response: HttpResponse = client.send(get_request(url)?).await?;
        match response.status {
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                return Err(DocError::NotFound(owner.to_string()))
            }
            status if !status.is_success() => {
                return Err(DocError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        response.json().map_err(|source| DocError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Pages through `/users/{owner}/repos` until a short page
    async fn github_repositories(
        &self,
        client: &dyn HttpClient,
        owner: &str,
    ) -> Result<Vec<Repository>, DocError> {
        let mut url = api_url(&self.github_api, &["users", owner, "repos"])?;
        let mut repositories = Vec::new();

        for page in 1..=MAX_LISTING_PAGES {
            url.query_pairs_mut()
                .clear()
                .append_pair("per_page", &GITHUB_PAGE_SIZE.to_string())
                .append_pair("page", &page.to_string());
            let batch: Vec<Repository> = Self::get_json(client, url.as_str(), owner).await?;
            let last = batch.len() < GITHUB_PAGE_SIZE;
            repositories.extend(batch);
            if last {
                return Ok(repositories);
            }
        }

        tracing::warn!(
            "Listing of github.com:{} stopped after {} pages",
            owner,
            MAX_LISTING_PAGES
        );
        Ok(repositories)
    }

    /// Follows the `next` links of `/2.0/repositories/{owner}`
    async fn bitbucket_repositories(
        &self,
        client: &dyn HttpClient,
        owner: &str,
    ) -> Result<Vec<Repository>, DocError> {
        let first = api_url(&self.bitbucket_api, &["2.0", "repositories", owner])?;
        let mut next = Some(first.to_string());
        let mut repositories = Vec::new();

        for _ in 0..MAX_LISTING_PAGES {
            let Some(url) = next.take() else {
                return Ok(repositories);
            };
            let page: RepositoryPage = Self::get_json(client, &url, owner).await?;
            repositories.extend(page.values);
            next = page.next;
        }

        if next.is_some() {
            tracing::warn!(
                "Listing of bitbucket.org:{} stopped after {} pages",
                owner,
                MAX_LISTING_PAGES
            );
        }
        Ok(repositories)
    }
}

#[async_trait]
impl PersonSource for HostingApis {
    async fn projects(
        &self,
        client: &dyn HttpClient,
        site: PersonSite,
        owner: &str,
    ) -> Result<Vec<String>, DocError> {
        let repositories = match site {
            PersonSite::GitHub => self.github_repositories(client, owner).await?,
            PersonSite::Bitbucket => self.bitbucket_repositories(client, owner).await?,
        };

        Ok(repositories
            .into_iter()
            .map(|repo| format!("{}/{}", site.host(), repo.full_name))
            .collect())
    }
}

/// Lists the packages of one person
///
/// Returns `Ok(None)` for sites that cannot be listed.
pub async fn crawl_person(
    ctx: &CrawlContext,
    id: &PersonId,
) -> Result<Option<Person>, SearchError> {
    let Some(site) = PersonSite::from_host(&id.site) else {
        tracing::debug!("Person {} is on an unsupported site", id);
        return Ok(None);
    };

    let packages = ctx
        .persons
        .projects(ctx.client.as_ref(), site, &id.username)
        .await
        .map_err(|e| SearchError::from(e).context(format!("crawl_person({})", id)))?;

    tracing::debug!("Person {} owns {} packages", id, packages.len());
    Ok(Some(Person {
        id: id.to_string(),
        packages,
    }))
}
