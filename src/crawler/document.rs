//! Package document source
//!
//! A [`DocumentSource`] turns an import path into a parsed [`Document`]:
//! name, docs, imports, exported identifiers and so on. The crawler only
//! depends on the trait; [`DocApiSource`] is the implementation backed by a
//! JSON document API that understands `If-None-Match`.

use crate::crawler::http::{get_request, HttpClient};
use crate::model::UNKNOWN_STARS;
use async_trait::async_trait;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::header::HeaderValue;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised by document and person-listing sources
#[derive(Debug, Error)]
pub enum DocError {
    /// The remote content matches the etag that was sent
    #[error("Document not modified")]
    NotModified,

    /// The package or person does not exist (any more)
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// One readme file shipped with a package
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadmeFile {
    pub name: String,
    #[serde(default)]
    pub data: String,
}

/// Parsed package documentation as delivered by a [`DocumentSource`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub import_path: String,
    pub name: String,
    pub synopsis: String,
    pub doc: String,
    #[serde(rename = "projectURL", alias = "projectUrl")]
    pub project_url: String,
    /// Popularity count, negative when the source does not know it
    pub star_count: i32,
    /// Readme files in the order the source lists them
    pub readme_files: Vec<ReadmeFile>,
    pub imports: Vec<String>,
    pub test_imports: Vec<String>,
    /// Imports of external (`_test` package) tests
    pub x_test_imports: Vec<String>,
    /// Names of exported top-level functions
    pub funcs: Vec<String>,
    /// Names of exported types
    pub types: Vec<String>,
    pub references: Vec<String>,
    pub etag: String,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            import_path: String::new(),
            name: String::new(),
            synopsis: String::new(),
            doc: String::new(),
            project_url: String::new(),
            star_count: UNKNOWN_STARS,
            readme_files: Vec::new(),
            imports: Vec::new(),
            test_imports: Vec::new(),
            x_test_imports: Vec::new(),
            funcs: Vec::new(),
            types: Vec::new(),
            references: Vec::new(),
            etag: String::new(),
        }
    }
}

/// Fetches package documents
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetches the document for `import_path`
    ///
    /// A non-empty `etag` enables conditional fetching: when the remote
    /// content still matches it, [`DocError::NotModified`] is returned.
    async fn get(
        &self,
        client: &dyn HttpClient,
        import_path: &str,
        etag: &str,
    ) -> Result<Document, DocError>;
}

/// [`DocumentSource`] backed by a JSON API at `{base_url}/{import path}`
pub struct DocApiSource {
    base_url: String,
}

impl DocApiSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn document_url(&self, import_path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), import_path)
    }
}

#[async_trait]
impl DocumentSource for DocApiSource {
    async fn get(
        &self,
        client: &dyn HttpClient,
        import_path: &str,
        etag: &str,
    ) -> Result<Document, DocError> {
        let url = self.document_url(import_path);
        let mut request = get_request(&url)?;
        if !etag.is_empty() {
            if let Ok(value) = HeaderValue::from_str(etag) {
                request.headers_mut().insert(IF_NONE_MATCH, value);
            }
        }

        let response = client.send(request).await?;
        match response.status {
            StatusCode::NOT_MODIFIED => return Err(DocError::NotModified),
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                return Err(DocError::NotFound(import_path.to_string()))
            }
            status if !status.is_success() => {
                return Err(DocError::Status {
                    url,
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        let mut doc: Document = response
            .json()
            .map_err(|source| DocError::Decode {
                url: url.clone(),
                source,
            })?;

        if doc.import_path.is_empty() {
            doc.import_path = import_path.to_string();
        }
        if let Some(etag) = response.header(ETAG.as_str()) {
            doc.etag = etag.to_string();
        }

        Ok(doc)
    }
}
