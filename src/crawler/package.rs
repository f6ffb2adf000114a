//! Single-package crawl pipeline
//!
//! [`crawl_package`] fetches one package document and turns it into a
//! [`Package`] snapshot. Nothing that happens while crawling one package is
//! allowed to take the rest of the run down with it: document source errors
//! come back as contextual [`SearchError`]s, and panics raised while
//! assembling the snapshot (or anywhere in the spawned pipeline, via
//! [`crawl_package_isolated`]) are converted into [`SearchError::Panic`].

use crate::crawler::document::{DocError, Document, ReadmeFile};
use crate::crawler::readme;
use crate::crawler::CrawlContext;
use crate::model::Package;
use crate::SearchError;
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Readme bodies are cut to this many bytes
pub const MAX_README_BYTES: usize = 100 * 1024;

/// Result of a successful package crawl
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlOutcome {
    /// A fresh snapshot
    Fetched(Package),
    /// The source reported that nothing changed since the given etag
    NotModified,
}

/// Crawls one package
///
/// `etag` is the change token of the previous crawl, or empty to force a
/// full fetch.
pub async fn crawl_package(
    ctx: &CrawlContext,
    path: &str,
    etag: &str,
) -> Result<CrawlOutcome, SearchError> {
    let mut doc = match ctx.docs.get(ctx.client.as_ref(), path, etag).await {
        Ok(doc) => doc,
        Err(DocError::NotModified) => {
            tracing::debug!("{} not modified", path);
            return Ok(CrawlOutcome::NotModified);
        }
        Err(e) => return Err(SearchError::from(e).context(format!("crawl_package({})", path))),
    };

    if doc.star_count < 0 {
        doc.star_count = ctx
            .signals
            .fused_stars(ctx.client.as_ref(), &doc.project_url)
            .await;
        tracing::debug!("{} fused star count {}", path, doc.star_count);
    }

    contain_panic(path, || assemble(doc)).map(CrawlOutcome::Fetched)
}

/// Runs `f`, turning a panic into [`SearchError::Panic`] for `target`
fn contain_panic<T>(target: &str, f: impl FnOnce() -> T) -> Result<T, SearchError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!("Panic when crawling package {}: {}", target, message);
        SearchError::Panic {
            target: target.to_string(),
            message,
        }
    })
}

/// Runs [`crawl_package`] on its own task
///
/// A panic anywhere in the pipeline, including inside the document source,
/// comes back as [`SearchError::Panic`] instead of unwinding into the caller.
pub async fn crawl_package_isolated(
    ctx: Arc<CrawlContext>,
    path: String,
    etag: String,
) -> Result<CrawlOutcome, SearchError> {
    let target = path.clone();
    let handle = tokio::spawn(async move { crawl_package(&ctx, &path, &etag).await });

    match handle.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let message = panic_message(e.into_panic().as_ref());
            tracing::error!("Panic when crawling package {}: {}", target, message);
            Err(SearchError::Panic { target, message })
        }
        Err(e) => Err(SearchError::Join(e)),
    }
}

/// Returns true if the deepest cause of `err` says the package does not exist
pub fn is_bad_package(err: &SearchError) -> bool {
    matches!(
        err.root_cause().downcast_ref::<DocError>(),
        Some(DocError::NotFound(_))
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Picks the first readme whose trimmed body is longer than one byte
fn pick_readme(files: &[ReadmeFile]) -> (String, String) {
    files
        .iter()
        .map(|f| (f.name.trim(), f.data.trim()))
        .find(|(_, data)| data.len() > 1)
        .map(|(name, data)| (name.to_string(), data.to_string()))
        .unwrap_or_default()
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

fn assemble(doc: Document) -> Package {
    let (readme_fn, mut readme_data) = pick_readme(&doc.readme_files);

    let synopsis = if doc.doc.is_empty() && doc.synopsis.is_empty() {
        readme::synopsis(&readme::readme_to_text(&readme_fn, &readme_data))
    } else {
        doc.synopsis
    };

    truncate_at_char_boundary(&mut readme_data, MAX_README_BYTES);

    let imports: BTreeSet<String> = doc.imports.into_iter().collect();
    let test_imports: BTreeSet<String> = doc
        .test_imports
        .into_iter()
        .chain(doc.x_test_imports)
        .filter(|import| !imports.contains(import))
        .collect();
    let exported: BTreeSet<String> = doc.funcs.into_iter().chain(doc.types).collect();

    Package {
        package: doc.import_path,
        name: doc.name,
        synopsis,
        doc: doc.doc,
        project_url: doc.project_url,
        star_count: doc.star_count,
        readme_fn,
        readme_data,
        imports: imports.into_iter().collect(),
        test_imports: test_imports.into_iter().collect(),
        exported: exported.into_iter().collect(),
        references: doc.references,
        etag: doc.etag,
    }
}
