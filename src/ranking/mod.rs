//! Ranking of crawled packages
//!
//! Scoring happens in two stages. [`static_score`] estimates how important a
//! package is regardless of the query, mostly from how many independent
//! packages import it. [`match_score`] estimates how well a package matches
//! a tokenized query.
//!
//! The constants below were tuned by hand against a fixed corpus and are
//! kept exactly as they are so scores stay reproducible.

mod tokenizer;

pub use tokenizer::{append_tokens, filter_urls, tokenize};

use crate::identity::{author_of, project_of};
use std::collections::HashSet;

/// What the ranking functions know about one candidate package
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitInfo {
    /// Author; derived from `package` when empty
    pub author: String,
    /// Import path
    pub package: String,
    pub name: String,
    pub description: String,
    /// Pre-extracted highlight sentences
    pub important_sentences: Vec<String>,
    pub synopsis: String,
    pub assigned_star_count: i32,
    /// Packages importing this one from non-test code
    pub imported: Vec<String>,
    /// Packages importing this one only from tests
    pub test_imported: Vec<String>,
}

impl HitInfo {
    fn author(&self) -> String {
        if self.author.is_empty() {
            author_of(&self.package)
        } else {
            self.author.clone()
        }
    }
}

/// Sums the weight of importers, counting each author and project once
///
/// An importer whose author or project was already counted is skipped.
/// Importers by the same author or from the same project weigh 0.5, all
/// others 1.0.
fn effective_imported(imported: &[String], author: &str, project: &str) -> f64 {
    let mut authors = HashSet::new();
    let mut projects = HashSet::new();
    let mut score = 0.0;

    for import in imported {
        let import_author = author_of(import);
        if !import_author.is_empty() && !authors.insert(import_author.clone()) {
            continue;
        }

        let import_project = project_of(import);
        if !projects.insert(import_project.clone()) {
            continue;
        }

        if (!import_author.is_empty() && import_author == author) || import_project == project {
            score += 0.5;
        } else {
            score += 1.0;
        }
    }

    score
}

fn description_score(hit: &HitInfo) -> f64 {
    let desc = hit.description.trim();
    if desc.is_empty() {
        return 0.0;
    }

    let mut score = 1.0;
    if desc.len() > 100 {
        score += 0.5;
    }

    let name = &hit.name;
    if desc.starts_with(&format!("Package {}", name)) || desc.starts_with(&format!("{} package", name)) {
        score += 0.5;
    } else if desc.starts_with(&format!("package {}", name)) {
        score += 0.4;
    }
    score
}

/// Shared shape of the static scores; `fraction` picks the share of the
/// popularity weight that goes to this variant
fn static_score_of(hit: &HitInfo, importers: &[String], fraction: fn(f64, f64) -> f64) -> f64 {
    let author = hit.author();
    let project = project_of(&hit.package);

    let mut score = 1.0;
    score += effective_imported(importers, &author, &project);
    score += description_score(hit);

    if !hit.name.is_empty() && hit.name != "main" {
        score += 0.1;
    }

    let stars = (hit.assigned_star_count - 3).max(0);
    let imported = hit.imported.len() as f64;
    let test_imported = hit.test_imported.len() as f64;
    let frac = if imported + test_imported > 0.0 {
        fraction(imported, test_imported)
    } else {
        1.0
    };
    score += (stars as f64).sqrt() * 0.5 * frac;

    score
}

/// Query-independent importance of a package
pub fn static_score(hit: &HitInfo) -> f64 {
    static_score_of(hit, &hit.imported, |imported, test| imported / (imported + test))
}

/// Importance of a package as a test dependency
pub fn test_static_score(hit: &HitInfo) -> f64 {
    static_score_of(hit, &hit.test_imported, |imported, test| test / (imported + test))
}

/// True if `token` is a substring of `text`, one of `tokens`, or a prefix or
/// suffix of one of `tokens`
fn match_token(token: &str, text: &str, tokens: &HashSet<String>) -> bool {
    text.contains(token)
        || tokens.contains(token)
        || tokens
            .iter()
            .any(|t| t.starts_with(token) || t.ends_with(token))
}

/// Strips the host segment from an import path
fn remove_host(package: &str) -> &str {
    match package.find('/') {
        Some(p) if p > 0 && p < package.len() - 1 => &package[p + 1..],
        _ => package,
    }
}

/// Relevance of a package for a tokenized query
///
/// `tokens` are lower-cased query tokens; `text_idfs` and `name_idfs` hold
/// the inverse document frequency of each token in descriptive text and in
/// package names. A missing weight counts as 0. An empty query scores
/// exactly 1.
pub fn match_score(hit: &HitInfo, tokens: &[String], text_idfs: &[f64], name_idfs: &[f64]) -> f64 {
    if tokens.is_empty() {
        return 1.0;
    }

    let mut score = 0.02 * tokens.len() as f64;

    let filtered_synopsis = filter_urls(&hit.synopsis);
    let synopsis = filtered_synopsis.to_lowercase();
    let synopsis_tokens = tokenize(&filtered_synopsis);

    let name = hit.name.to_lowercase();
    let name_tokens = tokenize(&name);

    let package_path = remove_host(&hit.package);
    let package = package_path.to_lowercase();
    let package_tokens = tokenize(package_path);

    let mut sentence_tokens = HashSet::new();
    let mut sentences = String::new();
    for sentence in &hit.important_sentences {
        append_tokens(&mut sentence_tokens, sentence);
        sentences.push_str(&sentence.to_lowercase());
        sentences.push(' ');
    }

    for (i, token) in tokens.iter().enumerate() {
        let text_idf = text_idfs.get(i).copied().unwrap_or(0.0);
        let name_idf = name_idfs.get(i).copied().unwrap_or(0.0);

        if match_token(token, &synopsis, &synopsis_tokens) {
            score += 0.25 * text_idf;
        }
        if match_token(token, &sentences, &sentence_tokens) {
            score += 0.25 * text_idf;
        }
        if match_token(token, &name, &name_tokens) {
            score += 0.25 * name_idf;
        }
        if match_token(token, &package, &package_tokens) {
            score += 0.1 * text_idf;
        }
    }

    score
}
