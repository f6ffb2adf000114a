//! Package identity resolution
//!
//! This module maps an import path such as `github.com/user/repo/sub` to the
//! host, author and project it belongs to. Every function here is total: any
//! string, including empty or short paths, produces an answer.
//!
//! The per-host layout knowledge lives in [`hosts`], a static rule table.

mod hosts;

pub use hosts::{AuthorRule, HostRule, ProjectRule, HOST_RULES};

use url::Url;

/// Splits an import path into its `/`-separated segments
///
/// An empty path yields a single empty segment, so `segments[0]` always exists.
fn segments(path: &str) -> Vec<&str> {
    path.split('/').collect()
}

/// Returns the author (user or organization) owning a package
///
/// # Examples
///
/// ```
/// use pkgsearch::identity::author_of;
///
/// assert_eq!(author_of("github.com/foo/bar"), "foo");
/// assert_eq!(author_of("launchpad.net/~user/proj"), "user");
/// assert_eq!(author_of("example.org/lib"), "example.org");
/// ```
pub fn author_of(path: &str) -> String {
    let parts = segments(path);
    let first = parts[0];

    let rule = hosts::rule_for(first).map(|r| r.author);
    match rule {
        Some(AuthorRule::Segment) if parts.len() > 1 => parts[1].to_string(),
        Some(AuthorRule::Fixed(author)) => author.to_string(),
        Some(AuthorRule::Tilde) if parts.len() > 1 => match parts[1].strip_prefix('~') {
            Some(owner) => owner.to_string(),
            None => first.to_string(),
        },
        _ => first.to_string(),
    }
}

/// Returns the host of a package path, or an empty string if it has none
///
/// The path is interpreted as the authority and path of an `http` URL. The
/// authority is returned as written, so any port is kept, including the
/// default one (`example.com:80/x` has host `example.com:80`).
pub fn host_of(path: &str) -> String {
    let url = match Url::parse(&format!("http://{}", path)) {
        Ok(url) => url,
        Err(_) => return String::new(),
    };
    if url.host_str().map_or(true, str::is_empty) {
        return String::new();
    }

    let end = path.find(['/', '?', '#']).unwrap_or(path.len());
    let authority = &path[..end];
    match authority.rfind('@') {
        Some(at) => authority[at + 1..].to_string(),
        None => authority.to_string(),
    }
}

/// Returns the core project name of a package
///
/// For hosts without a known layout the whole path is the project.
pub fn project_of(path: &str) -> String {
    let parts = segments(path);

    let rule = match hosts::rule_for(parts[0]) {
        Some(rule) => rule.project,
        None => return path.to_string(),
    };

    match rule {
        ProjectRule::Segment(idx) if parts.len() > idx => parts[idx].to_string(),
        ProjectRule::Segment(_) => path.to_string(),
        ProjectRule::Fixed(project) => project.to_string(),
        ProjectRule::Tilde => {
            if parts.len() > 2 && parts[1].starts_with('~') {
                parts[2].to_string()
            } else if parts.len() > 1 {
                parts[1].to_string()
            } else {
                path.to_string()
            }
        }
    }
}

/// Returns the host-qualified project key of a package
///
/// This is the prefix of the path that ends at the project segment, e.g.
/// `github.com/foo/bar` for `github.com/foo/bar/baz`.
///
/// On launchpad the key keeps the `~owner` segment and stops at the project,
/// so `launchpad.net/~user/proj/series` maps to `launchpad.net/~user/proj`.
pub fn full_project_of(path: &str) -> String {
    let parts = segments(path);
    let first = parts[0];

    let keep = match hosts::rule_for(first).map(|r| r.project) {
        Some(ProjectRule::Segment(idx)) => idx + 1,
        Some(ProjectRule::Fixed(project)) => return format!("{}/{}", first, project),
        Some(ProjectRule::Tilde) => {
            if parts.len() > 2 && parts[1].starts_with('~') {
                3
            } else {
                2
            }
        }
        None => 3,
    };

    parts[..keep.min(parts.len())].join("/")
}
