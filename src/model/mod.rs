//! Crawl snapshots and persisted records
//!
//! - [`Package`]: what a crawl learned about one import path
//! - [`Person`] / [`PersonId`]: the packages owned by one account on a site
//! - [`CrawlingEntry`]: per-package scheduling record
//! - [`CrawlResultAction`]: how a crawl result is merged into the index

pub mod codec;
mod entry;

pub use codec::{BinaryRecord, CodecError, Reader};
pub use entry::{CrawlResultAction, CrawlingEntry};

use codec::{put_signed, put_string, put_strings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Star count value meaning "not known"
pub const UNKNOWN_STARS: i32 = -1;

/// Crawl snapshot of a single package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Import path, e.g. `github.com/user/repo/sub`
    pub package: String,
    pub name: String,
    pub synopsis: String,
    pub doc: String,
    pub project_url: String,
    /// Fused popularity count, negative when unknown
    pub star_count: i32,
    pub readme_fn: String,
    pub readme_data: String,
    pub imports: Vec<String>,
    /// Test-only imports; never overlaps `imports`
    pub test_imports: Vec<String>,
    /// Exported function and type names
    pub exported: Vec<String>,
    /// Packages importing this one
    pub references: Vec<String>,
    pub etag: String,
}

impl Package {
    /// Returns true if the two snapshots differ at most in their star count
    pub fn same_except_stars(&self, other: &Package) -> bool {
        let mut other = other.clone();
        other.star_count = self.star_count;
        *self == other
    }
}

impl BinaryRecord for Package {
    fn write_to(&self, buf: &mut Vec<u8>) {
        put_string(buf, &self.package);
        put_string(buf, &self.name);
        put_string(buf, &self.synopsis);
        put_string(buf, &self.doc);
        put_string(buf, &self.project_url);
        put_signed(buf, self.star_count as i64);
        put_string(buf, &self.readme_fn);
        put_string(buf, &self.readme_data);
        put_strings(buf, &self.imports);
        put_strings(buf, &self.test_imports);
        put_strings(buf, &self.exported);
        put_strings(buf, &self.references);
        put_string(buf, &self.etag);
    }

    fn read_from(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let package = reader.string()?;
        let name = reader.string()?;
        let synopsis = reader.string()?;
        let doc = reader.string()?;
        let project_url = reader.string()?;
        let stars = reader.signed()?;
        let star_count =
            i32::try_from(stars).map_err(|_| CodecError::OutOfRange(stars as u64))?;

        Ok(Self {
            package,
            name,
            synopsis,
            doc,
            project_url,
            star_count,
            readme_fn: reader.string()?,
            readme_data: reader.string()?,
            imports: reader.strings()?,
            test_imports: reader.strings()?,
            exported: reader.strings()?,
            references: reader.strings()?,
            etag: reader.string()?,
        })
    }
}

/// Identity of an account on a code-hosting site, written `site:username`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersonId {
    pub site: String,
    pub username: String,
}

impl PersonId {
    pub fn new(site: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            username: username.into(),
        }
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.site, self.username)
    }
}

impl FromStr for PersonId {
    type Err = String;

    /// Splits at the first `:`; the username may itself contain colons
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((site, username)) => Ok(Self::new(site, username)),
            None => Err(format!("missing ':' in person id '{}'", s)),
        }
    }
}

/// Packages attributed to one person
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Canonical `site:username` id
    pub id: String,
    pub packages: Vec<String>,
}
