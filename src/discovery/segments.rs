//! Bulk import segments
//!
//! Other processes hand newly discovered packages to the crawler by dropping
//! numbered segment directories into the imports directory:
//!
//! ```text
//! imports/
//!   1/links.json   ["github.com/a/b", ...]
//!   1/.done        written last, marks the segment complete
//!   2/links.json
//! ```
//!
//! Segments without a `.done` marker are still being written and are ignored.

use crate::SearchError;
use std::fs;
use std::path::{Path, PathBuf};

const LINKS_FILE: &str = "links.json";
const DONE_MARKER: &str = ".done";

/// One numbered segment directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub number: u64,
    pub path: PathBuf,
}

impl Segment {
    pub fn is_done(&self) -> bool {
        self.path.join(DONE_MARKER).exists()
    }
}

/// The imports directory
#[derive(Debug, Clone)]
pub struct ImportSegments {
    root: PathBuf,
}

impl ImportSegments {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Lists all segments, complete or not, in numeric order
    pub fn segments(&self) -> Result<Vec<Segment>, SearchError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut segments = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(number) = entry.file_name().to_str().and_then(|n| n.parse::<u64>().ok())
            else {
                continue;
            };
            segments.push(Segment {
                number,
                path: entry.path(),
            });
        }

        segments.sort_by_key(|s| s.number);
        Ok(segments)
    }

    /// Lists complete segments in numeric order
    pub fn done_segments(&self) -> Result<Vec<Segment>, SearchError> {
        Ok(self
            .segments()?
            .into_iter()
            .filter(Segment::is_done)
            .collect())
    }

    /// Writes `packages` into a new segment and marks it done
    pub fn append_packages(&self, packages: &[String]) -> Result<Segment, SearchError> {
        fs::create_dir_all(&self.root)?;

        let number = self.segments()?.last().map_or(1, |s| s.number + 1);
        let segment = Segment {
            number,
            path: self.root.join(number.to_string()),
        };
        fs::create_dir(&segment.path)?;

        let json = serde_json::to_vec(packages)?;
        fs::write(segment.path.join(LINKS_FILE), json)?;
        fs::write(segment.path.join(DONE_MARKER), b"")?;

        tracing::info!("Imported {} packages to {}", packages.len(), segment.path.display());
        Ok(segment)
    }

    /// Deletes a processed segment
    pub fn remove_segment(&self, segment: &Segment) -> Result<(), SearchError> {
        fs::remove_dir_all(&segment.path)?;
        Ok(())
    }
}

/// Reads the package list of a segment
pub fn read_packages(segment: &Segment) -> Result<Vec<String>, SearchError> {
    let bytes = fs::read(segment.path.join(LINKS_FILE))?;
    Ok(serde_json::from_slice(&bytes)?)
}
