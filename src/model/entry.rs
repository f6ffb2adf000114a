//! Crawl scheduling record and index actions

use super::codec::{put_string, put_time, put_varint, BinaryRecord, CodecError, Reader};
use super::Package;
use chrono::{DateTime, Utc};

/// Per-package (or per-person) crawl scheduling record
///
/// The etag is only meaningful while `version` matches the crawler logic
/// version that wrote it; see [`CrawlingEntry::etag_for`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlingEntry {
    /// When the next crawl is due
    pub schedule_time: DateTime<Utc>,
    /// Crawler logic version that produced this record
    pub version: u32,
    pub etag: String,
}

impl CrawlingEntry {
    pub fn new(schedule_time: DateTime<Utc>, version: u32, etag: impl Into<String>) -> Self {
        Self {
            schedule_time,
            version,
            etag: etag.into(),
        }
    }

    /// Returns the etag to send with a conditional fetch
    ///
    /// A record written by a different crawler version yields an empty etag,
    /// forcing a full fetch.
    pub fn etag_for(&self, current_version: u32) -> &str {
        if self.version == current_version {
            &self.etag
        } else {
            ""
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.schedule_time <= now
    }
}

impl BinaryRecord for CrawlingEntry {
    fn write_to(&self, buf: &mut Vec<u8>) {
        put_time(buf, &self.schedule_time);
        put_varint(buf, self.version as u64);
        put_string(buf, &self.etag);
    }

    fn read_from(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let schedule_time = reader.time()?;
        let raw = reader.varint()?;
        let version = u32::try_from(raw).map_err(|_| CodecError::OutOfRange(raw))?;
        let etag = reader.string()?;
        Ok(Self {
            schedule_time,
            version,
            etag,
        })
    }
}

/// How a crawl result is merged into the index
///
/// `Delete` carries no snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlResultAction {
    /// New or changed content
    Update(Package),
    /// Only the star count changed
    StarsOnly(Package),
    /// The package is gone
    Delete,
}

impl CrawlResultAction {
    pub const TAG_UPDATE: u64 = 0;
    pub const TAG_STARS: u64 = 1;
    pub const TAG_DELETE: u64 = 2;

    pub fn tag(&self) -> u64 {
        match self {
            Self::Update(_) => Self::TAG_UPDATE,
            Self::StarsOnly(_) => Self::TAG_STARS,
            Self::Delete => Self::TAG_DELETE,
        }
    }

    pub fn package(&self) -> Option<&Package> {
        match self {
            Self::Update(pkg) | Self::StarsOnly(pkg) => Some(pkg),
            Self::Delete => None,
        }
    }
}

impl BinaryRecord for CrawlResultAction {
    fn write_to(&self, buf: &mut Vec<u8>) {
        put_varint(buf, self.tag());
        if let Some(pkg) = self.package() {
            pkg.write_to(buf);
        }
    }

    fn read_from(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match reader.varint()? {
            Self::TAG_UPDATE => Ok(Self::Update(Package::read_from(reader)?)),
            Self::TAG_STARS => Ok(Self::StarsOnly(Package::read_from(reader)?)),
            Self::TAG_DELETE => Ok(Self::Delete),
            tag => Err(CodecError::UnknownAction(tag)),
        }
    }
}
