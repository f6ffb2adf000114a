//! Sources of new packages to crawl
//!
//! - [`ImportSegments`]: bulk imports dropped on disk by other processes
//! - [`fetch_package_list`]: every package known to the document service
//! - [`github_updates`]: recently updated repositories on the hosting site

mod remote;
mod segments;

pub use remote::{fetch_package_list, github_updates, parse_github_updates};
pub use segments::{read_packages, ImportSegments, Segment};
