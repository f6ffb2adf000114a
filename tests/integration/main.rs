//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the document service, the
//! hosting APIs and the social counters.

mod common;
mod coordinator_tests;
mod crawl_tests;
mod discovery_tests;
