use crate::common::{create_test_config, fast_document, plusone_reply};
use chrono::{Duration, Utc};
use pkgsearch::config::Config;
use pkgsearch::crawler::{Coordinator, CRAWLER_VERSION};
use pkgsearch::discovery::ImportSegments;
use pkgsearch::model::{CrawlResultAction, CrawlingEntry};
use pkgsearch::storage::{open_storage, EntryKind, RunStatus, SqliteStorage, Storage};
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAST: &str = "github.com/alice/fast";

fn storage_for(config: &Config) -> SqliteStorage {
    open_storage(Path::new(&config.storage.database_path)).expect("Failed to open storage")
}

fn due_entry(version: u32, etag: &str) -> CrawlingEntry {
    CrawlingEntry::new(Utc::now() - Duration::hours(1), version, etag)
}

async fn mount_document(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(plusone_reply(3.0)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/github.com/alice/fast"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v2\"")
                .set_body_json(fast_document()),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_crawls_imported_package() {
    let server = MockServer::start().await;
    mount_document(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let imports = ImportSegments::new(&config.storage.imports_dir);
    imports.append_packages(&[FAST.to_string()]).unwrap();

    let mut coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();
    drop(coordinator);

    assert_eq!(summary.imported, 1);
    assert_eq!(summary.packages.updated, 1);
    assert_eq!(summary.packages.failed, 0);
    // github.com/bob/util and the author
    assert_eq!(summary.packages.discovered, 2);
    assert!(imports.segments().unwrap().is_empty());

    let storage = storage_for(&config);
    let run = storage.get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash");

    let doc = storage.get_doc(FAST).unwrap().expect("snapshot stored");
    assert_eq!(doc.etag, "\"v2\"");

    let entry = storage.get_entry(EntryKind::Package, FAST).unwrap().unwrap();
    assert_eq!(entry.version, CRAWLER_VERSION);
    assert_eq!(entry.etag, "\"v2\"");
    assert!(entry.schedule_time > Utc::now() + Duration::hours(100));

    assert!(storage
        .get_entry(EntryKind::Package, "github.com/bob/util")
        .unwrap()
        .is_some());
    assert!(storage
        .get_entry(EntryKind::Person, "github.com:alice")
        .unwrap()
        .is_some());

    let actions = storage.actions_for_run(summary.run_id).unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].0, FAST);
    assert!(matches!(actions[0].1, CrawlResultAction::Update(_)));
}

#[tokio::test]
async fn test_run_reports_stars_only_change() {
    let server = MockServer::start().await;
    mount_document(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    {
        let mut storage = storage_for(&config);
        storage
            .put_entry(EntryKind::Package, FAST, &due_entry(CRAWLER_VERSION, ""))
            .unwrap();
    }

    // First run stores the snapshot
    let mut coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let first = coordinator.run().await.unwrap();
    drop(coordinator);
    assert_eq!(first.packages.updated, 1);

    // Make it due again with a different stored star count
    {
        let mut storage = storage_for(&config);
        let mut doc = storage.get_doc(FAST).unwrap().unwrap();
        doc.star_count += 100;
        storage.put_doc(&doc).unwrap();
        storage
            .put_entry(EntryKind::Package, FAST, &due_entry(CRAWLER_VERSION, ""))
            .unwrap();
    }

    let mut coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let second = coordinator.run().await.unwrap();
    drop(coordinator);

    assert_eq!(second.packages.stars_only, 1);
    assert_eq!(second.packages.updated, 0);

    let storage = storage_for(&config);
    // github.com/bob/util was discovered by the first run and is crawled too
    let actions = storage.actions_for_run(second.run_id).unwrap();
    let (_, action) = actions
        .iter()
        .find(|(path, _)| path == FAST)
        .expect("action logged for the package");
    assert!(matches!(action, CrawlResultAction::StarsOnly(_)));
}

#[tokio::test]
async fn test_run_keeps_etag_when_not_modified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/github.com/alice/fast"))
        .and(header("If-None-Match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    {
        let mut storage = storage_for(&config);
        storage
            .put_entry(EntryKind::Package, FAST, &due_entry(CRAWLER_VERSION, "\"v1\""))
            .unwrap();
    }

    let mut coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();
    drop(coordinator);

    assert_eq!(summary.packages.not_modified, 1);

    let storage = storage_for(&config);
    let entry = storage.get_entry(EntryKind::Package, FAST).unwrap().unwrap();
    assert_eq!(entry.etag, "\"v1\"");
    assert!(entry.schedule_time > Utc::now());
    assert!(storage.actions_for_run(summary.run_id).unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_crawler_version_forces_full_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/github.com/alice/fast"))
        .and(header("If-None-Match", "\"old\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .expect(0)
        .mount(&server)
        .await;
    mount_document(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    {
        let mut storage = storage_for(&config);
        storage
            .put_entry(
                EntryKind::Package,
                FAST,
                &due_entry(CRAWLER_VERSION - 1, "\"old\""),
            )
            .unwrap();
    }

    let mut coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();
    drop(coordinator);

    assert_eq!(summary.packages.not_modified, 0);
    assert_eq!(summary.packages.updated, 1);

    let storage = storage_for(&config);
    let entry = storage.get_entry(EntryKind::Package, FAST).unwrap().unwrap();
    assert_eq!(entry.version, CRAWLER_VERSION);
    assert_eq!(entry.etag, "\"v2\"");
}

#[tokio::test]
async fn test_run_deletes_missing_package() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/github.com/alice/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    {
        let mut storage = storage_for(&config);
        let gone = pkgsearch::Package {
            package: "github.com/alice/gone".to_string(),
            ..Default::default()
        };
        storage.put_doc(&gone).unwrap();
        storage
            .put_entry(
                EntryKind::Package,
                "github.com/alice/gone",
                &due_entry(CRAWLER_VERSION, ""),
            )
            .unwrap();
    }

    let mut coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();
    drop(coordinator);

    assert_eq!(summary.packages.deleted, 1);

    let storage = storage_for(&config);
    assert!(storage.get_doc("github.com/alice/gone").unwrap().is_none());
    assert!(storage
        .get_entry(EntryKind::Package, "github.com/alice/gone")
        .unwrap()
        .is_none());
    let actions = storage.actions_for_run(summary.run_id).unwrap();
    assert_eq!(actions, vec![("github.com/alice/gone".to_string(), CrawlResultAction::Delete)]);
}

#[tokio::test]
async fn test_run_retries_failed_package_later() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/github.com/alice/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    {
        let mut storage = storage_for(&config);
        storage
            .put_entry(
                EntryKind::Package,
                "github.com/alice/flaky",
                &due_entry(CRAWLER_VERSION, "\"e\""),
            )
            .unwrap();
    }

    let mut coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();
    drop(coordinator);

    assert_eq!(summary.packages.failed, 1);

    let storage = storage_for(&config);
    let entry = storage
        .get_entry(EntryKind::Package, "github.com/alice/flaky")
        .unwrap()
        .unwrap();
    assert_eq!(entry.etag, "\"e\"");
    assert!(entry.schedule_time > Utc::now() + Duration::hours(11));
    assert!(entry.schedule_time < Utc::now() + Duration::hours(13));
}

#[tokio::test]
async fn test_run_crawls_due_person() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gh/users/alice/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"full_name": "alice/fast"},
            {"full_name": "alice/slow"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    {
        let mut storage = storage_for(&config);
        storage
            .put_entry(EntryKind::Person, "github.com:alice", &due_entry(CRAWLER_VERSION, ""))
            .unwrap();
    }

    let mut coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();
    drop(coordinator);

    assert_eq!(summary.persons.crawled, 1);
    assert_eq!(summary.persons.discovered, 2);

    let storage = storage_for(&config);
    for package in ["github.com/alice/fast", "github.com/alice/slow"] {
        assert!(storage
            .get_entry(EntryKind::Package, package)
            .unwrap()
            .is_some());
    }
    let person = storage
        .get_entry(EntryKind::Person, "github.com:alice")
        .unwrap()
        .unwrap();
    assert!(person.schedule_time > Utc::now() + Duration::hours(100));
}

#[tokio::test]
async fn test_run_with_nothing_due() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let mut coordinator = Coordinator::new(config, "hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.imported, 0);
    assert_eq!(summary.packages, Default::default());
    assert_eq!(summary.persons, Default::default());
}

#[tokio::test]
async fn test_recent_updates_make_package_due() {
    let server = MockServer::start().await;
    mount_document(&server).await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                 <a href="/alice/fast/stargazers">5</a>
                 <relative-time datetime="2014-03-01T10:00:00Z">now</relative-time>
               </body></html>"#,
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), dir.path());
    config.crawler.refresh_github_updates = true;
    {
        let mut storage = storage_for(&config);
        let later = CrawlingEntry::new(Utc::now() + Duration::days(3), CRAWLER_VERSION, "");
        storage.put_entry(EntryKind::Package, FAST, &later).unwrap();
    }

    let mut coordinator = Coordinator::new(config, "hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.refreshed, 1);
    assert_eq!(summary.packages.updated, 1);
}
