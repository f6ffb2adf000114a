use crate::common::{create_test_config, fast_document, plusone_reply, test_client};
use pkgsearch::crawler::{
    crawl_package, crawl_person, get_request, is_bad_package, CrawlContext, CrawlOutcome,
    HttpClient,
};
use pkgsearch::model::PersonId;
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_signals(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(plusone_reply(10.0)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/like"))
        .and(query_param("ids", "https://github.com/alice/fast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "https://github.com/alice/fast": { "shares": 20 }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetcher_remembers_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let fetcher = test_client(&config);
    let url = format!("{}/broken", server.uri());

    let first = fetcher.send(get_request(&url).unwrap()).await.unwrap();
    let second = fetcher.send(get_request(&url).unwrap()).await.unwrap();

    assert_eq!(first.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(second.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(fetcher.blacklisted(), 1);
}

#[tokio::test]
async fn test_crawl_package_full_fetch() {
    let server = MockServer::start().await;
    mount_signals(&server).await;
    Mock::given(method("GET"))
        .and(path("/docs/github.com/alice/fast"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v1\"")
                .set_body_json(fast_document()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let ctx = CrawlContext::from_config(&config).unwrap();

    let outcome = crawl_package(&ctx, "github.com/alice/fast", "").await.unwrap();
    let CrawlOutcome::Fetched(package) = outcome else {
        panic!("expected a fetched package, got {:?}", outcome);
    };

    assert_eq!(package.package, "github.com/alice/fast");
    assert_eq!(package.name, "fast");
    assert_eq!(package.etag, "\"v1\"");
    // fuse_stars(10, 20)
    assert_eq!(package.star_count, 22);
    assert_eq!(package.imports, vec!["fmt", "github.com/bob/util"]);
    assert_eq!(package.test_imports, vec!["testing"]);
    assert!(package.exported.contains(&"Run".to_string()));
    assert!(package.exported.contains(&"Engine".to_string()));
    assert_eq!(package.readme_fn, "README.md");
}

#[tokio::test]
async fn test_crawl_package_not_modified() {
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
    let ctx = CrawlContext::from_config(&config).unwrap();

    let outcome = crawl_package(&ctx, "github.com/alice/fast", "\"v1\"").await.unwrap();
    assert_eq!(outcome, CrawlOutcome::NotModified);
}

#[tokio::test]
async fn test_crawl_package_gone_is_bad_package() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/github.com/alice/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let ctx = CrawlContext::from_config(&config).unwrap();

    let err = crawl_package(&ctx, "github.com/alice/gone", "").await.unwrap_err();
    assert!(is_bad_package(&err));
    assert!(err.to_string().contains("crawl_package(github.com/alice/gone)"));
}

#[tokio::test]
async fn test_crawl_package_server_error_is_not_bad_package() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/github.com/alice/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let ctx = CrawlContext::from_config(&config).unwrap();

    let err = crawl_package(&ctx, "github.com/alice/flaky", "").await.unwrap_err();
    assert!(!is_bad_package(&err));
}

#[tokio::test]
async fn test_crawl_person_github() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gh/users/alice/repos"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"full_name": "alice/fast"},
            {"full_name": "alice/slow"}
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let ctx = CrawlContext::from_config(&config).unwrap();

    let person = crawl_person(&ctx, &PersonId::new("github.com", "alice"))
        .await
        .unwrap()
        .expect("github is a supported site");

    assert_eq!(person.id, "github.com:alice");
    assert_eq!(
        person.packages,
        vec!["github.com/alice/fast", "github.com/alice/slow"]
    );
}

#[tokio::test]
async fn test_crawl_person_bitbucket() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bb/2.0/repositories/bob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"full_name": "bob/app"}]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let ctx = CrawlContext::from_config(&config).unwrap();

    let person = crawl_person(&ctx, &PersonId::new("bitbucket.org", "bob"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(person.packages, vec!["bitbucket.org/bob/app"]);
}

#[tokio::test]
async fn test_crawl_person_github_pages() {
    let server = MockServer::start().await;
    let full_page: Vec<_> = (0..100)
        .map(|i| json!({ "full_name": format!("alice/repo{}", i) }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/gh/users/alice/repos"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gh/users/alice/repos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"full_name": "alice/last"}])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let ctx = CrawlContext::from_config(&config).unwrap();

    let person = crawl_person(&ctx, &PersonId::new("github.com", "alice"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(person.packages.len(), 101);
    assert_eq!(person.packages[0], "github.com/alice/repo0");
    assert_eq!(person.packages[100], "github.com/alice/last");
}

#[tokio::test]
async fn test_crawl_person_bitbucket_follows_next() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bb/2.0/repositories/bob"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"full_name": "bob/lib"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bb/2.0/repositories/bob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"full_name": "bob/app"}],
            "next": format!("{}/bb/2.0/repositories/bob?page=2", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let ctx = CrawlContext::from_config(&config).unwrap();

    let person = crawl_person(&ctx, &PersonId::new("bitbucket.org", "bob"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(person.packages, vec!["bitbucket.org/bob/app", "bitbucket.org/bob/lib"]);
}

#[tokio::test]
async fn test_crawl_person_owner_is_escaped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gh/users/a%2Fb/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let ctx = CrawlContext::from_config(&config).unwrap();

    let person = crawl_person(&ctx, &PersonId::new("github.com", "a/b"))
        .await
        .unwrap()
        .unwrap();
    assert!(person.packages.is_empty());
}

#[tokio::test]
async fn test_crawl_person_unsupported_site() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let ctx = CrawlContext::from_config(&config).unwrap();

    let person = crawl_person(&ctx, &PersonId::new("code.google.com", "carol"))
        .await
        .unwrap();
    assert!(person.is_none());
}
