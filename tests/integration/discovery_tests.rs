use crate::common::{create_test_config, test_client};
use pkgsearch::discovery::{fetch_package_list, github_updates, read_packages, ImportSegments};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn search_page(owner: &str, repo: &str, time: &str) -> String {
    format!(
        r#"<html><body><div class="repo-list">
             <a href="/{owner}/{repo}">{owner}/{repo}</a>
             <a href="/{owner}/{repo}/stargazers">5</a>
             <relative-time datetime="{time}">recently</relative-time>
           </div></body></html>"#
    )
}

#[tokio::test]
async fn test_fetch_package_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"path": "github.com/alice/fast"}, {"path": "golang.org/x/net"}]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let client = test_client(&config);

    let packages = fetch_package_list(&client, &config.endpoints.package_list)
        .await
        .unwrap();
    assert_eq!(packages, vec!["github.com/alice/fast", "golang.org/x/net"]);

    // What --fetch-package-list does with the result
    let imports = ImportSegments::new(&config.storage.imports_dir);
    let segment = imports.append_packages(&packages).unwrap();
    assert!(segment.is_done());
    assert_eq!(read_packages(&segment).unwrap(), packages);
}

#[tokio::test]
async fn test_fetch_package_list_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/packages"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let client = test_client(&config);

    assert!(fetch_package_list(&client, &config.endpoints.package_list)
        .await
        .is_err());
}

#[tokio::test]
async fn test_github_updates_scrapes_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(
            "alice",
            "fast",
            "2014-03-01T10:00:00Z",
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("p", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(
            "bob",
            "tool",
            "2014-02-28T09:00:00Z",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let client = test_client(&config);

    let updates = github_updates(&client, &config.endpoints.github_search, 2)
        .await
        .unwrap();
    assert_eq!(updates.len(), 2);
    assert!(updates.contains_key("github.com/alice/fast"));
    assert!(updates.contains_key("github.com/bob/tool"));
}

#[tokio::test]
async fn test_github_updates_empty_result_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let client = test_client(&config);

    assert!(github_updates(&client, &config.endpoints.github_search, 1)
        .await
        .is_err());
}
