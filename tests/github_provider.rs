//! Integration tests for the GitHub aggregator using wiremock

use chrono::{Duration, Utc};
use org_pulse::sources::SnapshotStore;
use org_pulse::sources::github::{GithubStats, Provider, SNAPSHOT};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORG: &str = "example-org";
const REPO: &str = "alpha";

fn repo_body() -> serde_json::Value {
    json!({
        "name": REPO,
        "full_name": format!("{ORG}/{REPO}"),
        "stargazers_count": 1234,
        "forks_count": 56,
        "open_issues_count": 9,
        "description": "An example package",
        "html_url": format!("https://github.com/{ORG}/{REPO}"),
        "language": "Python",
        "updated_at": "2024-05-01T00:00:00Z"
    })
}

fn link_header(last_page: u64) -> String {
    format!(r#"<https://api.github.com/x?page=2>; rel="next", <https://api.github.com/x?page={last_page}>; rel="last""#)
}

async fn mount_repo(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_body()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_aggregation_end_to_end() {
    let server = MockServer::start().await;
    let now = Utc::now();

    let recent = (now - Duration::days(2)).to_rfc3339();
    let within_year = (now - Duration::days(100)).to_rfc3339();
    let beyond_year = (now - Duration::days(400)).to_rfc3339();

    mount_repo(&server).await;

    // One short page of stargazers: one star within the month, one more
    // within the year, one outside both windows.
    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}/stargazers")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "starred_at": recent },
            { "starred_at": within_year },
            { "starred_at": beyond_year }
        ])))
        .mount(&server)
        .await;

    // Open/closed PR totals come from Link-header probes.
    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}/pulls")))
        .and(query_param("state", "open"))
        .respond_with(ResponseTemplate::new(200).insert_header("link", link_header(3).as_str()).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}/pulls")))
        .and(query_param("state", "closed"))
        .respond_with(ResponseTemplate::new(200).insert_header("link", link_header(5).as_str()).set_body_json(json!([])))
        .mount(&server)
        .await;

    // Created-descending scan: one recent PR, then an older one that stops it.
    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}/pulls")))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "created_at": recent },
            { "created_at": beyond_year }
        ])))
        .mount(&server)
        .await;

    // Exact issue counts filter out the PR-marked item.
    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}/issues")))
        .and(query_param("state", "open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "created_at": recent },
            { "created_at": recent, "pull_request": { "url": "https://api.github.com/x" } }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}/issues")))
        .and(query_param("state", "closed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "created_at": within_year },
            { "created_at": beyond_year },
            { "created_at": recent, "pull_request": { "url": "https://api.github.com/x" } }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}/issues")))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "created_at": recent },
            { "created_at": within_year }
        ])))
        .mount(&server)
        .await;

    // Contributors: a human and a bot; the bot must not count.
    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}/contributors")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "login": "octocat", "contributions": 40 },
            { "login": "dependabot[bot]", "contributions": 12 }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/orgs/{ORG}/members")))
        .respond_with(ResponseTemplate::new(200).insert_header("link", link_header(42).as_str()).set_body_json(json!([])))
        .mount(&server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = SnapshotStore::new(temp_dir.path());

    let provider = Provider::new(None, ORG, Some(&server.uri()), now).expect("Failed to create provider");
    provider.collect(&[REPO.to_string()], &store).await.expect("collect failed");

    let stats: GithubStats = store.load(SNAPSHOT).expect("snapshot missing");

    assert_eq!(stats.organization, ORG);
    assert_eq!(stats.total_repositories, 1);
    assert_eq!(stats.total_stars, 1234);
    assert_eq!(stats.total_stars_last_month, 1);
    assert_eq!(stats.total_stars_last_year, 2);
    assert_eq!(stats.unique_contributors, 1);
    assert_eq!(stats.organization_members, 42);
    assert_eq!(stats.total_pull_requests_open, 3);
    assert_eq!(stats.total_pull_requests_closed, 5);
    assert_eq!(stats.total_issues_open, 1);
    assert_eq!(stats.total_issues_closed, 2);

    let repo = &stats.repositories[0];
    assert_eq!(repo.name, REPO);
    assert_eq!(repo.stargazers_count, 1234);
    assert_eq!(repo.forks_count, 56);
    assert_eq!(repo.contributors_count, 1);
    assert_eq!(repo.pull_requests_last_month, 1);
    assert_eq!(repo.issues_last_month, 1);
    assert_eq!(repo.language.as_deref(), Some("Python"));
}

#[tokio::test]
async fn test_stargazer_pagination_until_short_page() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let within_year = (now - Duration::days(100)).to_rfc3339();

    mount_repo(&server).await;

    // A full page, then a short one; both must be counted.
    let full_page: Vec<serde_json::Value> = (0..100).map(|_| json!({ "starred_at": within_year })).collect();
    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}/stargazers")))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}/stargazers")))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "starred_at": within_year }])))
        .mount(&server)
        .await;

    // Contributors and members still need to resolve for the run to finish;
    // everything else may 404 and degrade to zero defaults.
    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}/contributors")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/orgs/{ORG}/members")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = SnapshotStore::new(temp_dir.path());

    let provider = Provider::new(None, ORG, Some(&server.uri()), now).expect("Failed to create provider");
    provider.collect(&[REPO.to_string()], &store).await.expect("collect failed");

    let stats: GithubStats = store.load(SNAPSHOT).expect("snapshot missing");
    assert_eq!(stats.total_stars_last_year, 101);
    assert_eq!(stats.total_stars_last_month, 0);

    // Sub-statistics whose endpoints failed fall back to zeros.
    assert_eq!(stats.total_pull_requests_open, 0);
    assert_eq!(stats.total_issues_open, 0);

    // Absent Link header on the members probe means a single page.
    assert_eq!(stats.organization_members, 1);
}

#[tokio::test]
async fn test_malformed_repository_fails_collector() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{ORG}/{REPO}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": 42 })))
        .mount(&server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = SnapshotStore::new(temp_dir.path());

    let provider = Provider::new(None, ORG, Some(&server.uri()), Utc::now()).expect("Failed to create provider");
    let result = provider.collect(&[REPO.to_string()], &store).await;

    assert!(result.is_err());
    assert!(!store.path(SNAPSHOT).exists());
}
