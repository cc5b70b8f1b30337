use std::time::Duration;

use regex::Regex;
use serde_json::json;
use wiremock::MockServer;

use ghmig::cli::{
    DestinationEndpoint, IssuesConfig, LabelsConfig, MilestonesConfig, ParsedConfig,
    ProjectsConfig, ReleasesConfig, SourceEndpoint, StateFilter, UserPair,
};
use ghmig::fixtures::models::{comment, issue, label, user};
use ghmig::github::GithubClient;
use ghmig::issues::Issues;
use ghmig::pipeline::Pipeline;
use ghmig::users::IdentityMap;

use crate::mocks::github::{get_json_mock, mount_endpoint, mount_user, post_json_mock, requests_for};

fn source_endpoint(server: &MockServer, token_env_var: &str) -> SourceEndpoint {
    SourceEndpoint {
        base_url: server.uri(),
        owner: "my_org".to_string(),
        token_env_var: token_env_var.to_string(),
        repositories: vec!["repo_one".to_string()],
    }
}

fn destination_endpoint(server: &MockServer, token_env_var: &str) -> DestinationEndpoint {
    DestinationEndpoint {
        base_url: server.uri(),
        owner: "my_new_org".to_string(),
        token_env_var: token_env_var.to_string(),
    }
}

fn issues_config() -> IssuesConfig {
    IssuesConfig {
        migrate: true,
        state: StateFilter::All,
        add_provenance: false,
        redactions: vec![],
        authors: vec![],
        labels: vec![],
        close_on_migrate: false,
        lock_on_migrate: false,
        add_migrated_label: false,
    }
}

/// Full-run scenario: one issue by `alice` labeled `bug` with a comment by
/// `bob`, author allow-list `alice`, identity map `alice -> alice2`,
/// `bob -> bob2`, provenance and the migrated marker switched on.
#[tokio::test]
async fn end_to_end_issue_migration() {
    std::env::set_var("E2E_SRC_TOKEN", "source-token");
    std::env::set_var("E2E_DST_TOKEN", "destination-token");

    let mock_server = MockServer::start().await;
    mount_endpoint(&mock_server, "my_org", &["repo_one"]).await;
    mount_endpoint(&mock_server, "my_new_org", &[]).await;
    for handle in ["alice", "bob", "alice2", "bob2"] {
        mount_user(&mock_server, handle).await;
    }

    let source_issue = issue(
        1,
        "Deploy breaks on restart",
        Some("Deploy key is secret-42, ask alice"),
        user("alice"),
        vec![label("bug")],
        None,
    );
    get_json_mock("/repos/my_org/repo_one/issues", json!([&source_issue]))
        .mount(&mock_server)
        .await;
    get_json_mock(
        "/repos/my_org/repo_one/issues/1/comments",
        json!([&comment("bob will look into it", user("bob"))]),
    )
    .mount(&mock_server)
    .await;
    get_json_mock("/repos/my_org/repo_one/labels", json!([&label("bug")]))
        .mount(&mock_server)
        .await;

    let created_issue = issue(10, "Deploy breaks on restart", None, user("alice2"), vec![], None);
    post_json_mock("/repos/my_new_org/repo_one/issues", 201, json!(&created_issue))
        .mount(&mock_server)
        .await;
    post_json_mock("/repos/my_new_org/repo_one/issues/10/comments", 201, json!({}))
        .mount(&mock_server)
        .await;
    post_json_mock("/repos/my_new_org/repo_one/labels", 201, json!({}))
        .mount(&mock_server)
        .await;
    post_json_mock("/repos/my_org/repo_one/issues/1/labels", 200, json!([]))
        .mount(&mock_server)
        .await;

    let config = ParsedConfig {
        source: source_endpoint(&mock_server, "E2E_SRC_TOKEN"),
        destination: destination_endpoint(&mock_server, "E2E_DST_TOKEN"),
        issues: IssuesConfig {
            add_provenance: true,
            redactions: vec![Regex::new("secret-\\d+").unwrap()],
            authors: vec!["alice".to_string()],
            add_migrated_label: true,
            ..issues_config()
        },
        projects: ProjectsConfig {
            migrate: false,
            state: StateFilter::All,
            add_provenance: false,
            redactions: vec![],
            names: vec![],
            close_on_migrate: false,
        },
        labels: LabelsConfig { migrate: true },
        milestones: MilestonesConfig {
            migrate: false,
            state: StateFilter::All,
        },
        releases: ReleasesConfig { migrate: false },
        users: vec![
            UserPair {
                source: "alice".to_string(),
                destination: "alice2".to_string(),
            },
            UserPair {
                source: "bob".to_string(),
                destination: "bob2".to_string(),
            },
        ],
    };

    ghmig::migrator::run(config).await.unwrap();

    // The destination issue: title untouched, body redacted, remapped and
    // ending in a provenance block citing the remapped author.
    let created = requests_for(&mock_server, "POST", "/repos/my_new_org/repo_one/issues").await;
    assert_eq!(created.len(), 1);
    let body = &created[0].1;
    assert_eq!(body["title"], "Deploy breaks on restart");
    let issue_body = body["body"].as_str().unwrap();
    assert!(issue_body.starts_with("Deploy key is <redacted>, ask alice2"));
    assert!(issue_body.contains("Provenance: "));
    assert!(issue_body.contains("Creator: alice2"));
    assert!(!issue_body.contains("secret-42"));
    assert_eq!(body["labels"], json!(["bug"]));

    // One comment, attributed to the remapped commenter.
    let comments =
        requests_for(&mock_server, "POST", "/repos/my_new_org/repo_one/issues/10/comments").await;
    assert_eq!(comments.len(), 1);
    let comment_body = comments[0].1["body"].as_str().unwrap();
    assert!(comment_body.starts_with("bob2 will look into it"));
    assert!(comment_body.contains("Creator: bob2"));

    // The `bug` label arrived and the marker label was seeded.
    let copied_labels =
        requests_for(&mock_server, "POST", "/repos/my_new_org/repo_one/labels").await;
    let names: Vec<&str> = copied_labels
        .iter()
        .map(|(_, b)| b["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["bug", "migrated"]);

    // The source issue got its marker only after the copy succeeded.
    let marked = requests_for(&mock_server, "POST", "/repos/my_org/repo_one/issues/1/labels").await;
    assert_eq!(marked.len(), 1);
    assert_eq!(marked[0].1["labels"], json!(["migrated"]));
}

/// An issue already carrying the `migrated` label never re-enters the
/// candidate set: no comment fetch, no destination create.
#[tokio::test]
async fn marked_issues_are_excluded_from_fetch() {
    std::env::set_var("SKIP_SRC_TOKEN", "source-token");
    std::env::set_var("SKIP_DST_TOKEN", "destination-token");

    let mock_server = MockServer::start().await;
    mount_endpoint(&mock_server, "my_org", &["repo_one"]).await;
    mount_endpoint(&mock_server, "my_new_org", &[]).await;

    let already_migrated = issue(
        1,
        "Old news",
        Some("done long ago"),
        user("alice"),
        vec![label("bug"), label("migrated")],
        None,
    );
    let fresh = issue(2, "Fresh issue", Some("new"), user("alice"), vec![], None);
    get_json_mock(
        "/repos/my_org/repo_one/issues",
        json!([&already_migrated, &fresh]),
    )
    .mount(&mock_server)
    .await;
    get_json_mock("/repos/my_org/repo_one/issues/2/comments", json!([]))
        .mount(&mock_server)
        .await;

    let created_issue = issue(20, "Fresh issue", None, user("alice"), vec![], None);
    post_json_mock("/repos/my_new_org/repo_one/issues", 201, json!(&created_issue))
        .mount(&mock_server)
        .await;

    let source = GithubClient::connect_source(&source_endpoint(&mock_server, "SKIP_SRC_TOKEN"))
        .await
        .unwrap();
    let destination =
        GithubClient::connect_destination(&destination_endpoint(&mock_server, "SKIP_DST_TOKEN"))
            .await
            .unwrap();

    let mut pipeline = Issues::new(issues_config()).with_copy_delay(Duration::ZERO);
    pipeline.fetch(&source).await.unwrap();
    pipeline.transform(&IdentityMap::default());
    pipeline.copy(&destination).await.unwrap();

    let created = requests_for(&mock_server, "POST", "/repos/my_new_org/repo_one/issues").await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].1["title"], "Fresh issue");

    let comment_fetches =
        requests_for(&mock_server, "GET", "/repos/my_org/repo_one/issues/1/comments").await;
    assert!(comment_fetches.is_empty());
}
