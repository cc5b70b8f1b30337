use serde_json::json;
use wiremock::MockServer;

use ghmig::cli::{DestinationEndpoint, MilestonesConfig, SourceEndpoint, StateFilter};
use ghmig::fixtures::models::milestone;
use ghmig::github::GithubClient;
use ghmig::milestones::Milestones;
use ghmig::pipeline::Pipeline;
use ghmig::users::IdentityMap;

use crate::mocks::github::{already_exists_mock, get_json_mock, mount_endpoint, requests_for};

#[tokio::test]
async fn copies_milestones_and_skips_duplicates() {
    std::env::set_var("MS_SRC_TOKEN", "source-token");
    std::env::set_var("MS_DST_TOKEN", "destination-token");

    let mock_server = MockServer::start().await;
    mount_endpoint(&mock_server, "my_org", &["repo_one"]).await;
    mount_endpoint(&mock_server, "my_new_org", &[]).await;

    get_json_mock(
        "/repos/my_org/repo_one/milestones",
        json!([&milestone(1, "v1.0"), &milestone(2, "v2.0")]),
    )
    .mount(&mock_server)
    .await;

    // Every create answers "already exists"; the run must still attempt
    // both milestones rather than stop at the first.
    already_exists_mock("/repos/my_new_org/repo_one/milestones")
        .mount(&mock_server)
        .await;

    let source = GithubClient::connect_source(&SourceEndpoint {
        base_url: mock_server.uri(),
        owner: "my_org".to_string(),
        token_env_var: "MS_SRC_TOKEN".to_string(),
        repositories: vec!["repo_one".to_string()],
    })
    .await
    .unwrap();
    let destination = GithubClient::connect_destination(&DestinationEndpoint {
        base_url: mock_server.uri(),
        owner: "my_new_org".to_string(),
        token_env_var: "MS_DST_TOKEN".to_string(),
    })
    .await
    .unwrap();

    let mut pipeline = Milestones::new(MilestonesConfig {
        migrate: true,
        state: StateFilter::All,
    });
    pipeline.fetch(&source).await.unwrap();
    pipeline.transform(&IdentityMap::default());
    pipeline.copy(&destination).await.unwrap();

    let posted = requests_for(&mock_server, "POST", "/repos/my_new_org/repo_one/milestones").await;
    let titles: Vec<&str> = posted
        .iter()
        .map(|(_, b)| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["v1.0", "v2.0"]);
}
