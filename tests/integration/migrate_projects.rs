use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ghmig::cli::{DestinationEndpoint, ProjectsConfig, SourceEndpoint, StateFilter};
use ghmig::fixtures::models::{column, project, user};
use ghmig::github::GithubClient;
use ghmig::pipeline::Pipeline;
use ghmig::projects::Projects;
use ghmig::users::IdentityMap;

use crate::mocks::github::{get_json_mock, mount_endpoint, post_json_mock, requests_for};

#[tokio::test]
async fn copies_named_projects_with_columns_and_closes_source() {
    std::env::set_var("PRJ_SRC_TOKEN", "source-token");
    std::env::set_var("PRJ_DST_TOKEN", "destination-token");

    let mock_server = MockServer::start().await;
    mount_endpoint(&mock_server, "my_org", &["repo_one"]).await;
    mount_endpoint(&mock_server, "my_new_org", &[]).await;

    let roadmap = project(7, "Roadmap", Some("Planning board"), user("carol"));
    let internal = project(8, "Internal", Some("Not migrated"), user("carol"));
    get_json_mock("/orgs/my_org/projects", json!([&roadmap, &internal]))
        .mount(&mock_server)
        .await;
    get_json_mock(
        "/projects/7/columns",
        json!([&column("Todo"), &column("Doing"), &column("Done")]),
    )
    .mount(&mock_server)
    .await;
    get_json_mock("/projects/8/columns", json!([]))
        .mount(&mock_server)
        .await;

    let created = project(70, "Roadmap", Some("Planning board"), user("carol"));
    post_json_mock("/orgs/my_new_org/projects", 201, json!(&created))
        .mount(&mock_server)
        .await;
    post_json_mock("/projects/70/columns", 201, json!({}))
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/projects/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let source = GithubClient::connect_source(&SourceEndpoint {
        base_url: mock_server.uri(),
        owner: "my_org".to_string(),
        token_env_var: "PRJ_SRC_TOKEN".to_string(),
        repositories: vec!["repo_one".to_string()],
    })
    .await
    .unwrap();
    let destination = GithubClient::connect_destination(&DestinationEndpoint {
        base_url: mock_server.uri(),
        owner: "my_new_org".to_string(),
        token_env_var: "PRJ_DST_TOKEN".to_string(),
    })
    .await
    .unwrap();

    let mut pipeline = Projects::new(ProjectsConfig {
        migrate: true,
        state: StateFilter::All,
        add_provenance: true,
        redactions: vec![],
        names: vec!["Roadmap".to_string()],
        close_on_migrate: true,
    });
    pipeline.fetch(&source).await.unwrap();
    pipeline.transform(&IdentityMap::default());
    pipeline.copy(&destination).await.unwrap();
    pipeline.cleanup(&source).await.unwrap();

    // Only the allow-listed project was created, with its provenance block.
    let created_posts = requests_for(&mock_server, "POST", "/orgs/my_new_org/projects").await;
    assert_eq!(created_posts.len(), 1);
    assert_eq!(created_posts[0].1["name"], "Roadmap");
    let body = created_posts[0].1["body"].as_str().unwrap();
    assert!(body.starts_with("Planning board"));
    assert!(body.contains("Creator: carol"));
    assert!(body.contains("Created at: "));

    // Columns in original order, on the freshly created project.
    let column_posts = requests_for(&mock_server, "POST", "/projects/70/columns").await;
    let names: Vec<&str> = column_posts
        .iter()
        .map(|(_, b)| b["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Todo", "Doing", "Done"]);

    // The source project was closed only after its copy succeeded.
    let patches = requests_for(&mock_server, "PATCH", "/projects/7").await;
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].1["state"], "closed");
}
