use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::cli::{DestinationEndpoint, SourceEndpoint, StateFilter};

const PER_PAGE: usize = 100;

/// Typed outcome of a client call, so pipelines branch on duplicates and
/// missing resources instead of swallowing unrelated failures.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ClientError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClientError::AlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub number: u64,
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub user: User,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub milestone: Option<Milestone>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub user: User,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub creator: User,
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectColumn {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
    pub target_commitish: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
    pub target_commitish: String,
}

/// Fields that can be rewritten on an existing classic project.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Authenticated client for one GitHub endpoint (one org, one token).
///
/// The source-side client also resolves and holds the configured
/// repository list; a failure anywhere in [`GithubClient::connect_source`]
/// or [`GithubClient::connect_destination`] is fatal initialization and
/// happens before any migration stage runs.
#[derive(Clone, Debug)]
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    owner: String,
    token: String,
    repositories: Vec<Repo>,
}

impl GithubClient {
    pub async fn connect_source(config: &SourceEndpoint) -> Result<Self, ClientError> {
        GithubClient::connect(
            &config.base_url,
            &config.owner,
            &config.token_env_var,
            &config.repositories,
        )
        .await
    }

    pub async fn connect_destination(config: &DestinationEndpoint) -> Result<Self, ClientError> {
        GithubClient::connect(&config.base_url, &config.owner, &config.token_env_var, &[]).await
    }

    async fn connect(
        base_url: &str,
        owner: &str,
        token_env_var: &str,
        repo_names: &[String],
    ) -> Result<Self, ClientError> {
        let token = std::env::var(token_env_var)
            .map_err(|_| ClientError::Auth(format!("environment variable {token_env_var} is not set")))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("ghmig/0.1"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let mut client = GithubClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            token,
            repositories: Vec::new(),
        };

        info!(base_url = %client.base_url, owner = %client.owner, "initializing client");

        // Organization lookup doubles as the auth check.
        let org_path = format!("/orgs/{owner}");
        client.get_json::<serde_json::Value>(&org_path, &[]).await?;

        for name in repo_names {
            let repo: Repo = client
                .get_json(&format!("/repos/{owner}/{name}"), &[])
                .await?;
            client.repositories.push(repo);
        }

        info!(
            base_url = %client.base_url,
            repos = client.repositories.len(),
            "client initialization complete"
        );
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repositories(&self) -> &[Repo] {
        &self.repositories
    }

    pub async fn get_user(&self, handle: &str) -> Result<User, ClientError> {
        debug!(handle = %handle, base_url = %self.base_url, "getting user");
        self.get_json(&format!("/users/{handle}"), &[]).await
    }

    pub async fn list_issues(
        &self,
        repo: &str,
        state: StateFilter,
    ) -> Result<Vec<Issue>, ClientError> {
        self.get_paged(
            &format!("/repos/{}/{repo}/issues", self.owner),
            &[("state", state.to_string())],
        )
        .await
    }

    pub async fn list_comments(&self, repo: &str, number: u64) -> Result<Vec<Comment>, ClientError> {
        self.get_paged(
            &format!("/repos/{}/{repo}/issues/{number}/comments", self.owner),
            &[],
        )
        .await
    }

    pub async fn create_issue(&self, repo: &str, issue: &NewIssue) -> Result<Issue, ClientError> {
        let response = self
            .request(
                Method::POST,
                &format!("/repos/{}/{repo}/issues", self.owner),
                issue,
                false,
            )
            .await?;

        let response = Self::check(response, &format!("issue `{}`", issue.title)).await?;
        Ok(response.json().await?)
    }

    pub async fn add_comment(&self, repo: &str, number: u64, body: &str) -> Result<(), ClientError> {
        let response = self
            .request(
                Method::POST,
                &format!("/repos/{}/{repo}/issues/{number}/comments", self.owner),
                &serde_json::json!({ "body": body }),
                false,
            )
            .await?;

        Self::check(response, &format!("comment on issue #{number}")).await?;
        Ok(())
    }

    pub async fn add_labels(
        &self,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<(), ClientError> {
        if labels.is_empty() {
            return Ok(());
        }

        let response = self
            .request(
                Method::POST,
                &format!("/repos/{}/{repo}/issues/{number}/labels", self.owner),
                &serde_json::json!({ "labels": labels }),
                false,
            )
            .await?;

        Self::check(response, &format!("labels on issue #{number}")).await?;
        Ok(())
    }

    pub async fn lock_issue(&self, repo: &str, number: u64, reason: &str) -> Result<(), ClientError> {
        let response = self
            .request(
                Method::PUT,
                &format!("/repos/{}/{repo}/issues/{number}/lock", self.owner),
                &serde_json::json!({ "lock_reason": reason }),
                false,
            )
            .await?;

        Self::check(response, &format!("lock on issue #{number}")).await?;
        Ok(())
    }

    pub async fn close_issue(&self, repo: &str, number: u64) -> Result<(), ClientError> {
        let response = self
            .request(
                Method::PATCH,
                &format!("/repos/{}/{repo}/issues/{number}", self.owner),
                &serde_json::json!({ "state": "closed" }),
                false,
            )
            .await?;

        Self::check(response, &format!("issue #{number}")).await?;
        Ok(())
    }

    pub async fn list_labels(&self, repo: &str) -> Result<Vec<Label>, ClientError> {
        self.get_paged(&format!("/repos/{}/{repo}/labels", self.owner), &[])
            .await
    }

    pub async fn create_label(&self, repo: &str, label: &Label) -> Result<(), ClientError> {
        let response = self
            .request(
                Method::POST,
                &format!("/repos/{}/{repo}/labels", self.owner),
                &serde_json::json!({
                    "name": label.name,
                    "color": label.color,
                    "description": label.description,
                }),
                false,
            )
            .await?;

        Self::check(response, &format!("label `{}`", label.name)).await?;
        Ok(())
    }

    pub async fn list_milestones(
        &self,
        repo: &str,
        state: StateFilter,
    ) -> Result<Vec<Milestone>, ClientError> {
        self.get_paged(
            &format!("/repos/{}/{repo}/milestones", self.owner),
            &[("state", state.to_string())],
        )
        .await
    }

    pub async fn create_milestone(
        &self,
        repo: &str,
        title: &str,
        state: &str,
        description: Option<&str>,
    ) -> Result<(), ClientError> {
        let response = self
            .request(
                Method::POST,
                &format!("/repos/{}/{repo}/milestones", self.owner),
                &serde_json::json!({
                    "title": title,
                    "state": state,
                    "description": description,
                }),
                false,
            )
            .await?;

        Self::check(response, &format!("milestone `{title}`")).await?;
        Ok(())
    }

    pub async fn list_projects(&self, state: StateFilter) -> Result<Vec<Project>, ClientError> {
        self.get_paged_with(
            &format!("/orgs/{}/projects", self.owner),
            &[("state", state.to_string())],
            true,
        )
        .await
    }

    pub async fn list_columns(&self, project_id: u64) -> Result<Vec<ProjectColumn>, ClientError> {
        self.get_paged_with(&format!("/projects/{project_id}/columns"), &[], true)
            .await
    }

    pub async fn create_project(&self, name: &str, body: &str) -> Result<Project, ClientError> {
        let response = self
            .request(
                Method::POST,
                &format!("/orgs/{}/projects", self.owner),
                &serde_json::json!({ "name": name, "body": body }),
                true,
            )
            .await?;

        let response = Self::check(response, &format!("project `{name}`")).await?;
        Ok(response.json().await?)
    }

    pub async fn create_column(&self, project_id: u64, name: &str) -> Result<(), ClientError> {
        let response = self
            .request(
                Method::POST,
                &format!("/projects/{project_id}/columns"),
                &serde_json::json!({ "name": name }),
                true,
            )
            .await?;

        Self::check(response, &format!("column `{name}`")).await?;
        Ok(())
    }

    pub async fn update_project(
        &self,
        project_id: u64,
        patch: &ProjectPatch,
    ) -> Result<(), ClientError> {
        let response = self
            .request(
                Method::PATCH,
                &format!("/projects/{project_id}"),
                patch,
                true,
            )
            .await?;

        Self::check(response, &format!("project {project_id}")).await?;
        Ok(())
    }

    pub async fn list_releases(&self, repo: &str) -> Result<Vec<Release>, ClientError> {
        self.get_paged(&format!("/repos/{}/{repo}/releases", self.owner), &[])
            .await
    }

    pub async fn get_latest_release(&self, repo: &str) -> Result<Release, ClientError> {
        self.get_json(&format!("/repos/{}/{repo}/releases/latest", self.owner), &[])
            .await
    }

    pub async fn create_release(
        &self,
        repo: &str,
        release: &NewRelease,
    ) -> Result<(), ClientError> {
        let response = self
            .request(
                Method::POST,
                &format!("/repos/{}/{repo}/releases", self.owner),
                release,
                false,
            )
            .await?;

        Self::check(response, &format!("release `{}`", release.name)).await?;
        Ok(())
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        projects_preview: bool,
    ) -> Result<Response, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .http
            .request(method, &url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token));

        // The classic Projects API only answers to its preview media type.
        if projects_preview {
            request = request.header(ACCEPT, "application/vnd.github.inertia-preview+json");
        }

        Ok(request.json(body).send().await?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .query(query)
            .send()
            .await?;

        let response = Self::check(response, path).await?;
        Ok(response.json().await?)
    }

    async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ClientError> {
        self.get_paged_with(path, query, false).await
    }

    async fn get_paged_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        projects_preview: bool,
    ) -> Result<Vec<T>, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let mut items = Vec::new();
        let mut page: usize = 1;

        loop {
            let mut request = self
                .http
                .get(&url)
                .header(AUTHORIZATION, format!("Bearer {}", self.token))
                .query(query)
                .query(&[
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ]);

            if projects_preview {
                request = request.header(ACCEPT, "application/vnd.github.inertia-preview+json");
            }

            let response = Self::check(request.send().await?, path).await?;
            let batch: Vec<T> = response.json().await?;
            let batch_len = batch.len();
            items.extend(batch);

            if batch_len < PER_PAGE {
                return Ok(items);
            }
            page += 1;
        }
    }

    /// Map an error response onto the typed taxonomy. 404 means the
    /// resource is absent; a 422 whose error details carry the
    /// `already_exists` code means a duplicate create.
    async fn check(response: Response, resource: &str) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                resource: resource.to_string(),
            });
        }

        let text = response.text().await.unwrap_or_default();
        let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or(ApiErrorBody {
            message: text.clone(),
            errors: Vec::new(),
        });

        if status == StatusCode::UNPROCESSABLE_ENTITY
            && body.errors.iter().any(|e| e.code == "already_exists")
        {
            return Err(ClientError::AlreadyExists {
                resource: resource.to_string(),
            });
        }

        Err(ClientError::Api {
            status: status.as_u16(),
            message: body.message,
        })
    }
}
