use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cli::ProjectsConfig;
use crate::github::{GithubClient, Project, ProjectPatch};
use crate::pipeline::Pipeline;
use crate::rate::RateBudget;
use crate::transform::{add_provenance, redact, remap_identities, ProvenanceRecord};
use crate::users::IdentityMap;

struct FetchedProject {
    project: Project,
    columns: Vec<String>,
}

struct ProjectUnit {
    name: String,
    body: String,
    columns: Vec<String>,
    source_id: u64,
    copied: bool,
}

pub struct Projects {
    config: ProjectsConfig,
    fetch_budget: RateBudget,
    copy_budget: RateBudget,
    cleanup_budget: RateBudget,
    fetched: Vec<FetchedProject>,
    to_migrate: Vec<ProjectUnit>,
}

impl Projects {
    pub fn new(config: ProjectsConfig) -> Self {
        Projects {
            config,
            fetch_budget: RateBudget::standard(),
            copy_budget: RateBudget::standard(),
            cleanup_budget: RateBudget::standard(),
            fetched: Vec::new(),
            to_migrate: Vec::new(),
        }
    }

    fn included(&self, project: &Project) -> bool {
        self.config.names.is_empty() || self.config.names.contains(&project.name)
    }
}

#[async_trait]
impl Pipeline for Projects {
    fn kind(&self) -> &'static str {
        "projects"
    }

    async fn fetch(&mut self, source: &GithubClient) -> Result<()> {
        if !self.config.migrate {
            return Ok(());
        }

        info!(owner = %source.owner(), base_url = %source.base_url(), "getting projects");
        self.fetch_budget.acquire().await;
        let projects = match source.list_projects(self.config.state).await {
            Ok(projects) => projects,
            Err(error) => {
                warn!(owner = %source.owner(), %error, "could not get projects");
                return Ok(());
            }
        };
        debug!(owner = %source.owner(), count = projects.len(), "obtained projects");

        for project in projects {
            self.fetch_budget.acquire().await;
            let columns = match source.list_columns(project.id).await {
                Ok(columns) => columns.into_iter().map(|c| c.name).collect(),
                Err(error) => {
                    warn!(
                        project = %project.name,
                        %error,
                        "could not get columns, treating as none"
                    );
                    Vec::new()
                }
            };
            debug!(project = %project.name, columns = columns.len(), "obtained columns");

            self.fetched.push(FetchedProject { project, columns });
        }

        Ok(())
    }

    fn transform(&mut self, identities: &IdentityMap) {
        for fetched in std::mem::take(&mut self.fetched) {
            let project = &fetched.project;
            if !self.included(project) {
                debug!(project = %project.name, "filtered out");
                continue;
            }

            info!(project = %project.name, "processing project data");

            let mut body = redact(
                project.body.as_deref().unwrap_or(""),
                &self.config.redactions,
            );
            if self.config.add_provenance {
                let record = ProvenanceRecord::new(&project.creator.login)
                    .origin_url(&project.html_url)
                    .created_at(&project.created_at);
                body = add_provenance(&body, &record);
            }
            body = remap_identities(&body, identities);

            self.to_migrate.push(ProjectUnit {
                name: project.name.clone(),
                body,
                columns: fetched.columns,
                source_id: project.id,
                copied: false,
            });
        }
    }

    async fn copy(&mut self, destination: &GithubClient) -> Result<()> {
        let mut units = std::mem::take(&mut self.to_migrate);

        for unit in &mut units {
            info!(project = %unit.name, owner = %destination.owner(), "copying project");

            self.copy_budget.acquire().await;
            let created = match destination.create_project(&unit.name, &unit.body).await {
                Ok(project) => project,
                Err(error) if error.is_already_exists() => {
                    warn!(project = %unit.name, "project already exists");
                    continue;
                }
                Err(error) => {
                    warn!(project = %unit.name, %error, "could not copy project");
                    continue;
                }
            };

            for column in &unit.columns {
                info!(column = %column, project = %unit.name, owner = %destination.owner(), "copying column");
                self.copy_budget.acquire().await;
                if let Err(error) = destination.create_column(created.id, column).await {
                    warn!(
                        project = %unit.name,
                        column = %column,
                        %error,
                        "could not copy column"
                    );
                }
            }

            unit.copied = true;
        }

        self.to_migrate = units;
        Ok(())
    }

    async fn cleanup(&mut self, source: &GithubClient) -> Result<()> {
        if !self.config.close_on_migrate {
            return Ok(());
        }

        for unit in self.to_migrate.iter().filter(|u| u.copied) {
            self.cleanup_budget.acquire().await;
            let patch = ProjectPatch {
                name: None,
                state: Some("closed".to_string()),
            };
            match source.update_project(unit.source_id, &patch).await {
                Ok(()) => {
                    debug!(project = %unit.name, "closed source project");
                }
                Err(error) => {
                    warn!(project = %unit.name, %error, "could not close source project");
                }
            }
        }

        Ok(())
    }
}
