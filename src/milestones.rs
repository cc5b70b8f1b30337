use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cli::MilestonesConfig;
use crate::github::{GithubClient, Milestone};
use crate::pipeline::Pipeline;
use crate::rate::RateBudget;
use crate::users::IdentityMap;

struct RepoMilestones {
    repo: String,
    milestones: Vec<Milestone>,
}

pub struct Milestones {
    config: MilestonesConfig,
    fetch_budget: RateBudget,
    copy_budget: RateBudget,
    fetched: Vec<RepoMilestones>,
    to_migrate: Vec<RepoMilestones>,
}

impl Milestones {
    pub fn new(config: MilestonesConfig) -> Self {
        Milestones {
            config,
            fetch_budget: RateBudget::standard(),
            copy_budget: RateBudget::standard(),
            fetched: Vec::new(),
            to_migrate: Vec::new(),
        }
    }
}

#[async_trait]
impl Pipeline for Milestones {
    fn kind(&self) -> &'static str {
        "milestones"
    }

    async fn fetch(&mut self, source: &GithubClient) -> Result<()> {
        if !self.config.migrate {
            return Ok(());
        }

        for repo in source.repositories() {
            info!(repo = %repo.name, base_url = %source.base_url(), "getting milestones");
            self.fetch_budget.acquire().await;
            match source.list_milestones(&repo.name, self.config.state).await {
                Ok(milestones) => {
                    debug!(repo = %repo.name, count = milestones.len(), "obtained milestones");
                    self.fetched.push(RepoMilestones {
                        repo: repo.name.clone(),
                        milestones,
                    });
                }
                Err(error) => {
                    warn!(repo = %repo.name, %error, "could not get milestones, skipping repo");
                }
            }
        }

        Ok(())
    }

    fn transform(&mut self, _identities: &IdentityMap) {
        // No text fields and no configured filter for milestones.
        self.to_migrate = std::mem::take(&mut self.fetched);
    }

    async fn copy(&mut self, destination: &GithubClient) -> Result<()> {
        for unit in &self.to_migrate {
            info!(repo = %unit.repo, base_url = %destination.base_url(), "copying milestones");

            for milestone in &unit.milestones {
                self.copy_budget.acquire().await;
                let result = destination
                    .create_milestone(
                        &unit.repo,
                        &milestone.title,
                        &milestone.state,
                        milestone.description.as_deref(),
                    )
                    .await;

                match result {
                    Ok(()) => {
                        debug!(repo = %unit.repo, milestone = %milestone.title, "copied milestone");
                    }
                    Err(error) if error.is_already_exists() => {
                        warn!(repo = %unit.repo, milestone = %milestone.title, "milestone already exists");
                    }
                    Err(error) => {
                        warn!(repo = %unit.repo, milestone = %milestone.title, %error, "could not copy milestone");
                    }
                }
            }
        }

        Ok(())
    }
}
