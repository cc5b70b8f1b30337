use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cli::LabelsConfig;
use crate::github::{GithubClient, Label};
use crate::pipeline::Pipeline;
use crate::rate::RateBudget;
use crate::users::IdentityMap;

/// Marker label written onto migrated source issues. Label copy seeds it
/// on every destination repo so issue cleanup can reference it.
pub const MIGRATED_LABEL: &str = "migrated";
const MIGRATED_LABEL_COLOR: &str = "ededed";

struct RepoLabels {
    repo: String,
    labels: Vec<Label>,
}

pub struct Labels {
    config: LabelsConfig,
    seed_migrated_label: bool,
    fetch_budget: RateBudget,
    copy_budget: RateBudget,
    fetched: Vec<RepoLabels>,
    to_migrate: Vec<RepoLabels>,
}

impl Labels {
    /// `seed_migrated_label` comes from the Issues section: when issue
    /// cleanup will tag source issues, label copy must make sure the
    /// marker label exists on the destination first.
    pub fn new(config: LabelsConfig, seed_migrated_label: bool) -> Self {
        Labels {
            config,
            seed_migrated_label,
            fetch_budget: RateBudget::standard(),
            copy_budget: RateBudget::standard(),
            fetched: Vec::new(),
            to_migrate: Vec::new(),
        }
    }
}

#[async_trait]
impl Pipeline for Labels {
    fn kind(&self) -> &'static str {
        "labels"
    }

    async fn fetch(&mut self, source: &GithubClient) -> Result<()> {
        if !self.config.migrate {
            return Ok(());
        }

        for repo in source.repositories() {
            info!(repo = %repo.name, base_url = %source.base_url(), "getting labels");
            self.fetch_budget.acquire().await;
            match source.list_labels(&repo.name).await {
                Ok(labels) => {
                    debug!(repo = %repo.name, count = labels.len(), "obtained labels");
                    self.fetched.push(RepoLabels {
                        repo: repo.name.clone(),
                        labels,
                    });
                }
                Err(error) => {
                    warn!(repo = %repo.name, %error, "could not get labels, skipping repo");
                }
            }
        }

        Ok(())
    }

    fn transform(&mut self, _identities: &IdentityMap) {
        // Labels carry no free text; every fetched label becomes a unit.
        self.to_migrate = std::mem::take(&mut self.fetched);
    }

    async fn copy(&mut self, destination: &GithubClient) -> Result<()> {
        for unit in &self.to_migrate {
            info!(repo = %unit.repo, base_url = %destination.base_url(), "copying labels");

            for label in &unit.labels {
                self.copy_budget.acquire().await;
                match destination.create_label(&unit.repo, label).await {
                    Ok(()) => {
                        debug!(repo = %unit.repo, label = %label.name, "copied label");
                    }
                    Err(error) if error.is_already_exists() => {
                        warn!(repo = %unit.repo, label = %label.name, "label already exists");
                    }
                    Err(error) => {
                        warn!(repo = %unit.repo, label = %label.name, %error, "could not copy label");
                    }
                }
            }

            if self.seed_migrated_label {
                self.copy_budget.acquire().await;
                let marker = Label {
                    name: MIGRATED_LABEL.to_string(),
                    color: MIGRATED_LABEL_COLOR.to_string(),
                    description: Some("Migrated from the source organization".to_string()),
                };
                match destination.create_label(&unit.repo, &marker).await {
                    Ok(()) => {
                        debug!(repo = %unit.repo, "seeded migrated marker label");
                    }
                    Err(error) if error.is_already_exists() => {
                        debug!(repo = %unit.repo, "migrated marker label already present");
                    }
                    Err(error) => {
                        warn!(repo = %unit.repo, %error, "could not seed migrated marker label");
                    }
                }
            }
        }

        Ok(())
    }
}
