use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cli::ReleasesConfig;
use crate::github::{GithubClient, NewRelease, Release};
use crate::pipeline::Pipeline;
use crate::rate::RateBudget;
use crate::users::IdentityMap;

/// Pause between release creations; tag creation is throttled separately
/// from the primary API quota.
const RELEASE_CREATE_DELAY: Duration = Duration::from_secs(3);

struct RepoReleases {
    repo: String,
    releases: Vec<Release>,
    latest: Option<Release>,
}

pub struct Releases {
    config: ReleasesConfig,
    fetch_budget: RateBudget,
    copy_budget: RateBudget,
    copy_delay: Duration,
    fetched: Vec<RepoReleases>,
    to_migrate: Vec<RepoReleases>,
}

impl Releases {
    pub fn new(config: ReleasesConfig) -> Self {
        Releases {
            config,
            fetch_budget: RateBudget::standard(),
            copy_budget: RateBudget::standard(),
            copy_delay: RELEASE_CREATE_DELAY,
            fetched: Vec::new(),
            to_migrate: Vec::new(),
        }
    }

    /// Override the inter-release delay (for tests against a mock server).
    pub fn with_copy_delay(mut self, delay: Duration) -> Self {
        self.copy_delay = delay;
        self
    }
}

/// Creation order for one repo: every non-latest release first, the latest
/// release last, exactly once. "Latest" is whatever the separately-fetched
/// pointer names, matched by title, never by recency. With no pointer the
/// list order stands.
fn order_for_copy<'a>(releases: &'a [Release], latest: Option<&'a Release>) -> Vec<&'a Release> {
    match latest {
        None => releases.iter().collect(),
        Some(latest) => {
            let mut ordered: Vec<&Release> =
                releases.iter().filter(|r| r.name != latest.name).collect();
            ordered.push(latest);
            ordered
        }
    }
}

#[async_trait]
impl Pipeline for Releases {
    fn kind(&self) -> &'static str {
        "releases"
    }

    async fn fetch(&mut self, source: &GithubClient) -> Result<()> {
        if !self.config.migrate {
            return Ok(());
        }

        for repo in source.repositories() {
            info!(repo = %repo.name, base_url = %source.base_url(), "getting releases");

            self.fetch_budget.acquire().await;
            let releases = match source.list_releases(&repo.name).await {
                Ok(releases) => releases,
                Err(error) => {
                    warn!(repo = %repo.name, %error, "could not get releases, treating as none");
                    Vec::new()
                }
            };

            self.fetch_budget.acquire().await;
            let latest = match source.get_latest_release(&repo.name).await {
                Ok(latest) => Some(latest),
                Err(error) if error.is_not_found() => {
                    debug!(repo = %repo.name, "repo has no latest release");
                    None
                }
                Err(error) => {
                    warn!(repo = %repo.name, %error, "could not get latest release");
                    None
                }
            };

            debug!(
                repo = %repo.name,
                count = releases.len(),
                has_latest = latest.is_some(),
                "obtained releases"
            );
            self.fetched.push(RepoReleases {
                repo: repo.name.clone(),
                releases,
                latest,
            });
        }

        Ok(())
    }

    fn transform(&mut self, _identities: &IdentityMap) {
        // Releases are copied verbatim; ordering happens at copy time.
        self.to_migrate = std::mem::take(&mut self.fetched);
    }

    async fn copy(&mut self, destination: &GithubClient) -> Result<()> {
        for unit in &self.to_migrate {
            let ordered = order_for_copy(&unit.releases, unit.latest.as_ref());
            if ordered.is_empty() {
                continue;
            }

            info!(repo = %unit.repo, base_url = %destination.base_url(), "copying releases");
            let mut first = true;

            for release in ordered {
                if !first {
                    sleep(self.copy_delay).await;
                }
                first = false;

                let title = release
                    .name
                    .clone()
                    .unwrap_or_else(|| release.tag_name.clone());
                let new_release = NewRelease {
                    tag_name: release.tag_name.clone(),
                    name: title.clone(),
                    body: release.body.clone().unwrap_or_default(),
                    draft: release.draft,
                    prerelease: release.prerelease,
                    target_commitish: release.target_commitish.clone(),
                };

                self.copy_budget.acquire().await;
                match destination.create_release(&unit.repo, &new_release).await {
                    Ok(()) => {
                        debug!(repo = %unit.repo, release = %title, "copied release");
                    }
                    Err(error) if error.is_already_exists() => {
                        warn!(
                            repo = %unit.repo,
                            release = %title,
                            "release already exists or its tag is taken"
                        );
                    }
                    Err(error) => {
                        warn!(repo = %unit.repo, release = %title, %error, "could not copy release");
                    }
                }
            }
        }

        Ok(())
    }
}
