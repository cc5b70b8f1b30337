use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cli::{IssuesConfig, StateFilter};
use crate::github::{Comment, GithubClient, Issue, NewIssue};
use crate::labels::MIGRATED_LABEL;
use crate::pipeline::Pipeline;
use crate::rate::RateBudget;
use crate::transform::{add_provenance, redact, remap_identities, ProvenanceRecord};
use crate::users::IdentityMap;

/// Pause between comment creations, on top of the stage budget. GitHub
/// throttles rapid content creation separately from the primary quota.
const COMMENT_CREATE_DELAY: Duration = Duration::from_secs(1);

const LOCK_REASON: &str = "resolved";
const LOCK_COMMENT: &str =
    "This issue has been migrated to another organization and is now locked.";

struct FetchedIssue {
    repo: String,
    issue: Issue,
    comments: Vec<Comment>,
}

struct IssueUnit {
    repo: String,
    source_number: u64,
    title: String,
    body: String,
    comments: Vec<String>,
    labels: Vec<String>,
    milestone: Option<String>,
    copied: bool,
}

pub struct Issues {
    config: IssuesConfig,
    fetch_budget: RateBudget,
    copy_budget: RateBudget,
    cleanup_budget: RateBudget,
    copy_delay: Duration,
    fetched: Vec<FetchedIssue>,
    to_migrate: Vec<IssueUnit>,
}

impl Issues {
    pub fn new(config: IssuesConfig) -> Self {
        Issues {
            config,
            fetch_budget: RateBudget::new(50, Duration::from_secs(30)),
            copy_budget: RateBudget::standard(),
            cleanup_budget: RateBudget::standard(),
            copy_delay: COMMENT_CREATE_DELAY,
            fetched: Vec::new(),
            to_migrate: Vec::new(),
        }
    }

    /// Override the inter-comment delay (for tests against a mock server).
    pub fn with_copy_delay(mut self, delay: Duration) -> Self {
        self.copy_delay = delay;
        self
    }

    /// Author and label allow-lists; an empty list allows everything.
    fn included(&self, issue: &Issue) -> bool {
        let author_ok = self.config.authors.is_empty()
            || self.config.authors.iter().any(|a| *a == issue.user.login);
        let label_ok = self.config.labels.is_empty()
            || issue
                .labels
                .iter()
                .any(|l| self.config.labels.contains(&l.name));

        author_ok && label_ok
    }

    /// Milestone numbers differ between endpoints, so a unit's milestone
    /// title is resolved against the destination repo at copy time.
    async fn destination_milestone(
        &mut self,
        destination: &GithubClient,
        cache: &mut HashMap<String, HashMap<String, u64>>,
        repo: &str,
        title: &str,
    ) -> Option<u64> {
        if !cache.contains_key(repo) {
            self.copy_budget.acquire().await;
            let by_title = match destination.list_milestones(repo, StateFilter::All).await {
                Ok(milestones) => milestones
                    .into_iter()
                    .map(|m| (m.title, m.number))
                    .collect(),
                Err(error) => {
                    warn!(repo = %repo, %error, "could not list destination milestones");
                    HashMap::new()
                }
            };
            cache.insert(repo.to_string(), by_title);
        }

        cache.get(repo).and_then(|by_title| by_title.get(title)).copied()
    }
}

#[async_trait]
impl Pipeline for Issues {
    fn kind(&self) -> &'static str {
        "issues"
    }

    async fn fetch(&mut self, source: &GithubClient) -> Result<()> {
        if !self.config.migrate {
            return Ok(());
        }

        for repo in source.repositories() {
            info!(repo = %repo.name, base_url = %source.base_url(), "getting issues");
            self.fetch_budget.acquire().await;
            let issues = match source.list_issues(&repo.name, self.config.state).await {
                Ok(issues) => issues,
                Err(error) => {
                    warn!(repo = %repo.name, %error, "could not get issues, skipping repo");
                    continue;
                }
            };
            debug!(repo = %repo.name, count = issues.len(), "obtained issues");

            for issue in issues {
                // The marker is the only idempotency state there is:
                // an already-migrated issue never re-enters the run.
                if issue.labels.iter().any(|l| l.name == MIGRATED_LABEL) {
                    debug!(repo = %repo.name, number = issue.number, "already migrated, skipping");
                    continue;
                }

                self.fetch_budget.acquire().await;
                let comments = match source.list_comments(&repo.name, issue.number).await {
                    Ok(comments) => comments,
                    Err(error) => {
                        warn!(
                            repo = %repo.name,
                            number = issue.number,
                            %error,
                            "could not get comments, treating as none"
                        );
                        Vec::new()
                    }
                };
                debug!(
                    repo = %repo.name,
                    number = issue.number,
                    comments = comments.len(),
                    "obtained issue"
                );

                self.fetched.push(FetchedIssue {
                    repo: repo.name.clone(),
                    issue,
                    comments,
                });
            }
        }

        Ok(())
    }

    fn transform(&mut self, identities: &IdentityMap) {
        for fetched in std::mem::take(&mut self.fetched) {
            let issue = &fetched.issue;
            if !self.included(issue) {
                debug!(repo = %fetched.repo, number = issue.number, "filtered out");
                continue;
            }

            info!(repo = %fetched.repo, title = %issue.title, "processing issue body");

            let mut body = redact(issue.body.as_deref().unwrap_or(""), &self.config.redactions);
            if self.config.add_provenance {
                let record =
                    ProvenanceRecord::new(&issue.user.login).origin_url(&issue.html_url);
                body = add_provenance(&body, &record);
            }
            body = remap_identities(&body, identities);

            debug!(repo = %fetched.repo, title = %issue.title, "processing comment data");
            let comments = fetched
                .comments
                .iter()
                .map(|comment| {
                    let mut text =
                        redact(comment.body.as_deref().unwrap_or(""), &self.config.redactions);
                    if self.config.add_provenance {
                        let record = ProvenanceRecord::new(&comment.user.login)
                            .origin_url(&comment.html_url);
                        text = add_provenance(&text, &record);
                    }
                    remap_identities(&text, identities)
                })
                .collect();

            self.to_migrate.push(IssueUnit {
                repo: fetched.repo,
                source_number: issue.number,
                title: issue.title.clone(),
                body,
                comments,
                labels: issue.labels.iter().map(|l| l.name.clone()).collect(),
                milestone: issue.milestone.as_ref().map(|m| m.title.clone()),
                copied: false,
            });
        }
    }

    async fn copy(&mut self, destination: &GithubClient) -> Result<()> {
        let mut milestone_cache: HashMap<String, HashMap<String, u64>> = HashMap::new();
        let mut units = std::mem::take(&mut self.to_migrate);

        for unit in &mut units {
            info!(repo = %unit.repo, title = %unit.title, base_url = %destination.base_url(), "copying issue");

            let milestone = match &unit.milestone {
                Some(title) => {
                    let title = title.clone();
                    let resolved = self
                        .destination_milestone(destination, &mut milestone_cache, &unit.repo, &title)
                        .await;
                    if resolved.is_none() {
                        warn!(
                            repo = %unit.repo,
                            milestone = %title,
                            "no matching destination milestone, leaving unset"
                        );
                    }
                    resolved
                }
                None => None,
            };

            let new_issue = NewIssue {
                title: unit.title.clone(),
                body: unit.body.clone(),
                labels: unit.labels.clone(),
                milestone,
            };

            self.copy_budget.acquire().await;
            let created = match destination.create_issue(&unit.repo, &new_issue).await {
                Ok(issue) => issue,
                Err(error) if error.is_already_exists() => {
                    warn!(repo = %unit.repo, title = %unit.title, "issue already exists");
                    continue;
                }
                Err(error) => {
                    warn!(repo = %unit.repo, title = %unit.title, %error, "could not copy issue");
                    continue;
                }
            };
            debug!(repo = %unit.repo, title = %unit.title, number = created.number, "copied issue");

            for comment in &unit.comments {
                sleep(self.copy_delay).await;
                self.copy_budget.acquire().await;
                match destination
                    .add_comment(&unit.repo, created.number, comment)
                    .await
                {
                    Ok(()) => {
                        debug!(repo = %unit.repo, number = created.number, "added comment");
                    }
                    Err(error) => {
                        warn!(
                            repo = %unit.repo,
                            number = created.number,
                            %error,
                            "could not add comment"
                        );
                    }
                }
            }

            unit.copied = true;
        }

        self.to_migrate = units;
        Ok(())
    }

    async fn cleanup(&mut self, source: &GithubClient) -> Result<()> {
        for unit in self.to_migrate.iter().filter(|u| u.copied) {
            if self.config.add_migrated_label {
                self.cleanup_budget.acquire().await;
                let marker = vec![MIGRATED_LABEL.to_string()];
                match source
                    .add_labels(&unit.repo, unit.source_number, &marker)
                    .await
                {
                    Ok(()) => {
                        debug!(repo = %unit.repo, number = unit.source_number, "marked migrated");
                    }
                    Err(error) => {
                        warn!(
                            repo = %unit.repo,
                            number = unit.source_number,
                            %error,
                            "could not add migrated label"
                        );
                    }
                }
            }

            if self.config.lock_on_migrate {
                self.cleanup_budget.acquire().await;
                if let Err(error) = source
                    .add_comment(&unit.repo, unit.source_number, LOCK_COMMENT)
                    .await
                {
                    warn!(
                        repo = %unit.repo,
                        number = unit.source_number,
                        %error,
                        "could not add lock comment"
                    );
                }

                self.cleanup_budget.acquire().await;
                match source
                    .lock_issue(&unit.repo, unit.source_number, LOCK_REASON)
                    .await
                {
                    Ok(()) => {
                        debug!(repo = %unit.repo, number = unit.source_number, "locked source issue");
                    }
                    Err(error) => {
                        warn!(
                            repo = %unit.repo,
                            number = unit.source_number,
                            %error,
                            "could not lock source issue"
                        );
                    }
                }
            }

            if self.config.close_on_migrate {
                self.cleanup_budget.acquire().await;
                match source.close_issue(&unit.repo, unit.source_number).await {
                    Ok(()) => {
                        debug!(repo = %unit.repo, number = unit.source_number, "closed source issue");
                    }
                    Err(error) => {
                        warn!(
                            repo = %unit.repo,
                            number = unit.source_number,
                            %error,
                            "could not close source issue"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}
