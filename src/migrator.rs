use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ParsedConfig;
use crate::github::GithubClient;
use crate::issues::Issues;
use crate::labels::Labels;
use crate::milestones::Milestones;
use crate::pipeline::Pipeline;
use crate::projects::Projects;
use crate::releases::Releases;
use crate::users;

/// Run one full migration.
///
/// Client setup is the only fatal step; everything after it degrades
/// per item and the destination's partial progress is what re-runs build
/// on. Stage order encodes the cross-kind dependencies: issues reference
/// labels and milestones, and label copy seeds the migrated marker label
/// that issue cleanup writes.
pub async fn run(config: ParsedConfig) -> Result<()> {
    let source = GithubClient::connect_source(&config.source)
        .await
        .context("could not initialize source client")?;
    let destination = GithubClient::connect_destination(&config.destination)
        .await
        .context("could not initialize destination client")?;

    let identities = users::resolve(&config.users, &source, &destination).await;
    if !config.users.is_empty() && identities.is_empty() {
        info!("no identity pairs resolved, mentions will not be remapped");
    }

    let seed_migrated_label = config.issues.add_migrated_label;
    let mut issues = Issues::new(config.issues);
    let mut projects = Projects::new(config.projects);
    let mut milestones = Milestones::new(config.milestones);
    let mut labels = Labels::new(config.labels, seed_migrated_label);
    let mut releases = Releases::new(config.releases);

    // Fetch order among these four is free of cross-kind dependencies.
    let fetch_order: [&mut dyn Pipeline; 4] =
        [&mut issues, &mut projects, &mut milestones, &mut labels];
    for pipeline in fetch_order {
        info!(kind = pipeline.kind(), "fetching from source");
        pipeline.fetch(&source).await?;
    }

    projects.transform(&identities);
    milestones.transform(&identities);
    labels.transform(&identities);
    issues.transform(&identities);

    // Issues go last: they reference labels and milestones that must
    // already exist on the destination.
    labels.copy(&destination).await?;
    milestones.copy(&destination).await?;
    projects.copy(&destination).await?;
    issues.copy(&destination).await?;

    projects.cleanup(&source).await?;
    issues.cleanup(&source).await?;

    // Releases have no cross-kind dependency and run on their own.
    releases.fetch(&source).await?;
    releases.transform(&identities);
    releases.copy(&destination).await?;

    info!("migration run complete");
    Ok(())
}
