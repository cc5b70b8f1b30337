use anyhow::{Context, Result};
use regex::Regex;

use super::{
    common::{DestinationEndpoint, SourceEndpoint, StateFilter, UserPair},
    reader,
};

/// Run-ready configuration: redaction patterns compiled, every section
/// flattened to what its pipeline actually consumes.
#[derive(Clone, Debug)]
pub struct ParsedConfig {
    pub source: SourceEndpoint,
    pub destination: DestinationEndpoint,
    pub issues: IssuesConfig,
    pub projects: ProjectsConfig,
    pub labels: LabelsConfig,
    pub milestones: MilestonesConfig,
    pub releases: ReleasesConfig,
    pub users: Vec<UserPair>,
}

#[derive(Clone, Debug)]
pub struct IssuesConfig {
    pub migrate: bool,
    pub state: StateFilter,
    pub add_provenance: bool,
    pub redactions: Vec<Regex>,
    pub authors: Vec<String>,
    pub labels: Vec<String>,
    pub close_on_migrate: bool,
    pub lock_on_migrate: bool,
    pub add_migrated_label: bool,
}

#[derive(Clone, Debug)]
pub struct ProjectsConfig {
    pub migrate: bool,
    pub state: StateFilter,
    pub add_provenance: bool,
    pub redactions: Vec<Regex>,
    pub names: Vec<String>,
    pub close_on_migrate: bool,
}

#[derive(Clone, Debug)]
pub struct LabelsConfig {
    pub migrate: bool,
}

#[derive(Clone, Debug)]
pub struct MilestonesConfig {
    pub migrate: bool,
    pub state: StateFilter,
}

#[derive(Clone, Debug)]
pub struct ReleasesConfig {
    pub migrate: bool,
}

pub fn parse_config(config: reader::Config) -> Result<ParsedConfig> {
    let issue_redactions = compile_redactions(&config.issues.sensitive_info)?;
    let project_redactions = compile_redactions(&config.projects.sensitive_info)?;

    Ok(ParsedConfig {
        source: config.source,
        destination: config.destination,
        issues: IssuesConfig {
            migrate: config.issues.migrate,
            state: config.issues.state,
            add_provenance: config.issues.add_provenance,
            redactions: issue_redactions,
            authors: config.issues.authors,
            labels: config.issues.labels,
            close_on_migrate: config.issues.close_on_migrate,
            lock_on_migrate: config.issues.lock_on_migrate,
            add_migrated_label: config.issues.add_migrated_label,
        },
        projects: ProjectsConfig {
            migrate: config.projects.migrate,
            state: config.projects.state,
            add_provenance: config.projects.add_provenance,
            redactions: project_redactions,
            names: config.projects.names,
            close_on_migrate: config.projects.close_on_migrate,
        },
        labels: LabelsConfig {
            migrate: config.labels.migrate,
        },
        milestones: MilestonesConfig {
            migrate: config.milestones.migrate,
            state: config.milestones.state,
        },
        releases: ReleasesConfig {
            migrate: config.releases.migrate,
        },
        users: config.users,
    })
}

/// Patterns only matter when redaction is switched on; a section with
/// `redact: false` compiles to no patterns at all.
fn compile_redactions(sensitive: &super::common::SensitiveInfo) -> Result<Vec<Regex>> {
    if !sensitive.redact {
        return Ok(Vec::new());
    }

    sensitive
        .regexes
        .iter()
        .map(|pattern| {
            Regex::new(pattern)
                .with_context(|| format!("invalid sensitive_info regex `{pattern}`"))
        })
        .collect()
}
