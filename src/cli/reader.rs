use anyhow::Result;
use serde::Deserialize;
use serde_yaml;

use super::common::{DestinationEndpoint, SensitiveInfo, SourceEndpoint, StateFilter, UserPair};

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Config {
    pub source: SourceEndpoint,
    pub destination: DestinationEndpoint,
    #[serde(default)]
    pub issues: IssuesSection,
    #[serde(default)]
    pub projects: ProjectsSection,
    #[serde(default)]
    pub labels: LabelsSection,
    #[serde(default)]
    pub milestones: MilestonesSection,
    #[serde(default)]
    pub releases: ReleasesSection,
    #[serde(default)]
    pub users: Vec<UserPair>,
}

#[derive(Clone, Debug, PartialEq, Default, Deserialize)]
pub struct IssuesSection {
    #[serde(default)]
    pub migrate: bool,
    #[serde(default)]
    pub state: StateFilter,
    #[serde(default)]
    pub add_provenance: bool,
    #[serde(default)]
    pub sensitive_info: SensitiveInfo,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub close_on_migrate: bool,
    #[serde(default)]
    pub lock_on_migrate: bool,
    #[serde(default)]
    pub add_migrated_label: bool,
}

#[derive(Clone, Debug, PartialEq, Default, Deserialize)]
pub struct ProjectsSection {
    #[serde(default)]
    pub migrate: bool,
    #[serde(default)]
    pub state: StateFilter,
    #[serde(default)]
    pub add_provenance: bool,
    #[serde(default)]
    pub sensitive_info: SensitiveInfo,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub close_on_migrate: bool,
}

#[derive(Clone, Debug, PartialEq, Default, Deserialize)]
pub struct LabelsSection {
    #[serde(default)]
    pub migrate: bool,
}

#[derive(Clone, Debug, PartialEq, Default, Deserialize)]
pub struct MilestonesSection {
    #[serde(default)]
    pub migrate: bool,
    #[serde(default)]
    pub state: StateFilter,
}

#[derive(Clone, Debug, PartialEq, Default, Deserialize)]
pub struct ReleasesSection {
    #[serde(default)]
    pub migrate: bool,
}

pub fn read_config(config: &str) -> Result<Config> {
    let deserialized_config: Config = serde_yaml::from_str(config)?;

    Ok(deserialized_config)
}
